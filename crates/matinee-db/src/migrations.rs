use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                      TEXT PRIMARY KEY,
            name                    TEXT NOT NULL,
            email                   TEXT NOT NULL UNIQUE,
            password                TEXT,
            google_id               TEXT,
            google_refresh_token    TEXT,
            profile_pic             TEXT NOT NULL,
            created_at              TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS groups (
            id              TEXT PRIMARY KEY,
            name            TEXT NOT NULL,
            description     TEXT NOT NULL,
            created_by      TEXT NOT NULL REFERENCES users(id),
            invite_token    TEXT NOT NULL UNIQUE,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS group_members (
            group_id    TEXT NOT NULL REFERENCES groups(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(group_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS events (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            group_id    TEXT REFERENCES groups(id),
            created_by  TEXT NOT NULL REFERENCES users(id),
            starts_at   TEXT NOT NULL,
            notes       TEXT,
            remind      INTEGER NOT NULL DEFAULT 0,
            remind_at   TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_events_group
            ON events(group_id);

        CREATE TABLE IF NOT EXISTS event_invites (
            event_id    TEXT NOT NULL REFERENCES events(id),
            email       TEXT NOT NULL,
            UNIQUE(event_id, email)
        );

        CREATE TABLE IF NOT EXISTS event_participants (
            event_id    TEXT NOT NULL REFERENCES events(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            status      TEXT NOT NULL DEFAULT 'pending',
            UNIQUE(event_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS event_calendar_links (
            event_id        TEXT NOT NULL REFERENCES events(id),
            user_id         TEXT NOT NULL REFERENCES users(id),
            google_event_id TEXT NOT NULL,
            UNIQUE(event_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS event_movies (
            event_id    TEXT NOT NULL REFERENCES events(id),
            movie_id    TEXT NOT NULL,
            UNIQUE(event_id, movie_id)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            event_id    TEXT NOT NULL REFERENCES events(id),
            sender_id   TEXT NOT NULL REFERENCES users(id),
            text        TEXT,
            image_url   TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_event
            ON messages(event_id, created_at);

        CREATE TABLE IF NOT EXISTS polls (
            id          TEXT PRIMARY KEY,
            event_id    TEXT NOT NULL REFERENCES events(id),
            created_by  TEXT NOT NULL REFERENCES users(id),
            question    TEXT NOT NULL,
            options     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_polls_event
            ON polls(event_id);

        CREATE TABLE IF NOT EXISTS poll_votes (
            poll_id     TEXT NOT NULL REFERENCES polls(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            option      TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(poll_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_poll_votes_poll
            ON poll_votes(poll_id);

        CREATE TABLE IF NOT EXISTS movies (
            movie_id    TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            poster_url  TEXT,
            rating      REAL,
            year        INTEGER,
            genres      TEXT NOT NULL DEFAULT '[]',
            overview    TEXT
        );

        CREATE TABLE IF NOT EXISTS watchlists (
            id          TEXT PRIMARY KEY,
            owner_id    TEXT NOT NULL REFERENCES users(id),
            name        TEXT NOT NULL DEFAULT 'My Watchlist',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS watchlist_movies (
            watchlist_id    TEXT NOT NULL REFERENCES watchlists(id),
            movie_id        TEXT NOT NULL REFERENCES movies(movie_id),
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(watchlist_id, movie_id)
        );

        CREATE TABLE IF NOT EXISTS history (
            id              TEXT PRIMARY KEY,
            group_id        TEXT NOT NULL REFERENCES groups(id),
            event_id        TEXT NOT NULL REFERENCES events(id),
            watched_movie   TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_history_group
            ON history(group_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
