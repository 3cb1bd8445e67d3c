use anyhow::Result;

use super::OptionalExt;
use super::groups::delete_event_children;
use crate::Database;
use crate::models::{CalendarLinkRow, EventRow, ParticipantRow};

const EVENT_COLUMNS: &str =
    "id, title, group_id, created_by, starts_at, notes, remind, remind_at, created_at";

impl Database {
    /// Creates the event with its invite emails, suggested movies, and the
    /// initial participant set (creator accepted, other group members
    /// pending). One transaction.
    #[allow(clippy::too_many_arguments)]
    pub fn create_event(
        &self,
        id: &str,
        title: &str,
        group_id: Option<&str>,
        created_by: &str,
        starts_at: &str,
        notes: Option<&str>,
        remind_at: Option<&str>,
        invited_emails: &[String],
        suggested_movies: &[String],
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO events (id, title, group_id, created_by, starts_at, notes, remind, remind_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    id,
                    title,
                    group_id,
                    created_by,
                    starts_at,
                    notes,
                    remind_at.is_some(),
                    remind_at
                ],
            )?;

            for email in invited_emails {
                tx.execute(
                    "INSERT OR IGNORE INTO event_invites (event_id, email) VALUES (?1, ?2)",
                    rusqlite::params![id, email],
                )?;
            }

            for movie_id in suggested_movies {
                tx.execute(
                    "INSERT OR IGNORE INTO event_movies (event_id, movie_id) VALUES (?1, ?2)",
                    rusqlite::params![id, movie_id],
                )?;
            }

            tx.execute(
                "INSERT INTO event_participants (event_id, user_id, status) VALUES (?1, ?2, 'accepted')",
                rusqlite::params![id, created_by],
            )?;
            if let Some(group_id) = group_id {
                tx.execute(
                    "INSERT OR IGNORE INTO event_participants (event_id, user_id, status)
                     SELECT ?1, user_id, 'pending' FROM group_members WHERE group_id = ?2",
                    rusqlite::params![id, group_id],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_event(&self, id: &str) -> Result<Option<EventRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"))?;
            stmt.query_row([id], map_event).optional()
        })
    }

    /// Events the user created plus events of groups they belong to,
    /// soonest first.
    pub fn list_events_for_user(&self, user_id: &str) -> Result<Vec<EventRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT DISTINCT {EVENT_COLUMNS} FROM events e
                 WHERE e.created_by = ?1
                    OR e.group_id IN (SELECT group_id FROM group_members WHERE user_id = ?1)
                 ORDER BY e.starts_at"
            ))?;
            let rows = stmt
                .query_map([user_id], map_event)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Partial update. `remind`/`remind_at` are applied together when either
    /// changes; callers pass the resolved pair.
    pub fn update_event(
        &self,
        id: &str,
        title: Option<&str>,
        starts_at: Option<&str>,
        notes: Option<&str>,
        remind: Option<bool>,
        remind_at: Option<Option<&str>>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE events SET
                    title = COALESCE(?2, title),
                    starts_at = COALESCE(?3, starts_at),
                    notes = COALESCE(?4, notes),
                    remind = COALESCE(?5, remind)
                 WHERE id = ?1",
                rusqlite::params![id, title, starts_at, notes, remind],
            )?;
            if let Some(remind_at) = remind_at {
                conn.execute(
                    "UPDATE events SET remind_at = ?2 WHERE id = ?1",
                    rusqlite::params![id, remind_at],
                )?;
            }
            Ok(changed > 0)
        })
    }

    pub fn delete_event_cascade(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            delete_event_children(&tx, id)?;
            tx.execute("DELETE FROM history WHERE event_id = ?1", [id])?;
            let deleted = tx.execute("DELETE FROM events WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(deleted > 0)
        })
    }

    // -- Invitees --

    pub fn add_invites(&self, event_id: &str, emails: &[String]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            for email in emails {
                tx.execute(
                    "INSERT OR IGNORE INTO event_invites (event_id, email) VALUES (?1, ?2)",
                    rusqlite::params![event_id, email],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn remove_invite(&self, event_id: &str, email: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM event_invites WHERE event_id = ?1 AND email = ?2",
                rusqlite::params![event_id, email],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_invites(&self, event_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT email FROM event_invites WHERE event_id = ?1 ORDER BY email")?;
            let rows = stmt
                .query_map([event_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Participants --

    pub fn set_rsvp(&self, event_id: &str, user_id: &str, status: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO event_participants (event_id, user_id, status) VALUES (?1, ?2, ?3)
                 ON CONFLICT(event_id, user_id) DO UPDATE SET status = excluded.status",
                rusqlite::params![event_id, user_id, status],
            )?;
            Ok(())
        })
    }

    pub fn get_participants(&self, event_id: &str) -> Result<Vec<ParticipantRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.user_id, u.name, p.status
                 FROM event_participants p
                 JOIN users u ON u.id = p.user_id
                 WHERE p.event_id = ?1
                 ORDER BY u.name",
            )?;
            let rows = stmt
                .query_map([event_id], |row| {
                    Ok(ParticipantRow {
                        user_id: row.get(0)?,
                        name: row.get(1)?,
                        status: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_event_movies(&self, event_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT movie_id FROM event_movies WHERE event_id = ?1")?;
            let rows = stmt
                .query_map([event_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Calendar links --

    pub fn set_calendar_link(
        &self,
        event_id: &str,
        user_id: &str,
        google_event_id: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO event_calendar_links (event_id, user_id, google_event_id)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(event_id, user_id) DO UPDATE SET google_event_id = excluded.google_event_id",
                rusqlite::params![event_id, user_id, google_event_id],
            )?;
            Ok(())
        })
    }

    pub fn get_calendar_links(&self, event_id: &str) -> Result<Vec<CalendarLinkRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, google_event_id FROM event_calendar_links WHERE event_id = ?1",
            )?;
            let rows = stmt
                .query_map([event_id], |row| {
                    Ok(CalendarLinkRow {
                        user_id: row.get(0)?,
                        google_event_id: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn remove_calendar_link(&self, event_id: &str, user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM event_calendar_links WHERE event_id = ?1 AND user_id = ?2",
                rusqlite::params![event_id, user_id],
            )?;
            Ok(())
        })
    }
}

fn map_event(row: &rusqlite::Row<'_>) -> std::result::Result<EventRow, rusqlite::Error> {
    Ok(EventRow {
        id: row.get(0)?,
        title: row.get(1)?,
        group_id: row.get(2)?,
        created_by: row.get(3)?,
        starts_at: row.get(4)?,
        notes: row.get(5)?,
        remind: row.get(6)?,
        remind_at: row.get(7)?,
        created_at: row.get(8)?,
    })
}
