use anyhow::Result;

use super::OptionalExt;
use crate::Database;
use crate::models::{MovieRow, WatchlistRow};

const MOVIE_COLUMNS: &str = "movie_id, title, poster_url, rating, year, genres, overview";

impl Database {
    /// Refreshes the local catalog cache for a movie.
    #[allow(clippy::too_many_arguments)]
    pub fn upsert_movie(
        &self,
        movie_id: &str,
        title: &str,
        poster_url: Option<&str>,
        rating: Option<f64>,
        year: Option<i32>,
        genres_json: &str,
        overview: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO movies (movie_id, title, poster_url, rating, year, genres, overview)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(movie_id) DO UPDATE SET
                    title = excluded.title,
                    poster_url = excluded.poster_url,
                    rating = excluded.rating,
                    year = excluded.year,
                    genres = excluded.genres,
                    overview = excluded.overview",
                rusqlite::params![movie_id, title, poster_url, rating, year, genres_json, overview],
            )?;
            Ok(())
        })
    }

    /// Batch-fetch cached movies by external id, preserving no particular order.
    pub fn get_movies(&self, movie_ids: &[String]) -> Result<Vec<MovieRow>> {
        if movie_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=movie_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT {MOVIE_COLUMNS} FROM movies WHERE movie_id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = movie_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), map_movie)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// The user's default watchlist, created on first use.
    pub fn get_or_create_watchlist(&self, id_if_new: &str, owner_id: &str) -> Result<WatchlistRow> {
        self.with_conn_mut(|conn| {
            let existing = {
                let mut stmt = conn.prepare(
                    "SELECT id, owner_id, name, created_at FROM watchlists
                     WHERE owner_id = ?1 ORDER BY created_at LIMIT 1",
                )?;
                stmt.query_row([owner_id], map_watchlist).optional()?
            };
            if let Some(row) = existing {
                return Ok(row);
            }

            conn.execute(
                "INSERT INTO watchlists (id, owner_id) VALUES (?1, ?2)",
                rusqlite::params![id_if_new, owner_id],
            )?;
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, name, created_at FROM watchlists WHERE id = ?1",
            )?;
            let row = stmt.query_row([id_if_new], map_watchlist)?;
            Ok(row)
        })
    }

    /// Returns false when the movie was already on the list.
    pub fn add_watchlist_movie(&self, watchlist_id: &str, movie_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO watchlist_movies (watchlist_id, movie_id) VALUES (?1, ?2)",
                rusqlite::params![watchlist_id, movie_id],
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn remove_watchlist_movie(&self, watchlist_id: &str, movie_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM watchlist_movies WHERE watchlist_id = ?1 AND movie_id = ?2",
                rusqlite::params![watchlist_id, movie_id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Movies on a watchlist, in insertion order.
    pub fn get_watchlist_movies(&self, watchlist_id: &str) -> Result<Vec<MovieRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.movie_id, m.title, m.poster_url, m.rating, m.year, m.genres, m.overview
                 FROM watchlist_movies wm
                 JOIN movies m ON m.movie_id = wm.movie_id
                 WHERE wm.watchlist_id = ?1
                 ORDER BY wm.created_at",
            )?;
            let rows = stmt
                .query_map([watchlist_id], map_movie)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn watchlist_contains(&self, owner_id: &str, movie_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM watchlist_movies wm
                     JOIN watchlists w ON w.id = wm.watchlist_id
                     WHERE w.owner_id = ?1 AND wm.movie_id = ?2",
                    rusqlite::params![owner_id, movie_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }
}

fn map_movie(row: &rusqlite::Row<'_>) -> std::result::Result<MovieRow, rusqlite::Error> {
    Ok(MovieRow {
        movie_id: row.get(0)?,
        title: row.get(1)?,
        poster_url: row.get(2)?,
        rating: row.get(3)?,
        year: row.get(4)?,
        genres: row.get(5)?,
        overview: row.get(6)?,
    })
}

fn map_watchlist(row: &rusqlite::Row<'_>) -> std::result::Result<WatchlistRow, rusqlite::Error> {
    Ok(WatchlistRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        created_at: row.get(3)?,
    })
}
