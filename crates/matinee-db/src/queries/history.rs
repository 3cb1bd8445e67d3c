use anyhow::Result;

use crate::Database;
use crate::models::HistoryRow;

impl Database {
    pub fn insert_history(
        &self,
        id: &str,
        group_id: &str,
        event_id: &str,
        watched_movie: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO history (id, group_id, event_id, watched_movie)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, group_id, event_id, watched_movie],
            )?;
            Ok(())
        })
    }

    pub fn get_history_for_group(&self, group_id: &str) -> Result<Vec<HistoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, group_id, event_id, watched_movie, created_at
                 FROM history WHERE group_id = ?1 ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([group_id], |row| {
                    Ok(HistoryRow {
                        id: row.get(0)?,
                        group_id: row.get(1)?,
                        event_id: row.get(2)?,
                        watched_movie: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Most recently watched distinct movie ids for a group, newest first.
    /// This is what the recommender scores against.
    pub fn recent_watched_for_group(&self, group_id: &str, limit: u32) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT watched_movie FROM history
                 WHERE group_id = ?1
                 GROUP BY watched_movie
                 ORDER BY MAX(created_at) DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![group_id, limit], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
