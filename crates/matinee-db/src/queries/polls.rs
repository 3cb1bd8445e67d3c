use anyhow::Result;

use super::OptionalExt;
use crate::Database;
use crate::models::{PollRow, VoteRow};

const POLL_COLUMNS: &str = "id, event_id, created_by, question, options, created_at";

impl Database {
    pub fn insert_poll(
        &self,
        id: &str,
        event_id: &str,
        created_by: &str,
        question: &str,
        options_json: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO polls (id, event_id, created_by, question, options)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, event_id, created_by, question, options_json],
            )?;
            Ok(())
        })
    }

    pub fn get_poll(&self, id: &str) -> Result<Option<PollRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {POLL_COLUMNS} FROM polls WHERE id = ?1"))?;
            stmt.query_row([id], map_poll).optional()
        })
    }

    pub fn get_polls_for_event(&self, event_id: &str) -> Result<Vec<PollRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POLL_COLUMNS} FROM polls WHERE event_id = ?1 ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map([event_id], map_poll)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// One vote per user per poll: a re-vote replaces the previous choice.
    /// The single upsert statement is the whole consistency story, matching
    /// the semantics of a single-document save.
    pub fn upsert_vote(&self, poll_id: &str, user_id: &str, option: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO poll_votes (poll_id, user_id, option) VALUES (?1, ?2, ?3)
                 ON CONFLICT(poll_id, user_id) DO UPDATE SET
                    option = excluded.option,
                    created_at = datetime('now')",
                rusqlite::params![poll_id, user_id, option],
            )?;
            Ok(())
        })
    }

    pub fn get_votes(&self, poll_id: &str) -> Result<Vec<VoteRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT user_id, option FROM poll_votes WHERE poll_id = ?1")?;
            let rows = stmt
                .query_map([poll_id], |row| {
                    Ok(VoteRow {
                        user_id: row.get(0)?,
                        option: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// (option, votes) pairs for every option that received at least one
    /// vote. Options with zero votes are absent; callers fill them in.
    pub fn get_vote_counts(&self, poll_id: &str) -> Result<Vec<(String, u32)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT option, COUNT(*) FROM poll_votes WHERE poll_id = ?1 GROUP BY option",
            )?;
            let rows = stmt
                .query_map([poll_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_poll(row: &rusqlite::Row<'_>) -> std::result::Result<PollRow, rusqlite::Error> {
    Ok(PollRow {
        id: row.get(0)?,
        event_id: row.get(1)?,
        created_by: row.get(2)?,
        question: row.get(3)?,
        options: row.get(4)?,
        created_at: row.get(5)?,
    })
}
