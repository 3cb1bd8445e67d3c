use anyhow::Result;

use crate::Database;
use crate::models::MessageRow;

impl Database {
    pub fn insert_message(
        &self,
        id: &str,
        event_id: &str,
        sender_id: &str,
        text: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (id, event_id, sender_id, text, image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, event_id, sender_id, text, image_url],
            )?;
            Ok(())
        })
    }

    /// Messages for an event, newest first. JOINs users for sender details
    /// in a single query.
    pub fn get_messages_for_event(&self, event_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.event_id, m.sender_id, u.name, u.profile_pic,
                        m.text, m.image_url, m.created_at
                 FROM messages m
                 LEFT JOIN users u ON m.sender_id = u.id
                 WHERE m.event_id = ?1
                 ORDER BY m.created_at DESC",
            )?;

            let rows = stmt
                .query_map([event_id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        event_id: row.get(1)?,
                        sender_id: row.get(2)?,
                        sender_name: row
                            .get::<_, Option<String>>(3)?
                            .unwrap_or_else(|| "unknown".to_string()),
                        sender_profile_pic: row
                            .get::<_, Option<String>>(4)?
                            .unwrap_or_default(),
                        text: row.get(5)?,
                        image_url: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}
