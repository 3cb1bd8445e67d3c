use anyhow::Result;
use rusqlite::Connection;

use super::OptionalExt;
use crate::Database;
use crate::models::{GroupRow, MemberRow};

const GROUP_COLUMNS: &str = "id, name, description, created_by, invite_token, created_at";

impl Database {
    /// Creates the group and enrolls the creator as its first member.
    pub fn create_group(
        &self,
        id: &str,
        name: &str,
        description: &str,
        created_by: &str,
        invite_token: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO groups (id, name, description, created_by, invite_token)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, name, description, created_by, invite_token],
            )?;
            tx.execute(
                "INSERT INTO group_members (group_id, user_id) VALUES (?1, ?2)",
                rusqlite::params![id, created_by],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_group(&self, id: &str) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {GROUP_COLUMNS} FROM groups WHERE id = ?1"))?;
            stmt.query_row([id], map_group).optional()
        })
    }

    pub fn get_group_by_invite_token(&self, invite_token: &str) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {GROUP_COLUMNS} FROM groups WHERE invite_token = ?1"
            ))?;
            stmt.query_row([invite_token], map_group).optional()
        })
    }

    /// Groups the user belongs to, newest first. `created_by` narrows to a
    /// single creator when set.
    pub fn list_groups_for_user(
        &self,
        user_id: &str,
        created_by: Option<&str>,
    ) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {GROUP_COLUMNS} FROM groups g
                 JOIN group_members gm ON gm.group_id = g.id
                 WHERE gm.user_id = ?1
                   AND (?2 IS NULL OR g.created_by = ?2)
                 ORDER BY g.created_at DESC"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, created_by], map_group)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_group(
        &self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE groups SET
                    name = COALESCE(?2, name),
                    description = COALESCE(?3, description)
                 WHERE id = ?1",
                rusqlite::params![id, name, description],
            )?;
            Ok(changed > 0)
        })
    }

    /// Deletes the group and everything hanging off it: events with their
    /// messages, polls, votes, invites, participants and calendar links,
    /// plus watch history and memberships. One transaction.
    pub fn delete_group_cascade(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            delete_events_of_group(&tx, id)?;
            tx.execute("DELETE FROM history WHERE group_id = ?1", [id])?;
            tx.execute("DELETE FROM group_members WHERE group_id = ?1", [id])?;
            let deleted = tx.execute("DELETE FROM groups WHERE id = ?1", [id])?;

            tx.commit()?;
            Ok(deleted > 0)
        })
    }

    /// Idempotent: adding an existing member is a no-op.
    pub fn add_member(&self, group_id: &str, user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO group_members (group_id, user_id) VALUES (?1, ?2)",
                rusqlite::params![group_id, user_id],
            )?;
            Ok(())
        })
    }

    pub fn remove_member(&self, group_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2",
                rusqlite::params![group_id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn is_member(&self, group_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM group_members WHERE group_id = ?1 AND user_id = ?2",
                    rusqlite::params![group_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn get_members(&self, group_id: &str) -> Result<Vec<MemberRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.name, u.profile_pic
                 FROM group_members gm
                 JOIN users u ON u.id = gm.user_id
                 WHERE gm.group_id = ?1
                 ORDER BY gm.created_at",
            )?;
            let rows = stmt
                .query_map([group_id], |row| {
                    Ok(MemberRow {
                        user_id: row.get(0)?,
                        name: row.get(1)?,
                        profile_pic: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_group(row: &rusqlite::Row<'_>) -> std::result::Result<GroupRow, rusqlite::Error> {
    Ok(GroupRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_by: row.get(3)?,
        invite_token: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Shared by group deletion and event deletion: strips one event's children.
pub(crate) fn delete_event_children(conn: &Connection, event_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM poll_votes WHERE poll_id IN (SELECT id FROM polls WHERE event_id = ?1)",
        [event_id],
    )?;
    conn.execute("DELETE FROM polls WHERE event_id = ?1", [event_id])?;
    conn.execute("DELETE FROM messages WHERE event_id = ?1", [event_id])?;
    conn.execute("DELETE FROM event_invites WHERE event_id = ?1", [event_id])?;
    conn.execute("DELETE FROM event_participants WHERE event_id = ?1", [event_id])?;
    conn.execute("DELETE FROM event_calendar_links WHERE event_id = ?1", [event_id])?;
    conn.execute("DELETE FROM event_movies WHERE event_id = ?1", [event_id])?;
    Ok(())
}

fn delete_events_of_group(conn: &Connection, group_id: &str) -> Result<()> {
    let event_ids: Vec<String> = {
        let mut stmt = conn.prepare("SELECT id FROM events WHERE group_id = ?1")?;
        stmt.query_map([group_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?
    };

    for event_id in &event_ids {
        delete_event_children(conn, event_id)?;
        conn.execute("DELETE FROM history WHERE event_id = ?1", [event_id])?;
        conn.execute("DELETE FROM events WHERE id = ?1", [event_id])?;
    }
    Ok(())
}
