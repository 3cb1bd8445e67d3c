use anyhow::Result;
use rusqlite::Connection;

use super::OptionalExt;
use crate::Database;
use crate::models::UserRow;

const USER_COLUMNS: &str =
    "id, name, email, password, google_id, google_refresh_token, profile_pic, created_at";

impl Database {
    pub fn create_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        password_hash: Option<&str>,
        profile_pic: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password, profile_pic) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, name, email, password_hash, profile_pic],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Partial profile update; untouched fields keep their value.
    pub fn update_profile(
        &self,
        id: &str,
        name: Option<&str>,
        profile_pic: Option<&str>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                    name = COALESCE(?2, name),
                    profile_pic = COALESCE(?3, profile_pic)
                 WHERE id = ?1",
                rusqlite::params![id, name, profile_pic],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_password(&self, email: &str, password_hash: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?2 WHERE email = ?1",
                rusqlite::params![email, password_hash],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn link_google_account(
        &self,
        user_id: &str,
        google_id: &str,
        refresh_token: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET
                    google_id = ?2,
                    google_refresh_token = COALESCE(?3, google_refresh_token)
                 WHERE id = ?1",
                rusqlite::params![user_id, google_id, refresh_token],
            )?;
            Ok(())
        })
    }

    pub fn get_google_refresh_token(&self, user_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let token: Option<Option<String>> = conn
                .query_row(
                    "SELECT google_refresh_token FROM users WHERE id = ?1",
                    [user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(token.flatten())
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is a compile-time constant from the callers above, never user input
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                google_id: row.get(4)?,
                google_refresh_token: row.get(5)?,
                profile_pic: row.get(6)?,
                created_at: row.get(7)?,
            })
        })
        .optional()?;

    Ok(row)
}
