use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};

use crate::Database;
use crate::models::UserRow;

const USER_COLUMNS: &str =
    "id, username, email, role, password_hash, oauth_client, profile_picture_id";

impl Database {
    #[allow(clippy::too_many_arguments)]
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        role: &str,
        password_hash: Option<&str>,
        oauth_client: Option<&str>,
        profile_picture_id: Option<&str>,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, role, password_hash, oauth_client, profile_picture_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![username, email, role, password_hash, oauth_client, profile_picture_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(conn, &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"), email)
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
            let row = stmt.query_row([id], map_user_row).optional()?;
            Ok(row)
        })
    }

    /// Batch fetch, used to attach authors to a page of comments without one
    /// lookup per comment.
    pub fn get_users_by_ids(&self, ids: &[i64]) -> Result<Vec<UserRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users WHERE id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let db_params: Vec<&dyn rusqlite::types::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

            let rows = stmt
                .query_map(db_params.as_slice(), map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Exact, case-sensitive match.
    pub fn username_exists(&self, username: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM users WHERE username = ?1", [username], |r| r.get(0))
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Exact, case-sensitive match.
    pub fn email_exists(&self, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM users WHERE email = ?1", [email], |r| r.get(0))
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn set_user_role(&self, id: i64, role: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("UPDATE users SET role = ?1 WHERE id = ?2", params![role, id])?;
            Ok(changed > 0)
        })
    }

    pub fn set_profile_picture(&self, id: i64, file_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET profile_picture_id = ?1 WHERE id = ?2",
                params![file_id, id],
            )?;
            Ok(changed > 0)
        })
    }
}

fn query_user(conn: &Connection, sql: &str, key: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(sql)?;
    let row = stmt.query_row([key], map_user_row).optional()?;
    Ok(row)
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        password_hash: row.get(4)?,
        oauth_client: row.get(5)?,
        profile_picture_id: row.get(6)?,
    })
}
