use anyhow::Result;
use rusqlite::{OptionalExtension, params};

use crate::Database;
use crate::models::CommentRow;

impl Database {
    pub fn insert_comment(
        &self,
        event_id: i64,
        user_id: i64,
        content: &str,
        created_at: i64,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (event_id, user_id, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![event_id, user_id, content, created_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_comment_by_id(&self, id: i64) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, event_id, user_id, content, created_at, updated_at
                 FROM comments WHERE id = ?1",
            )?;
            let row = stmt.query_row([id], map_comment_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_comments_by_event(&self, event_id: i64) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, event_id, user_id, content, created_at, updated_at
                 FROM comments WHERE event_id = ?1 ORDER BY created_at, id",
            )?;
            let rows = stmt
                .query_map([event_id], map_comment_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Replaces the content and stamps `updated_at`; `created_at` is left
    /// untouched.
    pub fn update_comment(&self, id: i64, content: &str, updated_at: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE comments SET content = ?1, updated_at = ?2 WHERE id = ?3",
                params![content, updated_at, id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_comment(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

fn map_comment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        event_id: row.get(1)?,
        user_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
