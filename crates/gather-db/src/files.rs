use anyhow::Result;
use rusqlite::{OptionalExtension, params};

use crate::Database;
use crate::models::FileRow;

impl Database {
    pub fn insert_file(&self, file: &FileRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO files (id, filename, content_type, size, sha256)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![file.id, file.filename, file.content_type, file.size, file.sha256],
            )?;
            Ok(())
        })
    }

    pub fn get_file(&self, id: &str) -> Result<Option<FileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, filename, content_type, size, sha256 FROM files WHERE id = ?1",
            )?;
            let row = stmt
                .query_row([id], |row| {
                    Ok(FileRow {
                        id: row.get(0)?,
                        filename: row.get(1)?,
                        content_type: row.get(2)?,
                        size: row.get(3)?,
                        sha256: row.get(4)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    pub fn delete_file(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM files WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}
