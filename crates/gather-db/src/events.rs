use std::collections::HashMap;

use anyhow::Result;
use rusqlite::{OptionalExtension, params};

use crate::Database;
use crate::models::EventRow;

const EVENT_COLUMNS: &str = "id, title, description, location, event_types, owner_id, \
     date, start_time, end_time, banner_picture_id";

impl Database {
    pub fn insert_event(&self, event: &EventRow) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO events (title, description, location, event_types, owner_id, date, start_time, end_time, banner_picture_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    event.title,
                    event.description,
                    event.location,
                    event.event_types,
                    event.owner_id,
                    event.date,
                    event.start_time,
                    event.end_time,
                    event.banner_picture_id,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_event_by_id(&self, id: i64) -> Result<Option<EventRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"))?;
            let row = stmt.query_row([id], map_event_row).optional()?;
            Ok(row)
        })
    }

    pub fn event_exists(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM events WHERE id = ?1", [id], |r| r.get(0))
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Full-row update; the service layer merges the patch beforehand.
    pub fn update_event(&self, event: &EventRow) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE events SET title = ?1, description = ?2, location = ?3, event_types = ?4,
                     date = ?5, start_time = ?6, end_time = ?7, banner_picture_id = ?8
                 WHERE id = ?9",
                params![
                    event.title,
                    event.description,
                    event.location,
                    event.event_types,
                    event.date,
                    event.start_time,
                    event.end_time,
                    event.banner_picture_id,
                    event.id,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Deletes an event together with its likes and comments.
    pub fn delete_event(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute("DELETE FROM likes WHERE event_id = ?1", [id])?;
            tx.execute("DELETE FROM comments WHERE event_id = ?1", [id])?;
            let changed = tx.execute("DELETE FROM events WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(changed > 0)
        })
    }

    /// Events whose derived date falls within `[start_date, end_date]`
    /// inclusive. Dates are ISO `YYYY-MM-DD`, so string comparison orders
    /// correctly.
    pub fn list_events_between(&self, start_date: &str, end_date: &str) -> Result<Vec<EventRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE date >= ?1 AND date <= ?2 ORDER BY date, id"
            ))?;
            let rows = stmt
                .query_map(params![start_date, end_date], map_event_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Likes --

    /// Returns false when the (event, user) pair already holds a like; the
    /// primary key makes concurrent duplicates lose at the store level too.
    pub fn insert_like(&self, event_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            match conn.execute(
                "INSERT INTO likes (event_id, user_id) VALUES (?1, ?2)",
                params![event_id, user_id],
            ) {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn delete_like(&self, event_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM likes WHERE event_id = ?1 AND user_id = ?2",
                params![event_id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn count_likes(&self, event_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE event_id = ?1",
                [event_id],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }

    /// One grouped aggregation for a whole result page, instead of N+1
    /// per-event counts.
    pub fn count_likes_for_events(&self, event_ids: &[i64]) -> Result<HashMap<i64, i64>> {
        if event_ids.is_empty() {
            return Ok(HashMap::new());
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=event_ids.len()).map(|i| format!("?{i}")).collect();
            let sql = format!(
                "SELECT event_id, COUNT(*) FROM likes WHERE event_id IN ({}) GROUP BY event_id",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let db_params: Vec<&dyn rusqlite::types::ToSql> = event_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let counts = stmt
                .query_map(db_params.as_slice(), |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<std::result::Result<HashMap<_, _>, _>>()?;
            Ok(counts)
        })
    }
}

fn map_event_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        location: row.get(3)?,
        event_types: row.get(4)?,
        owner_id: row.get(5)?,
        date: row.get(6)?,
        start_time: row.get(7)?,
        end_time: row.get(8)?,
        banner_picture_id: row.get(9)?,
    })
}
