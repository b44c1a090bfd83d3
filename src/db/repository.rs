use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::DatabaseError;

/// One persisted analysis result.
///
/// `summary` is the full accumulated text returned by the generation service,
/// including any trailing relationship payload — the store treats it as an
/// opaque blob. Records are immutable after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub filename: String,
    pub summary: String,
    pub created_at: String,
}

/// Render a creation time the way the history sidebar displays it.
pub fn format_timestamp(time: DateTime<Local>) -> String {
    time.format("%m-%d %H:%M").to_string()
}

/// Insert a completed analysis. Returns the assigned record id.
pub fn insert_record(
    conn: &Connection,
    filename: &str,
    summary: &str,
    created_at: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO analysis_history (filename, summary, created_at)
         VALUES (?1, ?2, ?3)",
        params![filename, summary, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

/// List all records, most recent first.
pub fn list_records(conn: &Connection) -> Result<Vec<AnalysisRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, filename, summary, created_at
         FROM analysis_history ORDER BY id DESC",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(AnalysisRecord {
            id: row.get(0)?,
            filename: row.get(1)?,
            summary: row.get(2)?,
            created_at: row.get(3)?,
        })
    })?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

/// Fetch a single record by id.
pub fn get_record(conn: &Connection, id: i64) -> Result<Option<AnalysisRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, filename, summary, created_at
         FROM analysis_history WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id], |row| {
        Ok(AnalysisRecord {
            id: row.get(0)?,
            filename: row.get(1)?,
            summary: row.get(2)?,
            created_at: row.get(3)?,
        })
    });

    match result {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Delete every record. Returns the number of rows removed.
pub fn delete_all_records(conn: &Connection) -> Result<usize, DatabaseError> {
    let removed = conn.execute("DELETE FROM analysis_history", [])?;
    Ok(removed)
}
