use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use serde_json::Value;

use crate::model::{IngestRecord, IngestSummary, StorageError};

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens the database, creating the schema and running additive migrations.
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS ingests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                filename TEXT NOT NULL DEFAULT '',
                player_names TEXT NOT NULL DEFAULT '[]',
                bust INTEGER NOT NULL DEFAULT 0,
                raw_json TEXT NOT NULL DEFAULT '{}',
                normalized_json TEXT NOT NULL DEFAULT '{}'
            );
            ",
        )?;

        // Early deployments predate the metadata blob
        Self::migrate_add_column_if_missing(&conn, "ingests", "meta_json", "TEXT NOT NULL DEFAULT '{}'")?;

        Ok(Self { conn })
    }

    /// Checks for a column and adds it to the table when absent.
    fn migrate_add_column_if_missing(
        conn: &Connection,
        table: &str,
        column: &str,
        column_def: &str,
    ) -> Result<(), StorageError> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
        let existing_columns: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<_, _>>()?;

        if !existing_columns.iter().any(|c| c == column) {
            let alter_sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_def);
            conn.execute(&alter_sql, [])?;
        }

        Ok(())
    }

    /// Inserts one ingest row and returns its id.
    pub fn insert_ingest(
        &self,
        filename: &str,
        player_names: &[String],
        bust: bool,
        meta: &Value,
        raw: &Value,
        normalized: &Value,
    ) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO ingests (
                created_at, filename, player_names, bust,
                meta_json, raw_json, normalized_json
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                Utc::now().to_rfc3339(),
                filename,
                serde_json::to_string(player_names)?,
                bust,
                meta.to_string(),
                raw.to_string(),
                normalized.to_string(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Returns the newest ingests first, without the payload blobs.
    pub fn list_ingests(&self, limit: u32) -> Result<Vec<IngestSummary>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at, filename, player_names, bust
             FROM ingests ORDER BY id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit], |row| {
            Ok(IngestSummary {
                id: row.get(0)?,
                created_at: Self::parse_timestamp(row, 1)?,
                filename: row.get(2)?,
                player_names: Self::parse_names(row.get::<_, String>(3)?),
                bust: row.get(4)?,
            })
        })?;

        let mut ingests = Vec::new();
        for ingest in rows {
            ingests.push(ingest?);
        }
        Ok(ingests)
    }

    /// Fetches the full record, or `None` when the id is absent.
    pub fn get_ingest(&self, id: i64) -> Result<Option<IngestRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at, filename, player_names, bust,
                    meta_json, raw_json, normalized_json
             FROM ingests WHERE id = ?1",
        )?;

        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(IngestRecord {
                id: row.get(0)?,
                created_at: Self::parse_timestamp(row, 1)?,
                filename: row.get(2)?,
                player_names: Self::parse_names(row.get::<_, String>(3)?),
                bust: row.get(4)?,
                meta: Self::parse_blob(row.get::<_, String>(5)?),
                raw: Self::parse_blob(row.get::<_, String>(6)?),
                normalized: Self::parse_blob(row.get::<_, String>(7)?),
            }))
        } else {
            Ok(None)
        }
    }

    /// Deletes one ingest; `false` when no row matched.
    pub fn delete_ingest(&self, id: i64) -> Result<bool, StorageError> {
        let deleted = self
            .conn
            .execute("DELETE FROM ingests WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn parse_timestamp(row: &Row, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
        let text: String = row.get(idx)?;
        text.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    }

    fn parse_names(text: String) -> Vec<String> {
        serde_json::from_str(&text).unwrap_or_default()
    }

    fn parse_blob(text: String) -> Value {
        serde_json::from_str(&text).unwrap_or(Value::Null)
    }
}
