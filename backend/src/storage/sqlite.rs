//! SQLite-backed certificate store.
//!
//! The connection is opened once, owned by the store and shared behind a
//! mutex; its lifetime is tied to process start/shutdown instead of being
//! re-opened per call. Duplicate ids are handled by `INSERT OR IGNORE`, so a
//! retried batch simply reports fewer accepted records.

use super::CertificateStore;
use chrono::{DateTime, Utc};
use common::model::certificate::CertificateRecord;
use rusqlite::{params, Connection, Row};
use std::sync::Mutex;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, String> {
        let conn = Connection::open(path).map_err(|e| e.to_string())?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, String> {
        self.conn
            .lock()
            .map_err(|_| "certificate store mutex poisoned".to_string())
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CertificateRecord> {
    let created_at_ms: i64 = row.get(7)?;
    Ok(CertificateRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        verify_link: row.get(2)?,
        issued_at: row.get(3)?,
        issuer: row.get(4)?,
        template_id: row.get(5)?,
        recipient_email: row.get(6)?,
        created_at: DateTime::<Utc>::from_timestamp_millis(created_at_ms),
    })
}

const SELECT_FIELDS: &str =
    "id, name, verify_link, issued_at, issuer, template_id, recipient_email, created_at";

impl CertificateStore for SqliteStore {
    fn init(&self) -> Result<(), String> {
        let conn = self.lock()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS certificates (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                verify_link TEXT NOT NULL,
                issued_at TEXT NOT NULL,
                issuer TEXT NOT NULL,
                template_id TEXT,
                recipient_email TEXT,
                created_at INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn save(&self, records: &[CertificateRecord]) -> Result<usize, String> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(|e| e.to_string())?;
        let mut accepted = 0usize;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR IGNORE INTO certificates
                     (id, name, verify_link, issued_at, issuer, template_id, recipient_email, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .map_err(|e| e.to_string())?;
            for record in records {
                let created_at = record
                    .created_at
                    .unwrap_or_else(Utc::now)
                    .timestamp_millis();
                accepted += stmt
                    .execute(params![
                        record.id,
                        record.name,
                        record.verify_link,
                        record.issued_at,
                        record.issuer,
                        record.template_id,
                        record.recipient_email,
                        created_at,
                    ])
                    .map_err(|e| e.to_string())?;
            }
        }
        tx.commit().map_err(|e| e.to_string())?;
        Ok(accepted)
    }

    fn get_by_id(&self, id: &str) -> Result<Option<CertificateRecord>, String> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM certificates WHERE id = ?1",
                SELECT_FIELDS
            ))
            .map_err(|e| e.to_string())?;
        match stmt.query_row(params![id], record_from_row) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.to_string()),
        }
    }

    fn list_all(&self) -> Result<Vec<CertificateRecord>, String> {
        let conn = self.lock()?;
        // rowid breaks ties for records inserted within the same millisecond.
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM certificates ORDER BY created_at DESC, rowid DESC",
                SELECT_FIELDS
            ))
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map([], record_from_row)
            .map_err(|e| e.to_string())?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e| e.to_string())?);
        }
        Ok(records)
    }
}
