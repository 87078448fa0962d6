//! Record store on SQLite.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::{RecordStore, ReplaceOutcome, Result, UpsertOutcome};
use crate::error::StoreError;
use crate::models::record::{CaseId, FieldRecord, FieldValue, LineItem, Source};

const SCHEMA_VERSION: i64 = 1;

/// Record store backed by a SQLite database file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Open(e.to_string()))?;
        }
        let conn = Connection::open(path).map_err(|e| StoreError::Open(e.to_string()))?;
        debug!("Opened record store at {}", path.display());
        Self::init(conn)
    }

    /// Database that lives only as long as the store.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Open(e.to_string()))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS field_records (
                case_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                confidence REAL NOT NULL,
                source TEXT NOT NULL,
                last_updated_by TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(case_id, key)
            );
            CREATE TABLE IF NOT EXISTS line_items (
                case_id TEXT NOT NULL,
                line_no INTEGER NOT NULL,
                code TEXT,
                description TEXT NOT NULL,
                qty INTEGER,
                value_raw TEXT,
                value_num TEXT,
                PRIMARY KEY (case_id, line_no)
            );
            CREATE INDEX IF NOT EXISTS idx_field_records_case ON field_records(case_id);
            ",
        )
        .map_err(|e| StoreError::Open(e.to_string()))?;

        let version: Option<i64> = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .map_err(|e| StoreError::Open(e.to_string()))?;
        match version {
            None => {
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    params![SCHEMA_VERSION],
                )
                .map_err(|e| StoreError::Open(e.to_string()))?;
            }
            Some(v) if v > SCHEMA_VERSION => {
                return Err(StoreError::Open(format!(
                    "database schema version {} is newer than supported version {}",
                    v, SCHEMA_VERSION
                )));
            }
            Some(_) => {}
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// Raw `field_records` row before decoding.
struct FieldRow {
    case_id: String,
    key: String,
    value: String,
    confidence: f64,
    source: String,
    last_updated_by: String,
    updated_at: String,
}

impl FieldRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            case_id: row.get(0)?,
            key: row.get(1)?,
            value: row.get(2)?,
            confidence: row.get(3)?,
            source: row.get(4)?,
            last_updated_by: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn decode(self) -> Result<FieldRecord> {
        let value: FieldValue = serde_json::from_str(&self.value)
            .map_err(|e| StoreError::Serialization(format!("field {}: {}", self.key, e)))?;
        let updated_at = DateTime::parse_from_rfc3339(&self.updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::Serialization(format!("field {}: {}", self.key, e)))?;
        Ok(FieldRecord {
            case_id: CaseId::new(self.case_id),
            key: self.key,
            value,
            confidence: self.confidence as f32,
            source: Source::from(self.source),
            last_updated_by: self.last_updated_by,
            updated_at,
        })
    }
}

const FIELD_COLUMNS: &str =
    "case_id, key, value, confidence, source, last_updated_by, updated_at";

const UPSERT_FIELD: &str =
    "INSERT INTO field_records (case_id, key, value, confidence, source, last_updated_by, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
     ON CONFLICT(case_id, key) DO UPDATE SET
       value = excluded.value,
       confidence = excluded.confidence,
       source = excluded.source,
       last_updated_by = excluded.last_updated_by,
       updated_at = excluded.updated_at";

impl RecordStore for SqliteStore {
    fn get_field(&self, case_id: &CaseId, key: &str) -> Result<Option<FieldRecord>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM field_records WHERE case_id = ?1 AND key = ?2",
                    FIELD_COLUMNS
                ),
                params![case_id.as_str(), key],
                FieldRow::from_row,
            )
            .optional()?;
        row.map(FieldRow::decode).transpose()
    }

    fn upsert_field(&self, record: &FieldRecord) -> Result<()> {
        self.upsert_field_unless(record, &[]).map(|_| ())
    }

    fn upsert_field_unless(&self, record: &FieldRecord, protected: &[Source]) -> Result<UpsertOutcome> {
        let value = serde_json::to_string(&record.value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let case_id = record.case_id.as_str();
        let confidence = record.confidence as f64;
        let source = record.source.as_str();
        let updated_at = record.updated_at.to_rfc3339();
        let protected: Vec<&str> = protected.iter().map(Source::as_str).collect();

        // The conflict update only fires when the stored row is not protected,
        // so the check and the write happen in one statement.
        let mut sql = UPSERT_FIELD.to_string();
        if !protected.is_empty() {
            let placeholders: Vec<String> =
                (0..protected.len()).map(|i| format!("?{}", i + 8)).collect();
            sql.push_str(&format!(
                " WHERE field_records.source = excluded.source OR field_records.source NOT IN ({})",
                placeholders.join(", ")
            ));
        }

        let mut values: Vec<&dyn ToSql> = vec![
            &case_id,
            &record.key,
            &value,
            &confidence,
            &source,
            &record.last_updated_by,
            &updated_at,
        ];
        values.extend(protected.iter().map(|s| s as &dyn ToSql));

        let conn = self.lock()?;
        if conn.execute(&sql, values.as_slice())? > 0 {
            return Ok(UpsertOutcome::Written);
        }

        let kept: String = conn.query_row(
            "SELECT source FROM field_records WHERE case_id = ?1 AND key = ?2",
            params![case_id, record.key],
            |r| r.get(0),
        )?;
        Ok(UpsertOutcome::Protected(Source::from(kept)))
    }

    fn list_fields(&self, case_id: &CaseId) -> Result<Vec<FieldRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM field_records WHERE case_id = ?1 ORDER BY key",
            FIELD_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![case_id.as_str()], FieldRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(FieldRow::decode).collect()
    }

    fn replace_items(&self, case_id: &CaseId, items: &[LineItem]) -> Result<ReplaceOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM line_items WHERE case_id = ?1",
            params![case_id.as_str()],
        )?;
        debug!("Removed {} items of case {}", removed, case_id);

        let mut outcome = ReplaceOutcome::default();
        for item in items {
            let inserted = tx.execute(
                "INSERT INTO line_items (case_id, line_no, code, description, qty, value_raw, value_num)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    case_id.as_str(),
                    item.line_no,
                    item.code,
                    item.description,
                    item.qty,
                    item.value_raw,
                    item.value_num.map(|v| v.to_string()),
                ],
            );
            match inserted {
                Ok(_) => outcome.inserted += 1,
                Err(e) => {
                    warn!("Item {} of case {} rejected: {}", item.line_no, case_id, e);
                    outcome.failed += 1;
                }
            }
        }

        tx.commit()?;
        Ok(outcome)
    }

    fn list_items(&self, case_id: &CaseId) -> Result<Vec<LineItem>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT line_no, code, description, qty, value_raw, value_num
             FROM line_items WHERE case_id = ?1 ORDER BY line_no",
        )?;
        let rows = stmt
            .query_map(params![case_id.as_str()], |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<u32>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(line_no, code, description, qty, value_raw, value_num)| {
                let value_num = value_num
                    .map(|v| Decimal::from_str(&v))
                    .transpose()
                    .map_err(|e| StoreError::Serialization(format!("item {}: {}", line_no, e)))?;
                Ok(LineItem {
                    case_id: case_id.clone(),
                    line_no,
                    code,
                    description,
                    qty,
                    value_raw,
                    value_num,
                })
            })
            .collect()
    }
}
