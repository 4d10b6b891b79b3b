//! SQLite record store.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{OptionalExtension, Row, params};
use tokio_rusqlite::Connection;
use tracing::debug;

use super::RecordStore;
use super::schema::init_schema;
use crate::error::StoreError;
use crate::record::{RecordId, StatusUpdate, WorkflowRecord};
use crate::status::WorkflowStatus;

const SELECT_COLUMNS: &str = "SELECT id, topic, status, created_at, completed_at, result_content, \
     error_message, execution_time, job_id FROM research_results";

/// Record store backed by a SQLite database.
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    /// Create a new in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().await?;
        Self::with_connection(conn).await
    }

    /// Open or create a file-backed database.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        debug!(path = %path.display(), "Opening record database");
        let conn = Connection::open(path).await?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.call(|conn| Ok(init_schema(conn)?)).await?;
        Ok(Self { conn })
    }
}

/// A row as stored, before its text columns are parsed.
struct RawRecord {
    id: RecordId,
    topic: Option<String>,
    status: String,
    created_at: String,
    completed_at: Option<String>,
    result_content: Option<String>,
    error_message: Option<String>,
    execution_time: Option<i64>,
    job_id: Option<String>,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            topic: row.get(1)?,
            status: row.get(2)?,
            created_at: row.get(3)?,
            completed_at: row.get(4)?,
            result_content: row.get(5)?,
            error_message: row.get(6)?,
            execution_time: row.get(7)?,
            job_id: row.get(8)?,
        })
    }

    fn into_record(self) -> Result<WorkflowRecord, StoreError> {
        let id = self.id;
        let corrupt = |message: String| StoreError::Corrupt { id, message };

        let status = self
            .status
            .parse::<WorkflowStatus>()
            .map_err(|e| corrupt(e.to_string()))?;
        let created_at = parse_time(&self.created_at).map_err(corrupt)?;
        let completed_at = self
            .completed_at
            .as_deref()
            .map(parse_time)
            .transpose()
            .map_err(corrupt)?;

        Ok(WorkflowRecord {
            id,
            topic: self.topic,
            status,
            created_at,
            completed_at,
            result_content: self.result_content,
            error_message: self.error_message,
            execution_time_seconds: self.execution_time,
            job_reference: self.job_id,
        })
    }
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(text: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp {:?}: {}", text, e))
}

fn select_raw(conn: &rusqlite::Connection, id: RecordId) -> rusqlite::Result<Option<RawRecord>> {
    conn.query_row(
        &format!("{} WHERE id = ?1", SELECT_COLUMNS),
        [id],
        RawRecord::from_row,
    )
    .optional()
}

fn clamp_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn create(&self, topic: Option<String>) -> Result<RecordId, StoreError> {
        let created_at = format_time(Utc::now());
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO research_results (topic, status, created_at) VALUES (?1, ?2, ?3)",
                    params![topic, WorkflowStatus::Queued.as_str(), created_at],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        debug!(record_id = id, "Created research record");
        Ok(id)
    }

    async fn get(&self, id: RecordId) -> Result<WorkflowRecord, StoreError> {
        let raw = self
            .conn
            .call(move |conn| Ok(select_raw(conn, id)?))
            .await?;
        raw.ok_or(StoreError::NotFound(id))?.into_record()
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<WorkflowRecord>, StoreError> {
        let (limit, offset) = (clamp_i64(limit), clamp_i64(offset));
        let raws = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
                    SELECT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![limit, offset], RawRecord::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;
        raws.into_iter().map(RawRecord::into_record).collect()
    }

    async fn update_status(
        &self,
        id: RecordId,
        update: StatusUpdate,
    ) -> Result<WorkflowRecord, StoreError> {
        let now = Utc::now();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let Some(raw) = select_raw(&tx, id)? else {
                    return Ok(Err(StoreError::NotFound(id)));
                };
                let mut record = match raw.into_record() {
                    Ok(record) => record,
                    Err(e) => return Ok(Err(e)),
                };
                if let Err(e) = record.apply(update, now) {
                    return Ok(Err(e));
                }

                tx.execute(
                    "UPDATE research_results SET status = ?1, completed_at = ?2, result_content = ?3,
                     error_message = ?4, execution_time = ?5 WHERE id = ?6",
                    params![
                        record.status.as_str(),
                        record.completed_at.map(format_time),
                        record.result_content,
                        record.error_message,
                        record.execution_time_seconds,
                        id
                    ],
                )?;
                tx.commit()?;
                Ok(Ok(record))
            })
            .await?
    }

    async fn set_job_reference(&self, id: RecordId, reference: String) -> Result<(), StoreError> {
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let Some(raw) = select_raw(&tx, id)? else {
                    return Ok(Err(StoreError::NotFound(id)));
                };
                let mut record = match raw.into_record() {
                    Ok(record) => record,
                    Err(e) => return Ok(Err(e)),
                };
                if let Err(e) = record.set_job_reference(reference) {
                    return Ok(Err(e));
                }

                tx.execute(
                    "UPDATE research_results SET job_id = ?1 WHERE id = ?2",
                    params![record.job_reference, id],
                )?;
                tx.commit()?;
                Ok(Ok(()))
            })
            .await?
    }

    async fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        let deleted = self
            .conn
            .call(move |conn| Ok(conn.execute("DELETE FROM research_results WHERE id = ?1", [id])?))
            .await?;
        if deleted == 0 {
            return Err(StoreError::NotFound(id));
        }
        debug!(record_id = id, "Deleted research record");
        Ok(())
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
