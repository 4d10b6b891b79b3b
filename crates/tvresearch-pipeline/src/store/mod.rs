//! Durable workflow records.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::{RecordId, StatusUpdate, WorkflowRecord};

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryRecordStore;
pub use schema::init_schema;
pub use sqlite::SqliteRecordStore;

/// Storage for workflow records.
///
/// Every operation touches a single record atomically. Status updates are
/// validated against the record's current status inside that atomic step,
/// so concurrent writers can never move a record backwards or revive a
/// terminal one.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a record in `queued` status.
    async fn create(&self, topic: Option<String>) -> Result<RecordId, StoreError>;

    /// Load a record.
    async fn get(&self, id: RecordId) -> Result<WorkflowRecord, StoreError>;

    /// Newest records first.
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<WorkflowRecord>, StoreError>;

    /// Apply a partial status update and return the updated record.
    async fn update_status(
        &self,
        id: RecordId,
        update: StatusUpdate,
    ) -> Result<WorkflowRecord, StoreError>;

    /// Remember the job that started the run.
    async fn set_job_reference(&self, id: RecordId, reference: String) -> Result<(), StoreError>;

    /// Remove a record for good.
    async fn delete(&self, id: RecordId) -> Result<(), StoreError>;
}
