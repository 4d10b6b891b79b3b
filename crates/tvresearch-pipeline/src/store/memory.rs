//! In-memory record store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::RecordStore;
use crate::error::StoreError;
use crate::record::{RecordId, StatusUpdate, WorkflowRecord};

/// Record store kept in process memory.
pub struct MemoryRecordStore {
    records: RwLock<HashMap<RecordId, WorkflowRecord>>,
    next_id: AtomicI64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create(&self, topic: Option<String>) -> Result<RecordId, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = WorkflowRecord::new(id, topic, Utc::now());
        self.records.write().await.insert(id, record);
        Ok(id)
    }

    async fn get(&self, id: RecordId) -> Result<WorkflowRecord, StoreError> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<WorkflowRecord>, StoreError> {
        let records = self.records.read().await;
        let mut all: Vec<&WorkflowRecord> = records.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(all.into_iter().skip(offset).take(limit).cloned().collect())
    }

    async fn update_status(
        &self,
        id: RecordId,
        update: StatusUpdate,
    ) -> Result<WorkflowRecord, StoreError> {
        let mut records = self.records.write().await;
        let current = records.get(&id).ok_or(StoreError::NotFound(id))?;

        // Apply to a copy so a rejected update leaves the record untouched.
        let mut updated = current.clone();
        updated.apply(update, Utc::now())?;
        records.insert(id, updated.clone());
        Ok(updated)
    }

    async fn set_job_reference(&self, id: RecordId, reference: String) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.set_job_reference(reference)
    }

    async fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}
