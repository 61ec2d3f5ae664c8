//! In-process document store.
//!
//! Used for `backend = "memory"` and throughout the tests. Faults can be
//! queued per operation with [`MemoryStore::fail_next`], and every committed
//! batch is recorded for inspection.

use super::collection::Collection;
use super::{
    DocumentStore, Document, Fields, Revision, Snapshot, StoreError, WriteBatch,
};
use std::sync::Mutex;
use tracing::trace;
use uuid::Uuid;

/// Store operation, for fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Query,
    Add,
    Update,
    Delete,
    Commit,
}

#[derive(Debug)]
pub struct MemoryStore {
    collection: Mutex<Collection>,
    max_document_bytes: usize,
    faults: Mutex<Vec<(Operation, StoreError)>>,
    batches: Mutex<Vec<WriteBatch>>,
}

impl MemoryStore {
    pub fn new(max_document_bytes: usize) -> Self {
        Self::with_documents(max_document_bytes, Vec::new())
    }

    /// Start from existing documents, at revision 0.
    pub fn with_documents(max_document_bytes: usize, documents: Vec<Document>) -> Self {
        Self {
            collection: Mutex::new(Collection::from_documents(documents)),
            max_document_bytes,
            faults: Mutex::new(Vec::new()),
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Make the next call of `op` fail with `error`. Faults queue in order.
    pub fn fail_next(&self, op: Operation, error: StoreError) {
        self.faults
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((op, error));
    }

    /// Batches that were successfully committed, oldest first.
    pub fn committed_batches(&self) -> Vec<WriteBatch> {
        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn revision(&self) -> Revision {
        self.lock().revision
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Collection> {
        self.collection.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn injected(&self, op: Operation) -> Result<(), StoreError> {
        let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
        match faults.iter().position(|(o, _)| *o == op) {
            Some(i) => {
                let (_, err) = faults.remove(i);
                trace!(?op, %err, "injected store fault");
                Err(err)
            }
            None => Ok(()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(1024 * 1024)
    }
}

impl DocumentStore for MemoryStore {
    fn query_ordered(&self, order_field: &str) -> Result<Snapshot, StoreError> {
        self.injected(Operation::Query)?;
        Ok(self.lock().query_ordered(order_field))
    }

    fn add(&self, fields: Fields) -> Result<(String, Revision), StoreError> {
        self.injected(Operation::Add)?;
        let id = Uuid::new_v4().to_string();
        let revision = self.lock().add(id.clone(), fields, self.max_document_bytes)?;
        Ok((id, revision))
    }

    fn update(&self, id: &str, fields: Fields) -> Result<Revision, StoreError> {
        self.injected(Operation::Update)?;
        self.lock().update(id, fields, self.max_document_bytes)
    }

    fn delete(&self, id: &str) -> Result<Revision, StoreError> {
        self.injected(Operation::Delete)?;
        self.lock().delete(id)
    }

    fn commit(&self, batch: WriteBatch) -> Result<Revision, StoreError> {
        self.injected(Operation::Commit)?;
        let revision = self
            .lock()
            .commit(batch.clone(), self.max_document_bytes)?;
        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(batch);
        Ok(revision)
    }
}
