//! Document store boundary.
//!
//! The roster talks to one collection of schemaless JSON documents through
//! the [`DocumentStore`] trait. Two backends ship with the crate:
//!
//! - [`MemoryStore`]: in-process, with fault injection for tests
//! - [`JsonFileStore`]: one JSON file per collection, written atomically
//!
//! # Revisions
//!
//! Every collection carries a [`Revision`] counter bumped by exactly one on
//! each successful write (add, update, delete or batch commit). Writes return
//! the new revision. A [`WriteBatch`] may name the revision its author last
//! observed; if the collection has moved on the whole batch is rejected with
//! [`StoreErrorKind::Conflict`] and nothing is written.
//!
//! # Size ceiling
//!
//! Backends reject any document whose serialized JSON exceeds the configured
//! `max_document_bytes` with [`StoreErrorKind::PayloadTooLarge`]. Clients
//! never enforce this limit themselves.

mod collection;
pub mod file;
pub mod handle;
pub mod memory;

pub use file::JsonFileStore;
pub use handle::{connect, disconnect};
pub use memory::{MemoryStore, Operation};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Document body: a JSON object.
pub type Fields = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// Monotonic per-collection write counter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Revision(pub u64);

impl Revision {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Result of an ordered query: the documents plus the revision they reflect.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub revision: Revision,
    pub documents: Vec<Document>,
}

/// Partial update of one document inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub id: String,
    pub fields: Fields,
}

/// A set of updates applied all-or-nothing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WriteBatch {
    /// Revision the batch was planned against. `None` skips the check.
    pub expected_revision: Option<Revision>,
    pub updates: Vec<FieldUpdate>,
}

impl WriteBatch {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }
}

/// What went wrong, independent of backend wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    PermissionDenied,
    PayloadTooLarge,
    Unavailable,
    NotFound,
    Conflict,
    Unknown,
}

impl StoreErrorKind {
    /// Canonical error code for this kind.
    pub fn code(self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission-denied",
            Self::PayloadTooLarge => "invalid-argument",
            Self::Unavailable => "unavailable",
            Self::NotFound => "not-found",
            Self::Conflict => "aborted",
            Self::Unknown => "unknown",
        }
    }

    /// Classify a backend failure that only exposes a code and message.
    ///
    /// Message text is checked too: some backends report a rules denial or
    /// an oversized document with a generic code.
    pub fn classify(code: &str, message: &str) -> Self {
        let message = message.to_lowercase();
        if code == "permission-denied" || message.contains("missing or insufficient permissions")
        {
            return Self::PermissionDenied;
        }
        if code == "invalid-argument"
            || message.contains("exceeds the maximum size")
            || message.contains("value is too large")
        {
            return Self::PayloadTooLarge;
        }
        match code {
            "unavailable" | "deadline-exceeded" => Self::Unavailable,
            "not-found" => Self::NotFound,
            "aborted" | "failed-precondition" => Self::Conflict,
            _ => Self::Unknown,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} ({code})")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub code: String,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.code().to_string(),
            message: message.into(),
        }
    }

    /// Build from raw backend text, classifying it once here.
    pub fn from_parts(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        let message = message.into();
        Self {
            kind: StoreErrorKind::classify(&code, &message),
            code,
            message,
        }
    }

    pub fn not_found(id: &str) -> Self {
        Self::new(StoreErrorKind::NotFound, format!("no document with id {id}"))
    }

    pub fn conflict(expected: Revision, actual: Revision) -> Self {
        Self::new(
            StoreErrorKind::Conflict,
            format!("collection changed: batch planned at {expected}, store is at {actual}"),
        )
    }

    pub fn too_large(id: &str, size: usize, limit: usize) -> Self {
        Self::new(
            StoreErrorKind::PayloadTooLarge,
            format!("document {id} is {size} bytes and exceeds the maximum size of {limit} bytes"),
        )
    }
}

/// One collection of documents.
pub trait DocumentStore: Send + Sync {
    /// All documents, ascending by the integer field `order_field`.
    /// Documents without that field come last, ordered by id.
    fn query_ordered(&self, order_field: &str) -> Result<Snapshot, StoreError>;

    /// Insert a new document. Returns the generated id.
    fn add(&self, fields: Fields) -> Result<(String, Revision), StoreError>;

    /// Merge `fields` into an existing document.
    fn update(&self, id: &str, fields: Fields) -> Result<Revision, StoreError>;

    fn delete(&self, id: &str) -> Result<Revision, StoreError>;

    /// Apply every update or none of them.
    fn commit(&self, batch: WriteBatch) -> Result<Revision, StoreError>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    fn query_ordered(&self, order_field: &str) -> Result<Snapshot, StoreError> {
        (**self).query_ordered(order_field)
    }

    fn add(&self, fields: Fields) -> Result<(String, Revision), StoreError> {
        (**self).add(fields)
    }

    fn update(&self, id: &str, fields: Fields) -> Result<Revision, StoreError> {
        (**self).update(id, fields)
    }

    fn delete(&self, id: &str) -> Result<Revision, StoreError> {
        (**self).delete(id)
    }

    fn commit(&self, batch: WriteBatch) -> Result<Revision, StoreError> {
        (**self).commit(batch)
    }
}
