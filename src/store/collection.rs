//! Collection semantics shared by the bundled backends.
//!
//! Backends differ only in where a [`Collection`] lives between calls; the
//! ordering, size ceiling, revision and batch rules are all here.

use super::{Document, FieldUpdate, Fields, Revision, Snapshot, StoreError, WriteBatch};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Collection {
    pub revision: Revision,
    pub documents: BTreeMap<String, Fields>,
}

impl Collection {
    pub fn from_documents(documents: Vec<Document>) -> Self {
        Self {
            revision: Revision::default(),
            documents: documents.into_iter().map(|d| (d.id, d.fields)).collect(),
        }
    }

    pub fn query_ordered(&self, order_field: &str) -> Snapshot {
        let mut documents: Vec<Document> = self
            .documents
            .iter()
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect();
        documents.sort_by(|a, b| compare_order(a, b, order_field));
        Snapshot {
            revision: self.revision,
            documents,
        }
    }

    pub fn add(&mut self, id: String, fields: Fields, limit: usize) -> Result<Revision, StoreError> {
        check_size(&id, &fields, limit)?;
        self.documents.insert(id, fields);
        Ok(self.bump())
    }

    pub fn update(&mut self, id: &str, fields: Fields, limit: usize) -> Result<Revision, StoreError> {
        let merged = self.merged(id, fields, limit)?;
        self.documents.insert(id.to_string(), merged);
        Ok(self.bump())
    }

    pub fn delete(&mut self, id: &str) -> Result<Revision, StoreError> {
        self.documents
            .remove(id)
            .ok_or_else(|| StoreError::not_found(id))?;
        Ok(self.bump())
    }

    /// Validate every update first; write only when all of them pass.
    pub fn commit(&mut self, batch: WriteBatch, limit: usize) -> Result<Revision, StoreError> {
        if let Some(expected) = batch.expected_revision
            && expected != self.revision
        {
            return Err(StoreError::conflict(expected, self.revision));
        }
        let staged = batch
            .updates
            .into_iter()
            .map(|FieldUpdate { id, fields }| {
                let merged = self.merged(&id, fields, limit)?;
                Ok((id, merged))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        self.documents.extend(staged);
        Ok(self.bump())
    }

    fn merged(&self, id: &str, fields: Fields, limit: usize) -> Result<Fields, StoreError> {
        let mut merged = self
            .documents
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(id))?;
        merged.extend(fields);
        check_size(id, &merged, limit)?;
        Ok(merged)
    }

    fn bump(&mut self) -> Revision {
        self.revision = self.revision.next();
        self.revision
    }
}

/// Serialized size of a document: its JSON body plus its id.
pub(crate) fn document_size(id: &str, fields: &Fields) -> usize {
    let body = serde_json::to_vec(fields).map(|v| v.len()).unwrap_or(usize::MAX);
    body.saturating_add(id.len())
}

fn check_size(id: &str, fields: &Fields, limit: usize) -> Result<(), StoreError> {
    let size = document_size(id, fields);
    if size > limit {
        return Err(StoreError::too_large(id, size, limit));
    }
    Ok(())
}

fn compare_order(a: &Document, b: &Document, field: &str) -> Ordering {
    let key = |d: &Document| d.fields.get(field).and_then(serde_json::Value::as_u64);
    match (key(a), key(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.id.cmp(&b.id))
}
