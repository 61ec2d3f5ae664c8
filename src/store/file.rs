//! JSON-file document store.
//!
//! Each collection is one file, `<dir>/<collection>.json`:
//!
//! ```json
//! { "version": 1, "revision": 12, "documents": { "<id>": { ... } } }
//! ```
//!
//! Every call reads the file, applies the operation to the in-memory
//! [`Collection`] and, for writes, replaces the file atomically (temp file in
//! the same directory, then rename). A missing file is an empty collection.
//!
//! Each call holds an advisory lock on `<dir>/<collection>.lock` for its whole
//! duration: shared for queries, exclusive for load → modify → rename. The
//! lock is per open file, so separate store values and separate processes on
//! the same directory exclude each other, and the revision check on a batch
//! sees the revision it will write over.

use super::collection::Collection;
use super::{
    DocumentStore, Fields, Revision, Snapshot, StoreError, StoreErrorKind, WriteBatch,
};
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// On-disk format version. Files with another version are refused.
const FILE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct CollectionFile {
    version: u32,
    #[serde(flatten)]
    collection: Collection,
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
    max_document_bytes: usize,
}

impl JsonFileStore {
    /// Open (or lazily create) `collection` under `dir`.
    pub fn open(dir: &Path, collection: &str, max_document_bytes: usize) -> Self {
        Self {
            path: dir.join(format!("{collection}.json")),
            lock_path: dir.join(format!("{collection}.lock")),
            max_document_bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Collection, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Collection::default()),
            Err(e) => return Err(io_error(&self.path, e)),
        };
        let file: CollectionFile = serde_json::from_str(&content).map_err(|e| {
            StoreError::from_parts(
                "data-loss",
                format!("{} is not a valid collection file: {e}", self.path.display()),
            )
        })?;
        if file.version != FILE_VERSION {
            return Err(StoreError::from_parts(
                "failed-precondition",
                format!(
                    "{} has format version {}, expected {FILE_VERSION}",
                    self.path.display(),
                    file.version
                ),
            ));
        }
        Ok(file.collection)
    }

    fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    fn lock_file(&self) -> Result<RwLock<File>, StoreError> {
        let dir = self.dir();
        std::fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| io_error(&self.lock_path, e))?;
        Ok(RwLock::new(file))
    }

    fn save(&self, collection: Collection) -> Result<(), StoreError> {
        let dir = self.dir();
        let file = CollectionFile {
            version: FILE_VERSION,
            collection,
        };
        let json = serde_json::to_vec_pretty(&file)
            .map_err(|e| StoreError::from_parts("internal", e.to_string()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| io_error(dir, e))?;
        tmp.write_all(&json).map_err(|e| io_error(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| io_error(&self.path, e.error))?;
        debug!(path = %self.path.display(), revision = %file.collection.revision, "collection saved");
        Ok(())
    }

    /// Load, mutate, and save only when `op` succeeds.
    fn write<T>(
        &self,
        op: impl FnOnce(&mut Collection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut lock = self.lock_file()?;
        let _guard = lock.write().map_err(|e| io_error(&self.lock_path, e))?;
        let mut collection = self.load()?;
        let out = op(&mut collection)?;
        self.save(collection)?;
        Ok(out)
    }
}

fn io_error(path: &Path, err: io::Error) -> StoreError {
    let kind = match err.kind() {
        io::ErrorKind::PermissionDenied => StoreErrorKind::PermissionDenied,
        _ => StoreErrorKind::Unavailable,
    };
    StoreError::new(kind, format!("{}: {err}", path.display()))
}

impl DocumentStore for JsonFileStore {
    fn query_ordered(&self, order_field: &str) -> Result<Snapshot, StoreError> {
        let lock = self.lock_file()?;
        let _guard = lock.read().map_err(|e| io_error(&self.lock_path, e))?;
        Ok(self.load()?.query_ordered(order_field))
    }

    fn add(&self, fields: Fields) -> Result<(String, Revision), StoreError> {
        let id = Uuid::new_v4().to_string();
        let limit = self.max_document_bytes;
        let revision = self.write(|c| c.add(id.clone(), fields, limit))?;
        Ok((id, revision))
    }

    fn update(&self, id: &str, fields: Fields) -> Result<Revision, StoreError> {
        let limit = self.max_document_bytes;
        self.write(|c| c.update(id, fields, limit))
    }

    fn delete(&self, id: &str) -> Result<Revision, StoreError> {
        self.write(|c| c.delete(id))
    }

    fn commit(&self, batch: WriteBatch) -> Result<Revision, StoreError> {
        let limit = self.max_document_bytes;
        self.write(|c| c.commit(batch, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FieldUpdate;
    use serde_json::json;
    use tempfile::TempDir;

    fn body(name: &str, order: u32) -> Fields {
        let mut f = Fields::new();
        f.insert("name".into(), json!(name));
        f.insert("order".into(), json!(order));
        f
    }

    #[test]
    fn missing_file_is_empty_collection() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::open(tmp.path(), "employees", 1024);
        let snap = store.query_ordered("order").unwrap();
        assert!(snap.documents.is_empty());
        assert_eq!(snap.revision, Revision(0));
        assert!(!store.path().exists());
    }

    #[test]
    fn writes_persist_across_instances() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::open(tmp.path(), "employees", 1024);
        let (b, _) = store.add(body("B", 1)).unwrap();
        store.add(body("A", 0)).unwrap();
        store.update(&b, body("B2", 1)).unwrap();

        let reopened = JsonFileStore::open(tmp.path(), "employees", 1024);
        let snap = reopened.query_ordered("order").unwrap();
        let names: Vec<_> = snap
            .documents
            .iter()
            .map(|d| d.fields["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["A", "B2"]);
        assert_eq!(snap.revision, Revision(3));
        assert!(tmp.path().join("employees.json").exists());
    }

    #[test]
    fn failed_write_leaves_file_untouched() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::open(tmp.path(), "employees", 1024);
        let (id, _) = store.add(body("A", 0)).unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        let stale = WriteBatch {
            expected_revision: Some(Revision(0)),
            updates: vec![FieldUpdate {
                id,
                fields: body("A", 5),
            }],
        };
        let err = store.commit(stale).unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::Conflict);
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn oversize_document_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::open(tmp.path(), "employees", 64);
        let err = store.add(body(&"x".repeat(100), 0)).unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::PayloadTooLarge);
        assert!(!store.path().exists());
    }

    #[test]
    fn corrupt_file_reported() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("employees.json"), "{not json").unwrap();
        let store = JsonFileStore::open(tmp.path(), "employees", 1024);
        let err = store.query_ordered("order").unwrap_err();
        assert_eq!(err.code, "data-loss");
        assert_eq!(err.kind, StoreErrorKind::Unknown);
    }

    #[test]
    fn wrong_version_refused() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("employees.json"),
            r#"{"version": 99, "revision": 0, "documents": {}}"#,
        )
        .unwrap();
        let store = JsonFileStore::open(tmp.path(), "employees", 1024);
        assert_eq!(
            store.query_ordered("order").unwrap_err().kind,
            StoreErrorKind::Conflict
        );
    }

    #[test]
    fn separate_instances_do_not_lose_writes() {
        let tmp = TempDir::new().unwrap();
        let threads: Vec<_> = (0..4)
            .map(|t| {
                let dir = tmp.path().to_path_buf();
                std::thread::spawn(move || {
                    let store = JsonFileStore::open(&dir, "employees", 1024);
                    for i in 0..25 {
                        store.add(body(&format!("T{t}-{i}"), i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in threads {
            handle.join().unwrap();
        }

        let snap = JsonFileStore::open(tmp.path(), "employees", 1024)
            .query_ordered("order")
            .unwrap();
        assert_eq!(snap.documents.len(), 100);
        assert_eq!(snap.revision, Revision(100));
    }

    #[test]
    fn only_one_of_two_racing_batches_lands() {
        let tmp = TempDir::new().unwrap();
        let seed = JsonFileStore::open(tmp.path(), "employees", 1024);
        let (id, revision) = seed.add(body("A", 0)).unwrap();

        let threads: Vec<_> = (0..2)
            .map(|t| {
                let dir = tmp.path().to_path_buf();
                let id = id.clone();
                std::thread::spawn(move || {
                    let store = JsonFileStore::open(&dir, "employees", 1024);
                    store.commit(WriteBatch {
                        expected_revision: Some(revision),
                        updates: vec![FieldUpdate {
                            id,
                            fields: body(&format!("T{t}"), 0),
                        }],
                    })
                })
            })
            .collect();
        let results: Vec<_> = threads.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let refused = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_eq!(refused.kind, StoreErrorKind::Conflict);
        assert_eq!(seed.query_ordered("order").unwrap().revision, revision.next());
    }

    #[test]
    fn lock_file_sits_next_to_the_collection() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::open(tmp.path(), "employees", 1024);
        store.add(body("A", 0)).unwrap();
        assert!(tmp.path().join("employees.lock").exists());
    }

    #[test]
    fn creates_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested/data");
        let store = JsonFileStore::open(&dir, "team", 1024);
        store.add(body("A", 0)).unwrap();
        assert!(dir.join("team.json").exists());
    }
}
