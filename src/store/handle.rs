//! Process-wide store handle.
//!
//! The first [`connect`] builds the backend named in the config; later calls
//! return the same instance, whatever config they pass. [`disconnect`] drops
//! it so the next `connect` starts fresh.

use super::{DocumentStore, JsonFileStore, MemoryStore};
use crate::config::{StoreBackend, StoreConfig};
use std::path::Path;
use std::sync::{Arc, LazyLock, Mutex};
use tracing::{debug, info};

pub type SharedStore = Arc<dyn DocumentStore>;

static HANDLE: LazyLock<Mutex<Option<SharedStore>>> = LazyLock::new(|| Mutex::new(None));

pub fn connect(config: &StoreConfig) -> SharedStore {
    let mut slot = HANDLE.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(store) = slot.as_ref() {
        debug!("reusing store handle");
        return Arc::clone(store);
    }
    let store = open(config);
    *slot = Some(Arc::clone(&store));
    store
}

pub fn disconnect() {
    let mut slot = HANDLE.lock().unwrap_or_else(|e| e.into_inner());
    if slot.take().is_some() {
        debug!("store handle released");
    }
}

fn open(config: &StoreConfig) -> SharedStore {
    match config.backend {
        StoreBackend::File => {
            info!(path = %config.path, collection = %config.collection, "opening file store");
            Arc::new(JsonFileStore::open(
                Path::new(&config.path),
                &config.collection,
                config.max_document_bytes,
            ))
        }
        StoreBackend::Memory => {
            info!("opening in-memory store");
            Arc::new(MemoryStore::new(config.max_document_bytes))
        }
    }
}
