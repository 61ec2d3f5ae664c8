//! Team roster client.
//!
//! [`Roster`] keeps a local copy of the ordered employee list and the
//! collection revision it was read at. Mutations go to the store first:
//!
//! | Operation | Store calls | Afterwards |
//! |---|---|---|
//! | `create` | `add` | re-fetch, reconcile if needed |
//! | `update` | `update` | re-fetch |
//! | `delete` | `delete`, then one batch | local list made dense |
//! | `move_employee` | one batch | local list made dense |
//!
//! A failed batch triggers a re-fetch so the local list never keeps an order
//! the store refused. After `create` and `delete`, whose document write has
//! already landed, a batch refused for a stale revision is planned once more
//! against the fresh list. Only one mutation runs at a time per roster; an
//! overlapping call gets [`RosterError::Busy`].

use crate::config::RosterConfig;
use crate::employee::{Employee, EmployeeFields, FieldError, ORDER_FIELD, new_document_fields};
use crate::reconcile::{self, Direction};
use crate::store::{DocumentStore, Revision, StoreError, StoreErrorKind};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RosterError {
    #[error("invalid employee: {0}")]
    Validation(#[from] FieldError),
    #[error("failed to load employees: {0}")]
    Fetch(#[source] StoreError),
    #[error("failed to save: {0}")]
    Write(#[source] StoreError),
    #[error("another change is still being saved")]
    Busy,
}

impl RosterError {
    /// The store error behind a fetch or write failure.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Fetch(e) | Self::Write(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct RosterState {
    employees: Vec<Employee>,
    /// Revision the local list reflects. `None` before the first load or
    /// after a failed one.
    revision: Option<Revision>,
}

/// Clears the saving flag on every exit path.
struct SavingGuard<'a>(&'a AtomicBool);

impl<'a> SavingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, RosterError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RosterError::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Roster<S> {
    store: S,
    placeholder: String,
    soft_limit: usize,
    state: Mutex<RosterState>,
    saving: AtomicBool,
    loading: AtomicBool,
}

impl<S: DocumentStore> Roster<S> {
    pub fn new(store: S, config: &RosterConfig) -> Self {
        Self {
            store,
            placeholder: config.placeholder_url.clone(),
            soft_limit: config.encoder.soft_limit_bytes,
            state: Mutex::new(RosterState::default()),
            saving: AtomicBool::new(false),
            loading: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Cached list, as of the last fetch or successful write.
    pub fn employees(&self) -> Vec<Employee> {
        self.lock().employees.clone()
    }

    pub fn employee(&self, id: &str) -> Option<Employee> {
        self.lock().employees.iter().find(|e| e.id == id).cloned()
    }

    pub fn is_busy(&self) -> bool {
        self.saving.load(Ordering::Acquire)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Fetch every employee, ascending by order.
    ///
    /// On failure the local list is emptied.
    pub fn list_all(&self) -> Result<Vec<Employee>, RosterError> {
        self.loading.store(true, Ordering::Release);
        let result = self.store.query_ordered(ORDER_FIELD);
        self.loading.store(false, Ordering::Release);

        let mut state = self.lock();
        match result {
            Ok(snapshot) => {
                state.employees = snapshot
                    .documents
                    .iter()
                    .map(|doc| Employee::from_document(doc, &self.placeholder))
                    .collect();
                state.revision = Some(snapshot.revision);
                debug!(
                    count = state.employees.len(),
                    revision = %snapshot.revision,
                    "employees loaded"
                );
                Ok(state.employees.clone())
            }
            Err(err) => {
                warn!(%err, "failed to load employees");
                state.employees.clear();
                state.revision = None;
                Err(RosterError::Fetch(err))
            }
        }
    }

    /// Add an employee at the end of the list.
    pub fn create(&self, fields: &EmployeeFields) -> Result<Employee, RosterError> {
        let _saving = SavingGuard::acquire(&self.saving)?;
        fields.validate()?;
        self.check_photo_size(fields);
        self.ensure_loaded()?;

        let order = match self.next_order() {
            Some(order) => order,
            None => {
                debug!("order values exhausted; compacting before append");
                self.close_gaps()?;
                self.next_order().ok_or_else(|| {
                    RosterError::Write(StoreError::new(
                        StoreErrorKind::Unknown,
                        "no order value left to append with",
                    ))
                })?
            }
        };
        let doc = new_document_fields(fields, order, Utc::now(), &self.placeholder);
        let (id, revision) = self.store.add(doc).map_err(RosterError::Write)?;
        info!(%id, name = %fields.name.trim(), order, "employee created");
        self.note_write(revision);

        self.list_all()?;
        self.close_gaps()?;
        self.employee(&id).ok_or_else(|| {
            RosterError::Fetch(StoreError::not_found(&id))
        })
    }

    /// Replace the editable fields of `id`. Order and creation time are kept.
    pub fn update(&self, id: &str, fields: &EmployeeFields) -> Result<(), RosterError> {
        let _saving = SavingGuard::acquire(&self.saving)?;
        fields.validate()?;
        self.check_photo_size(fields);

        let revision = self
            .store
            .update(id, fields.to_fields(&self.placeholder))
            .map_err(RosterError::Write)?;
        info!(%id, "employee updated");
        self.note_write(revision);
        self.list_all()?;
        Ok(())
    }

    /// Remove `id` and close the gap it leaves in the order.
    pub fn delete(&self, id: &str) -> Result<(), RosterError> {
        let _saving = SavingGuard::acquire(&self.saving)?;
        self.ensure_loaded()?;

        let revision = self.store.delete(id).map_err(RosterError::Write)?;
        info!(%id, "employee deleted");
        self.note_write(revision);
        self.lock().employees.retain(|e| e.id != id);
        self.close_gaps()
    }

    /// Swap `id` with its neighbour. Returns `false` when there is nothing
    /// to do (unknown id, or already first/last).
    pub fn move_employee(&self, id: &str, direction: Direction) -> Result<bool, RosterError> {
        let _saving = SavingGuard::acquire(&self.saving)?;
        self.ensure_loaded()?;

        let Some(moved) = reconcile::move_position(&self.lock().employees, id, direction) else {
            debug!(%id, %direction, "move ignored");
            return Ok(false);
        };
        self.lock().employees = moved;
        self.reconcile_current()?;
        info!(%id, %direction, "employee moved");
        Ok(true)
    }

    /// Commit the plan for the local sequence. On failure, re-fetch and
    /// report the write error.
    fn reconcile_current(&self) -> Result<(), RosterError> {
        let (updates, expected) = {
            let state = self.lock();
            (
                reconcile::plan(&state.employees),
                state.revision.unwrap_or_default(),
            )
        };
        if updates.is_empty() {
            return Ok(());
        }

        debug!(updates = updates.len(), expected = %expected, "committing order batch");
        match self.store.commit(reconcile::to_batch(&updates, expected)) {
            Ok(revision) => {
                self.note_write(revision);
                reconcile::apply_dense(&mut self.lock().employees);
                Ok(())
            }
            Err(err) => {
                warn!(%err, "order batch rejected; reloading");
                if let Err(refetch) = self.list_all() {
                    warn!(err = %refetch, "reload after rejected batch failed");
                }
                Err(RosterError::Write(err))
            }
        }
    }

    /// Reconcile after a write that already landed. A batch refused for a
    /// stale revision is re-planned once against the re-fetched list.
    fn close_gaps(&self) -> Result<(), RosterError> {
        match self.reconcile_current() {
            Err(RosterError::Write(err))
                if err.kind == StoreErrorKind::Conflict && self.lock().revision.is_some() =>
            {
                debug!(%err, "re-planning order batch against the fresh list");
                self.reconcile_current()
            }
            other => other,
        }
    }

    /// One past the highest stored order, `None` when that would overflow.
    fn next_order(&self) -> Option<u32> {
        self.lock()
            .employees
            .iter()
            .filter_map(|e| e.order)
            .max()
            .map_or(Some(0), |max| max.checked_add(1))
    }

    fn ensure_loaded(&self) -> Result<(), RosterError> {
        if self.lock().revision.is_none() {
            self.list_all()?;
        }
        Ok(())
    }

    /// Advance the known revision only if `revision` directly follows it.
    /// A gap means someone else wrote in between; keeping the old value
    /// makes the next batch fail and re-sync.
    fn note_write(&self, revision: Revision) {
        let mut state = self.lock();
        match state.revision {
            Some(known) if known.next() == revision => state.revision = Some(revision),
            known => debug!(?known, %revision, "revision gap; local list is stale"),
        }
    }

    fn check_photo_size(&self, fields: &EmployeeFields) {
        if let Some(len) = fields.photo.encoded_len()
            && len > self.soft_limit
        {
            warn!(
                length = len,
                limit = self.soft_limit,
                "photo is above the advisory size; the store may reject it"
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, RosterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
