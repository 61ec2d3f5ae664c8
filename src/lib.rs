//! # Roster
//!
//! Admin tooling for the "our team" section of a small loan-brokerage
//! website. An administrator picks a photo, crops it to a square, and saves
//! it with the employee's name, role and description into a document store.
//! The employees are shown in a strict order that survives adds, removals
//! and moves.
//!
//! # Architecture: Photo Pipeline + Ordered Store
//!
//! ```text
//! 1. Capture    file      →  LoadedImage     (size + type checks, natural dimensions)
//! 2. Crop       image     →  PixelRect       (1:1 square, min 150px, displayed → natural)
//! 3. Encode     rect      →  EncodedPhoto    (PNG/JPEG → Base64 data URL, soft 950 KiB)
//! 4. Save       fields    →  Employee        (document store, hard ~1 MiB per document)
//! 5. Reconcile  sequence  →  WriteBatch      (dense 0..N-1 `order`, one atomic batch)
//! ```
//!
//! Stages 1-3 never touch the store; stage 4 never touches pixels. The
//! photo travels between them as a [`photo::DataUrl`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`capture`] | Upload rules checked before decoding; loads natural dimensions |
//! | [`crop`] | Crop session state machine: select, apply, cancel, reset |
//! | [`imaging`] | Crop geometry, image backend, data-URL encoding |
//! | [`photo`] | `data:` URLs and the photo reference stored per employee |
//! | [`employee`] | Employee record, field validation, document mapping |
//! | [`reconcile`] | Order planning and moves |
//! | [`roster`] | Client over one collection: list, create, update, delete, move |
//! | [`store`] | `DocumentStore` trait, memory and JSON-file backends, global handle |
//! | [`transcribe`] | Audio clip validation and the HTTP transcription client |
//! | [`config`] | `roster.toml` loading, validation and stock defaults |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`output`] | CLI listing and user notices |
//!
//! # Design Decisions
//!
//! ## Photos Live Inside the Record
//!
//! The cropped photo is stored as a Base64 data URL in the employee's
//! `photoUrl` field, not in a separate blob store. One document holds
//! everything the public page needs. The cost is the store's per-document
//! ceiling, so two limits apply: a soft one checked when encoding (a warning)
//! and the store's hard one (a [`store::StoreErrorKind::PayloadTooLarge`]
//! error that tells the user to shrink the image).
//!
//! ## Optimistic Order, Authoritative Store
//!
//! Moves and deletes update the local list first and then commit one batch
//! of `order` changes. The batch names the collection [`store::Revision`] it
//! was planned against. If anything else wrote in between, the batch is
//! refused, and the roster reloads the list instead of guessing.
//!
//! ## One Store Handle per Process
//!
//! [`store::connect`] opens the configured backend once and hands out the
//! same `Arc` afterwards; [`store::disconnect`] drops it.

pub mod capture;
pub mod config;
pub mod crop;
pub mod employee;
pub mod imaging;
pub mod logging;
pub mod output;
pub mod photo;
pub mod reconcile;
pub mod roster;
pub mod store;
pub mod transcribe;

#[cfg(test)]
pub(crate) mod test_helpers;
