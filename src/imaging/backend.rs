//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the photo pipeline
//! needs: identify (natural dimensions from encoded bytes) and crop (cut a
//! natural-pixel rectangle out of the source and encode it).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend) — pure Rust on top of the
//! `image` crate. Everything is statically linked into the binary.

use super::params::CropParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Trait for image processing backends.
///
/// Backends work on in-memory bytes only: the photo never touches disk
/// between upload and persistence.
pub trait ImageBackend: Sync {
    /// Natural dimensions of an encoded image.
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError>;

    /// Crop `params.rect` out of the decoded source and encode it in
    /// `params.format`. The output has exactly the rectangle's dimensions.
    fn crop(&self, params: &CropParams<'_>) -> Result<Vec<u8>, BackendError>;
}
