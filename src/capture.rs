//! Photo upload capture and validation.
//!
//! First step of the photo pipeline. A candidate file is checked against the
//! upload rules *before* any decoding:
//!
//! 1. declared size ≤ `upload.max_file_bytes` (700 KiB by default)
//! 2. declared media type starts with `upload.accepted_type_prefix` (`image/`)
//!
//! Only an accepted file is decoded far enough to learn its natural
//! dimensions. The result, [`LoadedImage`], carries the original bytes
//! untouched; cropping happens later in [`crop`](crate::crop).

use crate::config::UploadConfig;
use crate::imaging::{BackendError, Dimensions, ImageBackend};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("file is {size} bytes; the limit is {limit} bytes ({} KB)", .limit / 1024)]
    TooLarge { size: u64, limit: u64 },
    #[error("unsupported file type `{media_type}`; select an image (JPG, PNG, WebP)")]
    NotAnImage { media_type: String },
    #[error("could not read {name}: {source}")]
    Unreadable {
        name: String,
        #[source]
        source: BackendError,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file picked by the user, with the media type it claims to have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a file from disk; the media type is declared from its extension.
    pub fn from_path(path: &Path) -> Result<Self, CaptureError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            name,
            media_type: media_type_for(path).to_string(),
            bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Media type implied by a file extension.
pub fn media_type_for(path: &Path) -> &'static str {
    if path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"))
    {
        return "text/plain";
    }
    image::ImageFormat::from_path(path)
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream")
}

/// An accepted upload, decoded only as far as its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
    pub natural: Dimensions,
}

/// Check size and type. Size is checked first.
pub fn validate(candidate: &CandidateFile, rules: &UploadConfig) -> Result<(), CaptureError> {
    if candidate.size() > rules.max_file_bytes {
        return Err(CaptureError::TooLarge {
            size: candidate.size(),
            limit: rules.max_file_bytes,
        });
    }
    if !candidate
        .media_type
        .starts_with(rules.accepted_type_prefix.as_str())
    {
        return Err(CaptureError::NotAnImage {
            media_type: candidate.media_type.clone(),
        });
    }
    Ok(())
}

/// Validate the candidate and load it for cropping.
pub fn accept(
    candidate: CandidateFile,
    rules: &UploadConfig,
    backend: &impl ImageBackend,
) -> Result<LoadedImage, CaptureError> {
    validate(&candidate, rules)?;
    let natural = backend
        .identify(&candidate.bytes)
        .map_err(|source| CaptureError::Unreadable {
            name: candidate.name.clone(),
            source,
        })?;
    debug!(
        name = %candidate.name,
        width = natural.width,
        height = natural.height,
        "accepted upload"
    );
    Ok(LoadedImage {
        name: candidate.name,
        media_type: candidate.media_type,
        bytes: candidate.bytes,
        natural,
    })
}
