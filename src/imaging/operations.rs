//! High-level image operations.
//!
//! These functions combine calculations with backend execution. They take
//! configuration, compute parameters, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::params::{CropParams, OutputFormat, PixelRect};
use crate::photo::DataUrl;
use tracing::{debug, warn};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Advisory ceiling for an encoded photo: 950 KiB of data-URL text.
pub const DEFAULT_SOFT_LIMIT: usize = 950 * 1024;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, bytes: &[u8]) -> Result<(u32, u32)> {
    let dims = backend.identify(bytes)?;
    Ok((dims.width, dims.height))
}

/// Configuration for photo encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeConfig {
    pub format: OutputFormat,
    /// Data-URL length above which the result is flagged as oversize.
    pub soft_limit: usize,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            soft_limit: DEFAULT_SOFT_LIMIT,
        }
    }
}

/// A cropped photo ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedPhoto {
    pub data_url: DataUrl,
    pub width: u32,
    pub height: u32,
    /// Set when the data URL exceeds the soft limit. Saving may still
    /// succeed; the store's own limit decides.
    pub oversize: bool,
}

impl EncodedPhoto {
    pub fn len(&self) -> usize {
        self.data_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_url.is_empty()
    }
}

/// Crop `rect` out of `source` and encode it as a data URL.
///
/// Size never aborts encoding: an output over `config.soft_limit` is
/// returned with `oversize` set and a warning logged.
pub fn encode_crop(
    backend: &impl ImageBackend,
    source: &[u8],
    rect: PixelRect,
    config: &EncodeConfig,
) -> Result<EncodedPhoto> {
    let bytes = backend.crop(&CropParams {
        source,
        rect,
        format: config.format,
    })?;
    let data_url = DataUrl::encode(config.format.mime_type(), &bytes);
    let oversize = data_url.len() > config.soft_limit;

    if oversize {
        warn!(
            length = data_url.len(),
            limit = config.soft_limit,
            "encoded photo exceeds the advisory size limit; saving may fail"
        );
    } else {
        debug!(
            width = rect.width,
            height = rect.height,
            length = data_url.len(),
            "encoded photo"
        );
    }

    Ok(EncodedPhoto {
        data_url,
        width: rect.width,
        height: rect.height,
        oversize,
    })
}
