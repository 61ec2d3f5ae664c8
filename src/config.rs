//! Roster configuration module.
//!
//! Handles loading, validating, and merging `roster.toml`. Stock defaults are
//! overridden by the user's file; the file is sparse, so it only needs the
//! keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! placeholder_url = "https://placehold.co/200x200.png"
//!
//! [store]
//! backend = "file"              # "file" (JSON on disk) or "memory"
//! path = "roster-data"          # Directory for the file backend
//! collection = "employees"
//! max_document_bytes = 1048576  # Hard per-document ceiling (1 MiB)
//!
//! [upload]
//! max_file_bytes = 716800       # 700 KiB
//! accepted_type_prefix = "image/"
//!
//! [crop]
//! min_edge = 150                # Minimum crop edge in pixels
//! initial_fraction = 0.9        # Initial crop = 90% of the shorter side
//!
//! [encoder]
//! format = "png"                # "png" or "jpeg"
//! quality = 90                  # JPEG only (1-100)
//! soft_limit_bytes = 972800     # 950 KiB advisory ceiling
//!
//! [transcription]
//! endpoint = "http://127.0.0.1:3400/transcribe"
//! timeout_secs = 120
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{EncodeConfig, OutputFormat, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the config directory.
pub const CONFIG_FILENAME: &str = "roster.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Roster configuration loaded from `roster.toml`.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RosterConfig {
    /// Image shown for employees without a photo. Stored verbatim.
    pub placeholder_url: String,
    /// Document store settings.
    pub store: StoreConfig,
    /// Upload acceptance rules.
    pub upload: UploadConfig,
    /// Crop surface settings.
    pub crop: CropConfig,
    /// Photo encoding settings.
    pub encoder: EncoderConfig,
    /// Audio transcription endpoint.
    pub transcription: TranscriptionConfig,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            placeholder_url: "https://placehold.co/200x200.png".to_string(),
            store: StoreConfig::default(),
            upload: UploadConfig::default(),
            crop: CropConfig::default(),
            encoder: EncoderConfig::default(),
            transcription: TranscriptionConfig::default(),
        }
    }
}

impl RosterConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.placeholder_url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::Validation(
                    "placeholder_url must be an http(s) URL".into(),
                ));
            }
        }
        if self.store.collection.trim().is_empty() {
            return Err(ConfigError::Validation(
                "store.collection must not be empty".into(),
            ));
        }
        if self.store.max_document_bytes == 0 {
            return Err(ConfigError::Validation(
                "store.max_document_bytes must be non-zero".into(),
            ));
        }
        if self.upload.max_file_bytes == 0 {
            return Err(ConfigError::Validation(
                "upload.max_file_bytes must be non-zero".into(),
            ));
        }
        if self.crop.min_edge == 0 {
            return Err(ConfigError::Validation(
                "crop.min_edge must be non-zero".into(),
            ));
        }
        if !(self.crop.initial_fraction > 0.0 && self.crop.initial_fraction <= 1.0) {
            return Err(ConfigError::Validation(
                "crop.initial_fraction must be in (0, 1]".into(),
            ));
        }
        if self.encoder.quality == 0 || self.encoder.quality > 100 {
            return Err(ConfigError::Validation(
                "encoder.quality must be 1-100".into(),
            ));
        }
        if self.encoder.soft_limit_bytes == 0 {
            return Err(ConfigError::Validation(
                "encoder.soft_limit_bytes must be non-zero".into(),
            ));
        }
        if self.transcription.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "transcription.timeout_secs must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Which [`DocumentStore`](crate::store::DocumentStore) backs the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Memory,
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Directory holding one JSON file per collection (file backend only).
    pub path: String,
    /// Collection holding employee documents.
    pub collection: String,
    /// Serialized size above which the store rejects a document.
    pub max_document_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            path: "roster-data".to_string(),
            collection: "employees".to_string(),
            max_document_bytes: 1024 * 1024,
        }
    }
}

/// Upload acceptance rules, checked before any decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    pub max_file_bytes: u64,
    pub accepted_type_prefix: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 700 * 1024,
            accepted_type_prefix: "image/".to_string(),
        }
    }
}

/// Crop surface settings. The aspect ratio is always 1:1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropConfig {
    /// Minimum edge, in displayed pixels while dragging and in natural
    /// pixels when applying.
    pub min_edge: u32,
    /// Initial region edge as a fraction of the shorter displayed side.
    pub initial_fraction: f64,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            min_edge: 150,
            initial_fraction: 0.9,
        }
    }
}

/// Encoded photo format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoFormat {
    #[default]
    Png,
    Jpeg,
}

/// Photo encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderConfig {
    pub format: PhotoFormat,
    /// JPEG quality (ignored for PNG).
    pub quality: u32,
    /// Advisory data-URL size; larger photos are flagged, not rejected.
    pub soft_limit_bytes: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            format: PhotoFormat::Png,
            quality: 90,
            soft_limit_bytes: 950 * 1024,
        }
    }
}

impl EncoderConfig {
    pub fn to_encode_config(&self) -> EncodeConfig {
        let format = match self.format {
            PhotoFormat::Png => OutputFormat::Png,
            PhotoFormat::Jpeg => OutputFormat::Jpeg(Quality::new(self.quality)),
        };
        EncodeConfig {
            format,
            soft_limit: self.soft_limit_bytes,
        }
    }
}

/// Audio transcription endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranscriptionConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:3400/transcribe".to_string(),
            timeout_secs: 120,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(RosterConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `roster.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no file exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<RosterConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: RosterConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `roster.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<RosterConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `roster.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Roster Configuration
# ====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Image shown for employees without a photo.
placeholder_url = "https://placehold.co/200x200.png"

# ---------------------------------------------------------------------------
# Document store
# ---------------------------------------------------------------------------
[store]
# "file" keeps one JSON file per collection under `path`.
# "memory" keeps everything in process (useful for dry runs).
backend = "file"
path = "roster-data"
collection = "employees"

# Hard per-document ceiling, in bytes of serialized JSON. Writes above this
# are rejected by the store with a payload-too-large error.
max_document_bytes = 1048576

# ---------------------------------------------------------------------------
# Upload
# ---------------------------------------------------------------------------
[upload]
# Files larger than this are rejected before decoding (700 KiB).
max_file_bytes = 716800

# Declared media type must start with this prefix.
accepted_type_prefix = "image/"

# ---------------------------------------------------------------------------
# Crop
# ---------------------------------------------------------------------------
[crop]
# Minimum square edge. Enforced in displayed pixels while dragging and in
# source pixels when the crop is applied.
min_edge = 150

# Initial crop edge as a fraction of the shorter side.
initial_fraction = 0.9

# ---------------------------------------------------------------------------
# Photo encoding
# ---------------------------------------------------------------------------
[encoder]
# "png" (lossless, larger) or "jpeg" (lossy, smaller).
format = "png"

# JPEG quality (1 = worst, 100 = best). Ignored for PNG.
quality = 90

# Advisory ceiling for the encoded photo (950 KiB). Larger photos produce a
# warning but are still submitted; the store limit above decides.
soft_limit_bytes = 972800

# ---------------------------------------------------------------------------
# Transcription
# ---------------------------------------------------------------------------
[transcription]
endpoint = "http://127.0.0.1:3400/transcribe"
timeout_secs = 120
"##
}
