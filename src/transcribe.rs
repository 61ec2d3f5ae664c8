//! Audio transcription client.
//!
//! The inference itself runs elsewhere. This module checks the clip, wraps
//! it in a data URI and posts it to the configured endpoint:
//!
//! ```text
//! POST <endpoint>
//! {"audioDataUri": "data:audio/mpeg;base64,..."}
//!
//! 200 OK
//! {"transcription": "..."}
//! ```
//!
//! Only MP3 and M4A clips are accepted. Service failures are passed through
//! with the service's own text.

use crate::config::TranscriptionConfig;
use crate::photo::DataUrl;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Media types accepted for upload, with the extension each maps from.
pub const ACCEPTED_AUDIO: &[(&str, &str)] = &[
    ("audio/mpeg", "mp3"),
    ("audio/m4a", "m4a"),
    ("audio/mp4", "m4a"),
    ("audio/x-m4a", "m4a"),
];

#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("unsupported audio type `{0}`; send an .mp3 or .m4a file")]
    UnsupportedType(String),
    #[error("audio file is empty")]
    Empty,
    #[error("invalid transcription endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("transcription request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("transcription service returned {status}: {body}")]
    Service { status: u16, body: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl AudioClip {
    /// Build a clip, rejecting types outside [`ACCEPTED_AUDIO`].
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, TranscribeError> {
        let media_type = media_type.into();
        if !ACCEPTED_AUDIO.iter().any(|(t, _)| *t == media_type) {
            return Err(TranscribeError::UnsupportedType(media_type));
        }
        if bytes.is_empty() {
            return Err(TranscribeError::Empty);
        }
        Ok(Self {
            name: name.into(),
            media_type,
            bytes,
        })
    }

    /// Read a clip from disk, typed by its extension.
    pub fn from_path(path: &Path) -> Result<Self, TranscribeError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let media_type = match ext.as_str() {
            "mp3" => "audio/mpeg",
            "m4a" => "audio/mp4",
            other => return Err(TranscribeError::UnsupportedType(format!(".{other}"))),
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(name, media_type, std::fs::read(path)?)
    }

    pub fn data_uri(&self) -> DataUrl {
        DataUrl::encode(&self.media_type, &self.bytes)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptionRequest {
    audio_data_uri: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    transcription: String,
}

pub trait Transcriber {
    fn transcribe(&self, clip: &AudioClip) -> Result<String, TranscribeError>;
}

pub struct HttpTranscriber {
    client: reqwest::blocking::Client,
    endpoint: Url,
}

impl HttpTranscriber {
    pub fn new(config: &TranscriptionConfig) -> Result<Self, TranscribeError> {
        let endpoint = Url::parse(&config.endpoint)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, endpoint })
    }
}

impl Transcriber for HttpTranscriber {
    fn transcribe(&self, clip: &AudioClip) -> Result<String, TranscribeError> {
        let body = request_body(clip);
        debug!(endpoint = %self.endpoint, clip = %clip.name, bytes = clip.bytes.len(), "sending clip");
        let response = self.client.post(self.endpoint.clone()).json(&body).send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TranscribeError::Service {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: TranscriptionResponse = response.json()?;
        info!(clip = %clip.name, chars = parsed.transcription.chars().count(), "clip transcribed");
        Ok(parsed.transcription)
    }
}

fn request_body(clip: &AudioClip) -> TranscriptionRequest {
    TranscriptionRequest {
        audio_data_uri: clip.data_uri().to_string(),
    }
}
