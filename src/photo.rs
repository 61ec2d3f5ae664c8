//! Employee photo references and self-contained data URLs.
//!
//! A stored photo is one of three things, never more than one:
//!
//! ```text
//! data:image/png;base64,iVBORw0KGgo...   → PhotoRef::Encoded   (cropped upload)
//! https://cdn.example.com/ana.jpg        → PhotoRef::External  (link set elsewhere)
//! https://placehold.co/200x200.png       → PhotoRef::Placeholder
//! ```
//!
//! Anything that is neither a well-formed image data URL nor an `http(s)`
//! URL resolves to the placeholder, so a broken document never breaks the
//! listing.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use thiserror::Error;
use url::Url;

const DATA_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("not a data URL (missing `data:` prefix)")]
    MissingPrefix,
    #[error("data URL is not base64-encoded")]
    NotBase64,
    #[error("data URL has an empty media type")]
    EmptyMediaType,
    #[error("invalid base64 payload: {0}")]
    Payload(String),
}

/// A `data:<mime>;base64,<payload>` string, directly usable as an image source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    mime_type: String,
    payload: String,
}

impl DataUrl {
    /// Base64-encode `bytes` under the given media type.
    pub fn encode(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            payload: STANDARD.encode(bytes),
        }
    }

    /// Parse a data URL. The payload is checked for base64 validity lazily,
    /// by [`decode_payload`](Self::decode_payload).
    pub fn parse(text: &str) -> Result<Self, DataUrlError> {
        let rest = text
            .strip_prefix(DATA_PREFIX)
            .ok_or(DataUrlError::MissingPrefix)?;
        let (mime_type, payload) = rest
            .split_once(BASE64_MARKER)
            .ok_or(DataUrlError::NotBase64)?;
        if mime_type.is_empty() {
            return Err(DataUrlError::EmptyMediaType);
        }
        Ok(Self {
            mime_type: mime_type.to_string(),
            payload: payload.to_string(),
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Decoded binary payload.
    pub fn decode_payload(&self) -> Result<Vec<u8>, DataUrlError> {
        STANDARD
            .decode(&self.payload)
            .map_err(|e| DataUrlError::Payload(e.to_string()))
    }

    /// Length of the full textual form, which is what counts against
    /// document size limits.
    pub fn len(&self) -> usize {
        DATA_PREFIX.len() + self.mime_type.len() + BASE64_MARKER.len() + self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{DATA_PREFIX}{}{BASE64_MARKER}{}",
            self.mime_type, self.payload
        )
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PhotoLinkError {
    #[error("invalid photo URL: {0}")]
    Invalid(#[from] url::ParseError),
    #[error("photo URL must use http or https, not `{0}`")]
    Scheme(String),
}

/// An external `http(s)` photo link, kept as entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoLink(String);

impl PhotoLink {
    pub fn parse(text: &str) -> Result<Self, PhotoLinkError> {
        let text = text.trim();
        let url = Url::parse(text)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PhotoLinkError::Scheme(url.scheme().to_string()));
        }
        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhotoLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an employee's photo comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PhotoRef {
    Encoded(DataUrl),
    External(PhotoLink),
    #[default]
    Placeholder,
}

impl PhotoRef {
    /// Interpret a stored `photoUrl` value.
    ///
    /// Missing, empty, unparseable and placeholder values all map to
    /// [`PhotoRef::Placeholder`].
    pub fn from_stored(value: Option<&str>, placeholder: &str) -> Self {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Self::Placeholder;
        };
        if value == placeholder {
            return Self::Placeholder;
        }
        if value.starts_with("data:image") {
            return match DataUrl::parse(value) {
                Ok(data) => Self::Encoded(data),
                Err(_) => Self::Placeholder,
            };
        }
        PhotoLink::parse(value).map_or(Self::Placeholder, Self::External)
    }

    /// Value written to the `photoUrl` field. The placeholder is stored as
    /// its URL so other readers of the collection can render it directly.
    pub fn to_stored(&self, placeholder: &str) -> String {
        match self {
            Self::Encoded(data) => data.to_string(),
            Self::External(link) => link.as_str().to_string(),
            Self::Placeholder => placeholder.to_string(),
        }
    }

    /// Encoded length of an uploaded photo, `None` for links.
    pub fn encoded_len(&self) -> Option<usize> {
        match self {
            Self::Encoded(data) => Some(data.len()),
            _ => None,
        }
    }

    /// Short human label for listings.
    pub fn describe(&self) -> String {
        match self {
            Self::Encoded(data) => format!("{} ({} KB)", data.mime_type(), data.len() / 1024),
            Self::External(link) => link.to_string(),
            Self::Placeholder => "placeholder".to_string(),
        }
    }
}
