//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the crop session / [`operations`](super::operations)
//! (which decide which pixels become the photo) and the
//! [`backend`](super::backend) (which does the actual pixel work). Keeping them
//! plain data lets tests swap in a recording mock backend.
//!
//! ## Types
//!
//! - [`Quality`] — Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`OutputFormat`] — Encoded photo format: PNG (lossless) or JPEG at a quality.
//! - [`DisplaySize`] — Size the image is shown at while the user drags the crop region.
//! - [`CropRegion`] — Crop rectangle in *displayed* pixels (fractional).
//! - [`PixelRect`] — Crop rectangle in *natural* (source) pixels.
//! - [`CropParams`] — Everything one crop needs: source bytes, natural rectangle, format.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Encoding of the cropped photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg(Quality),
}

impl OutputFormat {
    /// Media type written into the data URL.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg(_) => "image/jpeg",
        }
    }
}

/// Size the source image is rendered at in the crop surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl DisplaySize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn shorter_edge(self) -> f64 {
        self.width.min(self.height)
    }

    /// Both sides finite and strictly positive.
    pub fn is_valid(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Crop rectangle in displayed pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRegion {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square region with its top-left corner at `(x, y)`.
    pub fn square(x: f64, y: f64, edge: f64) -> Self {
        Self::new(x, y, edge, edge)
    }
}

/// Crop rectangle in natural pixels of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Parameters for a crop-and-encode operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CropParams<'a> {
    /// Original, uncropped file bytes.
    pub source: &'a [u8],
    pub rect: PixelRect,
    pub format: OutputFormat,
}
