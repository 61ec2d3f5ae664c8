//! Pure Rust image backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::with_guessed_format` + `into_dimensions` (header only) |
//! | Decode (JPEG, PNG, GIF, WebP) | `image::load_from_memory` |
//! | Crop | `image::DynamicImage::crop_imm` |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (RGB8, quality from params) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{CropParams, OutputFormat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn load_image(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    image::load_from_memory(bytes).map_err(|e| BackendError::Decode(e.to_string()))
}

fn encode(image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let result = match format {
        OutputFormat::Png => image.write_with_encoder(PngEncoder::new(&mut buf)),
        OutputFormat::Jpeg(quality) => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
            rgb.write_with_encoder(encoder)
        }
    };
    result.map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to encode {}: {e}", format.mime_type()))
    })?;
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Dimensions { width, height })
    }

    fn crop(&self, params: &CropParams<'_>) -> Result<Vec<u8>, BackendError> {
        let img = load_image(params.source)?;
        let rect = params.rect;
        if rect.width == 0
            || rect.height == 0
            || rect.x + rect.width > img.width()
            || rect.y + rect.height > img.height()
        {
            return Err(BackendError::ProcessingFailed(format!(
                "Crop {}x{}+{}+{} outside {}x{} source",
                rect.width,
                rect.height,
                rect.x,
                rect.y,
                img.width(),
                img.height()
            )));
        }
        let cropped = img.crop_imm(rect.x, rect.y, rect.width, rect.height);
        encode(&cropped, params.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::{PixelRect, Quality};
    use crate::test_helpers::{create_test_jpeg, create_test_png};

    fn rect(x: u32, y: u32, edge: u32) -> PixelRect {
        PixelRect {
            x,
            y,
            width: edge,
            height: edge,
        }
    }

    #[test]
    fn identify_png_dimensions() {
        let bytes = create_test_png(200, 150);
        let dims = RustBackend::new().identify(&bytes).unwrap();
        assert_eq!(dims, Dimensions { width: 200, height: 150 });
    }

    #[test]
    fn identify_jpeg_dimensions() {
        let bytes = create_test_jpeg(320, 240);
        let dims = RustBackend::new().identify(&bytes).unwrap();
        assert_eq!(dims.width, 320);
        assert_eq!(dims.height, 240);
    }

    #[test]
    fn identify_garbage_errors() {
        let result = RustBackend::new().identify(b"definitely not an image");
        assert!(result.is_err());
    }

    #[test]
    fn crop_png_output_has_rect_dimensions() {
        let source = create_test_png(400, 300);
        let out = RustBackend::new()
            .crop(&CropParams {
                source: &source,
                rect: rect(50, 20, 180),
                format: OutputFormat::Png,
            })
            .unwrap();

        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.width(), 180);
        assert_eq!(decoded.height(), 180);
        assert_eq!(
            image::guess_format(&out).unwrap(),
            image::ImageFormat::Png
        );
    }

    #[test]
    fn crop_jpeg_output_has_rect_dimensions() {
        let source = create_test_png(300, 300);
        let out = RustBackend::new()
            .crop(&CropParams {
                source: &source,
                rect: rect(0, 0, 160),
                format: OutputFormat::Jpeg(Quality::new(80)),
            })
            .unwrap();

        assert_eq!(
            image::guess_format(&out).unwrap(),
            image::ImageFormat::Jpeg
        );
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (160, 160));
    }

    #[test]
    fn out_of_range_quality_encodes_at_maximum() {
        let source = create_test_png(64, 64);
        let encode = |quality| {
            RustBackend::new()
                .crop(&CropParams {
                    source: &source,
                    rect: rect(0, 0, 64),
                    format: OutputFormat::Jpeg(quality),
                })
                .unwrap()
        };
        // 257 would wrap to 1 if it reached the encoder unclamped
        assert_eq!(encode(Quality::new(257)), encode(Quality::new(100)));
        assert_ne!(encode(Quality::new(257)), encode(Quality::new(1)));
    }

    #[test]
    fn crop_preserves_source_pixels() {
        // Gradient source: pixel (x, y) = (x, y, 128). The crop's top-left
        // pixel must be the source pixel at the crop offset.
        let source = create_test_png(256, 256);
        let out = RustBackend::new()
            .crop(&CropParams {
                source: &source,
                rect: rect(30, 40, 150),
                format: OutputFormat::Png,
            })
            .unwrap();
        let decoded = image::load_from_memory(&out).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(0, 0).0, [30, 40, 128]);
    }

    #[test]
    fn crop_outside_source_errors() {
        let source = create_test_png(200, 200);
        let result = RustBackend::new().crop(&CropParams {
            source: &source,
            rect: rect(100, 100, 150),
            format: OutputFormat::Png,
        });
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
    }

    #[test]
    fn crop_undecodable_source_errors() {
        let result = RustBackend::new().crop(&CropParams {
            source: b"nope",
            rect: rect(0, 0, 10),
            format: OutputFormat::Png,
        });
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }
}
