//! Interactive square crop session.
//!
//! ```text
//!                 load()                    apply() ok
//! Uninitialized ─────────▶ Selecting ───────────────────▶ Applied
//!       ▲                  │  ▲  │                          │
//!       │                  │  │  └─ apply() too small:      │
//!       │                  │  │     stays Selecting         │
//!       │        cancel()  │  └──────── reopen() ───────────┤
//!       │◀─ (no output) ───┘                                │
//!       └──────────────────────── reset() ──────────────────┘
//! ```
//!
//! While selecting, every drag is constrained to a 1:1 square of at least
//! `min_edge` *displayed* pixels. `release()` marks the end of a drag and
//! commits the current region as the completed crop; `apply()` always works
//! on the completed crop, which starts as the initial centered region.
//!
//! On apply the completed crop is mapped to *natural* pixels and must be at
//! least `min_edge` on both sides there too; a downscaled display can pass the
//! first check and fail the second.
//!
//! `cancel()` never loses an applied photo. `reset()` drops everything and
//! the employee falls back to the placeholder.

use crate::capture::LoadedImage;
use crate::config::CropConfig;
use crate::imaging::{
    BackendError, CropRegion, DisplaySize, EncodeConfig, EncodedPhoto, ImageBackend, PixelRect,
    constrain_square, encode_crop, initial_square_region, meets_minimum, scale_ratio,
    to_natural_rect,
};
use crate::photo::PhotoRef;
use std::fmt;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropState {
    Uninitialized,
    Selecting,
    Applied,
}

impl fmt::Display for CropState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Selecting => "selecting",
            Self::Applied => "applied",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum CropError {
    #[error("crop area is {width}x{height}px; it must be at least {min}x{min}px")]
    TooSmall { width: u32, height: u32, min: u32 },
    #[error("no crop area selected")]
    NoSelection,
    #[error("no image loaded")]
    NoImage,
    #[error("display size {width}x{height} is not usable")]
    InvalidDisplay { width: f64, height: f64 },
    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: CropState,
    },
    #[error("failed to render crop: {0}")]
    Render(#[from] BackendError),
}

/// One crop interaction over one uploaded image.
#[derive(Debug)]
pub struct CropSession {
    settings: CropConfig,
    state: CropState,
    image: Option<LoadedImage>,
    display: Option<DisplaySize>,
    region: Option<CropRegion>,
    completed: Option<CropRegion>,
    applied: Option<EncodedPhoto>,
}

impl CropSession {
    pub fn new(settings: CropConfig) -> Self {
        Self {
            settings,
            state: CropState::Uninitialized,
            image: None,
            display: None,
            region: None,
            completed: None,
            applied: None,
        }
    }

    pub fn state(&self) -> CropState {
        self.state
    }

    /// Region as currently dragged (displayed pixels).
    pub fn region(&self) -> Option<CropRegion> {
        self.region
    }

    /// Region committed by the last `release()` (displayed pixels).
    pub fn completed(&self) -> Option<CropRegion> {
        self.completed
    }

    pub fn applied(&self) -> Option<&EncodedPhoto> {
        self.applied.as_ref()
    }

    pub fn image(&self) -> Option<&LoadedImage> {
        self.image.as_ref()
    }

    /// Photo this session resolves to: the applied crop, or the placeholder.
    pub fn photo(&self) -> PhotoRef {
        match &self.applied {
            Some(photo) => PhotoRef::Encoded(photo.data_url.clone()),
            None => PhotoRef::Placeholder,
        }
    }

    /// Open the crop surface on a freshly accepted image.
    ///
    /// A photo applied earlier in the session stays in place until the new
    /// crop is applied.
    pub fn load(&mut self, image: LoadedImage, display: DisplaySize) -> Result<(), CropError> {
        if !display.is_valid() {
            return Err(CropError::InvalidDisplay {
                width: display.width,
                height: display.height,
            });
        }
        let initial = initial_square_region(display, self.settings.initial_fraction);
        let initial = constrain_square(initial, display, self.settings.min_edge as f64);
        debug!(name = %image.name, ?initial, "crop session opened");

        self.image = Some(image);
        self.display = Some(display);
        self.region = Some(initial);
        self.completed = Some(initial);
        self.state = CropState::Selecting;
        Ok(())
    }

    /// Move or resize the region. Returns the constrained region.
    pub fn drag(&mut self, requested: CropRegion) -> Result<CropRegion, CropError> {
        self.require(CropState::Selecting, "drag")?;
        let display = self.display.ok_or(CropError::NoImage)?;
        let region = constrain_square(requested, display, self.settings.min_edge as f64);
        self.region = Some(region);
        Ok(region)
    }

    /// End of a drag: the current region becomes the completed crop.
    pub fn release(&mut self) -> Result<(), CropError> {
        self.require(CropState::Selecting, "release")?;
        self.completed = self.region;
        Ok(())
    }

    /// Completed crop in natural pixels.
    pub fn natural_selection(&self) -> Result<PixelRect, CropError> {
        let image = self.image.as_ref().ok_or(CropError::NoImage)?;
        let display = self.display.ok_or(CropError::NoImage)?;
        let completed = self.completed.ok_or(CropError::NoSelection)?;
        let natural = image.natural.as_tuple();
        Ok(to_natural_rect(
            completed,
            scale_ratio(natural, display),
            natural,
        ))
    }

    /// Render the completed crop and move to `Applied`.
    ///
    /// A selection under the minimum in natural pixels is rejected and the
    /// session stays in `Selecting` with its previous output untouched.
    pub fn apply(
        &mut self,
        backend: &impl ImageBackend,
        encode: &EncodeConfig,
    ) -> Result<&EncodedPhoto, CropError> {
        self.require(CropState::Selecting, "apply")?;
        let rect = self.natural_selection()?;
        let min = self.settings.min_edge;
        if !meets_minimum(rect, min) {
            return Err(CropError::TooSmall {
                width: rect.width,
                height: rect.height,
                min,
            });
        }
        let image = self.image.as_ref().ok_or(CropError::NoImage)?;
        let photo = encode_crop(backend, &image.bytes, rect, encode)?;
        self.state = CropState::Applied;
        Ok(self.applied.insert(photo))
    }

    /// Close the crop surface without applying.
    pub fn cancel(&mut self) {
        if self.state != CropState::Selecting {
            return;
        }
        self.state = if self.applied.is_some() {
            CropState::Applied
        } else {
            CropState::Uninitialized
        };
    }

    /// Crop the loaded image again, starting from the last completed crop.
    pub fn reopen(&mut self) -> Result<(), CropError> {
        if self.image.is_none() {
            return Err(CropError::NoImage);
        }
        self.region = self.completed;
        self.state = CropState::Selecting;
        Ok(())
    }

    /// Drop the image, the selection and any applied photo.
    pub fn reset(&mut self) {
        self.state = CropState::Uninitialized;
        self.image = None;
        self.display = None;
        self.region = None;
        self.completed = None;
        self.applied = None;
    }

    fn require(&self, expected: CropState, action: &'static str) -> Result<(), CropError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CropError::InvalidState {
                action,
                state: self.state,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::{Dimensions, OutputFormat, RustBackend};
    use crate::test_helpers::create_test_png;

    fn loaded(width: u32, height: u32) -> LoadedImage {
        LoadedImage {
            name: "photo.png".into(),
            media_type: "image/png".into(),
            bytes: create_test_png(width, height),
            natural: Dimensions { width, height },
        }
    }

    fn fake_loaded(width: u32, height: u32) -> LoadedImage {
        LoadedImage {
            name: "photo.png".into(),
            media_type: "image/png".into(),
            bytes: vec![0u8; 8],
            natural: Dimensions { width, height },
        }
    }

    fn session() -> CropSession {
        CropSession::new(CropConfig::default())
    }

    #[test]
    fn starts_uninitialized() {
        let s = session();
        assert_eq!(s.state(), CropState::Uninitialized);
        assert_eq!(s.photo(), PhotoRef::Placeholder);
    }

    #[test]
    fn load_sets_centered_initial_region() {
        let mut s = session();
        s.load(fake_loaded(800, 600), DisplaySize::new(400.0, 300.0)).unwrap();
        assert_eq!(s.state(), CropState::Selecting);
        assert_eq!(s.region(), Some(CropRegion::square(65.0, 15.0, 270.0)));
        assert_eq!(s.completed(), s.region());
    }

    #[test]
    fn load_rejects_zero_display() {
        let mut s = session();
        let err = s.load(fake_loaded(800, 600), DisplaySize::new(0.0, 300.0));
        assert!(matches!(err, Err(CropError::InvalidDisplay { .. })));
        assert_eq!(s.state(), CropState::Uninitialized);
    }

    #[test]
    fn drag_is_constrained_and_not_committed_until_release() {
        let mut s = session();
        s.load(fake_loaded(800, 600), DisplaySize::new(400.0, 300.0)).unwrap();

        let r = s.drag(CropRegion::new(-10.0, 0.0, 80.0, 300.0)).unwrap();
        assert_eq!(r, CropRegion::square(0.0, 0.0, 150.0));
        assert_eq!(s.completed(), Some(CropRegion::square(65.0, 15.0, 270.0)));

        s.release().unwrap();
        assert_eq!(s.completed(), Some(r));
    }

    #[test]
    fn drag_outside_selecting_is_invalid() {
        let mut s = session();
        let err = s.drag(CropRegion::square(0.0, 0.0, 200.0)).unwrap_err();
        assert!(matches!(
            err,
            CropError::InvalidState {
                action: "drag",
                state: CropState::Uninitialized
            }
        ));
    }

    #[test]
    fn apply_renders_natural_rect() {
        // Natural 800x600 shown at 400x300: scale 2.0
        let backend = MockBackend::with_output_len(64);
        let mut s = session();
        s.load(fake_loaded(800, 600), DisplaySize::new(400.0, 300.0)).unwrap();
        s.drag(CropRegion::square(10.0, 20.0, 200.0)).unwrap();
        s.release().unwrap();

        let photo = s.apply(&backend, &EncodeConfig::default()).unwrap();
        assert_eq!((photo.width, photo.height), (400, 400));
        assert_eq!(s.state(), CropState::Applied);
        assert!(matches!(s.photo(), PhotoRef::Encoded(_)));

        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Crop {
                source_len: 8,
                rect: PixelRect {
                    x: 20,
                    y: 40,
                    width: 400,
                    height: 400
                },
                format: OutputFormat::Png,
            }]
        );
    }

    #[test]
    fn apply_rejects_small_natural_selection_and_stays_selecting() {
        // Natural 200x200 shown at 400x400: a 150px displayed square is 75px natural
        let backend = MockBackend::with_output_len(64);
        let mut s = session();
        s.load(fake_loaded(200, 200), DisplaySize::new(400.0, 400.0)).unwrap();
        s.drag(CropRegion::square(0.0, 0.0, 150.0)).unwrap();
        s.release().unwrap();

        let err = s.apply(&backend, &EncodeConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            CropError::TooSmall {
                width: 75,
                height: 75,
                min: 150
            }
        ));
        assert_eq!(s.state(), CropState::Selecting);
        assert!(s.applied().is_none());
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn too_small_rejected_across_scale_ratios() {
        // Smallest draggable square at each ratio: accepted exactly when it
        // covers 150 natural pixels.
        for &natural in &[150u32, 300, 451, 1000, 1777] {
            for &display in &[100.0f64, 240.0, 333.0, 500.0, 1024.0] {
                let scale = natural as f64 / display;
                let edge = 150.0f64.min(display);
                let backend = MockBackend::with_output_len(4);
                let mut s = session();
                s.load(fake_loaded(natural, natural), DisplaySize::new(display, display))
                    .unwrap();
                s.drag(CropRegion::square(0.0, 0.0, 1.0)).unwrap();
                s.release().unwrap();
                let rect = s.natural_selection().unwrap();
                assert_eq!(rect.width, ((edge * scale).round() as u32).min(natural));

                let result = s.apply(&backend, &EncodeConfig::default());
                if rect.width < 150 {
                    assert!(matches!(result, Err(CropError::TooSmall { .. })));
                    assert_eq!(s.state(), CropState::Selecting);
                } else {
                    assert!(result.is_ok(), "natural {natural} display {display}");
                    assert_eq!(s.state(), CropState::Applied);
                }
            }
        }
    }

    #[test]
    fn image_smaller_than_minimum_can_never_apply() {
        let backend = MockBackend::with_output_len(4);
        let mut s = session();
        s.load(fake_loaded(120, 120), DisplaySize::new(120.0, 120.0)).unwrap();
        s.drag(CropRegion::square(0.0, 0.0, 500.0)).unwrap();
        s.release().unwrap();
        assert!(matches!(
            s.apply(&backend, &EncodeConfig::default()),
            Err(CropError::TooSmall {
                width: 120,
                height: 120,
                ..
            })
        ));
    }

    #[test]
    fn cancel_without_apply_returns_to_uninitialized() {
        let mut s = session();
        s.load(fake_loaded(800, 600), DisplaySize::new(400.0, 300.0)).unwrap();
        s.cancel();
        assert_eq!(s.state(), CropState::Uninitialized);
        assert_eq!(s.photo(), PhotoRef::Placeholder);
    }

    #[test]
    fn cancel_keeps_previously_applied_output() {
        let backend = MockBackend::with_output_len(16);
        let mut s = session();
        s.load(fake_loaded(800, 600), DisplaySize::new(400.0, 300.0)).unwrap();
        let first = s.apply(&backend, &EncodeConfig::default()).unwrap().clone();

        // Upload another image, then change our mind
        s.load(fake_loaded(1000, 1000), DisplaySize::new(500.0, 500.0)).unwrap();
        s.cancel();

        assert_eq!(s.state(), CropState::Applied);
        assert_eq!(s.applied(), Some(&first));
    }

    #[test]
    fn reopen_after_apply_allows_recrop() {
        let backend = MockBackend::with_output_len(16);
        let mut s = session();
        s.load(fake_loaded(800, 600), DisplaySize::new(400.0, 300.0)).unwrap();
        s.apply(&backend, &EncodeConfig::default()).unwrap();

        s.reopen().unwrap();
        assert_eq!(s.state(), CropState::Selecting);
        assert_eq!(s.region(), s.completed());
    }

    #[test]
    fn reopen_without_image_fails() {
        let mut s = session();
        assert!(matches!(s.reopen(), Err(CropError::NoImage)));
    }

    #[test]
    fn reset_discards_everything() {
        let backend = MockBackend::with_output_len(16);
        let mut s = session();
        s.load(fake_loaded(800, 600), DisplaySize::new(400.0, 300.0)).unwrap();
        s.apply(&backend, &EncodeConfig::default()).unwrap();

        s.reset();
        assert_eq!(s.state(), CropState::Uninitialized);
        assert!(s.applied().is_none());
        assert!(s.image().is_none());
        assert_eq!(s.photo(), PhotoRef::Placeholder);
    }

    #[test]
    fn apply_with_real_pixels() {
        let mut s = session();
        s.load(loaded(600, 400), DisplaySize::new(300.0, 200.0)).unwrap();
        let photo = s
            .apply(&RustBackend::new(), &EncodeConfig::default())
            .unwrap();

        // Initial region: 180px displayed → 360px natural
        assert_eq!((photo.width, photo.height), (360, 360));
        let bytes = photo.data_url.decode_payload().unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (360, 360));
        assert_eq!(photo.data_url.mime_type(), "image/png");
    }
}
