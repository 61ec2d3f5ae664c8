//! Pure calculation functions for crop geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//! Two coordinate spaces are involved:
//!
//! - **Displayed** pixels: the size the image is shown at while the user drags
//!   the crop region ([`DisplaySize`], [`CropRegion`]).
//! - **Natural** pixels: the size of the decoded source image ([`PixelRect`]).
//!
//! The crop region is constrained in displayed space and converted to natural
//! space only when the crop is applied.

use super::params::{CropRegion, DisplaySize, PixelRect};

/// Initial crop region: a centered square whose edge is `fraction` of the
/// shorter displayed side.
///
/// # Examples
/// ```
/// # use roster::imaging::{initial_square_region, CropRegion, DisplaySize};
/// // 400x300 display, 90% of the short edge → 270px square, centered
/// let region = initial_square_region(DisplaySize::new(400.0, 300.0), 0.9);
/// assert_eq!(region, CropRegion::square(65.0, 15.0, 270.0));
/// ```
pub fn initial_square_region(display: DisplaySize, fraction: f64) -> CropRegion {
    let edge = display.shorter_edge() * fraction;
    CropRegion::square(
        (display.width - edge) / 2.0,
        (display.height - edge) / 2.0,
        edge,
    )
}

/// Force a requested region back into shape: square, at least `min_edge`
/// displayed pixels per side and fully inside the displayed image.
///
/// If the displayed image is itself smaller than `min_edge`, the minimum
/// shrinks to the shorter displayed side so a region always exists.
pub fn constrain_square(requested: CropRegion, display: DisplaySize, min_edge: f64) -> CropRegion {
    let max_edge = display.shorter_edge();
    let min_edge = min_edge.min(max_edge);

    // Square: the smaller requested side wins, then clamp to [min, image].
    let edge = requested.width.min(requested.height).clamp(min_edge, max_edge);

    let x = requested.x.clamp(0.0, display.width - edge);
    let y = requested.y.clamp(0.0, display.height - edge);
    CropRegion::square(x, y, edge)
}

/// Natural-over-displayed scale factors `(scale_x, scale_y)`.
pub fn scale_ratio(natural: (u32, u32), display: DisplaySize) -> (f64, f64) {
    (
        natural.0 as f64 / display.width,
        natural.1 as f64 / display.height,
    )
}

/// Map a displayed crop region onto natural pixels.
///
/// Offset and extent are both multiplied by the scale factor and rounded.
/// The result is clamped to the source bounds; the extent wins over the
/// offset, so a region hugging the right/bottom edge keeps its size and
/// moves inward instead of shrinking.
pub fn to_natural_rect(region: CropRegion, scale: (f64, f64), natural: (u32, u32)) -> PixelRect {
    let (scale_x, scale_y) = scale;
    let (nat_w, nat_h) = natural;

    let width = scaled(region.width, scale_x).min(nat_w);
    let height = scaled(region.height, scale_y).min(nat_h);
    let x = scaled(region.x, scale_x).min(nat_w - width);
    let y = scaled(region.y, scale_y).min(nat_h - height);

    PixelRect {
        x,
        y,
        width,
        height,
    }
}

fn scaled(value: f64, scale: f64) -> u32 {
    (value * scale).round().max(0.0) as u32
}

/// Whether a natural-pixel rectangle is at least `min_edge` on both sides.
pub fn meets_minimum(rect: PixelRect, min_edge: u32) -> bool {
    rect.width >= min_edge && rect.height >= min_edge
}
