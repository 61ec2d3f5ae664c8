//! Photo imaging: crop geometry, decoding, and data-URL encoding.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Crop** | `DynamicImage::crop_imm` |
//! | **Encode** | PNG / JPEG encoders → Base64 data URL |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop geometry (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    constrain_square, initial_square_region, meets_minimum, scale_ratio, to_natural_rect,
};
pub use operations::{DEFAULT_SOFT_LIMIT, EncodeConfig, EncodedPhoto, encode_crop, get_dimensions};
pub use params::{CropParams, CropRegion, DisplaySize, OutputFormat, PixelRect, Quality};
pub use rust_backend::RustBackend;
