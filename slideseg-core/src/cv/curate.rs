// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use crate::cv::transform::{resize_cubic, scaled_length};
use crate::error::SlideSegError;
use crate::im::ClassMask;

/// Bring a raw level 0 mask region to exactly `tile_size` x `tile_size`
///
/// The region is first resized by the inverse of the level scale factors
/// with cubic interpolation so that it matches the chip read at that level.
/// Truncated window bounds mean the result can be a pixel or so off, so
/// short axes are zero-padded on their trailing edge and long axes are
/// cropped to their leading `tile_size` pixels.
///
/// # Arguments
///
/// * `region` - Mask sub-region in level 0 pixels
/// * `scale_x` - Level 0 width divided by the level width
/// * `scale_y` - Level 0 height divided by the level height
/// * `tile_size` - Chip edge length
///
/// # Examples
///
/// ```
/// use slideseg_core::cv::curate_mask;
/// use slideseg_core::im::ClassMask;
///
/// let region = ClassMask::new(250, 262);
/// let curated = curate_mask(region, 2.0, 2.0, 128).unwrap();
///
/// assert_eq!(curated.shape(), (128, 128, 3));
/// ```
pub fn curate_mask(
    region: ClassMask,
    scale_x: f64,
    scale_y: f64,
    tile_size: u32,
) -> Result<ClassMask, SlideSegError> {
    if !(scale_x.is_finite() && scale_x > 0.0 && scale_y.is_finite() && scale_y > 0.0) {
        return Err(SlideSegError::ConfigError(format!(
            "Scale factors must be positive, received ({}, {}).",
            scale_x, scale_y
        )));
    }

    if region.width() == 0 || region.height() == 0 {
        return Ok(ClassMask::new(tile_size, tile_size));
    }

    let width = scaled_length(region.width(), scale_x);
    let height = scaled_length(region.height(), scale_y);

    let resized = resize_cubic(&region.into_rgb_image()?, width, height)?;

    let size = tile_size as usize;
    let copy_width = width.min(tile_size) as usize * 3;
    let source = resized.as_raw();

    let mut buffer = vec![0u8; size * size * 3];

    for row in 0..height.min(tile_size) as usize {
        let src = row * width as usize * 3;
        let dst = row * size * 3;
        buffer[dst..dst + copy_width].copy_from_slice(&source[src..src + copy_width]);
    }

    ClassMask::from_raw(tile_size, tile_size, buffer)
}
