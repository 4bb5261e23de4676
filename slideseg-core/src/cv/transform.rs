// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use fast_image_resize::images::{Image, ImageRef};
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::RgbImage;

use crate::error::SlideSegError;

/// Resize an RGB image using the SIMD-accelerated fast-image-resize crate
///
/// Identity resizes return a copy without interpolating so that exact class
/// codes survive untouched.
///
/// # Arguments
///
/// * `source` - An 8-bit RGB image
/// * `new_width` - New width following resizing
/// * `new_height` - New height following resizing
/// * `filter` - Convolution filter (e.g. `Bilinear` or `CatmullRom`)
pub fn resize_rgb(
    source: &RgbImage,
    new_width: u32,
    new_height: u32,
    filter: FilterType,
) -> Result<RgbImage, SlideSegError> {
    let (width, height) = source.dimensions();

    if (width, height) == (new_width, new_height) {
        return Ok(source.clone());
    }

    if width == 0 || height == 0 || new_width == 0 || new_height == 0 {
        return Ok(RgbImage::new(new_width, new_height));
    }

    let source = ImageRef::new(width, height, source.as_raw(), PixelType::U8x3)
        .map_err(|err| SlideSegError::ImageReadError(err.to_string()))?;

    let mut destination = Image::new(new_width, new_height, PixelType::U8x3);

    let mut resizer = Resizer::new();
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(filter));

    resizer
        .resize(&source, &mut destination, &options)
        .map_err(|err| SlideSegError::ImageReadError(err.to_string()))?;

    RgbImage::from_raw(new_width, new_height, destination.into_vec())
        .ok_or(SlideSegError::BufferSizeError)
}

/// Resize an RGB image with cubic (Catmull-Rom) interpolation
pub fn resize_cubic(
    source: &RgbImage,
    new_width: u32,
    new_height: u32,
) -> Result<RgbImage, SlideSegError> {
    resize_rgb(source, new_width, new_height, FilterType::CatmullRom)
}

/// Resize an RGB image with bilinear interpolation
pub fn resize_bilinear(
    source: &RgbImage,
    new_width: u32,
    new_height: u32,
) -> Result<RgbImage, SlideSegError> {
    resize_rgb(source, new_width, new_height, FilterType::Bilinear)
}

/// Output length of an axis resized by `1 / scale`, never below one pixel
pub fn scaled_length(length: u32, scale: f64) -> u32 {
    ((length as f64 / scale).round() as u32).max(1)
}

#[cfg(test)]
mod test {

    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 20) as u8, (y * 20) as u8, ((x + y) * 10) as u8])
        })
    }

    #[test]
    fn test_resize_consistency() {
        // Integer rounding differs between resize implementations so we
        // accept consistency at some specified mean error.
        const MAX_ERROR: f32 = 5.0;

        let source = gradient(6, 6);

        let resize_fast = resize_cubic(&source, 11, 11).unwrap();
        let resize_default =
            image::imageops::resize(&source, 11, 11, image::imageops::FilterType::CatmullRom);

        let error = resize_fast
            .as_raw()
            .iter()
            .zip(resize_default.as_raw())
            .map(|(x, y)| (*x as f32 - *y as f32).abs())
            .sum::<f32>()
            / resize_fast.as_raw().len() as f32;

        assert!(error < MAX_ERROR);
    }

    #[test]
    fn test_resize_dimensions() {
        let source = gradient(5, 3);

        assert_eq!(resize_cubic(&source, 10, 6).unwrap().dimensions(), (10, 6));
        assert_eq!(resize_bilinear(&source, 2, 1).unwrap().dimensions(), (2, 1));
        assert_eq!(resize_cubic(&source, 7, 9).unwrap().len(), 7 * 9 * 3);
    }

    #[test]
    fn test_resize_identity_is_exact() {
        let source = gradient(4, 4);
        assert_eq!(resize_cubic(&source, 4, 4).unwrap(), source);
    }

    #[test]
    fn test_resize_empty_source() {
        let source = RgbImage::new(0, 4);
        let resized = resize_cubic(&source, 3, 3).unwrap();
        assert_eq!(resized.dimensions(), (3, 3));
        assert!(resized.as_raw().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_scaled_length() {
        assert_eq!(scaled_length(128, 1.0), 128);
        assert_eq!(scaled_length(512, 4.0), 128);
        assert_eq!(scaled_length(257, 2.0), 129);
        assert_eq!(scaled_length(1, 8.0), 1);
    }
}
