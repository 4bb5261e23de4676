// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::Path;

use image::RgbImage;

use crate::constant;
use crate::cv::transform::resize_bilinear;
use crate::error::SlideSegError;

/// Read-only access to a multi-resolution slide
///
/// Level 0 is full resolution and every other level is a downsampled copy.
/// Region origins are always expressed in the level 0 reference frame while
/// region sizes are expressed in pixels of the requested level. Readers are
/// shared across worker threads and must never mutate during a run.
pub trait PyramidReader: Sync {
    /// Per-level (width, height) pairs, level 0 first
    fn level_dimensions(&self) -> &[(u32, u32)];

    /// Read an RGB region, filling pixels outside the level with black
    ///
    /// # Arguments
    ///
    /// * `origin` - Top-left (x, y) in level 0 coordinates
    /// * `level` - Pyramid level to read from
    /// * `size` - Region (width, height) in level pixels
    fn read_region(
        &self,
        origin: (u32, u32),
        level: usize,
        size: (u32, u32),
    ) -> Result<RgbImage, SlideSegError>;

    /// Number of pyramid levels
    fn level_count(&self) -> usize {
        self.level_dimensions().len()
    }
}

/// An in-memory pyramid synthesized from a single raster image
///
/// Each level halves the previous one, mirroring the power-of-two layout
/// used by most whole-slide formats.
///
/// # Examples
///
/// ```
/// use image::RgbImage;
/// use slideseg_core::im::{ImagePyramid, PyramidReader};
///
/// let pyramid = ImagePyramid::from_image(RgbImage::new(64, 48), 3).unwrap();
///
/// assert_eq!(pyramid.level_count(), 3);
/// assert_eq!(pyramid.level_dimensions(), &[(64, 48), (32, 24), (16, 12)]);
/// ```
#[derive(Debug, Clone)]
pub struct ImagePyramid {
    levels: Vec<RgbImage>,
    dimensions: Vec<(u32, u32)>,
}

impl ImagePyramid {
    /// Open a slide image and build `levels` resolution levels
    ///
    /// # Arguments
    ///
    /// * `path` - A path to an image with a valid extension
    /// * `levels` - Number of levels to synthesize (at least 1)
    ///
    /// ```no_run
    /// use slideseg_core::im::ImagePyramid;
    /// let pyramid = ImagePyramid::open("slide.tif", 3);
    /// ```
    pub fn open<P: AsRef<Path>>(path: P, levels: usize) -> Result<ImagePyramid, SlideSegError> {
        let path = path.as_ref();

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        match extension {
            Some(ext) if constant::SUPPORTED_SLIDE_FORMATS.contains(&ext.as_str()) => {}
            _ => {
                return Err(SlideSegError::ImageReadError(format!(
                    "Unsupported slide extension {}",
                    path.display()
                )));
            }
        }

        if !path.is_file() {
            return Err(SlideSegError::NoFileError(path.display().to_string()));
        }

        let image = image::open(path)
            .map_err(|err| SlideSegError::ImageReadError(format!("{}: {}", path.display(), err)))?
            .to_rgb8();

        Self::from_image(image, levels)
    }

    /// Build a pyramid by repeatedly halving a full resolution image
    ///
    /// Level synthesis stops early once both axes have shrunk to one pixel.
    pub fn from_image(image: RgbImage, levels: usize) -> Result<ImagePyramid, SlideSegError> {
        if levels == 0 {
            return Err(SlideSegError::ConfigError(
                "A pyramid needs at least one level.".to_string(),
            ));
        }

        let mut pyramid = vec![image];

        while pyramid.len() < levels {
            let (width, height) = pyramid[pyramid.len() - 1].dimensions();
            if width == 1 && height == 1 {
                break;
            }

            let level = resize_bilinear(&pyramid[0], (width / 2).max(1), (height / 2).max(1))?;
            pyramid.push(level);
        }

        Self::from_levels(pyramid)
    }

    /// Use pre-computed levels as a pyramid
    ///
    /// Levels must be non-empty and no level may exceed level 0.
    pub fn from_levels(levels: Vec<RgbImage>) -> Result<ImagePyramid, SlideSegError> {
        let Some(base) = levels.first() else {
            return Err(SlideSegError::ImageReadError(
                "A pyramid needs at least one level.".to_string(),
            ));
        };

        let (base_width, base_height) = base.dimensions();

        if base_width == 0 || base_height == 0 {
            return Err(SlideSegError::ImageReadError(
                "Level 0 must not be empty.".to_string(),
            ));
        }

        let dimensions: Vec<(u32, u32)> = levels.iter().map(|level| level.dimensions()).collect();

        if dimensions
            .iter()
            .any(|&(w, h)| w == 0 || h == 0 || w > base_width || h > base_height)
        {
            return Err(SlideSegError::ImageReadError(
                "Pyramid levels must be non-empty and no larger than level 0.".to_string(),
            ));
        }

        Ok(ImagePyramid { levels, dimensions })
    }
}

impl PyramidReader for ImagePyramid {
    fn level_dimensions(&self) -> &[(u32, u32)] {
        &self.dimensions
    }

    fn read_region(
        &self,
        origin: (u32, u32),
        level: usize,
        size: (u32, u32),
    ) -> Result<RgbImage, SlideSegError> {
        let source = self.levels.get(level).ok_or_else(|| {
            SlideSegError::ImageReadError(format!(
                "Level {} is out of range for a {}-level pyramid",
                level,
                self.levels.len()
            ))
        })?;

        let (base_width, base_height) = self.dimensions[0];
        let (width, height) = source.dimensions();

        let scale_x = base_width as f64 / width as f64;
        let scale_y = base_height as f64 / height as f64;

        let x0 = (origin.0 as f64 / scale_x) as u32;
        let y0 = (origin.1 as f64 / scale_y) as u32;

        let mut region = RgbImage::new(size.0, size.1);

        let x1 = x0.saturating_add(size.0).min(width);
        let y1 = y0.saturating_add(size.1).min(height);

        for y in y0..y1 {
            for x in x0..x1 {
                region.put_pixel(x - x0, y - y0, *source.get_pixel(x, y));
            }
        }

        Ok(region)
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use image::Rgb;

    fn checker(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 7]))
    }

    #[test]
    fn test_from_image_levels() {
        let pyramid = ImagePyramid::from_image(checker(40, 20), 3).unwrap();
        assert_eq!(pyramid.level_dimensions(), &[(40, 20), (20, 10), (10, 5)]);
    }

    #[test]
    fn test_from_image_stops_at_single_pixel() {
        let pyramid = ImagePyramid::from_image(checker(2, 2), 5).unwrap();
        assert_eq!(pyramid.level_dimensions(), &[(2, 2), (1, 1)]);
    }

    #[test]
    fn test_from_image_zero_levels() {
        assert!(ImagePyramid::from_image(checker(2, 2), 0).is_err());
    }

    #[test]
    fn test_from_levels_rejects_larger_level() {
        let levels = vec![checker(4, 4), checker(8, 2)];
        assert!(ImagePyramid::from_levels(levels).is_err());
    }

    #[test]
    fn test_read_region_level_zero() {
        let pyramid = ImagePyramid::from_image(checker(16, 16), 1).unwrap();
        let region = pyramid.read_region((4, 6), 0, (3, 2)).unwrap();

        assert_eq!(region.dimensions(), (3, 2));
        assert_eq!(region.get_pixel(0, 0).0, [4, 6, 7]);
        assert_eq!(region.get_pixel(2, 1).0, [6, 7, 7]);
    }

    #[test]
    fn test_read_region_pads_with_black() {
        let pyramid = ImagePyramid::from_image(checker(8, 8), 1).unwrap();
        let region = pyramid.read_region((6, 6), 0, (4, 4)).unwrap();

        assert_eq!(region.get_pixel(1, 1).0, [7, 7, 7]);
        assert_eq!(region.get_pixel(2, 2).0, [0, 0, 0]);
        assert_eq!(region.get_pixel(3, 0).0, [0, 0, 0]);
    }

    #[test]
    fn test_read_region_uses_level_zero_origin() {
        let levels = vec![checker(16, 16), checker(8, 8)];
        let pyramid = ImagePyramid::from_levels(levels).unwrap();

        // Level 0 origin (8, 4) maps to level 1 pixel (4, 2)
        let region = pyramid.read_region((8, 4), 1, (2, 2)).unwrap();
        assert_eq!(region.get_pixel(0, 0).0, [4, 2, 7]);
    }

    #[test]
    fn test_read_region_invalid_level() {
        let pyramid = ImagePyramid::from_image(checker(8, 8), 1).unwrap();
        assert!(pyramid.read_region((0, 0), 3, (2, 2)).is_err());
    }

    #[test]
    fn test_open_missing_file() {
        assert!(ImagePyramid::open("does_not_exist.png", 1).is_err());
        assert!(ImagePyramid::open("slide.svs", 1).is_err());
    }
}
