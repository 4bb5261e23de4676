// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::collections::BTreeSet;
use std::slice::ChunksExact;

use image::RgbImage;

use crate::constant::BACKGROUND;
use crate::error::SlideSegError;

/// An RGB class code stored in mask pixels
pub type MaskColor = [u8; 3];

/// A row-major, 3-channel container storing per-pixel class codes
///
/// Each pixel holds either the background value `(0, 0, 0)` or the color
/// code of an annotation class. The length of the container must be equal
/// to the product of `w` * `h` * 3.
///
/// # Examples
///
/// ```
/// use slideseg_core::im::ClassMask;
///
/// let mask = ClassMask::from_raw(4, 2, vec![0u8; 4 * 2 * 3]);
/// assert_eq!(mask.unwrap().len(), 24);
///
/// let mask = ClassMask::from_raw(4, 2, vec![0u8; 10]);
/// assert!(mask.is_err()); // Buffer size does not match dimensions
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMask {
    w: u32,
    h: u32,
    buffer: Vec<u8>,
}

impl ClassMask {
    /// Initializes a background-only mask
    ///
    /// # Arguments
    ///
    /// * `width` - Mask width
    /// * `height` - Mask height
    pub fn new(width: u32, height: u32) -> ClassMask {
        ClassMask {
            w: width,
            h: height,
            buffer: vec![0u8; width as usize * height as usize * 3],
        }
    }

    /// Initializes a mask from a raw RGB buffer
    ///
    /// # Arguments
    ///
    /// * `width` - Mask width
    /// * `height` - Mask height
    /// * `buffer` - Row-major RGB subpixels
    pub fn from_raw(width: u32, height: u32, buffer: Vec<u8>) -> Result<ClassMask, SlideSegError> {
        if width as usize * height as usize * 3 == buffer.len() {
            Ok(ClassMask {
                w: width,
                h: height,
                buffer,
            })
        } else {
            Err(SlideSegError::BufferSizeError)
        }
    }
}

// >>> PROPERTY METHODS

impl ClassMask {
    /// Width of the mask
    pub fn width(&self) -> u32 {
        self.w
    }

    /// Height of the mask
    pub fn height(&self) -> u32 {
        self.h
    }

    /// Shape/dimensions of the mask
    pub fn shape(&self) -> (u32, u32, u32) {
        (self.h, self.w, 3)
    }

    /// Length of the raw mask
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if mask is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Color of the pixel at (x, y)
    pub fn get(&self, x: u32, y: u32) -> Option<MaskColor> {
        if x >= self.w || y >= self.h {
            return None;
        }

        let start = self.offset(x, y);
        Some([
            self.buffer[start],
            self.buffer[start + 1],
            self.buffer[start + 2],
        ])
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.w as usize + x as usize) * 3
    }
}

// <<< PROPERTY METHODS

// >>> CONVERSION METHODS

impl ClassMask {
    /// Returns the raw mask
    pub fn into_raw(self) -> Vec<u8> {
        self.buffer
    }

    /// Returns a reference to the raw mask
    pub fn as_raw(&self) -> &[u8] {
        &self.buffer
    }

    /// An iterator over pixel-level chunks of the raw buffer
    pub fn iter_pixels(&self) -> ChunksExact<'_, u8> {
        self.buffer.chunks_exact(3)
    }

    /// Convert into an image-rs RGB buffer
    pub fn into_rgb_image(self) -> Result<RgbImage, SlideSegError> {
        RgbImage::from_raw(self.w, self.h, self.buffer).ok_or(SlideSegError::BufferSizeError)
    }

    /// Initialize a mask from an image-rs RGB buffer
    pub fn from_rgb_image(image: RgbImage) -> ClassMask {
        let (w, h) = image.dimensions();
        ClassMask {
            w,
            h,
            buffer: image.into_raw(),
        }
    }
}

// <<< CONVERSION METHODS

// >>> TRANSFORM METHODS

impl ClassMask {
    /// Paint pixels `[x0, x1)` of row `y` with a class color
    ///
    /// Spans are clipped to the mask, so callers may pass coordinates that
    /// fall partially or entirely outside of it.
    pub fn fill_span(&mut self, y: u32, x0: u32, x1: u32, color: MaskColor) {
        if y >= self.h {
            return;
        }

        let x1 = x1.min(self.w);
        if x0 >= x1 {
            return;
        }

        let start = self.offset(x0, y);
        let end = self.offset(x1, y);

        for pixel in self.buffer[start..end].chunks_exact_mut(3) {
            pixel.copy_from_slice(&color);
        }
    }

    /// Clip a half-open `[x0, x1) x [y0, y1)` rectangle to the mask bounds
    pub fn clip(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> (u32, u32, u32, u32) {
        let x1 = x1.min(self.w);
        let y1 = y1.min(self.h);
        (x0.min(x1), y0.min(y1), x1, y1)
    }

    /// Copy a half-open `[x0, x1) x [y0, y1)` region, clipped to the mask
    ///
    /// # Examples
    ///
    /// ```
    /// use slideseg_core::im::ClassMask;
    ///
    /// let mask = ClassMask::new(10, 10);
    /// let region = mask.region(8, 2, 14, 4);
    ///
    /// assert_eq!(region.width(), 2);
    /// assert_eq!(region.height(), 2);
    /// ```
    pub fn region(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> ClassMask {
        let (x0, y0, x1, y1) = self.clip(x0, y0, x1, y1);
        let w = x1 - x0;
        let h = y1 - y0;

        let mut buffer = Vec::with_capacity(w as usize * h as usize * 3);

        for row in y0..y1 {
            let start = self.offset(x0, row);
            let end = self.offset(x1, row);
            buffer.extend_from_slice(&self.buffer[start..end]);
        }

        ClassMask { w, h, buffer }
    }

    /// Distinct colors found in a half-open region, clipped to the mask
    pub fn colors(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> BTreeSet<MaskColor> {
        let (x0, y0, x1, y1) = self.clip(x0, y0, x1, y1);
        let mut colors = BTreeSet::new();
        let mut last: Option<MaskColor> = None;

        for row in y0..y1 {
            let start = self.offset(x0, row);
            let end = self.offset(x1, row);

            for pixel in self.buffer[start..end].chunks_exact(3) {
                let color = [pixel[0], pixel[1], pixel[2]];
                if last != Some(color) {
                    colors.insert(color);
                    last = Some(color);
                }
            }
        }

        colors
    }

    /// Distinct colors found anywhere in the mask
    pub fn unique_colors(&self) -> BTreeSet<MaskColor> {
        self.colors(0, 0, self.w, self.h)
    }

    /// Check if any pixel in the mask differs from the background
    pub fn is_annotated(&self) -> bool {
        self.iter_pixels().any(|pixel| pixel != BACKGROUND.as_slice())
    }
}

// <<< TRANSFORM METHODS

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_mask_new_background() {
        let mask = ClassMask::new(3, 2);
        assert_eq!(mask.shape(), (2, 3, 3));
        assert_eq!(mask.len(), 18);
        assert!(!mask.is_annotated());
    }

    #[test]
    fn test_mask_from_raw_error() {
        assert!(ClassMask::from_raw(2, 2, vec![0u8; 11]).is_err());
    }

    #[test]
    fn test_fill_span_clips() {
        let mut mask = ClassMask::new(4, 2);
        mask.fill_span(1, 2, 10, [0, 0, 9]);
        mask.fill_span(5, 0, 4, [0, 0, 1]);

        assert_eq!(mask.get(1, 1), Some(BACKGROUND));
        assert_eq!(mask.get(2, 1), Some([0, 0, 9]));
        assert_eq!(mask.get(3, 1), Some([0, 0, 9]));
        assert_eq!(mask.get(4, 1), None);
        assert_eq!(mask.unique_colors().len(), 2);
    }

    #[test]
    fn test_iter_pixels_row_major() {
        let mut mask = ClassMask::new(3, 2);
        mask.fill_span(1, 0, 1, [7, 8, 9]);

        let pixels: Vec<&[u8]> = mask.iter_pixels().collect();
        assert_eq!(pixels.len(), 6);
        assert_eq!(pixels[3], &[7, 8, 9]);
        assert!(pixels.iter().filter(|p| **p == BACKGROUND.as_slice()).count() == 5);
    }

    #[test]
    fn test_region_copy() {
        let mut mask = ClassMask::new(4, 4);
        mask.fill_span(2, 1, 3, [1, 2, 3]);

        let region = mask.region(1, 2, 3, 3);
        assert_eq!(region.width(), 2);
        assert_eq!(region.height(), 1);
        assert_eq!(region.as_raw(), &[1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn test_region_outside_is_empty() {
        let mask = ClassMask::new(4, 4);
        let region = mask.region(6, 6, 9, 9);
        assert!(region.is_empty());
        assert!(mask.colors(6, 6, 9, 9).is_empty());
    }

    #[test]
    fn test_colors_region() {
        let mut mask = ClassMask::new(6, 6);
        mask.fill_span(0, 0, 2, [0, 0, 7]);
        mask.fill_span(5, 4, 6, [0, 0, 3]);

        let colors = mask.colors(0, 0, 3, 3);
        assert!(colors.contains(&BACKGROUND));
        assert!(colors.contains(&[0, 0, 7]));
        assert!(!colors.contains(&[0, 0, 3]));
    }

    #[test]
    fn test_rgb_image_conversion() {
        let mut mask = ClassMask::new(2, 2);
        mask.fill_span(0, 0, 1, [9, 8, 7]);

        let image = mask.clone().into_rgb_image().unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [9, 8, 7]);
        assert_eq!(ClassMask::from_rgb_image(image), mask);
    }
}
