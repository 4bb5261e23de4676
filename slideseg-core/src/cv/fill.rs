// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use crate::im::{ClassMask, MaskColor};

/// Fill the interior of a closed polygon with a class color
///
/// Uses an even-odd scanline rule sampled at pixel centers: pixel `(x, y)`
/// is painted when `(x + 0.5, y + 0.5)` lies inside the polygon. An axis
/// aligned rectangle with corners `(0, 0)` and `(w, h)` therefore paints
/// exactly `w * h` pixels, and two polygons sharing an edge never paint
/// the same pixel twice. Polygons with fewer than three vertices paint
/// nothing and vertices outside of the mask are clipped.
///
/// # Arguments
///
/// * `mask` - Mask to paint into
/// * `vertices` - Polygon vertices as (x, y) pairs, implicitly closed
/// * `color` - Class color code
///
/// # Examples
///
/// ```
/// use slideseg_core::cv::fill_polygon;
/// use slideseg_core::im::ClassMask;
///
/// let mut mask = ClassMask::new(8, 8);
/// fill_polygon(&mut mask, &[[2, 2], [6, 2], [6, 5], [2, 5]], [0, 0, 9]);
///
/// assert_eq!(mask.get(2, 2), Some([0, 0, 9]));
/// assert_eq!(mask.get(5, 4), Some([0, 0, 9]));
/// assert_eq!(mask.get(6, 4), Some([0, 0, 0]));
/// assert_eq!(mask.get(5, 5), Some([0, 0, 0]));
/// ```
pub fn fill_polygon(mask: &mut ClassMask, vertices: &[[i64; 2]], color: MaskColor) {
    let n = vertices.len();

    if n < 3 || mask.is_empty() {
        return;
    }

    let min_y = vertices.iter().map(|v| v[1]).min().unwrap_or(0).max(0);
    let max_y = vertices
        .iter()
        .map(|v| v[1])
        .max()
        .unwrap_or(0)
        .min(mask.height() as i64 - 1);

    let mut crossings: Vec<f64> = Vec::with_capacity(n);

    for y in min_y..=max_y {
        let center = y as f64 + 0.5;
        crossings.clear();

        for (i, a) in vertices.iter().enumerate() {
            let b = &vertices[(i + 1) % n];
            let (ay, by) = (a[1] as f64, b[1] as f64);

            if (ay > center) != (by > center) {
                let t = (center - ay) / (by - ay);
                crossings.push(a[0] as f64 + t * (b[0] - a[0]) as f64);
            }
        }

        crossings.sort_by(|a, b| a.total_cmp(b));

        for pair in crossings.chunks_exact(2) {
            let x0 = (pair[0] - 0.5).ceil().max(0.0) as u32;
            let x1 = (pair[1] - 0.5).ceil().max(0.0) as u32;

            mask.fill_span(y as u32, x0, x1, color);
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::constant::BACKGROUND;

    fn count(mask: &ClassMask, color: MaskColor) -> usize {
        mask.iter_pixels().filter(|p| **p == color[..]).count()
    }

    #[test]
    fn test_fill_rectangle_exact_area() {
        let mut mask = ClassMask::new(16, 16);
        fill_polygon(&mut mask, &[[0, 0], [10, 0], [10, 6], [0, 6]], [0, 0, 1]);

        assert_eq!(count(&mask, [0, 0, 1]), 60);
        assert_eq!(mask.get(9, 5), Some([0, 0, 1]));
        assert_eq!(mask.get(10, 5), Some(BACKGROUND));
        assert_eq!(mask.get(9, 6), Some(BACKGROUND));
    }

    #[test]
    fn test_fill_winding_order_independent() {
        let mut clockwise = ClassMask::new(12, 12);
        let mut counter = ClassMask::new(12, 12);

        fill_polygon(&mut clockwise, &[[1, 1], [9, 2], [5, 10]], [0, 0, 2]);
        fill_polygon(&mut counter, &[[5, 10], [9, 2], [1, 1]], [0, 0, 2]);

        assert_eq!(clockwise, counter);
        assert!(count(&clockwise, [0, 0, 2]) > 0);
    }

    #[test]
    fn test_fill_concave() {
        // A "U" shape: the notch between the arms stays background
        let vertices = [[0, 0], [9, 0], [9, 9], [6, 9], [6, 3], [3, 3], [3, 9], [0, 9]];
        let mut mask = ClassMask::new(10, 10);
        fill_polygon(&mut mask, &vertices, [0, 0, 3]);

        assert_eq!(mask.get(1, 7), Some([0, 0, 3]));
        assert_eq!(mask.get(7, 7), Some([0, 0, 3]));
        assert_eq!(mask.get(4, 7), Some(BACKGROUND));
        assert_eq!(mask.get(4, 1), Some([0, 0, 3]));
    }

    #[test]
    fn test_fill_self_intersecting_even_odd() {
        // A bow-tie polygon fills both lobes but not outside them
        let vertices = [[0, 0], [10, 10], [10, 0], [0, 10]];
        let mut mask = ClassMask::new(10, 10);
        fill_polygon(&mut mask, &vertices, [0, 0, 4]);

        assert_eq!(mask.get(1, 5), Some([0, 0, 4]));
        assert_eq!(mask.get(8, 5), Some([0, 0, 4]));
        assert_eq!(mask.get(5, 1), Some(BACKGROUND));
        assert_eq!(mask.get(5, 8), Some(BACKGROUND));
    }

    #[test]
    fn test_fill_clips_outside_vertices() {
        let mut mask = ClassMask::new(4, 4);
        fill_polygon(&mut mask, &[[-5, -5], [20, -5], [20, 20], [-5, 20]], [0, 0, 5]);
        assert_eq!(count(&mask, [0, 0, 5]), 16);

        let mut mask = ClassMask::new(4, 4);
        fill_polygon(&mut mask, &[[10, 10], [20, 10], [20, 20]], [0, 0, 5]);
        assert_eq!(count(&mask, [0, 0, 5]), 0);
    }

    #[test]
    fn test_fill_degenerate() {
        let mut mask = ClassMask::new(4, 4);
        fill_polygon(&mut mask, &[[0, 0], [3, 3]], [0, 0, 6]);
        fill_polygon(&mut mask, &[[0, 0], [3, 0], [3, 0]], [0, 0, 6]);
        assert!(!mask.is_annotated());
    }

    #[test]
    fn test_shared_edge_no_overlap() {
        let mut mask = ClassMask::new(10, 4);
        fill_polygon(&mut mask, &[[0, 0], [5, 0], [5, 4], [0, 4]], [0, 0, 7]);
        fill_polygon(&mut mask, &[[5, 0], [10, 0], [10, 4], [5, 4]], [0, 0, 8]);

        assert_eq!(count(&mask, [0, 0, 7]), 20);
        assert_eq!(count(&mask, [0, 0, 8]), 20);
    }
}
