// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::collections::BTreeMap;
use std::path::Path;

use crate::cv::fill_polygon;
use crate::error::SlideSegError;
use crate::im::{ClassMask, MaskColor};
use crate::io::keys::normalize_key;
use crate::io::{AnnotationKeyStore, AnnotationRegion, read_annotations};

/// Classes observed in one slide and their mask colors
pub type ClassLegend = BTreeMap<String, MaskColor>;

/// Paint annotation regions into a level 0 class mask
///
/// Regions are painted in order so later regions overwrite earlier ones
/// where they overlap. Unknown classes are added to the key store, which
/// persists them when it is attached to a file.
///
/// # Arguments
///
/// * `dimensions` - Level 0 (width, height)
/// * `store` - Key store resolving class names to colors
/// * `regions` - Annotation regions in file order
///
/// # Examples
///
/// ```
/// use slideseg_core::io::{AnnotationKeyStore, AnnotationRegion};
/// use slideseg_core::tile::rasterize;
///
/// let mut store = AnnotationKeyStore::new();
/// let regions = vec![AnnotationRegion {
///     name: "TUMOR".to_string(),
///     declared_color: None,
///     vertices: vec![[0, 0], [4, 0], [4, 4], [0, 4]],
/// }];
///
/// let (mask, legend) = rasterize((8, 8), &mut store, &regions).unwrap();
///
/// assert_eq!(mask.get(3, 3), Some(legend["TUMOR"]));
/// assert_eq!(mask.get(4, 4), Some([0, 0, 0]));
/// ```
pub fn rasterize(
    dimensions: (u32, u32),
    store: &mut AnnotationKeyStore,
    regions: &[AnnotationRegion],
) -> Result<(ClassMask, ClassLegend), SlideSegError> {
    let (width, height) = dimensions;

    let mut mask = ClassMask::new(width, height);
    let mut legend = ClassLegend::new();

    for region in regions {
        let color = store.resolve(&region.name)?;
        legend.entry(normalize_key(&region.name)).or_insert(color);

        fill_polygon(&mut mask, &region.vertices, color);
    }

    Ok((mask, legend))
}

/// Read an annotation file and paint it into a level 0 class mask
///
/// # Arguments
///
/// * `dimensions` - Level 0 (width, height)
/// * `store` - Key store resolving class names to colors
/// * `path` - Annotation file
pub fn rasterize_file<P: AsRef<Path>>(
    dimensions: (u32, u32),
    store: &mut AnnotationKeyStore,
    path: P,
) -> Result<(ClassMask, ClassLegend), SlideSegError> {
    let regions = read_annotations(path)?;
    rasterize(dimensions, store, &regions)
}
