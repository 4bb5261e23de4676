// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::Path;

use crate::error::SlideSegError;
use crate::im::MaskColor;
use crate::io::keys::{normalize_key, parse_hex_color};

/// A closed polygon tagged with an annotation class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRegion {
    /// Upper-case, trimmed class name
    pub name: String,
    /// Color declared by the annotation file, if it parsed
    pub declared_color: Option<MaskColor>,
    /// Level 0 vertices as (x, y)
    pub vertices: Vec<[i64; 2]>,
}

/// Read every contour region of an annotation file
///
/// # Arguments
///
/// * `path` - Path to a `.roi` or `.xml` annotation file
///
/// ```no_run
/// use slideseg_core::io::read_annotations;
/// let regions = read_annotations("annotations/slide.roi").unwrap();
/// ```
pub fn read_annotations<P: AsRef<Path>>(path: P) -> Result<Vec<AnnotationRegion>, SlideSegError> {
    let path = path.as_ref();

    let text = std::fs::read_to_string(path)
        .map_err(|err| SlideSegError::IoError(format!("{}: {}", path.display(), err)))?;

    parse_annotations(&text).map_err(|err| match err {
        SlideSegError::FormatError(message) => {
            SlideSegError::FormatError(format!("{}: {}", path.display(), message))
        }
        SlideSegError::ParseError(message) => {
            SlideSegError::ParseError(format!("{}: {}", path.display(), message))
        }
        other => other,
    })
}

/// Parse annotation markup into regions, in document order
///
/// Each `<contour name="..." color="#RRGGBB">` element becomes one region
/// and owns the `<point>x, y</point>` descendants that have no closer
/// enclosing contour.
///
/// # Examples
///
/// ```
/// use slideseg_core::io::parse_annotations;
///
/// let regions = parse_annotations(r##"
///     <annotations>
///         <contour name="tumor" color="#0000FF">
///             <point>0, 0</point><point>(10.6, 0)</point><point>10, 10</point>
///         </contour>
///     </annotations>
/// "##).unwrap();
///
/// assert_eq!(regions[0].name, "TUMOR");
/// assert_eq!(regions[0].declared_color, Some([0, 0, 255]));
/// assert_eq!(regions[0].vertices, vec![[0, 0], [11, 0], [10, 10]]);
/// ```
pub fn parse_annotations(text: &str) -> Result<Vec<AnnotationRegion>, SlideSegError> {
    let document = roxmltree::Document::parse(text)
        .map_err(|err| SlideSegError::FormatError(format!("Invalid annotation markup. {}", err)))?;

    let mut regions = Vec::new();

    for contour in document
        .descendants()
        .filter(|node| node.has_tag_name("contour"))
    {
        let name = contour
            .attribute("name")
            .map(normalize_key)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                let position = document.text_pos_at(contour.range().start);
                SlideSegError::FormatError(format!(
                    "Contour without a class name at line {}.",
                    position.row
                ))
            })?;

        let declared_color = contour
            .attribute("color")
            .and_then(|color| parse_hex_color(color).ok());

        let vertices = contour
            .descendants()
            .filter(|node| node.has_tag_name("point"))
            .filter(|point| {
                point
                    .ancestors()
                    .skip(1)
                    .find(|node| node.has_tag_name("contour"))
                    == Some(contour)
            })
            .map(|point| parse_point(point.text().unwrap_or("")))
            .collect::<Result<Vec<[i64; 2]>, SlideSegError>>()?;

        regions.push(AnnotationRegion {
            name,
            declared_color,
            vertices,
        });
    }

    Ok(regions)
}

/// Parse an `x, y` vertex, optionally wrapped in parentheses
///
/// Real-valued coordinates are rounded half to even.
pub fn parse_point(text: &str) -> Result<[i64; 2], SlideSegError> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(trimmed);

    let coordinates: Vec<&str> = inner.split(',').map(str::trim).collect();

    if coordinates.len() != 2 {
        return Err(SlideSegError::ParseError(format!(
            "Expected an x, y pair but found \"{}\".",
            trimmed
        )));
    }

    let mut point = [0i64; 2];
    for (value, coordinate) in point.iter_mut().zip(&coordinates) {
        let parsed = coordinate
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.abs() < i64::MAX as f64)
            .ok_or_else(|| {
                SlideSegError::ParseError(format!("Invalid coordinate \"{}\".", coordinate))
            })?;

        *value = parsed.round_ties_even() as i64;
    }

    Ok(point)
}
