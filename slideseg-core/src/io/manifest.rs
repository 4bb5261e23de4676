// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::constant::{MANIFEST_DIRECTORY, MANIFEST_LINE_WIDTH, MANIFEST_SUFFIX};
use crate::error::SlideSegError;
use crate::io::keys::format_key_line;
use crate::tile::{ChipEntry, ChipRegistry, ClassLegend, ImageKeyIndex};
use crate::ut::path::ensure_directory;

#[derive(Serialize)]
struct ManifestRecord<'a> {
    slide: &'a str,
    legend: &'a ClassLegend,
    chips: &'a [ChipEntry],
    index: &'a ImageKeyIndex,
}

/// Text manifest listing the slide legend and the chips holding each class
///
/// # Examples
///
/// ```
/// use slideseg_core::io::format_manifest;
/// use slideseg_core::tile::{ClassLegend, ImageKeyIndex};
///
/// let mut legend = ClassLegend::new();
/// legend.insert("TUMOR".to_string(), [0, 0, 255]);
///
/// let mut index = ImageKeyIndex::new();
/// index.insert("TUMOR".to_string(), vec!["s_0_0_0.png".to_string()]);
///
/// let text = format_manifest(&legend, &index);
/// let lines: Vec<&str> = text.lines().collect();
///
/// assert!(lines[0].starts_with("Key: TUMOR"));
/// assert!(lines[0].ends_with("Mask_Color: (0, 0, 255)"));
/// assert_eq!(lines[1..], ["", "Key: TUMOR", "   s_0_0_0.png"]);
/// ```
pub fn format_manifest(legend: &ClassLegend, index: &ImageKeyIndex) -> String {
    let mut text = String::new();

    for (name, color) in legend {
        text.push_str(&format_key_line(name, *color, MANIFEST_LINE_WIDTH));
        text.push('\n');
    }

    for (name, chips) in index {
        text.push_str(&format!("\nKey: {}\n", name));
        for chip in chips {
            text.push_str(&format!("   {}\n", chip));
        }
    }

    text
}

/// Write `<output_dir>/textfiles/<stem>_Details.txt` and its JSON sidecar
///
/// # Arguments
///
/// * `output_dir` - Slide output directory
/// * `stem` - Annotation file stem
/// * `legend` - Classes observed in the slide
/// * `registry` - Selected chips
/// * `index` - Class to chip index
pub fn write_manifest<P: AsRef<Path>>(
    output_dir: P,
    stem: &str,
    legend: &ClassLegend,
    registry: &ChipRegistry,
    index: &ImageKeyIndex,
) -> Result<(PathBuf, PathBuf), SlideSegError> {
    let directory = ensure_directory(output_dir.as_ref().join(MANIFEST_DIRECTORY))?;

    let text_path = directory.join(format!("{}_{}.txt", stem, MANIFEST_SUFFIX));
    let json_path = directory.join(format!("{}_{}.json", stem, MANIFEST_SUFFIX));

    std::fs::write(&text_path, format_manifest(legend, index))
        .map_err(|err| SlideSegError::IoError(format!("{}: {}", text_path.display(), err)))?;

    let record = ManifestRecord {
        slide: stem,
        legend,
        chips: registry.as_slice(),
        index,
    };

    let file = File::create(&json_path)
        .map_err(|err| SlideSegError::IoError(format!("{}: {}", json_path.display(), err)))?;

    serde_json::to_writer_pretty(BufWriter::new(file), &record)
        .map_err(|err| SlideSegError::IoError(format!("{}: {}", json_path.display(), err)))?;

    Ok((text_path, json_path))
}
