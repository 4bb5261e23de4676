// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::collections::BTreeMap;

use kdam::TqdmParallelIterator;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constant::{BACKGROUND, NONE_KEY};
use crate::error::SlideSegError;
use crate::im::{ClassMask, OutputFormat};
use crate::tile::raster::ClassLegend;
use crate::ut::track::{progress_bar, progress_log, thousands_format};

/// Which scanned windows become chips
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SavePolicy {
    /// Only windows holding at least one annotated pixel
    Annotated,
    /// Every window
    All,
    /// Every annotated window, plus blank windows while the ratio of
    /// annotated to blank selections (both starting at one) exceeds `ratio`
    Balanced { ratio: f64 },
}

impl SavePolicy {
    /// Decide whether a window is kept given the selections made so far
    ///
    /// # Arguments
    ///
    /// * `annotated` - Whether the window holds an annotated pixel
    /// * `annotated_count` - Annotated windows selected so far
    /// * `blank_count` - Blank windows selected so far
    ///
    /// # Examples
    ///
    /// ```
    /// use slideseg_core::tile::SavePolicy;
    ///
    /// let policy = SavePolicy::Balanced { ratio: 1.0 };
    ///
    /// assert!(policy.keep(true, 0, 0));
    /// assert!(policy.keep(false, 1, 0));
    /// assert!(!policy.keep(false, 0, 0));
    /// ```
    pub fn keep(&self, annotated: bool, annotated_count: usize, blank_count: usize) -> bool {
        match self {
            SavePolicy::Annotated => annotated,
            SavePolicy::All => true,
            SavePolicy::Balanced { ratio } => {
                annotated || (annotated_count as f64 + 1.0) / (blank_count as f64 + 1.0) > *ratio
            }
        }
    }
}

/// A tile position at one pyramid level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileWindow {
    pub level: usize,
    pub col: u32,
    pub row: u32,
    /// Level 0 width divided by the level width
    pub scale_x: f64,
    /// Level 0 height divided by the level height
    pub scale_y: f64,
}

impl TileWindow {
    /// Level 0 origin `(x, y)` of the window
    pub fn origin(&self) -> (u32, u32) {
        (
            (self.col as f64 * self.scale_x).floor() as u32,
            (self.row as f64 * self.scale_y).floor() as u32,
        )
    }

    /// Half-open level 0 mask bounds `(x0, y0, x1, y1)` covered by the window
    ///
    /// # Examples
    ///
    /// ```
    /// use slideseg_core::tile::TileWindow;
    ///
    /// let window = TileWindow { level: 1, col: 10, row: 20, scale_x: 2.0, scale_y: 1.5 };
    ///
    /// assert_eq!(window.mask_bounds(8), (20, 30, 36, 42));
    /// ```
    pub fn mask_bounds(&self, tile_size: u32) -> (u32, u32, u32, u32) {
        let (x0, y0) = self.origin();
        let x1 = ((self.col as f64 + tile_size as f64) * self.scale_x).floor() as u32;
        let y1 = ((self.row as f64 + tile_size as f64) * self.scale_y).floor() as u32;

        (x0, y0, x1, y1)
    }

    /// Chip file name `<slide>_<level>_<row>_<col>.<ext>`
    pub fn chip_name(&self, slide: &str, format: OutputFormat) -> String {
        format!(
            "{}_{}_{}_{}.{}",
            slide,
            self.level,
            self.row,
            self.col,
            format.suffix()
        )
    }
}

/// A selected chip and the classes it contains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChipEntry {
    pub name: String,
    /// Sorted class names, or `NONE` for blank chips
    pub keys: Vec<String>,
    #[serde(flatten)]
    pub window: TileWindow,
}

/// Selected chips in scan order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChipRegistry {
    entries: Vec<ChipEntry>,
    lookup: BTreeMap<String, usize>,
}

impl ChipRegistry {
    pub fn new() -> ChipRegistry {
        ChipRegistry::default()
    }

    /// Register a chip, replacing any previous entry with the same name
    pub fn insert(&mut self, entry: ChipEntry) {
        match self.lookup.get(&entry.name) {
            Some(&i) => self.entries[i] = entry,
            None => {
                self.lookup.insert(entry.name.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ChipEntry> {
        self.lookup.get(name).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChipEntry> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[ChipEntry] {
        &self.entries
    }
}

/// Class name to the chips containing it, in scan order
pub type ImageKeyIndex = BTreeMap<String, Vec<String>>;

/// Tiling parameters for a scan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanOptions {
    pub tile_size: u32,
    pub overlap: u32,
    pub policy: SavePolicy,
    pub format: OutputFormat,
    pub verbose: bool,
}

impl ScanOptions {
    /// Step between consecutive windows
    pub fn stride(&self) -> Result<u32, SlideSegError> {
        if self.tile_size == 0 || self.overlap >= self.tile_size {
            return Err(SlideSegError::ConfigError(format!(
                "Overlap ({}) must be smaller than the tile size ({}).",
                self.overlap, self.tile_size
            )));
        }

        Ok(self.tile_size - self.overlap)
    }
}

/// Chips selected by a scan and how they were counted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResult {
    pub registry: ChipRegistry,
    pub index: ImageKeyIndex,
    /// Windows evaluated across all levels
    pub windows: usize,
    /// Selected chips holding at least one class
    pub annotated: usize,
    /// Selected chips without any class
    pub blank: usize,
}

struct Evaluation {
    window: TileWindow,
    annotated: bool,
    keys: Vec<String>,
}

/// Enumerate tile windows over every pyramid level and select chips
///
/// Windows step by `tile_size - overlap` from the origin of each level and
/// are mapped back onto the level 0 mask to find the classes they cover.
/// Evaluation runs in parallel and is merged in (level, row, col) order
/// before the save policy is applied, so names and counters are
/// reproducible. No slide pixels are read.
///
/// # Arguments
///
/// * `dimensions` - (width, height) of every level, level 0 first
/// * `mask` - Level 0 class mask
/// * `legend` - Classes painted into the mask
/// * `slide` - Slide name used as the chip name prefix
/// * `options` - Tiling parameters
pub fn scan_pyramid(
    dimensions: &[(u32, u32)],
    mask: &ClassMask,
    legend: &ClassLegend,
    slide: &str,
    options: &ScanOptions,
) -> Result<ScanResult, SlideSegError> {
    let stride = options.stride()?;

    let Some(&(width_0, height_0)) = dimensions.first() else {
        return Err(SlideSegError::ConfigError(
            "A slide needs at least one level.".to_string(),
        ));
    };

    if (width_0, height_0) != (mask.width(), mask.height()) {
        return Err(SlideSegError::ConfigError(format!(
            "Mask is {}x{} but level 0 is {}x{}.",
            mask.width(),
            mask.height(),
            width_0,
            height_0
        )));
    }

    let mut windows = Vec::new();

    for (level, &(width, height)) in dimensions.iter().enumerate() {
        if width == 0 || height == 0 {
            return Err(SlideSegError::ConfigError(format!(
                "Level {} has an empty dimension.",
                level
            )));
        }

        let scale_x = width_0 as f64 / width as f64;
        let scale_y = height_0 as f64 / height as f64;

        for row in (0..height).step_by(stride as usize) {
            for col in (0..width).step_by(stride as usize) {
                windows.push(TileWindow {
                    level,
                    col,
                    row,
                    scale_x,
                    scale_y,
                });
            }
        }
    }

    progress_log(
        &format!(
            "Scanning {} windows across {} levels.",
            thousands_format(windows.len()),
            dimensions.len()
        ),
        options.verbose,
    );

    let pb = progress_bar(windows.len(), "Scanning windows", options.verbose);

    let mut evaluations: Vec<Evaluation> = windows
        .into_par_iter()
        .tqdm_with_bar(pb)
        .map(|window| evaluate_window(window, mask, legend, options.tile_size))
        .collect();

    evaluations.sort_by_key(|e| (e.window.level, e.window.row, e.window.col));

    let mut result = ScanResult {
        windows: evaluations.len(),
        ..ScanResult::default()
    };

    for evaluation in evaluations {
        let annotated = evaluation.annotated;

        if !options
            .policy
            .keep(annotated, result.annotated, result.blank)
        {
            continue;
        }

        if annotated {
            result.annotated += 1;
        } else {
            result.blank += 1;
        }

        let name = evaluation.window.chip_name(slide, options.format);

        for key in &evaluation.keys {
            result
                .index
                .entry(key.clone())
                .or_default()
                .push(name.clone());
        }

        result.registry.insert(ChipEntry {
            name,
            keys: evaluation.keys,
            window: evaluation.window,
        });
    }

    progress_log(
        &format!(
            "Selected {} chips ({} annotated, {} blank).",
            thousands_format(result.registry.len()),
            thousands_format(result.annotated),
            thousands_format(result.blank)
        ),
        options.verbose,
    );

    Ok(result)
}

fn evaluate_window(
    window: TileWindow,
    mask: &ClassMask,
    legend: &ClassLegend,
    tile_size: u32,
) -> Evaluation {
    let (x0, y0, x1, y1) = window.mask_bounds(tile_size);
    let colors = mask.colors(x0, y0, x1, y1);
    let annotated = colors.iter().any(|color| *color != BACKGROUND);

    // Legend is keyed by name so keys come out sorted
    let mut keys: Vec<String> = legend
        .iter()
        .filter(|(_, color)| **color != BACKGROUND && colors.contains(*color))
        .map(|(name, _)| name.clone())
        .collect();

    if keys.is_empty() {
        keys.push(NONE_KEY.to_string());
    }

    Evaluation {
        window,
        annotated,
        keys,
    }
}
