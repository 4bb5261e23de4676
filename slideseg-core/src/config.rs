// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constant::{
    DEFAULT_FORMAT, DEFAULT_LEVELS, DEFAULT_OVERLAP, DEFAULT_QUALITY, DEFAULT_TILE_SIZE,
};
use crate::error::SlideSegError;
use crate::im::OutputFormat;
use crate::io::{parse_bool, read_parameters};
use crate::tile::{ChipOptions, SavePolicy, ScanOptions};
use crate::ut::path::file_stem;

/// Settings for generating chips and masks from one slide
///
/// # Examples
///
/// ```
/// use slideseg_core::config::SlideSegConfig;
/// use slideseg_core::tile::SavePolicy;
///
/// let config = SlideSegConfig::new("data/slide.tif", "data/annotations").unwrap();
///
/// assert_eq!(config.output_dir.to_str(), Some("data/slide_output"));
/// assert_eq!(config.key_path.to_str(), Some("data/slide_output/slide_keys.txt"));
/// assert_eq!(config.save_policy(), SavePolicy::Annotated);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideSegConfig {
    pub slide_path: PathBuf,
    pub annotation_dir: PathBuf,
    pub output_dir: PathBuf,
    pub key_path: PathBuf,
    pub format: OutputFormat,
    /// JPEG quality for chips
    pub quality: u8,
    pub tile_size: u32,
    pub overlap: u32,
    /// Resolution levels synthesized for flat slide images
    pub levels: usize,
    pub save_all: bool,
    /// Annotated to blank ratio, `None` disables blank balancing
    pub save_ratio: Option<f64>,
    pub tags: bool,
    pub verbose: bool,
}

impl SlideSegConfig {
    /// Default settings for a slide and its annotation directory
    ///
    /// Output goes to `<slide_dir>/<stem>_output` and the key file to
    /// `<output_dir>/<stem>_keys.txt`.
    pub fn new<P, Q>(slide_path: P, annotation_dir: Q) -> Result<SlideSegConfig, SlideSegError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let slide_path = slide_path.as_ref().to_path_buf();
        let stem = file_stem(&slide_path)?;

        let output_dir = slide_path
            .parent()
            .unwrap_or(Path::new(""))
            .join(format!("{}_output", stem));

        let key_path = output_dir.join(format!("{}_keys.txt", stem));

        Ok(SlideSegConfig {
            slide_path,
            annotation_dir: annotation_dir.as_ref().to_path_buf(),
            output_dir,
            key_path,
            format: OutputFormat::from_str(DEFAULT_FORMAT)?,
            quality: DEFAULT_QUALITY,
            tile_size: DEFAULT_TILE_SIZE,
            overlap: DEFAULT_OVERLAP,
            levels: DEFAULT_LEVELS,
            save_all: false,
            save_ratio: None,
            tags: true,
            verbose: false,
        })
    }

    /// Build settings from a parameter file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to an `option: value  # comment` parameter file
    pub fn from_parameter_file<P: AsRef<Path>>(path: P) -> Result<SlideSegConfig, SlideSegError> {
        Self::from_parameters(&read_parameters(path)?)
    }

    /// Build settings from parsed parameter file options
    ///
    /// `slide_path` and `xml_path` are required. Empty values keep their
    /// defaults and unknown options are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use slideseg_core::config::SlideSegConfig;
    /// use slideseg_core::io::parse_parameters;
    ///
    /// let params = parse_parameters("\
    /// slide_path: slides/a.tif
    /// xml_path: annotations/
    /// size: 256
    /// save_all: yes
    /// save_ratio: inf
    /// ");
    ///
    /// let config = SlideSegConfig::from_parameters(&params).unwrap();
    ///
    /// assert_eq!(config.tile_size, 256);
    /// assert!(config.save_all);
    /// assert_eq!(config.save_ratio, None);
    /// ```
    pub fn from_parameters(
        params: &BTreeMap<String, String>,
    ) -> Result<SlideSegConfig, SlideSegError> {
        let value = |option: &str| {
            params
                .get(option)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let slide_path = value("slide_path").ok_or_else(|| {
            SlideSegError::ConfigError("Missing slide_path parameter.".to_string())
        })?;

        let annotation_dir = value("xml_path").ok_or_else(|| {
            SlideSegError::ConfigError("Missing xml_path parameter.".to_string())
        })?;

        let mut config = SlideSegConfig::new(slide_path, annotation_dir)?;

        if let Some(output_dir) = value("output_dir") {
            config.output_dir = PathBuf::from(output_dir);
            config.key_path = config
                .output_dir
                .join(format!("{}_keys.txt", file_stem(&config.slide_path)?));
        }

        if let Some(key) = value("key") {
            config.key_path = PathBuf::from(key);
        }

        if let Some(format) = value("format") {
            config.format = format.parse()?;
        }

        if let Some(quality) = value("quality") {
            config.quality = parse_number(quality, "quality")?;
        }

        if let Some(size) = value("size") {
            config.tile_size = parse_number(size, "size")?;
        }

        if let Some(overlap) = value("overlap") {
            config.overlap = parse_number(overlap, "overlap")?;
        }

        if let Some(levels) = value("levels") {
            config.levels = parse_number(levels, "levels")?;
        }

        if let Some(save_all) = value("save_all") {
            config.save_all = parse_bool(save_all)?;
        }

        if let Some(save_ratio) = value("save_ratio") {
            config.save_ratio = parse_ratio(save_ratio)?;
        }

        if let Some(tags) = value("tags") {
            config.tags = parse_bool(tags)?;
        }

        if let Some(verbose) = value("verbose") {
            config.verbose = parse_bool(verbose)?;
        }

        config.validate()?;

        Ok(config)
    }

    /// Check settings before any work starts
    pub fn validate(&self) -> Result<(), SlideSegError> {
        if self.tile_size == 0 {
            return Err(SlideSegError::ConfigError(
                "Tile size must be positive.".to_string(),
            ));
        }

        if self.overlap >= self.tile_size {
            return Err(SlideSegError::ConfigError(format!(
                "Overlap ({}) must be smaller than the tile size ({}).",
                self.overlap, self.tile_size
            )));
        }

        if !(1..=100).contains(&self.quality) {
            return Err(SlideSegError::ConfigError(format!(
                "Quality must be between 1 and 100, received {}.",
                self.quality
            )));
        }

        if self.levels == 0 {
            return Err(SlideSegError::ConfigError(
                "At least one pyramid level is required.".to_string(),
            ));
        }

        if let Some(ratio) = self.save_ratio {
            if !ratio.is_finite() || ratio < 0.0 {
                return Err(SlideSegError::ConfigError(format!(
                    "Save ratio must be a non-negative number, received {}.",
                    ratio
                )));
            }
        }

        Ok(())
    }

    /// Slide file name without extension
    pub fn slide_stem(&self) -> Result<String, SlideSegError> {
        file_stem(&self.slide_path)
    }

    /// Window step between consecutive tiles
    pub fn stride(&self) -> u32 {
        self.tile_size.saturating_sub(self.overlap)
    }

    /// Chip selection rule implied by `save_all` and `save_ratio`
    pub fn save_policy(&self) -> SavePolicy {
        match (self.save_all, self.save_ratio) {
            (true, _) => SavePolicy::All,
            (false, Some(ratio)) => SavePolicy::Balanced { ratio },
            (false, None) => SavePolicy::Annotated,
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            tile_size: self.tile_size,
            overlap: self.overlap,
            policy: self.save_policy(),
            format: self.format,
            verbose: self.verbose,
        }
    }

    pub fn chip_options(&self) -> ChipOptions {
        ChipOptions {
            tile_size: self.tile_size,
            format: self.format,
            quality: self.quality,
            tags: self.tags,
            verbose: self.verbose,
        }
    }
}

fn parse_number<T: FromStr>(value: &str, option: &str) -> Result<T, SlideSegError> {
    value.parse::<T>().map_err(|_| {
        SlideSegError::ConfigError(format!("Invalid {} value \"{}\".", option, value))
    })
}

/// Parse a save ratio where `inf` disables blank balancing
fn parse_ratio(value: &str) -> Result<Option<f64>, SlideSegError> {
    let ratio: f64 = parse_number(value, "save_ratio")?;

    if ratio.is_infinite() && ratio > 0.0 {
        Ok(None)
    } else {
        Ok(Some(ratio))
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::io::parse_parameters;

    fn params(text: &str) -> BTreeMap<String, String> {
        parse_parameters(text)
    }

    #[test]
    fn test_defaults() {
        let config = SlideSegConfig::new("slides/a.tif", "annotations").unwrap();

        assert_eq!(config.output_dir, PathBuf::from("slides/a_output"));
        assert_eq!(config.key_path, PathBuf::from("slides/a_output/a_keys.txt"));
        assert_eq!(config.format, OutputFormat::Png);
        assert_eq!(config.tile_size, 128);
        assert_eq!(config.overlap, 1);
        assert_eq!(config.stride(), 127);
        assert!(config.tags);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_parameters() {
        let config = SlideSegConfig::from_parameters(&params(
            "slide_path: slides/a.tif
xml_path: annotations/   # annotation directory
output_dir: out
format: jpg
quality: 100
size: 64
overlap: 0
save_all: False
save_ratio: 2.5
tags: n
verbose: 1
",
        ))
        .unwrap();

        assert_eq!(config.annotation_dir, PathBuf::from("annotations/"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.key_path, PathBuf::from("out/a_keys.txt"));
        assert_eq!(config.format, OutputFormat::Jpeg);
        assert_eq!(config.quality, 100);
        assert_eq!(config.tile_size, 64);
        assert_eq!(config.overlap, 0);
        assert_eq!(config.save_policy(), SavePolicy::Balanced { ratio: 2.5 });
        assert!(!config.tags);
        assert!(config.verbose);
    }

    #[test]
    fn test_explicit_key_path() {
        let config = SlideSegConfig::from_parameters(&params(
            "slide_path: a.tif\nxml_path: ann\nkey: keys/all_keys.txt\noutput_dir: out\n",
        ))
        .unwrap();

        assert_eq!(config.key_path, PathBuf::from("keys/all_keys.txt"));
    }

    #[test]
    fn test_save_policy() {
        let mut config = SlideSegConfig::new("a.tif", "ann").unwrap();
        assert_eq!(config.save_policy(), SavePolicy::Annotated);

        config.save_ratio = Some(1.0);
        assert_eq!(config.save_policy(), SavePolicy::Balanced { ratio: 1.0 });

        config.save_all = true;
        assert_eq!(config.save_policy(), SavePolicy::All);
    }

    #[test]
    fn test_infinite_ratio_disables_balancing() {
        assert_eq!(parse_ratio("inf").unwrap(), None);
        assert_eq!(parse_ratio("0").unwrap(), Some(0.0));
        assert!(parse_ratio("lots").is_err());
    }

    #[test]
    fn test_missing_required_parameters() {
        assert!(matches!(
            SlideSegConfig::from_parameters(&params("xml_path: ann\n")),
            Err(SlideSegError::ConfigError(_))
        ));
        assert!(matches!(
            SlideSegConfig::from_parameters(&params("slide_path: a.tif\n")),
            Err(SlideSegError::ConfigError(_))
        ));
    }

    #[test]
    fn test_invalid_values() {
        for text in [
            "size: zero",
            "size: 4\noverlap: 4",
            "quality: 0",
            "quality: 101",
            "format: gif",
            "save_all: sometimes",
            "save_ratio: -1",
            "levels: 0",
        ] {
            let text = format!("slide_path: a.tif\nxml_path: ann\n{}\n", text);
            assert!(
                SlideSegConfig::from_parameters(&params(&text)).is_err(),
                "{} should be rejected",
                text
            );
        }
    }

    #[test]
    fn test_serde_round_trip() {
        let mut config = SlideSegConfig::new("a.tif", "ann").unwrap();
        config.format = OutputFormat::Tiff;
        config.save_ratio = Some(3.0);

        let json = serde_json::to_string(&config).unwrap();
        let decoded: SlideSegConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, config);
        assert!(json.contains("\"format\":\"tif\""));
    }
}
