// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::fmt;
use std::str::FromStr;

use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::constant::SUPPORTED_OUTPUT_FORMATS;
use crate::error::SlideSegError;

/// Encodings accepted for written chips and masks
///
/// # Examples
///
/// ```
/// use slideseg_core::im::OutputFormat;
///
/// let format: OutputFormat = "JPEG".parse().unwrap();
///
/// assert_eq!(format, OutputFormat::Jpeg);
/// assert_eq!(format.suffix(), "jpg");
/// assert!("gif".parse::<OutputFormat>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OutputFormat {
    Png,
    Jpeg,
    Tiff,
    Bmp,
}

impl OutputFormat {
    /// File extension used for written files
    pub fn suffix(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Tiff => "tif",
            OutputFormat::Bmp => "bmp",
        }
    }

    /// Whether class keys can be embedded as image metadata
    pub fn supports_tags(&self) -> bool {
        matches!(self, OutputFormat::Png | OutputFormat::Jpeg)
    }

    /// The matching image-rs format
    pub fn image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Tiff => ImageFormat::Tiff,
            OutputFormat::Bmp => ImageFormat::Bmp,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = SlideSegError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().trim_start_matches('.').to_lowercase();

        match value.as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "tif" | "tiff" => Ok(OutputFormat::Tiff),
            "bmp" => Ok(OutputFormat::Bmp),
            _ => Err(SlideSegError::ConfigError(format!(
                "Invalid output format {}. Must be one of: {:?}.",
                value, SUPPORTED_OUTPUT_FORMATS
            ))),
        }
    }
}

impl TryFrom<String> for OutputFormat {
    type Error = SlideSegError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OutputFormat> for String {
    fn from(format: OutputFormat) -> String {
        format.suffix().to_string()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("png".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!(".jpeg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("TIFF".parse::<OutputFormat>().unwrap(), OutputFormat::Tiff);
        assert_eq!("bmp".parse::<OutputFormat>().unwrap(), OutputFormat::Bmp);
    }

    #[test]
    fn test_parse_invalid() {
        let error = "svs".parse::<OutputFormat>().unwrap_err();
        assert!(matches!(error, SlideSegError::ConfigError(_)));
    }

    #[test]
    fn test_suffix_and_tags() {
        assert_eq!(OutputFormat::Tiff.suffix(), "tif");
        assert!(OutputFormat::Png.supports_tags());
        assert!(OutputFormat::Jpeg.supports_tags());
        assert!(!OutputFormat::Bmp.supports_tags());
    }

    #[test]
    fn test_serde_as_suffix() {
        let json = serde_json::to_string(&OutputFormat::Jpeg).unwrap();
        assert_eq!(json, "\"jpg\"");

        let format: OutputFormat = serde_json::from_str("\"jpeg\"").unwrap();
        assert_eq!(format, OutputFormat::Jpeg);
        assert!(serde_json::from_str::<OutputFormat>("\"gif\"").is_err());
    }
}
