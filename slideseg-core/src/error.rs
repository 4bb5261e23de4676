// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::fmt;

#[derive(Debug, Clone)]
pub enum SlideSegError {
    BufferSizeError,
    FormatError(String),
    ParseError(String),
    IoError(String),
    ConfigError(String),
    KeyError(String),
    ImageReadError(String),
    ImageWriteError(String),
    NoFileError(String),
    DirError(String),
    SlideError {
        slide: String,
        error: Box<SlideSegError>,
    },
    ChipError {
        chip: String,
        error: Box<SlideSegError>,
    },
}

impl SlideSegError {
    /// Attach the slide name to an error raised while processing it
    pub fn in_slide(self, slide: &str) -> SlideSegError {
        SlideSegError::SlideError {
            slide: slide.to_string(),
            error: Box::new(self),
        }
    }

    /// Attach the chip name to an error raised while materializing it
    pub fn in_chip(self, chip: &str) -> SlideSegError {
        SlideSegError::ChipError {
            chip: chip.to_string(),
            error: Box::new(self),
        }
    }
}

impl fmt::Display for SlideSegError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SlideSegError::BufferSizeError => {
                write!(
                    f,
                    "[slideseg::BufferSizeError] The buffer does not match provided size"
                )
            }
            SlideSegError::FormatError(message) => {
                write!(f, "[slideseg::FormatError] Malformed input. {}", message)
            }
            SlideSegError::ParseError(message) => {
                write!(
                    f,
                    "[slideseg::ParseError] Could not parse annotation geometry. {}",
                    message
                )
            }
            SlideSegError::IoError(message) => {
                write!(f, "[slideseg::IoError] {}", message)
            }
            SlideSegError::ConfigError(message) => {
                write!(f, "[slideseg::ConfigError] Invalid configuration. {}", message)
            }
            SlideSegError::KeyError(message) => {
                write!(
                    f,
                    "[slideseg::KeyError] Could not assign annotation color. {}",
                    message
                )
            }
            SlideSegError::ImageReadError(message) => {
                write!(f, "[slideseg::ImageReadError] Failed to read image. {}", message)
            }
            SlideSegError::ImageWriteError(message) => {
                write!(
                    f,
                    "[slideseg::ImageWriteError] Failed to write image. {}",
                    message
                )
            }
            SlideSegError::NoFileError(message) => {
                write!(
                    f,
                    "[slideseg::NoFileError] File could not be found. {}.",
                    message
                )
            }
            SlideSegError::DirError(message) => {
                write!(
                    f,
                    "[slideseg::DirError] Directory could not be read. {}.",
                    message
                )
            }
            SlideSegError::SlideError { slide, error } => {
                write!(f, "[slideseg::SlideError] {}: {}", slide, error)
            }
            SlideSegError::ChipError { chip, error } => {
                write!(f, "[slideseg::ChipError] {}: {}", chip, error)
            }
        }
    }
}

impl std::error::Error for SlideSegError {}
