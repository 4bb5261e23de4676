// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, RgbImage};

use crate::error::SlideSegError;
use crate::im::OutputFormat;

// EXIF tag for the image description field
const EXIF_IMAGE_DESCRIPTION: u16 = 0x010e;

// EXIF ASCII field type
const EXIF_ASCII: u16 = 2;

/// Write an RGB image in the requested format with optional class tags
///
/// Tags are joined by spaces and stored as a PNG `tEXt` `Description`
/// chunk or a JPEG EXIF `ImageDescription`. Formats without a supported
/// metadata field are written untagged.
///
/// # Arguments
///
/// * `image` - Image to write
/// * `path` - Output path
/// * `format` - Output encoding
/// * `quality` - JPEG quality (1-100), ignored by other formats
/// * `tags` - Class keys to embed
///
/// # Examples
///
/// ```no_run
/// use image::RgbImage;
/// use slideseg_core::im::OutputFormat;
/// use slideseg_core::io::write_rgb;
///
/// let chip = RgbImage::new(128, 128);
/// let tags = vec!["TUMOR".to_string()];
/// write_rgb(&chip, "chip.png", OutputFormat::Png, 95, Some(&tags)).unwrap();
/// ```
pub fn write_rgb<P: AsRef<Path>>(
    image: &RgbImage,
    path: P,
    format: OutputFormat,
    quality: u8,
    tags: Option<&[String]>,
) -> Result<(), SlideSegError> {
    let path = path.as_ref();
    let description = tags.map(|tags| tags.join(" "));

    match format {
        OutputFormat::Png => write_png(image, path, description.as_deref()),
        OutputFormat::Jpeg => write_jpeg(image, path, quality, description.as_deref()),
        OutputFormat::Tiff | OutputFormat::Bmp => image
            .save_with_format(path, format.image_format())
            .map_err(|err| write_error(path, err)),
    }
}

fn write_error<E: std::fmt::Display>(path: &Path, err: E) -> SlideSegError {
    SlideSegError::ImageWriteError(format!("{}: {}", path.display(), err))
}

fn write_png(image: &RgbImage, path: &Path, description: Option<&str>) -> Result<(), SlideSegError> {
    let file = File::create(path).map_err(|err| write_error(path, err))?;

    let mut encoder = png::Encoder::new(BufWriter::new(file), image.width(), image.height());
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);

    if let Some(description) = description {
        encoder
            .add_text_chunk("Description".to_string(), description.to_string())
            .map_err(|err| write_error(path, err))?;
    }

    let mut writer = encoder.write_header().map_err(|err| write_error(path, err))?;

    writer
        .write_image_data(image.as_raw())
        .map_err(|err| write_error(path, err))?;

    writer.finish().map_err(|err| write_error(path, err))
}

fn write_jpeg(
    image: &RgbImage,
    path: &Path,
    quality: u8,
    description: Option<&str>,
) -> Result<(), SlideSegError> {
    let mut buffer = Vec::new();

    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|err| write_error(path, err))?;

    if let Some(description) = description {
        let segment = exif_description_segment(description)?;
        buffer = insert_jpeg_segment(buffer, &segment)?;
    }

    let mut file = File::create(path).map_err(|err| write_error(path, err))?;
    file.write_all(&buffer).map_err(|err| write_error(path, err))
}

/// A JPEG APP1 segment holding a single EXIF `ImageDescription` entry
pub fn exif_description_segment(description: &str) -> Result<Vec<u8>, SlideSegError> {
    let mut text = description.as_bytes().to_vec();
    text.push(0);

    let count = text.len() as u32;

    // TIFF header (8) + entry count (2) + one entry (12) + next IFD offset (4)
    let value_offset: u32 = 8 + 2 + 12 + 4;

    let mut tiff = Vec::with_capacity(value_offset as usize + text.len());
    tiff.extend_from_slice(b"MM\x00\x2a");
    tiff.extend_from_slice(&8u32.to_be_bytes());
    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&EXIF_IMAGE_DESCRIPTION.to_be_bytes());
    tiff.extend_from_slice(&EXIF_ASCII.to_be_bytes());
    tiff.extend_from_slice(&count.to_be_bytes());

    if count <= 4 {
        let mut inline = [0u8; 4];
        inline[..text.len()].copy_from_slice(&text);
        tiff.extend_from_slice(&inline);
        tiff.extend_from_slice(&0u32.to_be_bytes());
    } else {
        tiff.extend_from_slice(&value_offset.to_be_bytes());
        tiff.extend_from_slice(&0u32.to_be_bytes());
        tiff.extend_from_slice(&text);
    }

    let length = 2 + 6 + tiff.len();
    if length > u16::MAX as usize {
        return Err(SlideSegError::ImageWriteError(format!(
            "Tag description of {} bytes does not fit in a JPEG segment.",
            description.len()
        )));
    }

    let mut segment = Vec::with_capacity(2 + length);
    segment.extend_from_slice(&[0xff, 0xe1]);
    segment.extend_from_slice(&(length as u16).to_be_bytes());
    segment.extend_from_slice(b"Exif\x00\x00");
    segment.extend_from_slice(&tiff);

    Ok(segment)
}

/// Insert a marker segment after the start of image and any JFIF APP0
pub fn insert_jpeg_segment(jpeg: Vec<u8>, segment: &[u8]) -> Result<Vec<u8>, SlideSegError> {
    if jpeg.len() < 4 || jpeg[0..2] != [0xff, 0xd8] {
        return Err(SlideSegError::ImageWriteError(
            "Encoded data is not a JPEG stream.".to_string(),
        ));
    }

    let mut position = 2;

    if jpeg[2..4] == [0xff, 0xe0] {
        if jpeg.len() < 6 {
            return Err(SlideSegError::ImageWriteError(
                "Truncated JFIF header.".to_string(),
            ));
        }

        let length = u16::from_be_bytes([jpeg[4], jpeg[5]]) as usize;
        position = (4 + length).min(jpeg.len());
    }

    let mut output = Vec::with_capacity(jpeg.len() + segment.len());
    output.extend_from_slice(&jpeg[..position]);
    output.extend_from_slice(segment);
    output.extend_from_slice(&jpeg[position..]);

    Ok(output)
}
