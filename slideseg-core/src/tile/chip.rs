// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::{Path, PathBuf};

use kdam::TqdmParallelIterator;
use rayon::prelude::*;

use crate::constant::{CHIP_DIRECTORY, MASK_DIRECTORY, MASK_JPEG_QUALITY};
use crate::cv::curate_mask;
use crate::error::SlideSegError;
use crate::im::{ClassMask, OutputFormat, PyramidReader};
use crate::io::write_rgb;
use crate::tile::scan::{ChipEntry, ChipRegistry};
use crate::ut::path::ensure_directory;
use crate::ut::track::{progress_bar, progress_log, thousands_format};

/// Encoding parameters for written chips and masks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChipOptions {
    pub tile_size: u32,
    pub format: OutputFormat,
    /// JPEG quality for chips, masks always use the highest quality
    pub quality: u8,
    /// Embed class keys as image metadata
    pub tags: bool,
    pub verbose: bool,
}

/// Read, curate, and write every registered chip with its mask
///
/// Chips land in `<output_dir>/image_chips/<name>` and masks in
/// `<output_dir>/image_mask/<name>`. Chips are written in parallel and the
/// first failure aborts the run.
///
/// # Arguments
///
/// * `reader` - Slide pyramid
/// * `mask` - Level 0 class mask
/// * `registry` - Chips selected by the scanner
/// * `output_dir` - Slide output directory
/// * `options` - Encoding parameters
pub fn materialize<R, P>(
    reader: &R,
    mask: &ClassMask,
    registry: &ChipRegistry,
    output_dir: P,
    options: &ChipOptions,
) -> Result<(), SlideSegError>
where
    R: PyramidReader + ?Sized,
    P: AsRef<Path>,
{
    let chip_dir = ensure_directory(output_dir.as_ref().join(CHIP_DIRECTORY))?;
    let mask_dir = ensure_directory(output_dir.as_ref().join(MASK_DIRECTORY))?;

    progress_log(
        &format!("Saving {} chips.", thousands_format(registry.len())),
        options.verbose,
    );

    let pb = progress_bar(registry.len(), "Saving chips", options.verbose);

    registry
        .as_slice()
        .par_iter()
        .tqdm_with_bar(pb)
        .try_for_each(|entry| {
            materialize_chip(reader, mask, entry, &chip_dir, &mask_dir, options)
                .map(|_| ())
                .map_err(|err| err.in_chip(&entry.name))
        })
}

/// Read, curate, and write a single chip and its mask
pub fn materialize_chip<R>(
    reader: &R,
    mask: &ClassMask,
    entry: &ChipEntry,
    chip_dir: &Path,
    mask_dir: &Path,
    options: &ChipOptions,
) -> Result<(PathBuf, PathBuf), SlideSegError>
where
    R: PyramidReader + ?Sized,
{
    let window = &entry.window;
    let size = options.tile_size;

    let chip = reader.read_region(window.origin(), window.level, (size, size))?;

    let (x0, y0, x1, y1) = window.mask_bounds(size);
    let curated = curate_mask(
        mask.region(x0, y0, x1, y1),
        window.scale_x,
        window.scale_y,
        size,
    )?;

    let tags = options.tags.then_some(entry.keys.as_slice());

    let chip_path = chip_dir.join(&entry.name);
    let mask_path = mask_dir.join(&entry.name);

    write_rgb(&chip, &chip_path, options.format, options.quality, tags)?;
    write_rgb(
        &curated.into_rgb_image()?,
        &mask_path,
        options.format,
        MASK_JPEG_QUALITY,
        tags,
    )?;

    Ok((chip_path, mask_path))
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::cv::fill_polygon;
    use crate::im::ImagePyramid;
    use crate::tile::raster::ClassLegend;
    use crate::tile::scan::{SavePolicy, ScanOptions, scan_pyramid};
    use image::{Rgb, RgbImage};

    const TUMOR: [u8; 3] = [0, 0, 255];

    fn fixture() -> (ImagePyramid, ClassMask, ClassLegend) {
        let image = RgbImage::from_fn(64, 48, |x, y| Rgb([x as u8 * 3, y as u8 * 5, 100]));
        let pyramid = ImagePyramid::from_image(image, 2).unwrap();

        let mut mask = ClassMask::new(64, 48);
        fill_polygon(&mut mask, &[[0, 0], [20, 0], [20, 20], [0, 20]], TUMOR);

        let mut legend = ClassLegend::new();
        legend.insert("TUMOR".to_string(), TUMOR);

        (pyramid, mask, legend)
    }

    fn chip_options(format: OutputFormat) -> ChipOptions {
        ChipOptions {
            tile_size: 16,
            format,
            quality: 95,
            tags: true,
            verbose: false,
        }
    }

    fn scan(
        pyramid: &ImagePyramid,
        mask: &ClassMask,
        legend: &ClassLegend,
        format: OutputFormat,
    ) -> ChipRegistry {
        let options = ScanOptions {
            tile_size: 16,
            overlap: 0,
            policy: SavePolicy::All,
            format,
            verbose: false,
        };

        scan_pyramid(pyramid.level_dimensions(), mask, legend, "s", &options)
            .unwrap()
            .registry
    }

    #[test]
    fn test_materialize_writes_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let (pyramid, mask, legend) = fixture();
        let registry = scan(&pyramid, &mask, &legend, OutputFormat::Png);

        materialize(
            &pyramid,
            &mask,
            &registry,
            dir.path(),
            &chip_options(OutputFormat::Png),
        )
        .unwrap();

        for entry in registry.iter() {
            let chip = image::open(dir.path().join(CHIP_DIRECTORY).join(&entry.name))
                .unwrap()
                .to_rgb8();
            let mask = image::open(dir.path().join(MASK_DIRECTORY).join(&entry.name))
                .unwrap()
                .to_rgb8();

            assert_eq!(chip.dimensions(), (16, 16));
            assert_eq!(mask.dimensions(), (16, 16));
        }
    }

    #[test]
    fn test_materialized_chip_matches_slide() {
        let dir = tempfile::tempdir().unwrap();
        let (pyramid, mask, legend) = fixture();
        let registry = scan(&pyramid, &mask, &legend, OutputFormat::Png);

        materialize(
            &pyramid,
            &mask,
            &registry,
            dir.path(),
            &chip_options(OutputFormat::Png),
        )
        .unwrap();

        let chip = image::open(dir.path().join(CHIP_DIRECTORY).join("s_0_16_32.png"))
            .unwrap()
            .to_rgb8();
        assert_eq!(chip.get_pixel(0, 0), &Rgb([96, 80, 100]));

        let mask = image::open(dir.path().join(MASK_DIRECTORY).join("s_0_0_0.png"))
            .unwrap()
            .to_rgb8();
        assert_eq!(mask.get_pixel(15, 15), &Rgb(TUMOR));

        // Level 1 windows on the last row overhang the slide and are padded
        let mask = image::open(dir.path().join(MASK_DIRECTORY).join("s_1_16_0.png"))
            .unwrap()
            .to_rgb8();
        assert_eq!(mask.dimensions(), (16, 16));
        assert_eq!(mask.get_pixel(0, 15), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_materialize_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let (pyramid, mask, legend) = fixture();
        let registry = scan(&pyramid, &mask, &legend, OutputFormat::Jpeg);

        materialize(
            &pyramid,
            &mask,
            &registry,
            dir.path(),
            &chip_options(OutputFormat::Jpeg),
        )
        .unwrap();

        let written = std::fs::read_dir(dir.path().join(MASK_DIRECTORY))
            .unwrap()
            .count();
        assert_eq!(written, registry.len());
    }

    #[test]
    fn test_materialize_unwritable_output() {
        let dir = tempfile::tempdir().unwrap();
        let (pyramid, mask, legend) = fixture();
        let registry = scan(&pyramid, &mask, &legend, OutputFormat::Png);

        // A file where the mask directory should go
        std::fs::write(dir.path().join(MASK_DIRECTORY), b"").unwrap();

        let result = materialize(
            &pyramid,
            &mask,
            &registry,
            dir.path(),
            &chip_options(OutputFormat::Png),
        );
        assert!(matches!(result, Err(SlideSegError::DirError(_))));
    }

    #[test]
    fn test_materialize_error_names_chip() {
        let dir = tempfile::tempdir().unwrap();
        let (pyramid, mask, legend) = fixture();

        let mut registry = scan(&pyramid, &mask, &legend, OutputFormat::Png);
        let mut entry = registry.iter().next().unwrap().clone();
        entry.name = "s_7_0_0.png".to_string();
        entry.window.level = 7;
        registry.insert(entry);

        let result = materialize(
            &pyramid,
            &mask,
            &registry,
            dir.path(),
            &chip_options(OutputFormat::Png),
        );

        match result {
            Err(SlideSegError::ChipError { chip, error }) => {
                assert_eq!(chip, "s_7_0_0.png");
                assert!(matches!(*error, SlideSegError::ImageReadError(_)));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}
