// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::SlideSegConfig;
use crate::error::SlideSegError;
use crate::im::{ImagePyramid, PyramidReader};
use crate::io::{AnnotationKeyStore, read_annotations, write_manifest};
use crate::tile::chip::materialize;
use crate::tile::raster::rasterize;
use crate::tile::scan::scan_pyramid;
use crate::ut::path::{ensure_directory, file_stem, find_annotation};
use crate::ut::track::{progress_log, thousands_format};

/// What a slide run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideSummary {
    pub slide: String,
    pub annotation: PathBuf,
    pub levels: usize,
    pub windows: usize,
    pub chips: usize,
    pub annotated: usize,
    pub blank: usize,
    /// Classes painted into the slide mask
    pub classes: usize,
    pub manifest: PathBuf,
}

/// Generate chips, masks, and manifests for one slide
///
/// The key file is loaded, or generated from the annotation directory when
/// missing, and extended with any class the slide introduces.
///
/// # Arguments
///
/// * `config` - Slide settings
///
/// ```no_run
/// use slideseg_core::config::SlideSegConfig;
/// use slideseg_core::tile::run_slide;
///
/// let config = SlideSegConfig::new("slides/a.tif", "annotations/").unwrap();
/// let summary = run_slide(&config).unwrap();
/// ```
pub fn run_slide(config: &SlideSegConfig) -> Result<SlideSummary, SlideSegError> {
    let slide = config.slide_stem()?;

    config.validate().map_err(|err| err.in_slide(&slide))?;

    let mut store = AnnotationKeyStore::open_or_generate(&config.key_path, &config.annotation_dir)
        .map_err(|err| err.in_slide(&slide))?;

    run_slide_with_store(config, &mut store)
}

/// Generate chips, masks, and manifests for one slide with a given key store
///
/// Batch runs pass a detached store so that concurrent slides never write
/// the shared key file.
pub fn run_slide_with_store(
    config: &SlideSegConfig,
    store: &mut AnnotationKeyStore,
) -> Result<SlideSummary, SlideSegError> {
    let slide = config.slide_stem()?;

    config
        .validate()
        .and_then(|_| ImagePyramid::open(&config.slide_path, config.levels))
        .and_then(|pyramid| process_slide(&pyramid, config, store))
        .map_err(|err| err.in_slide(&slide))
}

/// Run every stage against an already opened slide pyramid
///
/// Rasterization finishes before scanning starts, and the manifests are
/// only written once every chip has been materialized.
pub fn process_slide<R>(
    reader: &R,
    config: &SlideSegConfig,
    store: &mut AnnotationKeyStore,
) -> Result<SlideSummary, SlideSegError>
where
    R: PyramidReader + ?Sized,
{
    let slide = config.slide_stem()?;
    let dimensions = reader.level_dimensions();

    let Some(&base) = dimensions.first() else {
        return Err(SlideSegError::ImageReadError(
            "Slide reader reported no levels.".to_string(),
        ));
    };

    let annotation = find_annotation(&config.annotation_dir, &slide)?;
    let annotation_stem = file_stem(&annotation)?;

    progress_log(
        &format!("Loading annotation data from {}.", annotation.display()),
        config.verbose,
    );

    let regions = read_annotations(&annotation)?;
    let (mask, legend) = rasterize(base, store, &regions)?;

    progress_log(
        &format!(
            "Painted {} regions of {} classes into a {}x{} mask.",
            thousands_format(regions.len()),
            legend.len(),
            base.0,
            base.1
        ),
        config.verbose,
    );

    let scan = scan_pyramid(dimensions, &mask, &legend, &slide, &config.scan_options())?;

    ensure_directory(&config.output_dir)?;
    materialize(
        reader,
        &mask,
        &scan.registry,
        &config.output_dir,
        &config.chip_options(),
    )?;

    let (manifest, _) = write_manifest(
        &config.output_dir,
        &annotation_stem,
        &legend,
        &scan.registry,
        &scan.index,
    )?;

    progress_log(
        &format!("Complete. Wrote manifest to {}.", manifest.display()),
        config.verbose,
    );

    Ok(SlideSummary {
        slide,
        annotation,
        levels: dimensions.len(),
        windows: scan.windows,
        chips: scan.registry.len(),
        annotated: scan.annotated,
        blank: scan.blank,
        classes: legend.len(),
        manifest,
    })
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::constant::{CHIP_DIRECTORY, MASK_DIRECTORY};
    use crate::im::OutputFormat;
    use image::{Rgb, RgbImage};
    use std::path::Path;

    const ANNOTATION: &str = r##"<annotations>
  <contour name="tumor" color="#0000FF">
    <point>0, 0</point><point>40, 0</point><point>40, 40</point><point>0, 40</point>
  </contour>
  <contour name="stroma">
    <point>70, 30</point><point>95, 30</point><point>95, 60</point><point>70, 60</point>
  </contour>
</annotations>"##;

    fn workspace(root: &Path) -> SlideSegConfig {
        let slides = root.join("slides");
        let annotations = root.join("annotations");
        std::fs::create_dir_all(&slides).unwrap();
        std::fs::create_dir_all(&annotations).unwrap();

        RgbImage::from_fn(96, 64, |x, y| Rgb([x as u8, y as u8, 128]))
            .save(slides.join("case.png"))
            .unwrap();

        std::fs::write(annotations.join("case.roi"), ANNOTATION).unwrap();

        let mut config = SlideSegConfig::new(slides.join("case.png"), &annotations).unwrap();
        config.tile_size = 32;
        config.overlap = 0;
        config.levels = 2;
        config
    }

    fn count(directory: &Path) -> usize {
        std::fs::read_dir(directory).unwrap().count()
    }

    #[test]
    fn test_run_slide_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = workspace(dir.path());

        let summary = run_slide(&config).unwrap();

        assert_eq!(summary.slide, "case");
        assert_eq!(summary.levels, 2);
        assert_eq!(summary.classes, 2);

        // 3x2 windows at level 0 and 2x1 at level 1
        assert_eq!(summary.windows, 8);
        assert_eq!(summary.chips, summary.annotated);
        assert_eq!(summary.blank, 0);

        assert_eq!(count(&config.output_dir.join(CHIP_DIRECTORY)), summary.chips);
        assert_eq!(count(&config.output_dir.join(MASK_DIRECTORY)), summary.chips);

        let manifest = std::fs::read_to_string(&summary.manifest).unwrap();
        assert!(manifest.starts_with("Key: STROMA"));
        assert!(manifest.contains("\nKey: TUMOR\n   case_0_0_0.png\n"));
        assert!(summary.manifest.ends_with("textfiles/case_Details.txt"));

        // Generated key file keeps the declared tumor color
        let store = AnnotationKeyStore::load(&config.key_path).unwrap();
        assert_eq!(store.get("TUMOR"), Some([0, 0, 255]));
        assert!(store.get("STROMA").is_some());
    }

    #[test]
    fn test_run_slide_save_all() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = workspace(dir.path());
        config.save_all = true;
        config.format = OutputFormat::Jpeg;

        let summary = run_slide(&config).unwrap();

        assert_eq!(summary.chips, 8);
        assert_eq!(summary.annotated + summary.blank, 8);
        assert!(
            config
                .output_dir
                .join(CHIP_DIRECTORY)
                .join("case_1_0_0.jpg")
                .is_file()
        );
    }

    #[test]
    fn test_process_slide_single_tumor_window() {
        let dir = tempfile::tempdir().unwrap();
        let annotations = dir.path().join("annotations");
        std::fs::create_dir_all(&annotations).unwrap();
        std::fs::write(
            annotations.join("slide.roi"),
            r##"<a><contour name="tumor" color="#0000FF">
                <point>0, 0</point><point>127, 0</point><point>127, 127</point><point>0, 127</point>
            </contour></a>"##,
        )
        .unwrap();

        let pyramid =
            ImagePyramid::from_image(RgbImage::from_pixel(512, 512, Rgb([200, 180, 190])), 1)
                .unwrap();

        let mut config = SlideSegConfig::new(dir.path().join("slide.png"), &annotations).unwrap();
        config.tile_size = 128;
        config.overlap = 1;
        config.format = OutputFormat::Jpeg;

        let mut store = AnnotationKeyStore::new();
        let summary = process_slide(&pyramid, &config, &mut store).unwrap();

        assert_eq!(summary.chips, 1);
        assert_eq!(summary.annotated, 1);
        assert_eq!(summary.blank, 0);
        assert_eq!(store.get("TUMOR"), Some([0, 0, 255]));

        let chip = config.output_dir.join(CHIP_DIRECTORY).join("slide_0_0_0.jpg");
        let mask = config.output_dir.join(MASK_DIRECTORY).join("slide_0_0_0.jpg");
        assert!(chip.is_file());
        assert!(mask.is_file());

        let bytes = std::fs::read(&chip).unwrap();
        assert!(bytes.windows(5).any(|w| w == b"TUMOR"));

        let manifest = std::fs::read_to_string(&summary.manifest).unwrap();
        assert!(manifest.contains("\nKey: TUMOR\n   slide_0_0_0.jpg\n"));
        assert!(!manifest.contains("slide_0_0_127.jpg"));
    }

    #[test]
    fn test_detached_store_leaves_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = workspace(dir.path());

        let mut store = AnnotationKeyStore::new();
        run_slide_with_store(&config, &mut store).unwrap();

        assert_eq!(store.len(), 2);
        assert!(!config.key_path.exists());
    }

    #[test]
    fn test_missing_annotation_names_slide() {
        let dir = tempfile::tempdir().unwrap();
        let config = workspace(dir.path());
        std::fs::remove_file(config.annotation_dir.join("case.roi")).unwrap();

        let mut store = AnnotationKeyStore::new();
        match run_slide_with_store(&config, &mut store) {
            Err(SlideSegError::SlideError { slide, error }) => {
                assert_eq!(slide, "case");
                assert!(matches!(*error, SlideSegError::NoFileError(_)));
            }
            other => panic!("unexpected result {:?}", other),
        }

        assert!(!config.output_dir.join("textfiles").exists());
    }

    #[test]
    fn test_invalid_config_rejected_before_work() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = workspace(dir.path());
        config.overlap = config.tile_size;

        assert!(run_slide(&config).is_err());
        assert!(!config.output_dir.exists());
    }
}
