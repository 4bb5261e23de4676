// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::path::{Path, PathBuf};

use crate::constant::SUPPORTED_ANNOTATION_FORMATS;
use crate::error::SlideSegError;

/// Creates a directory and any missing parents, keeping existing contents
///
/// # Arguments
///
/// * `directory` - Path to the directory
///
/// # Examples
///
/// ```
/// use slideseg_core::ut::path::ensure_directory;
///
/// let base = std::env::temp_dir().join("SLIDESEG_ENSURE_DIRECTORY/nested");
///
/// ensure_directory(&base).unwrap();
/// ensure_directory(&base).unwrap();
/// assert!(base.exists());
///
/// std::fs::remove_dir_all(base.parent().unwrap()).unwrap();
/// ```
pub fn ensure_directory<P: AsRef<Path>>(directory: P) -> Result<PathBuf, SlideSegError> {
    let directory = directory.as_ref();

    std::fs::create_dir_all(directory).map_err(|err| {
        SlideSegError::DirError(format!("{}: {}", directory.display(), err))
    })?;

    Ok(directory.to_path_buf())
}

/// Collect file paths from a directory with an optional substring filter
///
/// Paths are returned sorted so that directory scans are reproducible.
///
/// # Arguments
///
/// * `directory` - Path to directory containing files
/// * `valid_ext` - Lower-case extensions to keep
/// * `substring` - Only include files containing this substring
///
/// # Examples
///
/// ```no_run
/// use slideseg_core::ut::path::collect_file_paths;
/// use slideseg_core::constant::SUPPORTED_ANNOTATION_FORMATS;
/// let files = collect_file_paths("annotations/", SUPPORTED_ANNOTATION_FORMATS.as_slice(), None);
/// ```
pub fn collect_file_paths<P>(
    directory: P,
    valid_ext: &[&str],
    substring: Option<String>,
) -> Result<Vec<PathBuf>, SlideSegError>
where
    P: AsRef<Path>,
{
    let message = directory.as_ref().display().to_string();

    let mut files: Vec<PathBuf> = std::fs::read_dir(directory)
        .map_err(|_| SlideSegError::DirError(message))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| valid_ext.contains(&ext.to_lowercase().as_str()))
        })
        .collect();

    if let Some(substring) = substring {
        files.retain(|f| {
            f.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.contains(&substring))
        });
    }

    files.sort();

    Ok(files)
}

/// File name without its final extension
pub fn file_stem<P: AsRef<Path>>(path: P) -> Result<String, SlideSegError> {
    path.as_ref()
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_string())
        .ok_or_else(|| {
            SlideSegError::NoFileError(format!("Invalid file name {}", path.as_ref().display()))
        })
}

/// Locate the annotation file belonging to a slide
///
/// Annotations share the slide's stem and are looked up with each supported
/// annotation extension in turn (`.roi` before `.xml`).
///
/// # Arguments
///
/// * `annotation_dir` - Directory holding annotation files
/// * `slide_stem` - Slide file name without extension
pub fn find_annotation<P: AsRef<Path>>(
    annotation_dir: P,
    slide_stem: &str,
) -> Result<PathBuf, SlideSegError> {
    let annotation_dir = annotation_dir.as_ref();

    SUPPORTED_ANNOTATION_FORMATS
        .iter()
        .map(|ext| annotation_dir.join(format!("{}.{}", slide_stem, ext)))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            SlideSegError::NoFileError(format!(
                "No annotation for {} in {}",
                slide_stem,
                annotation_dir.display()
            ))
        })
}

/// Pair each slide with its annotation file
///
/// Slides without an annotation are skipped and returned separately so the
/// caller can report them.
///
/// # Arguments
///
/// * `slides` - Slide file paths
/// * `annotation_dir` - Directory holding annotation files
pub fn collect_slide_pairs<P: AsRef<Path>>(
    slides: &[PathBuf],
    annotation_dir: P,
) -> (Vec<(String, PathBuf, PathBuf)>, Vec<PathBuf>) {
    let mut pairs = Vec::with_capacity(slides.len());
    let mut missing = Vec::new();

    for slide in slides {
        let Ok(stem) = file_stem(slide) else {
            missing.push(slide.clone());
            continue;
        };

        match find_annotation(annotation_dir.as_ref(), &stem) {
            Ok(annotation) => pairs.push((stem, slide.clone(), annotation)),
            Err(_) => missing.push(slide.clone()),
        }
    }

    (pairs, missing)
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_collect_file_paths_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();

        for name in ["b.roi", "a.XML", "c.txt", "d.png"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }

        let files = collect_file_paths(dir.path(), &SUPPORTED_ANNOTATION_FORMATS, None).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names, vec!["a.XML", "b.roi"]);
    }

    #[test]
    fn test_collect_file_paths_missing_directory() {
        assert!(collect_file_paths("does_not_exist/", &SUPPORTED_ANNOTATION_FORMATS, None).is_err());
    }

    #[test]
    fn test_find_annotation_prefers_roi() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("slide.xml"), "").unwrap();
        assert!(find_annotation(dir.path(), "slide").unwrap().ends_with("slide.xml"));

        std::fs::write(dir.path().join("slide.roi"), "").unwrap();
        assert!(find_annotation(dir.path(), "slide").unwrap().ends_with("slide.roi"));

        assert!(find_annotation(dir.path(), "other").is_err());
    }

    #[test]
    fn test_collect_slide_pairs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.roi"), "").unwrap();

        let slides = vec![PathBuf::from("slides/one.png"), PathBuf::from("slides/two.png")];
        let (pairs, missing) = collect_slide_pairs(&slides, dir.path());

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, "one");
        assert_eq!(missing, vec![PathBuf::from("slides/two.png")]);
    }
}
