// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::constant::{
    BACKGROUND, INITIAL_COLOR, KEY_LINE_WIDTH, SUPPORTED_ANNOTATION_FORMATS,
};
use crate::error::SlideSegError;
use crate::im::MaskColor;
use crate::io::annotation::read_annotations;
use crate::ut::path::{collect_file_paths, ensure_directory};

/// A persistent mapping from annotation class names to mask color codes
///
/// Every class maps to one color and every color is used by at most one
/// class. New classes receive the smallest code in use minus one, with codes
/// compared as packed `r << 16 | g << 8 | b` integers. A store opened from a
/// file writes itself back after every extension; a detached store only
/// changes in memory.
///
/// # Examples
///
/// ```
/// use slideseg_core::io::AnnotationKeyStore;
///
/// let mut store = AnnotationKeyStore::new();
///
/// assert_eq!(store.resolve("tumor").unwrap(), [255, 255, 255]);
/// assert_eq!(store.resolve("stroma").unwrap(), [255, 255, 254]);
/// assert_eq!(store.resolve("TUMOR").unwrap(), [255, 255, 255]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationKeyStore {
    path: Option<PathBuf>,
    keys: BTreeMap<String, MaskColor>,
}

impl AnnotationKeyStore {
    /// An empty, detached store
    pub fn new() -> AnnotationKeyStore {
        AnnotationKeyStore::default()
    }

    /// A detached store holding the provided keys
    ///
    /// # Arguments
    ///
    /// * `keys` - Class names and their color codes
    pub fn from_keys<I, S>(keys: I) -> Result<AnnotationKeyStore, SlideSegError>
    where
        I: IntoIterator<Item = (S, MaskColor)>,
        S: AsRef<str>,
    {
        let mut store = AnnotationKeyStore::new();

        for (name, color) in keys {
            store.insert(name.as_ref(), color)?;
        }

        Ok(store)
    }
}

// >>> I/O METHODS

impl AnnotationKeyStore {
    /// Load a key file and keep it attached for later extensions
    ///
    /// # Arguments
    ///
    /// * `path` - Path to an existing key file
    ///
    /// ```no_run
    /// use slideseg_core::io::AnnotationKeyStore;
    /// let store = AnnotationKeyStore::load("annotation_keys.txt");
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<AnnotationKeyStore, SlideSegError> {
        let path = path.as_ref();

        let contents = std::fs::read_to_string(path)
            .map_err(|err| SlideSegError::IoError(format!("{}: {}", path.display(), err)))?;

        let mut store = AnnotationKeyStore::new();

        for (number, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let (name, color) = parse_key_line(line).map_err(|err| match err {
                SlideSegError::FormatError(message) => SlideSegError::FormatError(format!(
                    "{} line {}: {}",
                    path.display(),
                    number + 1,
                    message
                )),
                other => other,
            })?;

            store.insert(&name, color)?;
        }

        store.path = Some(path.to_path_buf());

        Ok(store)
    }

    /// Build a fresh key file from every annotation file in a directory
    ///
    /// Classes keep the first color declared for them, visiting files in
    /// sorted order. When two classes declare the same color the class seen
    /// first holds it. Classes without a usable declared color, or whose
    /// color is background or already taken, are then assigned codes with
    /// the minimum-minus-one rule in name order.
    ///
    /// # Arguments
    ///
    /// * `path` - Key file to (over)write
    /// * `annotation_dir` - Directory holding `.roi` / `.xml` annotations
    pub fn generate<P, Q>(path: P, annotation_dir: Q) -> Result<AnnotationKeyStore, SlideSegError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let files = collect_file_paths(
            annotation_dir.as_ref(),
            SUPPORTED_ANNOTATION_FORMATS.as_slice(),
            None,
        )?;

        // Classes in first-seen order with the first color declared for them
        let mut declared: Vec<(String, Option<MaskColor>)> = Vec::new();
        let mut seen: BTreeMap<String, usize> = BTreeMap::new();

        for file in &files {
            for region in read_annotations(file)? {
                match seen.get(&region.name) {
                    Some(&index) => {
                        if declared[index].1.is_none() {
                            declared[index].1 = region.declared_color;
                        }
                    }
                    None => {
                        seen.insert(region.name.clone(), declared.len());
                        declared.push((region.name, region.declared_color));
                    }
                }
            }
        }

        let mut store = AnnotationKeyStore::new();
        let mut pending = Vec::new();

        for (name, color) in declared {
            match color {
                Some(color) if color != BACKGROUND && store.name_of(color).is_none() => {
                    store.keys.insert(name, color);
                }
                _ => pending.push(name),
            }
        }

        pending.sort();

        for name in pending {
            store.add_key(&name)?;
        }

        store.path = Some(path.as_ref().to_path_buf());
        store.save()?;

        Ok(store)
    }

    /// Load the key file if it exists, otherwise generate it
    pub fn open_or_generate<P, Q>(
        path: P,
        annotation_dir: Q,
    ) -> Result<AnnotationKeyStore, SlideSegError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        if path.as_ref().is_file() {
            Self::load(path)
        } else {
            Self::generate(path, annotation_dir)
        }
    }

    /// Write the store to its attached path, sorted by class name
    ///
    /// Detached stores have nothing to write and return immediately.
    pub fn save(&self) -> Result<(), SlideSegError> {
        match &self.path {
            Some(path) => self.save_to(path),
            None => Ok(()),
        }
    }

    /// Write the store to an arbitrary path, sorted by class name
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), SlideSegError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_directory(parent)?;
            }
        }

        std::fs::write(path, self.to_key_file())
            .map_err(|err| SlideSegError::IoError(format!("{}: {}", path.display(), err)))
    }

    /// The key file text for this store
    pub fn to_key_file(&self) -> String {
        self.keys
            .iter()
            .map(|(name, color)| format!("{}\n", format_key_line(name, *color, KEY_LINE_WIDTH)))
            .collect()
    }
}

// <<< I/O METHODS

// >>> PROPERTY METHODS

impl AnnotationKeyStore {
    /// Number of stored classes
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if the store has no classes
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Path the store persists to, if attached
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Color assigned to a class
    pub fn get(&self, name: &str) -> Option<MaskColor> {
        self.keys.get(&normalize_key(name)).copied()
    }

    /// Class holding a color
    pub fn name_of(&self, color: MaskColor) -> Option<&str> {
        self.keys
            .iter()
            .find(|(_, c)| **c == color)
            .map(|(name, _)| name.as_str())
    }

    /// Classes and colors sorted by class name
    pub fn iter(&self) -> impl Iterator<Item = (&String, &MaskColor)> {
        self.keys.iter()
    }

    /// Underlying class to color mapping
    pub fn as_map(&self) -> &BTreeMap<String, MaskColor> {
        &self.keys
    }

    /// An in-memory copy that never writes back to disk
    pub fn detached(&self) -> AnnotationKeyStore {
        AnnotationKeyStore {
            path: None,
            keys: self.keys.clone(),
        }
    }
}

// <<< PROPERTY METHODS

// >>> TRANSFORM METHODS

impl AnnotationKeyStore {
    /// Color for a class, assigning and persisting a new one when unknown
    pub fn resolve(&mut self, name: &str) -> Result<MaskColor, SlideSegError> {
        match self.get(name) {
            Some(color) => Ok(color),
            None => self.add_key(name),
        }
    }

    /// Assign the next free color to a class and persist the store
    ///
    /// Known classes keep their color.
    pub fn add_key(&mut self, name: &str) -> Result<MaskColor, SlideSegError> {
        let name = normalize_key(name);

        if name.is_empty() {
            return Err(SlideSegError::FormatError(
                "Annotation class names must not be empty.".to_string(),
            ));
        }

        if let Some(color) = self.keys.get(&name) {
            return Ok(*color);
        }

        let color = self.next_color()?;
        self.keys.insert(name, color);
        self.save()?;

        Ok(color)
    }

    /// Smallest code in use minus one
    fn next_color(&self) -> Result<MaskColor, SlideSegError> {
        let Some(minimum) = self.keys.values().map(|color| pack_color(*color)).min() else {
            return Ok(INITIAL_COLOR);
        };

        if minimum <= pack_color(BACKGROUND) + 1 {
            return Err(SlideSegError::KeyError(format!(
                "No color below {:?} is free without colliding with the background.",
                unpack_color(minimum)
            )));
        }

        Ok(unpack_color(minimum - 1))
    }

    fn insert(&mut self, name: &str, color: MaskColor) -> Result<(), SlideSegError> {
        let name = normalize_key(name);

        if name.is_empty() {
            return Err(SlideSegError::FormatError(
                "Annotation class names must not be empty.".to_string(),
            ));
        }

        if color == BACKGROUND {
            return Err(SlideSegError::FormatError(format!(
                "Class {} uses the background color {:?}.",
                name, BACKGROUND
            )));
        }

        if let Some(other) = self.name_of(color) {
            if other != name {
                return Err(SlideSegError::FormatError(format!(
                    "Classes {} and {} share the color {:?}.",
                    other, name, color
                )));
            }
        }

        if let Some(existing) = self.keys.get(&name) {
            if *existing != color {
                return Err(SlideSegError::FormatError(format!(
                    "Class {} is listed with two colors.",
                    name
                )));
            }
        }

        self.keys.insert(name, color);

        Ok(())
    }
}

// <<< TRANSFORM METHODS

/// Upper-case, whitespace-trimmed class name
pub fn normalize_key(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Pack a color into a single comparable integer
pub fn pack_color(color: MaskColor) -> u32 {
    ((color[0] as u32) << 16) | ((color[1] as u32) << 8) | color[2] as u32
}

/// Inverse of [`pack_color`] for values below 2^24
pub fn unpack_color(code: u32) -> MaskColor {
    [(code >> 16) as u8, (code >> 8) as u8, code as u8]
}

/// Format a `Key: <name>` line with a right-justified `Mask_Color` field
///
/// At least two spaces always separate the two fields.
///
/// # Examples
///
/// ```
/// use slideseg_core::io::keys::format_key_line;
///
/// let line = format_key_line("TUMOR", [0, 0, 255], 40);
///
/// assert!(line.starts_with("Key: TUMOR  "));
/// assert!(line.ends_with("Mask_Color: (0, 0, 255)"));
/// assert_eq!(line.len(), 40);
/// ```
pub fn format_key_line(name: &str, color: MaskColor, width: usize) -> String {
    let key = format!("Key: {}", name);
    let field = format!("Mask_Color: ({}, {}, {})", color[0], color[1], color[2]);
    let pad = width.saturating_sub(key.len()).max(field.len() + 2);

    format!("{}{:>pad$}", key, field, pad = pad)
}

/// Parse a `Key: <name>  Mask_Color: (r, g, b)` line
pub fn parse_key_line(line: &str) -> Result<(String, MaskColor), SlideSegError> {
    let line = line.trim();

    let Some(rest) = line.strip_prefix("Key:") else {
        return Err(SlideSegError::FormatError(format!(
            "Missing Key field in \"{}\".",
            line
        )));
    };

    let Some(split) = rest.rfind("Mask_Color:") else {
        return Err(SlideSegError::FormatError(format!(
            "Missing Mask_Color field in \"{}\".",
            line
        )));
    };

    let name = normalize_key(&rest[..split]);
    if name.is_empty() {
        return Err(SlideSegError::FormatError(format!(
            "Empty Key field in \"{}\".",
            line
        )));
    }

    let color = parse_color_tuple(&rest[split + "Mask_Color:".len()..])?;

    Ok((name, color))
}

/// Parse an `(r, g, b)` triplet with strict 0-255 integer channels
pub fn parse_color_tuple(text: &str) -> Result<MaskColor, SlideSegError> {
    let inner = text
        .trim()
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| {
            SlideSegError::FormatError(format!("Expected (r, g, b) but found \"{}\".", text.trim()))
        })?;

    let channels: Vec<&str> = inner.split(',').map(str::trim).collect();

    if channels.len() != 3 {
        return Err(SlideSegError::FormatError(format!(
            "Expected three channels but found \"{}\".",
            inner
        )));
    }

    let mut color = [0u8; 3];
    for (value, channel) in color.iter_mut().zip(&channels) {
        *value = channel.parse::<u8>().map_err(|_| {
            SlideSegError::FormatError(format!("Invalid color channel \"{}\".", channel))
        })?;
    }

    Ok(color)
}

/// Parse a `#RRGGBB` hex color
pub fn parse_hex_color(text: &str) -> Result<MaskColor, SlideSegError> {
    let hex = text.trim().trim_start_matches('#');

    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SlideSegError::FormatError(format!(
            "Invalid hex color \"{}\".",
            text
        )));
    }

    let mut color = [0u8; 3];
    for (i, value) in color.iter_mut().enumerate() {
        *value = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16)
            .map_err(|_| SlideSegError::FormatError(format!("Invalid hex color \"{}\".", text)))?;
    }

    Ok(color)
}
