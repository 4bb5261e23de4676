// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

// Slide formats readable by the in-crate image pyramid
pub const SUPPORTED_SLIDE_FORMATS: [&str; 9] = [
    "bmp", "jpeg", "jpg", "png", "pbm", "pgm", "ppm", "tif", "tiff",
];

// Annotation markup extensions, in lookup order
pub const SUPPORTED_ANNOTATION_FORMATS: [&str; 2] = ["roi", "xml"];

// Output extensions accepted for chips and masks
pub const SUPPORTED_OUTPUT_FORMATS: [&str; 6] = ["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

// Mask value for pixels outside every annotation region
pub const BACKGROUND: [u8; 3] = [0, 0, 0];

// Key assigned to chips without any annotated pixel
pub const NONE_KEY: &str = "NONE";

// First color handed out by an empty key store
pub const INITIAL_COLOR: [u8; 3] = [255, 255, 255];

// Width the key file right-justifies `Mask_Color` fields to
pub const KEY_LINE_WIDTH: usize = 64;

// Width the slide manifest right-justifies `Mask_Color` fields to
pub const MANIFEST_LINE_WIDTH: usize = 49;

// Output subdirectories
pub const CHIP_DIRECTORY: &str = "image_chips";
pub const MASK_DIRECTORY: &str = "image_mask";
pub const MANIFEST_DIRECTORY: &str = "textfiles";

// Suffix appended to the annotation stem for slide manifests
pub const MANIFEST_SUFFIX: &str = "Details";

// Masks are always written at the highest JPEG quality
pub const MASK_JPEG_QUALITY: u8 = 100;

// Defaults mirrored by the parameter file and command line
pub const DEFAULT_TILE_SIZE: u32 = 128;
pub const DEFAULT_OVERLAP: u32 = 1;
pub const DEFAULT_QUALITY: u8 = 95;
pub const DEFAULT_FORMAT: &str = "png";
pub const DEFAULT_LEVELS: usize = 1;
