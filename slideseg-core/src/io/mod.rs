pub mod annotation;
pub mod keys;
mod manifest;
mod params;
mod write;

pub use annotation::AnnotationRegion;
pub use annotation::parse_annotations;
pub use annotation::read_annotations;

pub use keys::AnnotationKeyStore;

pub use manifest::format_manifest;
pub use manifest::write_manifest;

pub use params::parse_bool;
pub use params::parse_parameters;
pub use params::read_parameters;

pub use write::write_rgb;
