mod format;
mod mask;
mod pyramid;

pub use format::OutputFormat;

pub use mask::ClassMask;
pub use mask::MaskColor;

pub use pyramid::ImagePyramid;
pub use pyramid::PyramidReader;
