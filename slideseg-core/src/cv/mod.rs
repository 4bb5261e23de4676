pub mod curate;
pub mod fill;
pub mod transform;

pub use curate::curate_mask;
pub use fill::fill_polygon;
