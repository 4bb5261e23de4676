mod chip;
mod raster;
mod run;
mod scan;

pub use chip::ChipOptions;
pub use chip::materialize;
pub use chip::materialize_chip;

pub use raster::ClassLegend;
pub use raster::rasterize;
pub use raster::rasterize_file;

pub use run::SlideSummary;
pub use run::process_slide;
pub use run::run_slide;
pub use run::run_slide_with_store;

pub use scan::ChipEntry;
pub use scan::ChipRegistry;
pub use scan::ImageKeyIndex;
pub use scan::SavePolicy;
pub use scan::ScanOptions;
pub use scan::ScanResult;
pub use scan::TileWindow;
pub use scan::scan_pyramid;
