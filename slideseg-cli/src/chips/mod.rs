// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use clap::{Args, Subcommand};

use slideseg_core::config::SlideSegConfig;
use slideseg_core::constant;
use slideseg_core::error::SlideSegError;
use slideseg_core::tile;
use slideseg_core::ut;

mod batch;
mod params;
mod slide;

use batch::{ChipsBatchArgs, chips_batch};
use params::{ChipsParamsArgs, chips_params};
use slide::{ChipsSlideArgs, chips_slide};

#[derive(Debug, Args)]
#[command(about = "Generate paired image chips and class masks from annotated slides.")]
#[command(args_conflicts_with_subcommands = true)]
#[command(arg_required_else_help = true)]
#[command(flatten_help = true)]
pub struct ChipsArgs {
    #[command(subcommand)]
    command: Option<ChipsCommands>,
}

#[derive(Debug, Subcommand)]
enum ChipsCommands {
    Slide(ChipsSlideArgs),
    Batch(ChipsBatchArgs),
    Params(ChipsParamsArgs),
}

pub fn chips(args: &ChipsArgs) {
    match args.command.as_ref() {
        Some(ChipsCommands::Slide(slide)) => chips_slide(slide),
        Some(ChipsCommands::Batch(batch)) => chips_batch(batch),
        Some(ChipsCommands::Params(params)) => chips_params(params),
        None => {}
    }
}

/// Tiling and encoding options shared by the chip commands
#[derive(Debug, Args)]
pub struct TileArgs {
    #[arg(
        short = 'f',
        long,
        help = "Output format of chips and masks (e.g. png, jpg, tif, bmp).",
        default_value = constant::DEFAULT_FORMAT
    )]
    pub format: String,

    #[arg(
        short = 'q',
        long,
        help = "JPEG quality of image chips (masks are always written at 100).",
        default_value_t = constant::DEFAULT_QUALITY
    )]
    pub quality: u8,

    #[arg(
        short = 's',
        long,
        help = "Edge length of chips and masks.",
        default_value_t = constant::DEFAULT_TILE_SIZE
    )]
    pub size: u32,

    #[arg(
        long,
        help = "Pixel overlap between neighbouring chips.",
        default_value_t = constant::DEFAULT_OVERLAP
    )]
    pub overlap: u32,

    #[arg(
        short = 'l',
        long,
        help = "Resolution levels synthesized from the slide image.",
        default_value_t = constant::DEFAULT_LEVELS
    )]
    pub levels: usize,

    #[arg(long, help = "Save every chip, including chips without annotations.")]
    pub save_all: bool,

    #[arg(
        long,
        help = "Also save blank chips while the annotated to blank ratio exceeds this value."
    )]
    pub save_ratio: Option<f64>,

    #[arg(long, help = "Do not embed class keys as image metadata.")]
    pub no_tags: bool,
}

impl TileArgs {
    /// Copy command line options onto a slide configuration
    pub fn apply(&self, config: &mut SlideSegConfig) -> Result<(), SlideSegError> {
        config.format = self.format.parse()?;
        config.quality = self.quality;
        config.tile_size = self.size;
        config.overlap = self.overlap;
        config.levels = self.levels;
        config.save_all = self.save_all;
        config.save_ratio = self.save_ratio.filter(|ratio| !ratio.is_infinite());
        config.tags = !self.no_tags;

        config.validate()
    }
}

/// Size the global thread pool used for scanning and chip writing
pub fn set_threads(threads: Option<usize>, command: &str) {
    let Some(threads) = threads else {
        return;
    };

    if threads < 1 {
        eprintln!(
            "[slideseg::chips::{}] ERROR: Threads must be set to a positive integer if provided.",
            command
        );
        std::process::exit(1);
    }

    if let Err(err) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        eprintln!("[slideseg::chips::{}] ERROR: {}", command, err);
        std::process::exit(1);
    }
}

/// Print the settings a slide run will use
pub fn log_config(config: &SlideSegConfig) {
    let lines = [
        format!("Slide             : {}", config.slide_path.display()),
        format!("Annotations       : {}", config.annotation_dir.display()),
        format!("Output directory  : {}", config.output_dir.display()),
        format!("Key file          : {}", config.key_path.display()),
        format!("Format            : {}", config.format),
        format!("Quality           : {}", config.quality),
        format!("Chip size         : {}", config.tile_size),
        format!("Overlap           : {}", config.overlap),
        format!("Save policy       : {:?}", config.save_policy()),
        format!("Tags              : {}", config.tags),
    ];

    for line in lines {
        ut::track::progress_log(&line, config.verbose);
    }
}

/// Run one slide, echo its configuration, and exit on failure
pub fn run_single(config: &SlideSegConfig, command: &str) {
    log_config(config);

    let summary = tile::run_slide(config).unwrap_or_else(|err| {
        eprintln!("[slideseg::chips::{}] ERROR: {}", command, err);
        std::process::exit(1);
    });

    let echo = config
        .slide_stem()
        .map(|stem| config.output_dir.join(format!("{}_config.json", stem)))
        .unwrap_or_else(|_| config.output_dir.join("config.json"));

    let json = serde_json::to_string_pretty(config).unwrap_or_else(|err| {
        eprintln!("[slideseg::chips::{}] ERROR: {}", command, err);
        std::process::exit(1);
    });

    std::fs::write(&echo, json).unwrap_or_else(|err| {
        eprintln!(
            "[slideseg::chips::{}] ERROR: Could not write {}. {}",
            command,
            echo.display(),
            err
        );
        std::process::exit(1);
    });

    ut::track::progress_log(
        &format!(
            "Complete. {} chips saved from {} windows ({} annotated, {} blank).",
            ut::track::thousands_format(summary.chips),
            ut::track::thousands_format(summary.windows),
            ut::track::thousands_format(summary.annotated),
            ut::track::thousands_format(summary.blank)
        ),
        config.verbose,
    );
}
