// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use clap::Args;

use slideseg_core::config::SlideSegConfig;

use super::{TileArgs, run_single, set_threads};

#[derive(Debug, Args)]
#[command(about = "Generate chips and masks from a single slide.")]
pub struct ChipsSlideArgs {
    #[arg(short = 'i', long, help = "Slide image.", required = true)]
    pub slide: Option<String>,

    #[arg(
        short = 'a',
        long,
        help = "Annotation directory holding <slide>.roi or <slide>.xml.",
        required = true
    )]
    pub annotations: Option<String>,

    #[arg(
        short = 'o',
        long,
        help = "Output directory [default: <slide_dir>/<slide>_output]."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'k',
        long,
        help = "Annotation key file [default: <output>/<slide>_keys.txt]."
    )]
    pub keys: Option<String>,

    #[command(flatten)]
    pub tile: TileArgs,

    #[arg(short = 't', long, help = "Number of threads.")]
    pub threads: Option<usize>,

    #[arg(short = 'v', long, help = "Verbose output.")]
    pub verbose: bool,
}

pub fn chips_slide(args: &ChipsSlideArgs) {
    let (Some(slide), Some(annotations)) = (args.slide.as_ref(), args.annotations.as_ref()) else {
        eprintln!(
            "[slideseg::chips::slide] ERROR: Both --slide/-i and --annotations/-a must be specified."
        );
        std::process::exit(1);
    };

    set_threads(args.threads, "slide");

    let mut config = SlideSegConfig::new(slide, annotations).unwrap_or_else(|err| {
        eprintln!("[slideseg::chips::slide] ERROR: {}", err);
        std::process::exit(1);
    });

    if let Some(output) = &args.output {
        config.output_dir = output.into();
        if let Ok(stem) = config.slide_stem() {
            config.key_path = config.output_dir.join(format!("{}_keys.txt", stem));
        }
    }

    if let Some(keys) = &args.keys {
        config.key_path = keys.into();
    }

    config.verbose = args.verbose;

    args.tile.apply(&mut config).unwrap_or_else(|err| {
        eprintln!("[slideseg::chips::slide] ERROR: {}", err);
        std::process::exit(1);
    });

    run_single(&config, "slide");
}
