// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use clap::Args;

use slideseg_core::config::SlideSegConfig;

use super::{run_single, set_threads};

#[derive(Debug, Args)]
#[command(about = "Generate chips and masks from a slide described by a parameter file.")]
pub struct ChipsParamsArgs {
    #[arg(
        short = 'p',
        long,
        help = "Parameter file of `option: value  # comment` lines.",
        required = true
    )]
    pub params: Option<String>,

    #[arg(short = 't', long, help = "Number of threads.")]
    pub threads: Option<usize>,

    #[arg(short = 'v', long, help = "Verbose output.")]
    pub verbose: bool,
}

pub fn chips_params(args: &ChipsParamsArgs) {
    let Some(params) = args.params.as_ref() else {
        eprintln!("[slideseg::chips::params] ERROR: --params/-p must be specified.");
        std::process::exit(1);
    };

    set_threads(args.threads, "params");

    let mut config = SlideSegConfig::from_parameter_file(params).unwrap_or_else(|err| {
        eprintln!("[slideseg::chips::params] ERROR: {}", err);
        std::process::exit(1);
    });

    config.verbose |= args.verbose;

    run_single(&config, "params");
}
