// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use clap::Args;

use slideseg_core::io::AnnotationKeyStore;
use slideseg_core::ut;

#[derive(Debug, Args)]
#[command(about = "Build a fresh key file from every annotation file in a directory.")]
pub struct KeysGenerateArgs {
    #[arg(short = 'a', long, help = "Annotation directory.", required = true)]
    pub annotations: Option<String>,

    #[arg(short = 'k', long, help = "Key file to write.", required = true)]
    pub keys: Option<String>,

    #[arg(long, help = "Replace an existing key file.")]
    pub overwrite: bool,

    #[arg(short = 'v', long, help = "Verbose output.")]
    pub verbose: bool,
}

pub fn keys_generate(args: &KeysGenerateArgs) {
    let (Some(annotations), Some(keys)) = (args.annotations.as_ref(), args.keys.as_ref()) else {
        eprintln!(
            "[slideseg::keys::generate] ERROR: Both --annotations/-a and --keys/-k must be specified."
        );
        std::process::exit(1);
    };

    if std::path::Path::new(keys).exists() && !args.overwrite {
        eprintln!(
            "[slideseg::keys::generate] ERROR: {} already exists. Use --overwrite to replace it.",
            keys
        );
        std::process::exit(1);
    }

    let store = AnnotationKeyStore::generate(keys, annotations).unwrap_or_else(|err| {
        eprintln!("[slideseg::keys::generate] ERROR: {}", err);
        std::process::exit(1);
    });

    ut::track::progress_log(
        &format!(
            "Complete. Wrote {} annotation keys to {}.",
            ut::track::thousands_format(store.len()),
            keys
        ),
        args.verbose,
    );
}
