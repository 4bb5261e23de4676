// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use clap::Args;

use slideseg_core::io::AnnotationKeyStore;
use slideseg_core::io::keys::normalize_key;
use slideseg_core::ut;

#[derive(Debug, Args)]
#[command(about = "Assign colors to new annotation classes in an existing key file.")]
pub struct KeysAddArgs {
    #[arg(short = 'k', long, help = "Key file to extend.", required = true)]
    pub keys: Option<String>,

    #[arg(help = "Class names to add.", required = true)]
    pub names: Vec<String>,

    #[arg(short = 'v', long, help = "Verbose output.")]
    pub verbose: bool,
}

pub fn keys_add(args: &KeysAddArgs) {
    let Some(keys) = args.keys.as_ref() else {
        eprintln!("[slideseg::keys::add] ERROR: --keys/-k must be specified.");
        std::process::exit(1);
    };

    let mut store = AnnotationKeyStore::load(keys).unwrap_or_else(|err| {
        eprintln!("[slideseg::keys::add] ERROR: {}", err);
        std::process::exit(1);
    });

    for name in &args.names {
        let known = store.get(name).is_some();

        let color = store.add_key(name).unwrap_or_else(|err| {
            eprintln!("[slideseg::keys::add] ERROR: {}", err);
            std::process::exit(1);
        });

        let status = if known { "exists" } else { "added" };

        ut::track::progress_log(
            &format!(
                "{} {} -> ({}, {}, {})",
                status,
                normalize_key(name),
                color[0],
                color[1],
                color[2]
            ),
            args.verbose,
        );
    }
}
