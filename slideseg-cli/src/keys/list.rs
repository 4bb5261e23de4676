// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use clap::Args;
use colored::Colorize;

use slideseg_core::io::AnnotationKeyStore;

#[derive(Debug, Args)]
#[command(about = "Print the classes and colors stored in a key file.")]
pub struct KeysListArgs {
    #[arg(short = 'k', long, help = "Key file to read.", required = true)]
    pub keys: Option<String>,
}

pub fn keys_list(args: &KeysListArgs) {
    let Some(keys) = args.keys.as_ref() else {
        eprintln!("[slideseg::keys::list] ERROR: --keys/-k must be specified.");
        std::process::exit(1);
    };

    let store = AnnotationKeyStore::load(keys).unwrap_or_else(|err| {
        eprintln!("[slideseg::keys::list] ERROR: {}", err);
        std::process::exit(1);
    });

    println!("| {:-^52} |", "");
    println!("| {:^52} |", "slideseg".truecolor(196, 84, 148).bold());
    println!("| {:^52} |", "Annotation keys");
    println!("| {:-^52} |", "");
    println!("| {:^32} | {:^17} |", "key".bold(), "mask color".bold());
    println!("| {:-^32} | {:-^17} |", "", "");

    for (name, color) in store.iter() {
        let color = format!("({}, {}, {})", color[0], color[1], color[2]);
        println!("| {:<32} | {:^17} |", name, color);
    }

    println!("| {:-^32} | {:-^17} |", "", "");
}
