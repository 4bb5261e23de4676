// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use clap::{Parser, Subcommand};
use slideseg_cli::{chips, keys};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Chips(chips::ChipsArgs),
    Keys(keys::KeysArgs),
}

fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Chips(chips_args)) => chips::chips(chips_args),
        Some(Commands::Keys(keys_args)) => keys::keys(keys_args),
        None => {}
    }
}
