#![allow(clippy::all)]
use clap::{Parser, Subcommand};
use clap_markdown;

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
    clap_markdown::print_help_markdown::<Cli>();
}
