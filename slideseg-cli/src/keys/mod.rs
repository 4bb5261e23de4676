// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use clap::{Args, Subcommand};

mod add;
mod generate;
mod list;

use add::{KeysAddArgs, keys_add};
use generate::{KeysGenerateArgs, keys_generate};
use list::{KeysListArgs, keys_list};

#[derive(Debug, Args)]
#[command(about = "Create, inspect, and extend annotation key files.")]
#[command(args_conflicts_with_subcommands = true)]
#[command(arg_required_else_help = true)]
#[command(flatten_help = true)]
pub struct KeysArgs {
    #[command(subcommand)]
    command: Option<KeysCommands>,
}

#[derive(Debug, Subcommand)]
enum KeysCommands {
    Add(KeysAddArgs),
    Generate(KeysGenerateArgs),
    List(KeysListArgs),
}

pub fn keys(args: &KeysArgs) {
    match args.command.as_ref() {
        Some(KeysCommands::Add(add)) => keys_add(add),
        Some(KeysCommands::Generate(generate)) => keys_generate(generate),
        Some(KeysCommands::List(list)) => keys_list(list),
        None => {}
    }
}
