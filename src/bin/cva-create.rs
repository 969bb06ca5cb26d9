// src/bin/cva-create.rs

use anyhow::Result;
use clap::Parser;
use colored::*;
use cva_create::cli::{Cli, handlers};

// --- Command Definition and Registry ---

/// A named action and its handler. Handlers receive the arguments after the action name.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>) -> Result<()>,
}

/// Every action except `build`, which runs when the first argument names none of these.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "gen_config",
        aliases: &[],
        handler: handlers::gen_config::handle,
    },
    CommandDefinition {
        name: "upgrade_config",
        aliases: &[],
        handler: handlers::upgrade_config::handle,
    },
    CommandDefinition {
        name: "restart",
        aliases: &[],
        handler: handlers::restart::handle,
    },
];

fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()) {
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);
    handlers::commons::print_banner();

    let mut args = cli.args;
    match args.first().and_then(|first| find_command(first)) {
        Some(command) => {
            args.remove(0);
            (command.handler)(args)
        }
        None => handlers::build::handle(args),
    }
}
