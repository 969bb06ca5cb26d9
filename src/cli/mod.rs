use clap::Parser;

pub mod args;
pub mod handlers;

const USAGE: &str = "\
cva-create <app_dir> <app_id> <app_name> [platform...] [--debug] [--prepare] [--replace]
       cva-create gen_config
       cva-create upgrade_config
       cva-create restart";

/// cva-create: creates a Cordova project from layered JSON configuration.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    override_usage = USAGE,
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
#[command(trailing_var_arg = true)]
pub struct Cli {
    /// An action (`gen_config`, `upgrade_config`, `restart`) or the arguments of a build.
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}
