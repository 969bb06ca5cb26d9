// src/cli/handlers/commons.rs

// Shared steps of the handlers: loading configuration and running a plan.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::{
    constants::{SEPARATOR, TITLE},
    core::{
        build_context::{self, BuildContext},
        config_merger::{self, Layer},
        config_store,
        instructions::InstructionList,
        paths::{ConfigLocations, display_path, restart_file_in},
        restart_store::RestartStore,
        schema::Schema,
        task_executor::{self, FailedStep, OperationRegistry},
    },
    models::{Configuration, Settings},
    system::{executor::CommandRunner, toolchain::ToolAvailability},
};

pub fn print_banner() {
    println!("{}", SEPARATOR.green());
    println!("{}", TITLE.green());
    println!("{}", SEPARATOR.green());
}

/// Reports the host OS, which auxiliary tools exist, and the debug mode.
pub fn print_environment(tools: ToolAvailability, settings: &Settings) {
    let os = if cfg!(windows) { "Windows" } else { "*NIX" };
    let installed = |present: bool| if present { "is installed" } else { "is not installed" };

    println!("Running on {}", os);
    println!("\n{}", SEPARATOR.yellow());
    println!("{}", "  Checking local build environment".yellow());
    println!("{}", SEPARATOR.yellow());
    println!("git {}", installed(tools.git));
    println!("npm {}", installed(tools.npm));
    println!(
        "\nCordova debug mode is {}",
        if settings.cordova_debug { "enabled" } else { "disabled" }
    );
}

/// Loads both tiers, seeding the global file if needed, and merges them with
/// `overrides` on top. Returns the effective configuration and its typed view.
pub fn load_effective(
    locations: &ConfigLocations,
    schema: &Schema,
    overrides: Option<&Configuration>,
) -> Result<(Configuration, Settings)> {
    let global = config_store::load_or_create_global(locations, schema)?;
    if global.created {
        println!(
            "Created global configuration file {}",
            display_path(&locations.global).cyan()
        );
    }
    let local = config_store::load_local(locations)?;

    let mut layers = vec![Layer::new("global", &global.config)];
    if let Some(local) = &local {
        layers.push(Layer::new("local", local));
    }
    if let Some(overrides) = overrides {
        layers.push(Layer::new("command line", overrides));
    }

    let report = config_merger::merge_layers(schema, &layers);
    print_ignored(&report.ignored);
    let settings = settings_from(&report.config)?;
    Ok((report.config, settings))
}

/// Tells the user about fields the merge dropped.
pub fn print_ignored(ignored: &[(String, String)]) {
    for message in ignored_messages(ignored) {
        println!("{}", message.yellow());
    }
}

/// One line per `(layer, field)` pair.
pub fn ignored_messages(ignored: &[(String, String)]) -> Vec<String> {
    ignored
        .iter()
        .map(|(layer, field)| format!("Ignoring unknown property {} in the {} config file", field, layer))
        .collect()
}

/// Derives the typed view of an effective configuration.
pub fn settings_from(config: &Configuration) -> Result<Settings> {
    serde_json::from_value(config.clone().into_value())
        .context("The configuration does not have the expected shape")
}

/// Runs `list` with collaborators built from `settings`, saves the restart
/// state whatever happened, then prints the summary.
///
/// An aborted pass is returned as an error after the state has been saved.
pub fn execute_plan(
    mut list: InstructionList,
    configuration: &Configuration,
    settings: Settings,
    base_dir: &Path,
    tools: ToolAvailability,
    runner: &mut dyn CommandRunner,
) -> Result<Vec<FailedStep>> {
    let started = Instant::now();

    let outcome = {
        let mut context = BuildContext::new(settings, base_dir, tools, runner);
        let mut registry = OperationRegistry::new();
        build_context::register_operations(&mut registry);
        task_executor::run(&mut list, &mut registry, &mut context)
    };

    let store = RestartStore::new(restart_file_in(base_dir));
    store
        .save(&list, configuration)
        .context("Could not save the restart state")?;

    let failed = task_executor::failed_steps(&list);
    print_summary(&failed, started.elapsed());

    outcome?;
    Ok(failed)
}

pub fn print_summary(failed: &[FailedStep], elapsed: Duration) {
    if !failed.is_empty() {
        println!("\n{}", "The following build steps failed:".red());
        for step in failed {
            println!("{}", format!("{} (code {})", step.name, step.code).yellow());
        }
    }

    println!("\n{}", format!("Elapsed time (min:sec) = {}", format_elapsed(elapsed)).green());
    let message = match failed.len() {
        0 => "Build completed successfully.".to_string(),
        1 => "1 build step failed. Run 'cva-create restart' to retry it.".to_string(),
        n => format!("{} build steps failed. Run 'cva-create restart' to retry them.", n),
    };
    println!("{}", message.green());
}

/// `MM:SS.mmm`
pub fn format_elapsed(elapsed: Duration) -> String {
    let minutes = elapsed.as_secs() / 60;
    let seconds = elapsed.as_secs_f64() - (minutes * 60) as f64;
    format!("{:02}:{:06.3}", minutes, seconds)
}
