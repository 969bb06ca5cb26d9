// src/cli/handlers/restart.rs

use anyhow::Result;
use colored::*;
use std::env;

use crate::{
    cli::handlers::commons,
    core::{paths::restart_file_in, restart_store::RestartStore},
    system::{executor::SystemRunner, toolchain::ToolAvailability},
};

/// Resumes the last build started from the current directory.
///
/// Steps that succeeded last time are skipped unless mandatory. Collaborators
/// are rebuilt from the configuration saved with the instructions, so edits to
/// the config files since then have no effect.
pub fn handle(_args: Vec<String>) -> Result<()> {
    let base_dir = env::current_dir()?;
    let state = RestartStore::new(restart_file_in(&base_dir)).load()?;
    let settings = commons::settings_from(&state.configuration)?;

    let tools = ToolAvailability::detect();
    commons::print_environment(tools, &settings);
    println!("{}", "Restarting from last failed step\n".yellow());

    commons::execute_plan(
        state.instructions,
        &state.configuration,
        settings,
        &base_dir,
        tools,
        &mut SystemRunner,
    )?;
    Ok(())
}
