// src/cli/handlers/gen_config.rs

use anyhow::Result;
use colored::*;

use crate::core::{config_store, paths::ConfigLocations, paths::display_path, schema::Schema};

/// Ensures the global configuration file exists without running a build.
pub fn handle(_args: Vec<String>) -> Result<()> {
    let locations = ConfigLocations::from_env()?;
    let global = config_store::load_or_create_global(&locations, &Schema::standard())?;
    let path = display_path(&locations.global);

    if global.created {
        println!("Created global configuration file {}", path.cyan());
    } else {
        println!("Global configuration file {} already exists", path.cyan());
    }
    Ok(())
}
