// src/cli/handlers/upgrade_config.rs

use anyhow::Result;
use colored::*;
use std::path::Path;

use crate::core::{
    config_store::{self, UpgradeReport, UpgradeScope},
    paths::{ConfigLocations, display_path},
    schema::Schema,
};

/// Brings the global file, and the local file when present, up to the current schema.
/// The local file only gets renames and sub-fields of the objects it already has.
pub fn handle(_args: Vec<String>) -> Result<()> {
    let locations = ConfigLocations::from_env()?;
    let schema = Schema::standard();
    let renames = Schema::standard_renames();

    // The global file is seeded first so there is always something to upgrade.
    let global = config_store::load_or_create_global(&locations, &schema)?;
    if global.created {
        println!(
            "Created global configuration file {}",
            display_path(&locations.global).cyan()
        );
    }

    let tiers = [
        (&locations.global, UpgradeScope::AllFields),
        (&locations.local, UpgradeScope::PresentFields),
    ];
    for (path, scope) in tiers {
        if let Some(report) = config_store::upgrade_file(path, &schema, &renames, scope)? {
            print_report(path, &report);
        }
    }
    Ok(())
}

fn print_report(path: &Path, report: &UpgradeReport) {
    let path = display_path(path);
    if !report.changed() {
        println!("{} is up to date", path.cyan());
        return;
    }

    println!("Upgraded {}", path.cyan());
    for (old, new) in &report.renamed {
        println!("  renamed {} -> {}", old.yellow(), new.green());
    }
    for field in &report.inserted {
        println!("  added {}", field.green());
    }
}
