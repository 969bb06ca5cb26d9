// src/cli/handlers/build.rs

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::*;
use std::{env, fs};

use crate::{
    cli::{args::{BuildArgs, is_display_request}, handlers::commons},
    core::{build_plan, paths::ConfigLocations, paths::display_path, schema::Schema},
    system::{executor::SystemRunner, toolchain::ToolAvailability},
};

/// `cva-create <app_dir> <app_id> <app_name> [platform...]`
pub fn handle(args: Vec<String>) -> Result<()> {
    let build_args = match BuildArgs::try_parse_from(&args) {
        Ok(build_args) => build_args,
        Err(e) if is_display_request(&e) => e.exit(),
        Err(e) => return Err(e.into()),
    };
    let request = build_args.request();

    let locations = ConfigLocations::from_env()?;
    let schema = Schema::standard();
    let overrides = build_args.overrides();
    let (configuration, settings) = commons::load_effective(&locations, &schema, Some(&overrides))?;

    let tools = ToolAvailability::detect();
    commons::print_environment(tools, &settings);

    let base_dir = env::current_dir()?;
    let fq_target = base_dir.join(&request.target_dir);
    if fq_target.exists() {
        if settings.replace_target_dir {
            println!(
                "\n{}",
                format!("Replacing target folder {}", display_path(&fq_target)).yellow()
            );
            fs::remove_dir_all(&fq_target).with_context(|| {
                format!("Could not remove target folder '{}'", display_path(&fq_target))
            })?;
        } else {
            bail!("Target folder {} already exists", display_path(&fq_target));
        }
    }

    let platforms = if request.platforms.is_empty() {
        &settings.platform_list
    } else {
        &request.platforms
    };
    println!("\nApplication Name: {}", request.app_name.cyan());
    println!("Application ID: {}", request.app_id.cyan());
    println!("Target folder: {}", request.target_dir.cyan());
    println!("Target platforms: {}", platforms.join(", ").cyan());
    println!("Plugins: {}", settings.plugin_list.join(", ").cyan());

    let list = build_plan::assemble(&settings, &request, &fq_target, |p| p.exists());
    log::debug!("Assembled {} build instructions.", list.len());

    commons::execute_plan(list, &configuration, settings, &base_dir, tools, &mut SystemRunner)?;
    Ok(())
}
