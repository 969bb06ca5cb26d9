// src/cli/handlers/mod.rs

// One module per action. `build` is the default when no action name matches.

pub mod build;
pub mod commons;
pub mod gen_config;
pub mod restart;
pub mod upgrade_config;
