//! `cva-create` scaffolds Cordova projects from a layered JSON configuration
//! and runs the build as a resumable list of instructions.

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod system;
