// src/cli/args.rs
use crate::models::{BuildRequest, Configuration};
use clap::Parser;
use clap::error::ErrorKind;
use serde_json::{Value, json};

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)] // The handler receives the arguments without the program name
pub struct BuildArgs {
    /// Directory the project is created in, relative to the current directory.
    pub target_dir: String,

    /// Reverse-domain application identifier, e.g. `com.example.hello`.
    pub app_id: String,

    /// Human readable application name.
    pub app_name: String,

    /// Platforms to add. Defaults to `platformList` from the configuration.
    pub platforms: Vec<String>,

    /// Run every cordova command with `-d`.
    #[arg(long)]
    pub debug: bool,

    /// Run `cordova prepare` once the project is set up.
    #[arg(long)]
    pub prepare: bool,

    /// Replace the target directory if it already exists.
    #[arg(long)]
    pub replace: bool,
}

impl BuildArgs {
    pub fn request(&self) -> BuildRequest {
        BuildRequest {
            target_dir: self.target_dir.clone(),
            app_id: self.app_id.clone(),
            app_name: self.app_name.clone(),
            platforms: self.platforms.clone(),
        }
    }

    /// The command-line configuration layer. Flags only ever switch a setting
    /// on, so an unset flag leaves the file configuration alone.
    pub fn overrides(&self) -> Configuration {
        let mut layer = Configuration::new();
        if self.debug {
            layer.insert("cordovaDebug", Value::Bool(true));
        }
        if self.prepare {
            layer.insert("runPrepare", Value::Bool(true));
        }
        if self.replace {
            layer.insert("replaceTargetDir", Value::Bool(true));
        }
        if !self.platforms.is_empty() {
            layer.insert("platformList", json!(self.platforms));
        }
        layer
    }
}

/// `true` when clap stopped parsing to print help or version text rather than
/// because the arguments were wrong.
pub fn is_display_request(err: &clap::Error) -> bool {
    matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
}
