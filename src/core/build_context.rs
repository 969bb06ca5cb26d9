// src/core/build_context.rs

//! The execution context of a build and the operations registered against it.
//!
//! Instructions name their operation as `collaborator.operation`. The names below
//! are what ends up in `cva-create-restart.json`, so renaming one breaks resuming
//! builds started with an older version.

use crate::constants::SEPARATOR;
use crate::core::task_executor::{OperationRegistry, StepFailure, StepResult, arg_str, arg_value};
use crate::models::{Settings, XmlElement};
use crate::system::executor::CommandRunner;
use crate::system::project_cli::ProjectCli;
use crate::system::proxy::{ProxyHandler, Toggle};
use crate::system::toolchain::ToolAvailability;
use crate::system::xml_patch;
use colored::Colorize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

// --- Collaborator and operation names ---

pub const CONSOLE: &str = "console";
pub const CORDOVA: &str = "cordova";
pub const WORKSPACE: &str = "workspace";
pub const PROXY: &str = "proxy";
pub const XML: &str = "xml";

pub const SECTION: &str = "section";
pub const INFO: &str = "info";
pub const WARN: &str = "warn";
pub const RUN: &str = "run";
pub const ENTER: &str = "enter";
pub const SET_NPM_PROXY: &str = "setNpmProxy";
pub const SET_GIT_PROXY: &str = "setGitProxy";
pub const ADJUST: &str = "adjust";
/// Registered on the root context.
pub const NOOP: &str = "noop";

/// Everything the build operations share while a plan runs.
pub struct BuildContext<'r> {
    pub settings: Settings,
    /// Directory the tool was started from. Relative plan paths resolve against it.
    pub base_dir: PathBuf,
    /// Directory later subprocesses run in. Moved by `workspace.enter`.
    pub working_dir: PathBuf,
    pub project_cli: ProjectCli,
    pub proxy: ProxyHandler,
    pub runner: &'r mut dyn CommandRunner,
}

impl<'r> BuildContext<'r> {
    /// Rebuilds every collaborator from `settings`.
    pub fn new(
        settings: Settings,
        base_dir: &Path,
        tools: ToolAvailability,
        runner: &'r mut dyn CommandRunner,
    ) -> Self {
        let project_cli = ProjectCli::new(settings.cordova_debug);
        let proxy = ProxyHandler::new(&settings.proxy, tools);
        Self {
            settings,
            base_dir: base_dir.to_path_buf(),
            working_dir: base_dir.to_path_buf(),
            project_cli,
            proxy,
            runner,
        }
    }
}

impl fmt::Debug for BuildContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("base_dir", &self.base_dir)
            .field("working_dir", &self.working_dir)
            .field("project_cli", &self.project_cli)
            .field("proxy", &self.proxy)
            .finish_non_exhaustive()
    }
}

/// Registers every operation a build plan may refer to.
pub fn register_operations<'r>(registry: &mut OperationRegistry<'_, BuildContext<'r>>) {
    registry
        .register(Some(CONSOLE), SECTION, console_section)
        .register(Some(CONSOLE), INFO, console_info)
        .register(Some(CONSOLE), WARN, console_warn)
        .register(Some(CORDOVA), RUN, cordova_run)
        .register(Some(WORKSPACE), ENTER, workspace_enter)
        .register(Some(PROXY), SET_NPM_PROXY, set_npm_proxy)
        .register(Some(PROXY), SET_GIT_PROXY, set_git_proxy)
        .register(Some(XML), ADJUST, xml_adjust)
        .register(None, NOOP, noop);
}

// --- console ---

fn console_section(_ctx: &mut BuildContext<'_>, args: &[Value]) -> StepResult {
    let title = arg_str(args, 0)?;
    println!("\n\n{}", SEPARATOR.yellow());
    println!("  {}", title.yellow());
    println!("{}", SEPARATOR.yellow());
    Ok(())
}

fn console_info(_ctx: &mut BuildContext<'_>, args: &[Value]) -> StepResult {
    println!("\n{}", arg_str(args, 0)?.yellow());
    Ok(())
}

fn console_warn(_ctx: &mut BuildContext<'_>, args: &[Value]) -> StepResult {
    for index in 0..args.len() {
        let message = arg_str(args, index)?;
        log::warn!("{}", message);
        println!("{} {}", "Warning:".yellow().bold(), message);
    }
    Ok(())
}

// --- cordova ---

fn cordova_run(ctx: &mut BuildContext<'_>, args: &[Value]) -> StepResult {
    let cli_args = arg_str(args, 0)?;
    let env_vars = ctx.proxy.env_vars();
    ctx.project_cli
        .run(&mut *ctx.runner, &ctx.working_dir, &env_vars, cli_args)
}

// --- workspace ---

/// Moves the working directory into the generated project. Later steps would
/// act on the wrong directory if this failed, so failure stops the pass.
fn workspace_enter(ctx: &mut BuildContext<'_>, args: &[Value]) -> StepResult {
    let target = ctx.base_dir.join(arg_str(args, 0)?);
    if !target.is_dir() {
        return Err(StepFailure::Unrecoverable {
            code: 1,
            reason: format!("project folder '{}' does not exist", target.display()),
        });
    }
    log::debug!("Working directory is now '{}'.", target.display());
    ctx.working_dir = target;
    Ok(())
}

// --- proxy ---

fn toggle_arg(args: &[Value]) -> Result<Toggle, StepFailure> {
    let raw = arg_str(args, 0)?;
    Toggle::parse(raw)
        .ok_or_else(|| StepFailure::BadArguments(format!("expected 'on' or 'off', got '{}'", raw)))
}

fn set_npm_proxy(ctx: &mut BuildContext<'_>, args: &[Value]) -> StepResult {
    let toggle = toggle_arg(args)?;
    ctx.proxy.set_npm_proxy(&mut *ctx.runner, &ctx.working_dir, toggle)
}

fn set_git_proxy(ctx: &mut BuildContext<'_>, args: &[Value]) -> StepResult {
    let toggle = toggle_arg(args)?;
    ctx.proxy.set_git_proxy(&mut *ctx.runner, &ctx.working_dir, toggle)
}

// --- xml ---

fn xml_adjust(ctx: &mut BuildContext<'_>, args: &[Value]) -> StepResult {
    let project_dir = PathBuf::from(arg_str(args, 0)?);
    let directives: Vec<XmlElement> = serde_json::from_value(arg_value(args, 1)?.clone())
        .map_err(|e| StepFailure::BadArguments(format!("invalid configXmlWidget list: {}", e)))?;

    println!("\n{}", "Adjusting config.xml".yellow());
    match xml_patch::adjust_config_xml(&project_dir, &directives, &mut *ctx.runner) {
        Ok(_) => Ok(()),
        Err(e) => {
            println!("{}", e.to_string().red());
            Err(StepFailure::Code(1))
        }
    }
}

// --- root ---

fn noop(_ctx: &mut BuildContext<'_>, _args: &[Value]) -> StepResult {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::instructions::{InstructionList, Outcome};
    use crate::core::task_executor::{self, ExecutorError};
    use crate::system::executor::testing::RecordingRunner;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn run_list(
        list: &mut InstructionList,
        settings: Settings,
        base: &Path,
        runner: &mut RecordingRunner,
    ) -> Result<PathBuf, ExecutorError> {
        let mut ctx = BuildContext::new(settings, base, ToolAvailability::default(), runner);
        let mut registry = OperationRegistry::new();
        register_operations(&mut registry);
        task_executor::run(list, &mut registry, &mut ctx)?;
        Ok(ctx.working_dir)
    }

    #[test]
    fn test_every_plan_operation_is_registered() {
        let mut registry: OperationRegistry<'_, BuildContext<'_>> = OperationRegistry::new();
        register_operations(&mut registry);
        for (collaborator, operation) in [
            (Some(CONSOLE), SECTION),
            (Some(CONSOLE), INFO),
            (Some(CONSOLE), WARN),
            (Some(CORDOVA), RUN),
            (Some(WORKSPACE), ENTER),
            (Some(PROXY), SET_NPM_PROXY),
            (Some(PROXY), SET_GIT_PROXY),
            (Some(XML), ADJUST),
            (None, NOOP),
        ] {
            assert!(registry.contains(collaborator, operation), "{}", operation);
        }
    }

    #[test]
    fn test_cordova_runs_in_entered_workspace() {
        let base = TempDir::new().unwrap();
        fs::create_dir(base.path().join("app")).unwrap();
        let settings = Settings {
            cordova_debug: true,
            ..Settings::default()
        };
        let mut list = InstructionList::new();
        list.append(Some(CORDOVA), RUN, vec![json!("create app com.x \"X\"")])
            .append_mandatory(Some(WORKSPACE), ENTER, vec![json!("app")])
            .append(Some(CORDOVA), RUN, vec![json!("platform add android")]);
        let mut runner = RecordingRunner::default();

        let working_dir = run_list(&mut list, settings, base.path(), &mut runner).unwrap();

        assert_eq!(working_dir, base.path().join("app"));
        assert_eq!(
            runner.commands(),
            vec!["cordova -d create app com.x \"X\"", "cordova -d platform add android"]
        );
        assert_eq!(runner.calls[0].1, base.path());
        assert_eq!(runner.calls[1].1, base.path().join("app"));
    }

    #[test]
    fn test_missing_project_folder_aborts() {
        let base = TempDir::new().unwrap();
        let mut list = InstructionList::new();
        list.append_mandatory(Some(WORKSPACE), ENTER, vec![json!("missing")])
            .append(Some(CORDOVA), RUN, vec![json!("prepare")]);
        let mut runner = RecordingRunner::default();

        let err = run_list(&mut list, Settings::default(), base.path(), &mut runner).unwrap_err();

        assert!(matches!(err, ExecutorError::Aborted { index: 0, code: 1, .. }));
        assert!(runner.calls.is_empty());
        assert_eq!(list.outcomes(), vec![Outcome::Failed(1), Outcome::Pending]);
    }

    #[test]
    fn test_bad_arguments_are_recorded() {
        let base = TempDir::new().unwrap();
        let mut list = InstructionList::new();
        list.append(Some(PROXY), SET_NPM_PROXY, vec![json!("sideways")])
            .append(Some(XML), ADJUST, vec![json!("/nowhere"), json!("not a list")])
            .append(None, NOOP, vec![]);
        let mut runner = RecordingRunner::default();

        run_list(&mut list, Settings::default(), base.path(), &mut runner).unwrap();

        assert_eq!(
            list.outcomes(),
            vec![Outcome::Failed(2), Outcome::Failed(2), Outcome::Success]
        );
    }

    #[test]
    fn test_xml_adjust_without_config_xml_fails() {
        let base = TempDir::new().unwrap();
        let mut list = InstructionList::new();
        list.append(
            Some(XML),
            ADJUST,
            vec![json!(base.path().to_string_lossy()), json!([])],
        );
        let mut runner = RecordingRunner::default();

        run_list(&mut list, Settings::default(), base.path(), &mut runner).unwrap();

        assert_eq!(list.outcomes(), vec![Outcome::Failed(1)]);
    }
}
