// src/system/project_cli.rs

use crate::constants::PROJECT_CLI;
use crate::core::task_executor::{StepFailure, StepResult};
use crate::system::executor::CommandRunner;
use colored::Colorize;
use std::collections::HashMap;
use std::path::Path;

/// Exit code recorded when the project CLI itself cannot be started.
const NOT_STARTED_CODE: i32 = 127;

/// Wraps invocations of the `cordova` command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectCli {
    debug: bool,
}

impl ProjectCli {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// `cordova [-d] <args>`
    pub fn command_line(&self, args: &str) -> String {
        if self.debug {
            format!("{} -d {}", PROJECT_CLI, args.trim())
        } else {
            format!("{} {}", PROJECT_CLI, args.trim())
        }
    }

    /// Runs a project CLI command. A non-zero exit is a recoverable failure.
    pub fn run(
        &self,
        runner: &mut dyn CommandRunner,
        cwd: &Path,
        env_vars: &HashMap<String, String>,
        args: &str,
    ) -> StepResult {
        let command_line = self.command_line(args);
        println!("Executing command: {}", command_line.cyan());

        match runner.run(&command_line, cwd, env_vars, false) {
            Ok(0) => Ok(()),
            Ok(code) => {
                log::warn!("'{}' exited with code {}.", command_line, code);
                Err(StepFailure::Code(code))
            }
            Err(e) => Err(StepFailure::Unrecoverable {
                code: NOT_STARTED_CODE,
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::executor::testing::RecordingRunner;

    #[test]
    fn test_debug_flag_is_inserted() {
        assert_eq!(ProjectCli::new(false).command_line("prepare"), "cordova prepare");
        assert_eq!(ProjectCli::new(true).command_line(" prepare "), "cordova -d prepare");
    }

    #[test]
    fn test_exit_codes_map_to_step_results() {
        let mut runner = RecordingRunner::default();
        runner.exit_codes.insert("cordova plugin add x".to_string(), 8);
        let cli = ProjectCli::new(false);
        let env = HashMap::new();

        assert_eq!(cli.run(&mut runner, Path::new("/tmp"), &env, "prepare"), Ok(()));
        assert_eq!(
            cli.run(&mut runner, Path::new("/tmp"), &env, "plugin add x"),
            Err(StepFailure::Code(8))
        );
        assert_eq!(
            runner.commands(),
            vec!["cordova prepare", "cordova plugin add x"]
        );
    }
}
