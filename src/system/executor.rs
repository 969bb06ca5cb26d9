// src/system/executor.rs

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command as StdCommand, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command could not be parsed: {0}")]
    CommandParse(String),
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
    #[error("Command '{0}' exited with a non-zero error code.")]
    NonZeroExitStatus(String),
    #[error("Command '{0}' was terminated by a signal.")]
    Terminated(String),
    #[error("Command '{command}' produced output that was not valid UTF-8")]
    InvalidUtf8Output {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// Runs external commands on behalf of build steps.
///
/// Build steps only ever see this trait, so tests can substitute a recorder for
/// the real process spawner.
pub trait CommandRunner {
    /// Runs `command_line` to completion and returns its exit code.
    /// With `silent`, the command's output is discarded instead of shown.
    fn run(
        &mut self,
        command_line: &str,
        cwd: &Path,
        env_vars: &HashMap<String, String>,
        silent: bool,
    ) -> Result<i32, ExecutionError>;

    /// Runs `command_line` and returns its standard output.
    fn capture(&mut self, command_line: &str, cwd: &Path) -> Result<String, ExecutionError>;
}

/// The real `CommandRunner`, backed by `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &mut self,
        command_line: &str,
        cwd: &Path,
        env_vars: &HashMap<String, String>,
        silent: bool,
    ) -> Result<i32, ExecutionError> {
        execute_command(command_line, cwd, env_vars, silent)
    }

    fn capture(&mut self, command_line: &str, cwd: &Path) -> Result<String, ExecutionError> {
        execute_and_capture_output(command_line, cwd, &HashMap::new())
    }
}

/// Executes a system command and blocks until it finishes.
///
/// Returns the exit code. Spawning problems are errors; a non-zero exit is not,
/// because callers decide what a given code means.
pub fn execute_command(
    command_line: &str,
    cwd: &Path,
    env_vars: &HashMap<String, String>,
    silent: bool,
) -> Result<i32, ExecutionError> {
    let trimmed_command = command_line.trim();
    if trimmed_command.is_empty() {
        return Ok(0); // An empty command is a success, not an error.
    }

    let parts = shlex::split(trimmed_command)
        .ok_or_else(|| ExecutionError::CommandParse(trimmed_command.to_string()))?;
    let (program, args) = match parts.split_first() {
        Some(split) => split,
        None => return Ok(0),
    };
    let clean_cwd = dunce::simplified(cwd);

    let output_mode = || if silent { Stdio::null() } else { Stdio::inherit() };

    let mut command = StdCommand::new(program);
    command
        .args(args)
        .current_dir(clean_cwd)
        .envs(env_vars)
        .stdout(output_mode())
        .stderr(output_mode());

    // Fallback logic for Windows, where `cordova` and `npm` are `.cmd` shims.
    // We try to spawn directly first. If it fails with `NotFound`, we try with `cmd /C`.
    let status = match command.status() {
        Ok(status) => status,
        Err(e) if e.kind() == ErrorKind::NotFound && cfg!(target_os = "windows") => {
            log::debug!("Command '{}' not found. Retrying with cmd /C.", program);
            StdCommand::new("cmd")
                .arg("/C")
                .arg(trimmed_command) // Pass the full, unparsed line to cmd
                .current_dir(clean_cwd)
                .envs(env_vars)
                .stdout(output_mode())
                .stderr(output_mode())
                .status()
                .map_err(|e| ExecutionError::CommandFailed(trimmed_command.to_string(), e))?
        }
        Err(e) => {
            return Err(ExecutionError::CommandFailed(trimmed_command.to_string(), e));
        }
    };

    status
        .code()
        .ok_or_else(|| ExecutionError::Terminated(trimmed_command.to_string()))
}

/// Executes a command and captures its standard output.
/// Stderr is passed through to the user's terminal.
/// It is intended for short-running commands used for text substitution.
pub fn execute_and_capture_output(
    command_line: &str,
    cwd: &Path,
    env_vars: &HashMap<String, String>,
) -> Result<String, ExecutionError> {
    let trimmed_command = command_line.trim();
    if trimmed_command.is_empty() {
        return Ok(String::new());
    }

    let parts = shlex::split(trimmed_command)
        .ok_or_else(|| ExecutionError::CommandParse(trimmed_command.to_string()))?;
    let (program, args) = match parts.split_first() {
        Some(split) => split,
        None => return Ok(String::new()),
    };
    let clean_cwd = dunce::simplified(cwd);

    let command_output = StdCommand::new(program)
        .args(args)
        .current_dir(clean_cwd)
        .envs(env_vars)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|e| ExecutionError::CommandFailed(trimmed_command.to_string(), e))?;

    if !command_output.status.success() {
        return Err(ExecutionError::NonZeroExitStatus(
            trimmed_command.to_string(),
        ));
    }

    String::from_utf8(command_output.stdout).map_err(|e| ExecutionError::InvalidUtf8Output {
        command: trimmed_command.to_string(),
        source: e,
    })
}


#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_exit_code_is_returned() {
        let dir = TempDir::new().unwrap();
        let code = execute_command("sh -c 'exit 3'", dir.path(), &HashMap::new(), true).unwrap();
        assert_eq!(code, 3);
    }

    #[test]
    fn test_empty_command_is_success() {
        let dir = TempDir::new().unwrap();
        assert_eq!(execute_command("   ", dir.path(), &HashMap::new(), true).unwrap(), 0);
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = execute_command(
            "definitely-not-a-real-program-xyz",
            dir.path(),
            &HashMap::new(),
            true,
        );
        assert!(matches!(result, Err(ExecutionError::CommandFailed(..))));
    }

    #[test]
    fn test_capture_uses_env_and_cwd() {
        let dir = TempDir::new().unwrap();
        let env = HashMap::from([("CVA_TEST_VALUE".to_string(), "hello".to_string())]);
        let output =
            execute_and_capture_output("sh -c 'echo $CVA_TEST_VALUE'", dir.path(), &env).unwrap();
        assert_eq!(output, "hello\n");
    }

    #[test]
    fn test_unbalanced_quotes_fail_to_parse() {
        let dir = TempDir::new().unwrap();
        let result = execute_command("echo \"oops", dir.path(), &HashMap::new(), true);
        assert!(matches!(result, Err(ExecutionError::CommandParse(_))));
    }
}
