// src/core/paths.rs

use crate::constants::{CONFIG_FILENAME, HOME_ENV_VAR, RESTART_FILENAME};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error(
        "User home directory cannot be identified! Please set the environment variable {var} to a valid location."
    )]
    HomeDirectoryUnresolved { var: &'static str },
    #[error("Could not determine the current working directory: {0}")]
    CurrentDir(#[from] std::io::Error),
}

/// Where the two configuration tiers live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocations {
    /// `<home>/cva-create.json`, shared across projects.
    pub global: PathBuf,
    /// `./cva-create.json`, project-scoped and optional.
    pub local: PathBuf,
}

impl ConfigLocations {
    /// Resolves both locations from the process environment.
    pub fn from_env() -> Result<Self, PathError> {
        let home = resolve_home_with(|var| env::var(var).ok())?;
        let cwd = env::current_dir()?;
        Ok(Self::new(&home, &cwd))
    }

    pub fn new(home: &Path, working_dir: &Path) -> Self {
        Self {
            global: home.join(CONFIG_FILENAME),
            local: working_dir.join(CONFIG_FILENAME),
        }
    }
}

/// Resolves the home directory through `lookup`, which maps an environment
/// variable name to its value. An unset or empty variable is fatal.
pub fn resolve_home_with<F>(lookup: F) -> Result<PathBuf, PathError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(HOME_ENV_VAR) {
        Some(value) if !value.trim().is_empty() => Ok(PathBuf::from(value)),
        _ => Err(PathError::HomeDirectoryUnresolved { var: HOME_ENV_VAR }),
    }
}

/// The restart sidecar for builds started from `working_dir`.
pub fn restart_file_in(working_dir: &Path) -> PathBuf {
    working_dir.join(RESTART_FILENAME)
}

/// Expands `~` and environment variables in a user-supplied path value.
/// Falls back to the raw value when expansion is not possible.
pub fn expand_user_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(e) => {
            log::debug!("Could not expand path '{}': {}", raw, e);
            PathBuf::from(raw)
        }
    }
}

/// Strips Windows verbatim prefixes so paths read naturally in messages.
pub fn display_path(path: &Path) -> String {
    dunce::simplified(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_home_from_variable() {
        let home = resolve_home_with(|_| Some("/home/dev".to_string())).unwrap();
        assert_eq!(home, PathBuf::from("/home/dev"));
    }

    #[test]
    fn test_resolve_home_fails_when_unset_or_empty() {
        assert!(matches!(
            resolve_home_with(|_| None),
            Err(PathError::HomeDirectoryUnresolved { .. })
        ));
        assert!(matches!(
            resolve_home_with(|_| Some(String::new())),
            Err(PathError::HomeDirectoryUnresolved { .. })
        ));
    }

    #[test]
    fn test_locations_use_same_file_name() {
        let locations = ConfigLocations::new(Path::new("/home/dev"), Path::new("/work/app"));
        assert_eq!(locations.global, PathBuf::from("/home/dev/cva-create.json"));
        assert_eq!(locations.local, PathBuf::from("/work/app/cva-create.json"));
    }
}
