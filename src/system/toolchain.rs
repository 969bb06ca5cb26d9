// src/system/toolchain.rs

use std::env;
use std::path::Path;

/// Which auxiliary tools are installed. Proxy toggles only touch tools that exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToolAvailability {
    pub git: bool,
    pub npm: bool,
}

impl ToolAvailability {
    pub fn detect() -> Self {
        Self {
            git: is_executable_in_path("git"),
            npm: is_executable_in_path("npm"),
        }
    }
}

/// Looks `executable_name` up in every directory of `PATH`.
/// On Windows the usual launcher extensions are tried as well.
pub fn is_executable_in_path(executable_name: &str) -> bool {
    match env::var_os("PATH") {
        Some(path_var) => env::split_paths(&path_var).any(|dir| is_in_dir(&dir, executable_name)),
        None => false,
    }
}

fn is_in_dir(dir: &Path, executable_name: &str) -> bool {
    if cfg!(target_os = "windows") {
        ["", ".exe", ".cmd", ".bat"]
            .iter()
            .any(|ext| dir.join(format!("{}{}", executable_name, ext)).is_file())
    } else {
        dir.join(executable_name).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_in_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tool"), "").unwrap();
        assert!(is_in_dir(dir.path(), "tool"));
        assert!(!is_in_dir(dir.path(), "other"));
    }
}
