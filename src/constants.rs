// src/constants.rs

/// The name of the configuration file, used both in the home directory (global)
/// and in the current working directory (local).
pub const CONFIG_FILENAME: &str = "cva-create.json";

/// The name of the sidecar file holding the state of the last build, used by `restart`.
pub const RESTART_FILENAME: &str = "cva-create-restart.json";

/// The file patched by the `adjustConfigXml` step, relative to the project directory.
pub const CONFIG_XML_FILENAME: &str = "config.xml";

/// Environment variable holding the user's home directory.
#[cfg(windows)]
pub const HOME_ENV_VAR: &str = "USERPROFILE";
/// Environment variable holding the user's home directory.
#[cfg(not(windows))]
pub const HOME_ENV_VAR: &str = "HOME";

/// Permissions applied to every file we write: owner rw, group r, other r.
pub const CONFIG_FILE_MODE: u32 = 0o644;

/// The external project CLI wrapped by the build steps.
pub const PROJECT_CLI: &str = "cordova";

/// Outcome code recorded for an instruction whose operation is not registered.
pub const UNKNOWN_OPERATION_CODE: i32 = 127;

pub const SEPARATOR: &str = "************************************************************";
pub const TITLE: &str = "*                   C V A - C R E A T E                    *";
