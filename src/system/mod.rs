//! # System Interaction Layer
//!
//! Everything that touches the world outside the process: spawning commands,
//! probing for installed tools, and editing files of the generated project.
//!
//! ## Modules
//!
//! - **`executor`**: Spawns external processes. The `CommandRunner` trait is the
//!   seam that build steps call through, so tests can record commands instead of
//!   running them.
//! - **`project_cli`**: Builds and runs `cordova` command lines.
//! - **`proxy`**: Switches the npm and git proxy configuration on and off.
//! - **`toolchain`**: Detects whether `git` and `npm` are on the `PATH`.
//! - **`xml_patch`**: Rewrites top-level elements of the project's `config.xml`.

pub mod executor;
pub mod project_cli;
pub mod proxy;
pub mod toolchain;
pub mod xml_patch;
