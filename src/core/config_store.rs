//! # Config Store
//!
//! Loads, seeds, persists and upgrades the two `cva-create.json` tiers.
//!
//! The store never merges. It hands raw documents to `config_merger`, with one
//! exception: `upgrade_schema`, which fills in fields the on-disk document is
//! missing so that older files keep working after the schema grows. The local
//! tier only ever holds overrides, so it is upgraded with `UpgradeScope::PresentFields`.
//!
//! Unlike an ordinary merge, an upgrade never drops a field it does not know
//! about. A local file may carry settings for a newer release, and the user is
//! the only one who should delete them.
use crate::constants::CONFIG_FILE_MODE;
use crate::core::paths::ConfigLocations;
use crate::core::schema::{RenameRule, Schema};
use crate::models::Configuration;
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Could not read configuration file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Configuration file '{path}' is not valid JSON: {source}")]
    InvalidConfigFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Configuration file '{path}' must contain a JSON object at the top level.")]
    NotAnObject { path: String },
    #[error("Unable to write to file '{path}' (OS error code {code:?}): {source}")]
    WriteError {
        path: String,
        code: Option<i32>,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

type StoreResult<T> = Result<T, StoreError>;

/// Result of `load_or_create_global`.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalLoad {
    pub config: Configuration,
    /// `true` when the file did not exist and was seeded from the defaults.
    pub created: bool,
}

/// What an upgrade changed, for reporting to the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpgradeReport {
    pub config: Configuration,
    /// `(old, new)` pairs of renames that were applied.
    pub renamed: Vec<(String, String)>,
    /// Dotted paths of fields inserted with their default value.
    pub inserted: Vec<String>,
}

impl UpgradeReport {
    pub fn changed(&self) -> bool {
        !self.renamed.is_empty() || !self.inserted.is_empty()
    }
}

/// Which schema fields an upgrade may add to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeScope {
    /// Every missing field is inserted. Used for the global file.
    AllFields,
    /// Only sub-fields of objects the document already has are filled in.
    /// Absent top-level fields stay absent so lower layers keep their values.
    PresentFields,
}

// --- PUBLIC API ---

/// Returns the global configuration, creating the file from `schema` defaults
/// when it does not exist yet. An existing file is returned verbatim.
pub fn load_or_create_global(locations: &ConfigLocations, schema: &Schema) -> StoreResult<GlobalLoad> {
    if let Some(config) = read_config(&locations.global)? {
        log::debug!("Read global configuration from '{}'.", locations.global.display());
        return Ok(GlobalLoad {
            config,
            created: false,
        });
    }

    log::debug!(
        "Global configuration '{}' not found. Seeding it from defaults.",
        locations.global.display()
    );
    let defaults = schema.defaults();
    persist(&locations.global, &defaults)?;
    Ok(GlobalLoad {
        config: defaults,
        created: true,
    })
}

/// Returns the local configuration, or `None` when the project has no local file.
/// The local file is never created.
pub fn load_local(locations: &ConfigLocations) -> StoreResult<Option<Configuration>> {
    read_config(&locations.local)
}

/// Writes `config` as pretty-printed JSON (2-space indentation) and applies
/// owner-rw/group-r/other-r permissions.
pub fn persist(path: &Path, config: &Configuration) -> StoreResult<()> {
    let json = serde_json::to_string_pretty(config)?;
    write_with_mode(path, &json)
}

/// Upgrades an on-disk configuration to `schema`.
///
/// 1. Every rename in `renames` is applied.
/// 2. With `UpgradeScope::AllFields`, every schema field missing from `on_disk`
///    is inserted with its default. Nested objects present on both sides are
///    upgraded recursively under either scope.
/// 3. Fields unknown to the schema are left alone.
///
/// Running the upgrade on its own output changes nothing.
pub fn upgrade_schema(
    on_disk: &Configuration,
    schema: &Schema,
    renames: &[RenameRule],
    scope: UpgradeScope,
) -> UpgradeReport {
    let mut config = on_disk.clone();
    let mut renamed = Vec::new();

    for rule in renames {
        if apply_rename(&mut config, rule) {
            renamed.push((rule.old_field.to_string(), rule.new_field.to_string()));
        }
    }

    let mut inserted = Vec::new();
    for field in schema.fields() {
        match config.get_mut(field.name) {
            None if scope == UpgradeScope::AllFields => {
                config.insert(field.name, field.default.clone());
                inserted.push(field.name.to_string());
            }
            None => {}
            Some(Value::Object(existing)) => {
                if let Value::Object(template) = &field.default {
                    fill_missing(existing, template, field.name, &mut inserted);
                }
            }
            Some(_) => {}
        }
    }

    UpgradeReport {
        config,
        renamed,
        inserted,
    }
}

/// Reads, upgrades and rewrites the file at `path`. Returns `None` when there
/// is no file to upgrade. The file is only rewritten when something changed.
pub fn upgrade_file(
    path: &Path,
    schema: &Schema,
    renames: &[RenameRule],
    scope: UpgradeScope,
) -> StoreResult<Option<UpgradeReport>> {
    let on_disk = match read_config(path)? {
        Some(config) => config,
        None => return Ok(None),
    };

    let report = upgrade_schema(&on_disk, schema, renames, scope);
    if report.changed() {
        persist(path, &report.config)?;
    } else {
        log::debug!("'{}' is already up to date.", path.display());
    }
    Ok(Some(report))
}

/// Reads a configuration file. A missing file is `Ok(None)`.
pub fn read_config(path: &Path) -> StoreResult<Option<Configuration>> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StoreError::Read {
                path: path.display().to_string(),
                source: e,
            });
        }
    };

    let value: Value =
        serde_json::from_str(&content).map_err(|e| StoreError::InvalidConfigFormat {
            path: path.display().to_string(),
            source: e,
        })?;

    Configuration::from_value(value)
        .map(Some)
        .ok_or_else(|| StoreError::NotAnObject {
            path: path.display().to_string(),
        })
}

/// Writes `content` to `path` and sets `CONFIG_FILE_MODE` on Unix.
pub(crate) fn write_with_mode(path: &Path, content: &str) -> StoreResult<()> {
    let to_write_error = |path: &Path, e: std::io::Error| StoreError::WriteError {
        path: path.display().to_string(),
        code: e.raw_os_error(),
        source: e,
    };

    fs::write(path, content).map_err(|e| to_write_error(path, e))?;
    set_mode(path).map_err(|e| to_write_error(path, e))
}

#[cfg(unix)]
fn set_mode(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(CONFIG_FILE_MODE))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

// --- Internal helpers ---

/// Applies one rename. Returns `true` if the document changed.
///
/// A legacy value that cannot be decoded is kept in place for manual
/// inspection and the new field is left for the structural pass to default.
fn apply_rename(config: &mut Configuration, rule: &RenameRule) -> bool {
    let old_value = match config.get(rule.old_field) {
        Some(v) => v.clone(),
        None => return false,
    };

    match (rule.transform)(&old_value) {
        Ok(new_value) => {
            if let Some(value) = new_value {
                if config.contains(rule.new_field) {
                    log::warn!(
                        "Both '{}' and '{}' are present. Keeping '{}' and discarding the legacy value.",
                        rule.old_field,
                        rule.new_field,
                        rule.new_field
                    );
                } else {
                    config.insert(rule.new_field, value);
                }
            }
            config.remove(rule.old_field);
            log::debug!("Renamed '{}' to '{}'.", rule.old_field, rule.new_field);
            true
        }
        Err(e) => {
            log::warn!(
                "Could not convert legacy field '{}' into '{}' ({}). Leaving it untouched.",
                rule.old_field,
                rule.new_field,
                e.0
            );
            false
        }
    }
}

fn fill_missing(
    target: &mut Map<String, Value>,
    template: &Map<String, Value>,
    prefix: &str,
    inserted: &mut Vec<String>,
) {
    for (key, default) in template {
        let path = format!("{}.{}", prefix, key);
        match target.get_mut(key) {
            None => {
                target.insert(key.clone(), default.clone());
                inserted.push(path);
            }
            Some(Value::Object(nested)) => {
                if let Value::Object(nested_template) = default {
                    fill_missing(nested, nested_template, &path, inserted);
                }
            }
            Some(_) => {}
        }
    }
}
