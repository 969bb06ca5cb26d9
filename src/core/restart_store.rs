// src/core/restart_store.rs

use crate::core::config_store::{self, StoreError};
use crate::core::instructions::InstructionList;
use crate::models::Configuration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RestartError {
    #[error(
        "No restart information found at '{path}'. A restart is only possible after a previous build has run in this directory."
    )]
    RestartStateMissing { path: String },
    #[error("Could not read restart file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Restart file '{path}' is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize restart state: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Write(#[from] StoreError),
}

/// A build snapshot: the instructions with their outcomes, and the configuration
/// they were built from.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RestartState {
    pub instructions: InstructionList,
    pub configuration: Configuration,
}

/// Persists build snapshots to a sidecar file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartStore {
    path: PathBuf,
}

impl RestartStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Writes the snapshot. Called after every pass, whether or not it succeeded.
    pub fn save(&self, instructions: &InstructionList, configuration: &Configuration) -> Result<(), RestartError> {
        #[derive(Serialize)]
        struct Snapshot<'a> {
            instructions: &'a InstructionList,
            configuration: &'a Configuration,
        }

        let json = serde_json::to_string_pretty(&Snapshot {
            instructions,
            configuration,
        })?;
        config_store::write_with_mode(&self.path, &json)?;
        log::debug!("Restart state saved to '{}'.", self.path.display());
        Ok(())
    }

    /// Reads the last snapshot back.
    pub fn load(&self) -> Result<RestartState, RestartError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RestartError::RestartStateMissing {
                    path: self.path.display().to_string(),
                });
            }
            Err(e) => {
                return Err(RestartError::Read {
                    path: self.path.display().to_string(),
                    source: e,
                });
            }
        };

        serde_json::from_str(&content).map_err(|e| RestartError::Corrupt {
            path: self.path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::instructions::Outcome;
    use crate::core::task_executor::{self, OperationRegistry, exit_code_to_result};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> RestartStore {
        RestartStore::new(dir.path().join("cva-create-restart.json"))
    }

    /// Every operation returns the code configured for its name and records its call.
    fn scripted_registry<'a>(codes: &'a HashMap<String, i32>) -> OperationRegistry<'a, Vec<String>> {
        let mut registry = OperationRegistry::new();
        for name in ["A", "B", "C"] {
            registry.register(None, name, move |calls: &mut Vec<String>, _: &[Value]| {
                calls.push(name.to_string());
                exit_code_to_result(codes.get(name).copied().unwrap_or(0))
            });
        }
        registry
    }

    #[test]
    fn test_load_without_file_is_restart_state_missing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(!store.exists());
        assert!(matches!(
            store.load(),
            Err(RestartError::RestartStateMissing { .. })
        ));
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{ \"instructions\": 4 }").unwrap();
        assert!(matches!(store.load(), Err(RestartError::Corrupt { .. })));
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut list = InstructionList::new();
        list.append(Some("cordova"), "run", vec![json!("prepare")]);
        let configuration = Configuration::from_value(json!({ "runPrepare": true })).unwrap();

        store.save(&list, &configuration).unwrap();
        let state = store.load().unwrap();

        assert_eq!(state.instructions, list);
        assert_eq!(state.configuration, configuration);

        let raw: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert!(raw.get("instructions").unwrap().is_array());
        assert!(raw.get("configuration").unwrap().is_object());
    }

    #[test]
    fn test_restart_resumes_from_failure() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let configuration = Configuration::new();

        let mut list = InstructionList::new();
        list.append(None, "A", vec![]);
        list.append(None, "B", vec![]);
        list.append_mandatory(None, "C", vec![]);

        // First run: B fails with code 3.
        let first_codes = HashMap::from([("B".to_string(), 3)]);
        let mut calls = Vec::new();
        task_executor::run(&mut list, &mut scripted_registry(&first_codes), &mut calls).unwrap();
        store.save(&list, &configuration).unwrap();
        assert_eq!(
            list.outcomes(),
            vec![Outcome::Success, Outcome::Failed(3), Outcome::Success]
        );

        // Restart: A is skipped, B retried, C runs again.
        let mut restored = store.load().unwrap().instructions;
        let no_failures = HashMap::new();
        let mut calls = Vec::new();
        let summary =
            task_executor::run(&mut restored, &mut scripted_registry(&no_failures), &mut calls)
                .unwrap();

        assert_eq!(calls, vec!["B", "C"]);
        assert_eq!(summary.skipped, 1);
        assert!(summary.succeeded());
    }

    #[test]
    fn test_pending_steps_after_abort_are_retried() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut list = InstructionList::new();
        list.append(None, "A", vec![]);
        list.append(None, "B", vec![]);
        list.append(None, "C", vec![]);

        let mut registry: OperationRegistry<'_, Vec<String>> = OperationRegistry::new();
        registry.register(None, "A", |calls, _| {
            calls.push("A".into());
            Ok(())
        });
        registry.register(None, "B", |_, _| {
            Err(task_executor::StepFailure::Unrecoverable {
                code: 1,
                reason: "boom".into(),
            })
        });
        assert!(task_executor::run(&mut list, &mut registry, &mut Vec::new()).is_err());
        store.save(&list, &Configuration::new()).unwrap();

        let mut restored = store.load().unwrap().instructions;
        assert_eq!(
            restored.outcomes(),
            vec![Outcome::Success, Outcome::Failed(1), Outcome::Pending]
        );
        let codes = HashMap::new();
        let mut calls = Vec::new();
        task_executor::run(&mut restored, &mut scripted_registry(&codes), &mut calls).unwrap();
        assert_eq!(calls, vec!["B", "C"]);
    }
}
