// src/core/task_executor.rs

use crate::constants::UNKNOWN_OPERATION_CODE;
use crate::core::instructions::{BuildInstruction, InstructionList, Outcome};
use colored::Colorize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Why an operation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepFailure {
    /// A recoverable failure. The next step still runs.
    Code(i32),
    /// The stored arguments do not match what the operation expects.
    BadArguments(String),
    /// Continuing would corrupt state. The executor stops the pass.
    Unrecoverable { code: i32, reason: String },
}

impl StepFailure {
    const BAD_ARGUMENTS_CODE: i32 = 2;

    /// The numeric outcome recorded on the instruction. Never zero.
    pub fn code(&self) -> i32 {
        let raw = match self {
            StepFailure::Code(code) => *code,
            StepFailure::BadArguments(_) => Self::BAD_ARGUMENTS_CODE,
            StepFailure::Unrecoverable { code, .. } => *code,
        };
        if raw > 0 { raw } else { 1 }
    }
}

/// The result contract every registered operation conforms to.
pub type StepResult = Result<(), StepFailure>;

/// Converts a process exit code into a `StepResult`.
pub fn exit_code_to_result(code: i32) -> StepResult {
    if code == 0 {
        Ok(())
    } else {
        Err(StepFailure::Code(code))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("Step '{step}' failed with code {code} and cannot be recovered: {reason}")]
    Aborted {
        index: usize,
        step: String,
        code: i32,
        reason: String,
    },
}

type Operation<'a, C> = Box<dyn FnMut(&mut C, &[Value]) -> StepResult + 'a>;

/// Maps `(collaborator, operation)` names to invocable operations.
///
/// `C` is the execution context handed to every operation. Instructions only
/// store names, so a list restored from disk resolves against whatever registry
/// the current process has built.
pub struct OperationRegistry<'a, C> {
    operations: HashMap<(Option<String>, String), Operation<'a, C>>,
}

impl<'a, C> OperationRegistry<'a, C> {
    pub fn new() -> Self {
        Self {
            operations: HashMap::new(),
        }
    }

    /// Registers `operation` under `collaborator` (`None` for the root context).
    /// A later registration under the same names replaces the earlier one.
    pub fn register<F>(&mut self, collaborator: Option<&str>, operation: &str, f: F) -> &mut Self
    where
        F: FnMut(&mut C, &[Value]) -> StepResult + 'a,
    {
        self.operations.insert(
            (collaborator.map(str::to_string), operation.to_string()),
            Box::new(f),
        );
        self
    }

    pub fn contains(&self, collaborator: Option<&str>, operation: &str) -> bool {
        self.operations
            .contains_key(&(collaborator.map(str::to_string), operation.to_string()))
    }

    fn lookup(&mut self, instruction: &BuildInstruction) -> Option<&mut Operation<'a, C>> {
        self.operations
            .get_mut(&(instruction.collaborator.clone(), instruction.operation.clone()))
    }
}

impl<C> Default for OperationRegistry<'_, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for OperationRegistry<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self
            .operations
            .keys()
            .map(|(collaborator, operation)| match collaborator {
                Some(c) => format!("{}.{}", c, operation),
                None => operation.clone(),
            })
            .collect();
        names.sort();
        f.debug_struct("OperationRegistry")
            .field("operations", &names)
            .finish()
    }
}

/// A step whose final outcome is a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedStep {
    pub index: usize,
    pub name: String,
    pub code: i32,
}

/// Aggregate of one execution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: usize,
    pub skipped: usize,
    pub failed: Vec<FailedStep>,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs every instruction of `list` in order against `registry`.
///
/// Steps that already succeeded are skipped unless they are mandatory. A failing
/// step is recorded on the instruction and the pass moves on. Only an
/// `Unrecoverable` failure stops the pass early; the list is still updated up to
/// and including that step, so it can be saved and resumed.
pub fn run<C>(
    list: &mut InstructionList,
    registry: &mut OperationRegistry<'_, C>,
    context: &mut C,
) -> Result<RunSummary, ExecutorError> {
    let mut summary = RunSummary::default();

    for (index, instruction) in list.iter_mut().enumerate() {
        if !instruction.needs_run() {
            println!(
                "{}",
                format!("Skipping successful step \"{}\"", instruction.step_name()).dimmed()
            );
            summary.skipped += 1;
            continue;
        }

        summary.executed += 1;
        log::debug!("Executing step {}: {}", index, instruction.step_name_with_args());

        let result = match registry.lookup(instruction) {
            Some(operation) => operation(context, &instruction.args),
            None => {
                log::error!(
                    "No operation registered for step '{}'.",
                    instruction.step_name()
                );
                Err(StepFailure::Code(UNKNOWN_OPERATION_CODE))
            }
        };

        match result {
            Ok(()) => instruction.outcome = Outcome::Success,
            Err(failure) => {
                let code = failure.code();
                instruction.outcome = Outcome::Failed(code);
                match failure {
                    StepFailure::Unrecoverable { reason, .. } => {
                        return Err(ExecutorError::Aborted {
                            index,
                            step: instruction.step_name_with_args(),
                            code,
                            reason,
                        });
                    }
                    StepFailure::BadArguments(message) => {
                        log::warn!("Step '{}' rejected its arguments: {}", instruction.step_name(), message);
                    }
                    StepFailure::Code(_) => {
                        log::debug!("Step '{}' failed with code {}.", instruction.step_name(), code);
                    }
                }
            }
        }
    }

    summary.failed = failed_steps(list);
    Ok(summary)
}

/// Every instruction whose last outcome is a failure, in list order.
pub fn failed_steps(list: &InstructionList) -> Vec<FailedStep> {
    list.failed()
        .into_iter()
        .map(|(index, instruction)| FailedStep {
            index,
            name: instruction.step_name_with_args(),
            code: instruction.outcome.code(),
        })
        .collect()
}

// --- Argument helpers for operations ---

pub fn arg_str<'v>(args: &'v [Value], index: usize) -> Result<&'v str, StepFailure> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| StepFailure::BadArguments(format!("argument {} must be a string", index)))
}

pub fn arg_value(args: &[Value], index: usize) -> Result<&Value, StepFailure> {
    args.get(index)
        .ok_or_else(|| StepFailure::BadArguments(format!("argument {} is missing", index)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Test context: records which steps ran.
    #[derive(Default)]
    struct Trace {
        calls: Vec<String>,
    }

    fn registry_with_codes<'a>(codes: &'a HashMap<&'static str, i32>) -> OperationRegistry<'a, Trace> {
        let mut registry = OperationRegistry::new();
        for name in ["a", "b", "c"] {
            registry.register(Some("steps"), name, move |trace: &mut Trace, _args: &[Value]| {
                trace.calls.push(name.to_string());
                exit_code_to_result(*codes.get(name).unwrap_or(&0))
            });
        }
        registry
    }

    fn abc_list() -> InstructionList {
        let mut list = InstructionList::new();
        list.append(Some("steps"), "a", vec![]);
        list.append(Some("steps"), "b", vec![json!("x")]);
        list.append_mandatory(Some("steps"), "c", vec![]);
        list
    }

    #[test]
    fn test_runs_in_order_and_records_outcomes() {
        let codes = HashMap::from([("b", 3)]);
        let mut registry = registry_with_codes(&codes);
        let mut list = abc_list();
        let mut trace = Trace::default();

        let summary = run(&mut list, &mut registry, &mut trace).unwrap();

        assert_eq!(trace.calls, vec!["a", "b", "c"]);
        assert_eq!(
            list.outcomes(),
            vec![Outcome::Success, Outcome::Failed(3), Outcome::Success]
        );
        assert_eq!(summary.executed, 3);
        assert_eq!(summary.skipped, 0);
        assert_eq!(
            summary.failed,
            vec![FailedStep {
                index: 1,
                name: "steps.b(x)".to_string(),
                code: 3
            }]
        );
    }

    #[test]
    fn test_second_pass_skips_successes_but_not_mandatory() {
        let codes = HashMap::from([("b", 3)]);
        let mut registry = registry_with_codes(&codes);
        let mut list = abc_list();
        run(&mut list, &mut registry, &mut Trace::default()).unwrap();

        let fixed = HashMap::new();
        let mut registry = registry_with_codes(&fixed);
        let mut trace = Trace::default();
        let summary = run(&mut list, &mut registry, &mut trace).unwrap();

        assert_eq!(trace.calls, vec!["b", "c"]);
        assert_eq!(summary.skipped, 1);
        assert!(summary.succeeded());
        assert!(list.outcomes().iter().all(|o| o.is_success()));
    }

    #[test]
    fn test_unknown_operation_is_a_failure_not_an_abort() {
        let codes = HashMap::new();
        let mut registry = registry_with_codes(&codes);
        let mut list = InstructionList::new();
        list.append(Some("ghost"), "vanish", vec![]);
        list.append(Some("steps"), "a", vec![]);
        let mut trace = Trace::default();

        let summary = run(&mut list, &mut registry, &mut trace).unwrap();

        assert_eq!(list.outcomes(), vec![Outcome::Failed(127), Outcome::Success]);
        assert_eq!(trace.calls, vec!["a"]);
        assert_eq!(summary.failed.len(), 1);
    }

    #[test]
    fn test_failure_with_non_positive_code_is_still_a_failure() {
        let mut registry: OperationRegistry<'_, Trace> = OperationRegistry::new();
        registry.register(None, "odd", |_, _| Err(StepFailure::Code(0)));
        registry.register(None, "args", |_, args| arg_str(args, 0).map(|_| ()));
        let mut list = InstructionList::new();
        list.append(None, "odd", vec![]);
        list.append(None, "args", vec![json!(5)]);

        run(&mut list, &mut registry, &mut Trace::default()).unwrap();
        assert_eq!(list.outcomes(), vec![Outcome::Failed(1), Outcome::Failed(2)]);
    }

    #[test]
    fn test_unrecoverable_failure_stops_the_pass() {
        let mut registry: OperationRegistry<'_, Trace> = OperationRegistry::new();
        registry.register(None, "ok", |t, _| {
            t.calls.push("ok".into());
            Ok(())
        });
        registry.register(None, "fatal", |_, _| {
            Err(StepFailure::Unrecoverable {
                code: 4,
                reason: "create failed".into(),
            })
        });
        let mut list = InstructionList::new();
        list.append(None, "ok", vec![]);
        list.append(None, "fatal", vec![]);
        list.append(None, "ok", vec![]);
        let mut trace = Trace::default();

        let err = run(&mut list, &mut registry, &mut trace).unwrap_err();

        assert!(matches!(err, ExecutorError::Aborted { index: 1, code: 4, .. }));
        assert_eq!(
            list.outcomes(),
            vec![Outcome::Success, Outcome::Failed(4), Outcome::Pending]
        );
        assert_eq!(trace.calls, vec!["ok"]);
    }

    #[test]
    fn test_registry_debug_lists_names() {
        let mut registry: OperationRegistry<'_, Trace> = OperationRegistry::new();
        registry.register(Some("cordova"), "run", |_, _| Ok(()));
        registry.register(None, "noop", |_, _| Ok(()));
        assert!(registry.contains(Some("cordova"), "run"));
        assert!(!registry.contains(None, "run"));
        assert_eq!(
            format!("{:?}", registry),
            "OperationRegistry { operations: [\"cordova.run\", \"noop\"] }"
        );
    }
}
