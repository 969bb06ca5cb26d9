// src/core/instructions.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The last known result of an instruction.
///
/// Serialized as a number so the restart file stays readable:
/// `-1` never run, `0` success, anything else the failure code.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(from = "i32", into = "i32")]
pub enum Outcome {
    #[default]
    Pending,
    Success,
    Failed(i32),
}

impl Outcome {
    const PENDING_CODE: i32 = -1;

    pub fn code(self) -> i32 {
        match self {
            Outcome::Pending => Self::PENDING_CODE,
            Outcome::Success => 0,
            Outcome::Failed(code) => code,
        }
    }

    pub fn is_success(self) -> bool {
        self == Outcome::Success
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl From<i32> for Outcome {
    fn from(code: i32) -> Self {
        match code {
            0 => Outcome::Success,
            c if c < 0 => Outcome::Pending,
            c => Outcome::Failed(c),
        }
    }
}

impl From<Outcome> for i32 {
    fn from(outcome: Outcome) -> Self {
        outcome.code()
    }
}

/// One deferred, named, replayable step of a build.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BuildInstruction {
    /// The registered collaborator owning the operation. `None` is the root context.
    pub collaborator: Option<String>,
    pub operation: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub outcome: Outcome,
    /// Mandatory steps run on every pass, even after succeeding.
    #[serde(default)]
    pub mandatory: bool,
}

impl BuildInstruction {
    pub fn new(collaborator: Option<&str>, operation: &str, args: Vec<Value>, mandatory: bool) -> Self {
        Self {
            collaborator: collaborator.map(str::to_string),
            operation: operation.to_string(),
            args,
            outcome: Outcome::Pending,
            mandatory,
        }
    }

    /// Whether the next pass has to invoke this step.
    pub fn needs_run(&self) -> bool {
        self.mandatory || !self.outcome.is_success()
    }

    /// `collaborator.operation()`, without arguments.
    pub fn step_name(&self) -> String {
        format!("{}{}()", self.qualifier(), self.operation)
    }

    /// `collaborator.operation(arg1,arg2)`, for failure reports.
    pub fn step_name_with_args(&self) -> String {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| match arg {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        format!("{}{}({})", self.qualifier(), self.operation, args.join(","))
    }

    fn qualifier(&self) -> String {
        match &self.collaborator {
            Some(name) => format!("{}.", name),
            None => String::new(),
        }
    }
}

impl fmt::Display for BuildInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.step_name())
    }
}

/// An ordered list of build instructions.
///
/// Construction only appends. Execution order is insertion order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct InstructionList {
    instructions: Vec<BuildInstruction>,
}

impl InstructionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an optional step, skipped on resume once it has succeeded.
    pub fn append(&mut self, collaborator: Option<&str>, operation: &str, args: Vec<Value>) -> &mut Self {
        self.push(BuildInstruction::new(collaborator, operation, args, false))
    }

    /// Adds a step that runs on every pass.
    pub fn append_mandatory(&mut self, collaborator: Option<&str>, operation: &str, args: Vec<Value>) -> &mut Self {
        self.push(BuildInstruction::new(collaborator, operation, args, true))
    }

    pub fn push(&mut self, instruction: BuildInstruction) -> &mut Self {
        self.instructions.push(instruction);
        self
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildInstruction> {
        self.instructions.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut BuildInstruction> {
        self.instructions.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&BuildInstruction> {
        self.instructions.get(index)
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.instructions.iter().map(|i| i.outcome).collect()
    }

    /// The instructions whose last outcome is a failure, with their positions.
    pub fn failed(&self) -> Vec<(usize, &BuildInstruction)> {
        self.instructions
            .iter()
            .enumerate()
            .filter(|(_, i)| i.outcome.is_failure())
            .collect()
    }
}
