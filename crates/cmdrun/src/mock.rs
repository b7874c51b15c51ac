//! Recording executor for tests.
//!
//! Records every [`CommandSpec`] it receives and replays scripted results
//! instead of spawning processes.

use crate::error::{Error, Result};
use crate::types::{CommandOutput, CommandSpec};
use crate::CommandExecutor;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// An executor that never spawns anything.
///
/// ```
/// use cmdrun::{CommandExecutor, CommandSpec, RecordingExecutor};
///
/// let exec = RecordingExecutor::new();
/// exec.respond("sw_vers", "14.2\n");
///
/// let out = exec.execute(&CommandSpec::new("sw_vers").capture(true)).unwrap();
/// assert_eq!(out.stdout_trimmed(), "14.2");
/// assert_eq!(exec.calls().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    calls: Arc<Mutex<Vec<CommandSpec>>>,
    outputs: Arc<Mutex<HashMap<String, String>>>,
    failures: Arc<Mutex<HashMap<String, String>>>,
}

impl RecordingExecutor {
    /// Create an executor where every command succeeds with empty output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `stdout` whenever `program` runs.
    pub fn respond(&self, program: impl Into<String>, stdout: impl Into<String>) {
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(program.into(), stdout.into());
    }

    /// Fail with exit code 1 and `stderr` whenever `program` runs.
    pub fn fail(&self, program: impl Into<String>, stderr: impl Into<String>) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(program.into(), stderr.into());
    }

    /// Every spec received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rendered command lines received so far.
    #[must_use]
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(CommandSpec::display).collect()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(spec.clone());

        let failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(stderr) = failures.get(&spec.program) {
            return Err(Error::CommandFailed {
                command: spec.display(),
                code: Some(1),
                stderr: stderr.clone(),
            });
        }
        drop(failures);

        let outputs = self.outputs.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(CommandOutput {
            code: Some(0),
            stdout: outputs.get(&spec.program).cloned().unwrap_or_default(),
            stderr: String::new(),
        })
    }
}
