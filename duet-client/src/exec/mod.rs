//! Code execution collaborator: runs a snippet somewhere else and turns the
//! result into output-log lines.

mod http;

pub use http::*;

use crate::ExecutionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub language: String,
    pub source: String,
    pub stdin: Option<String>,
}

impl ExecutionRequest {
    pub fn new(language: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            source: source.into(),
            stdin: None,
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub time_ms: Option<f64>,
    pub memory_kb: Option<u64>,
    /// Failure reported by the service itself rather than by the program.
    pub error: Option<String>,
}

#[async_trait]
pub trait CodeExecutor: Send + Sync {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionOutcome, ExecutionError>;
}

/// Output log for a finished run: compile output, stdout, stderr lines
/// prefixed with `stderr: `, then a timing line.
pub fn format_outcome(outcome: &ExecutionOutcome) -> Vec<String> {
    if let Some(error) = &outcome.error {
        return vec![format!("Error: {error}")];
    }

    let mut lines: Vec<String> = Vec::new();
    if let Some(compile) = &outcome.compile_output {
        lines.extend(compile.lines().map(str::to_owned));
    }
    if let Some(stdout) = &outcome.stdout {
        lines.extend(stdout.lines().map(str::to_owned));
    }
    if let Some(stderr) = &outcome.stderr {
        lines.extend(stderr.lines().map(|l| format!("stderr: {l}")));
    }

    match (outcome.time_ms, outcome.memory_kb) {
        (Some(time), Some(memory)) => lines.push(format!("Finished in {time} ms, {memory} KB")),
        (Some(time), None) => lines.push(format!("Finished in {time} ms")),
        (None, Some(memory)) => lines.push(format!("Finished, {memory} KB")),
        (None, None) => {}
    }
    lines
}

/// Never fails: a failed run is a single `Error: ...` line.
pub fn output_lines(result: Result<ExecutionOutcome, ExecutionError>) -> Vec<String> {
    match result {
        Ok(outcome) => format_outcome(&outcome),
        Err(e) => vec![format!("Error: {e}")],
    }
}
