//! Boundary message types.
//!
//! Requests and responses between the client and the interpreter
//! worker. Transport is an in-process channel, but the messages are
//! serde types with a stable JSON shape so the protocol stays
//! inspectable and easy to test.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::engine::{CompletedRun, PausedRun, RunOutcome};

/// Text reported on stderr when a request is interrupted by
/// [`terminate`](crate::client::BridgeClient::terminate).
pub const INTERRUPTED_TEXT: &str = "Execution interrupted";

/// Host-to-worker commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerRequest {
    /// Build the interpreter ahead of the first run.
    Init,

    /// Execute one program.
    Run {
        correlation_id: u64,
        source: String,
        stdin: Option<String>,
    },
}

/// Worker-to-host result for one `Run` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResponse {
    pub correlation_id: u64,
    pub value: Option<JsonValue>,
    pub value_text: Option<String>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub images: Vec<String>,
    /// True when the run paused on a blocking read.
    #[serde(default)]
    pub input_required: bool,
    pub prompt: Option<String>,
    /// Set when the run failed before evaluation could start.
    pub error: Option<String>,
}

impl RunResponse {
    /// Response for a finished outcome.
    pub fn from_outcome(correlation_id: u64, outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed(run) => RunResponse {
                correlation_id,
                value: run.value,
                value_text: run.value_text,
                stdout: run.stdout,
                stderr: run.stderr,
                images: run.images,
                input_required: false,
                prompt: None,
                error: None,
            },
            RunOutcome::Paused(run) => RunResponse {
                correlation_id,
                value: None,
                value_text: None,
                stdout: run.stdout,
                stderr: String::new(),
                images: Vec::new(),
                input_required: true,
                prompt: run.prompt,
                error: None,
            },
        }
    }

    /// Response for a run that failed before evaluation.
    pub fn failed(correlation_id: u64, error: impl Into<String>) -> Self {
        RunResponse {
            correlation_id,
            value: None,
            value_text: None,
            stdout: String::new(),
            stderr: String::new(),
            images: Vec::new(),
            input_required: false,
            prompt: None,
            error: Some(error.into()),
        }
    }

    /// Synthetic response for a request interrupted by termination.
    /// Shaped like a failed run: a null value and the sentinel on
    /// stderr, so callers keep a single result-handling path.
    pub fn interrupted(correlation_id: u64) -> Self {
        RunResponse {
            correlation_id,
            value: Some(JsonValue::Null),
            value_text: None,
            stdout: String::new(),
            stderr: INTERRUPTED_TEXT.to_string(),
            images: Vec::new(),
            input_required: false,
            prompt: None,
            error: None,
        }
    }

    /// Split back into the caller-facing outcome, or the error message
    /// for a run that never evaluated.
    pub fn into_outcome(self) -> Result<RunOutcome, String> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.input_required {
            return Ok(RunOutcome::Paused(PausedRun {
                prompt: self.prompt,
                stdout: self.stdout,
            }));
        }
        Ok(RunOutcome::Completed(CompletedRun {
            value: self.value,
            value_text: self.value_text,
            stdout: self.stdout,
            stderr: self.stderr,
            images: self.images,
        }))
    }
}
