//! Interpreter lifecycle and per-run execution.
//!
//! The engine owns one interpreter, built lazily from a factory and
//! reused warm across runs. Each execution clears the stream captures,
//! reloads the input channel, evaluates the source, and turns the
//! result into a transport-ready outcome: captured stdout/stderr,
//! base64-encoded images, and a serialized final value. A guest
//! blocking read with no buffered input pauses the run instead of
//! completing it; the caller resumes by re-running the same source with
//! the full input supplied, which re-executes the program from the
//! start.

use base64::prelude::*;
use bytes::Bytes;
use log::{info, warn};
use serde_json::Value as JsonValue;

use crate::capture::StreamCapture;
use crate::input::InputChannel;
use crate::interpreter::{EvalError, Interpreter, RunIo};
use crate::serialize::{serialize_value, SerializedValue};

/// Replacement text when a completed value failed transport validation.
pub const UNSERIALIZABLE_TEXT: &str = "[unserializable result]";

/// Lifecycle of the engine's interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No interpreter built yet, or the last initialization failed.
    Uninitialized,
    /// Interpreter built and ready to execute.
    Ready,
    /// The last run stopped on a blocking read and awaits more input.
    Paused,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Ready => "ready",
            EngineState::Paused => "paused",
        };
        write!(f, "{}", label)
    }
}

/// Engine failures. Guest-program failures are not engine failures;
/// they complete the run with the message on stderr.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Interpreter initialization failed: {0}")]
    Init(anyhow::Error),
}

/// A run that reached the end of the program.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRun {
    /// Transport form of the final value, when one exists.
    pub value: Option<JsonValue>,
    /// Textual rendering of the final value.
    pub value_text: Option<String>,
    pub stdout: String,
    pub stderr: String,
    /// Base64-encoded PNG images rendered during the run.
    pub images: Vec<String>,
}

/// A run stopped on a blocking read.
#[derive(Debug, Clone, PartialEq)]
pub struct PausedRun {
    /// Prompt the guest passed to its read call, if any.
    pub prompt: Option<String>,
    /// Output captured before the read.
    pub stdout: String,
}

/// Result of one execution.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(CompletedRun),
    Paused(PausedRun),
}

/// Owns the interpreter and drives individual runs.
pub struct ExecutionEngine {
    factory: Box<dyn FnMut() -> anyhow::Result<Box<dyn Interpreter>>>,
    preamble: Option<String>,
    interpreter: Option<Box<dyn Interpreter>>,
    input: InputChannel,
    stdout: StreamCapture,
    stderr: StreamCapture,
    state: EngineState,
}

impl ExecutionEngine {
    /// Create an engine that builds its interpreter on first use.
    pub fn new(factory: impl FnMut() -> anyhow::Result<Box<dyn Interpreter>> + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            preamble: None,
            interpreter: None,
            input: InputChannel::new(),
            stdout: StreamCapture::new(),
            stderr: StreamCapture::new(),
            state: EngineState::Uninitialized,
        }
    }

    /// Fixed source evaluated once right after the interpreter is
    /// built, before any user code. Its output is discarded; a failing
    /// preamble fails initialization.
    pub fn with_preamble(mut self, source: impl Into<String>) -> Self {
        self.preamble = Some(source.into());
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Build the interpreter now if it does not exist yet.
    ///
    /// On failure the engine stays uninitialized and the next call
    /// retries from scratch.
    pub fn ensure_ready(&mut self) -> Result<(), EngineError> {
        if self.interpreter.is_some() {
            return Ok(());
        }
        info!("[engine] Building interpreter");
        let mut interpreter = (self.factory)().map_err(EngineError::Init)?;
        if let Some(preamble) = self.preamble.as_deref() {
            let io = RunIo {
                stdout: &mut self.stdout,
                stderr: &mut self.stderr,
                input: &mut self.input,
            };
            interpreter
                .eval(preamble, io)
                .map_err(|e| EngineError::Init(anyhow::anyhow!("preamble failed: {}", e)))?;
            interpreter.take_images();
        }
        self.interpreter = Some(interpreter);
        self.state = EngineState::Ready;
        info!("[engine] Interpreter ready");
        Ok(())
    }

    /// Run `source` with `stdin` as the complete buffered input.
    ///
    /// Guest failures complete the run with the message on stderr; only
    /// initialization problems surface as `Err`.
    pub fn execute(&mut self, source: &str, stdin: Option<&str>) -> Result<RunOutcome, EngineError> {
        self.ensure_ready()?;
        self.stdout.clear();
        self.stderr.clear();
        self.input.load(stdin);

        let Some(interpreter) = self.interpreter.as_deref_mut() else {
            return Err(EngineError::Init(anyhow::anyhow!(
                "no interpreter after initialization"
            )));
        };
        let io = RunIo {
            stdout: &mut self.stdout,
            stderr: &mut self.stderr,
            input: &mut self.input,
        };

        match interpreter.eval(source, io) {
            Ok(value) => {
                let images = encode_images(interpreter.take_images());
                let (value, value_text) = validate_transport(serialize_value(&value));
                self.state = EngineState::Ready;
                Ok(RunOutcome::Completed(CompletedRun {
                    value,
                    value_text,
                    stdout: self.stdout.contents(),
                    stderr: self.stderr.contents(),
                    images,
                }))
            }
            Err(EvalError::InputRequested { prompt }) => {
                // discard partial renders; the resumed run redraws them
                interpreter.take_images();
                self.state = EngineState::Paused;
                Ok(RunOutcome::Paused(PausedRun {
                    prompt,
                    stdout: self.stdout.contents(),
                }))
            }
            Err(EvalError::Guest { message }) => {
                interpreter.take_images();
                if self.stderr.is_empty() {
                    self.stderr.write_line(message);
                }
                self.state = EngineState::Ready;
                Ok(RunOutcome::Completed(CompletedRun {
                    value: Some(JsonValue::Null),
                    value_text: None,
                    stdout: self.stdout.contents(),
                    stderr: self.stderr.contents(),
                    images: Vec::new(),
                }))
            }
        }
    }
}

fn encode_images(images: Vec<Bytes>) -> Vec<String> {
    images.iter().map(|png| BASE64_STANDARD.encode(png)).collect()
}

/// Gate a serialized value at the boundary: anything that cannot be
/// re-serialized is dropped in favor of placeholder text.
fn validate_transport(serialized: SerializedValue) -> (Option<JsonValue>, Option<String>) {
    match serialized.value {
        Some(value) => match serde_json::to_string(&value) {
            Ok(_) => (Some(value), serialized.text),
            Err(e) => {
                warn!("[engine] Discarding unserializable result: {}", e);
                (None, Some(UNSERIALIZABLE_TEXT.to_string()))
            }
        },
        None => (None, serialized.text),
    }
}
