//! The interpreter seam.
//!
//! The bridge does not know which language it is running. Embedders
//! supply an [`Interpreter`] implementation plus a factory that builds
//! one; isolation, stream capture, pause/resume, and serialization are
//! handled generically on top of this trait.

use bytes::Bytes;

use crate::capture::StreamCapture;
use crate::input::InputChannel;
use crate::value::GuestValue;

/// Per-run I/O handles passed to the interpreter.
pub struct RunIo<'a> {
    pub stdout: &'a mut StreamCapture,
    pub stderr: &'a mut StreamCapture,
    pub input: &'a mut InputChannel,
}

/// Why an evaluation did not produce a value.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// The guest program performed a blocking read with no buffered
    /// input left. Not a failure: the engine reports a paused run and
    /// the caller re-runs with more input supplied.
    #[error("Input requested")]
    InputRequested { prompt: Option<String> },

    /// The guest program failed (syntax error, uncaught exception, ...).
    #[error("{message}")]
    Guest { message: String },
}

impl EvalError {
    /// Guest failure with the given message.
    pub fn guest(message: impl Into<String>) -> Self {
        EvalError::Guest {
            message: message.into(),
        }
    }

    /// Blocking-read signal, optionally carrying the guest's prompt.
    pub fn input_requested(prompt: Option<String>) -> Self {
        EvalError::InputRequested { prompt }
    }
}

/// A guest-language interpreter the engine can drive.
///
/// Implementations are expected to be heavyweight and slow to build;
/// the engine constructs one lazily and reuses it warm across runs.
pub trait Interpreter {
    /// Evaluate `source` to completion, writing output through `io`.
    ///
    /// A blocking read finding no line buffered in `io.input` must
    /// abandon the run with [`EvalError::InputRequested`].
    fn eval(&mut self, source: &str, io: RunIo<'_>) -> Result<GuestValue, EvalError>;

    /// Drain the raw PNG images rendered since the last drain.
    fn take_images(&mut self) -> Vec<Bytes> {
        Vec::new()
    }
}
