//! slate-bridge - Interactive code-execution bridge.
//!
//! Runs untrusted guest programs inside an isolated, heavyweight
//! interpreter: captured stdout/stderr stream back to the caller, a
//! blocking input read with nothing buffered pauses the run instead of
//! hanging it, and arbitrary guest values (including cyclic graphs)
//! serialize into transport-safe data.
//!
//! The interpreter itself is a capability supplied by the embedder: an
//! [`Interpreter`] implementation plus a factory that builds one. The
//! bridge owns everything around it - lazy initialization, warm reuse,
//! the worker thread, request/response bookkeeping, and teardown.

pub mod capture;
pub mod client;
pub mod engine;
pub mod input;
pub mod interpreter;
pub mod protocol;
pub mod serialize;
pub mod value;

mod worker;

pub use client::{BridgeClient, BridgeError, SharedFactory};
pub use engine::{
    CompletedRun, EngineError, EngineState, ExecutionEngine, PausedRun, RunOutcome,
};
pub use interpreter::{EvalError, Interpreter, RunIo};
pub use serialize::{serialize_value, SerializedValue};
pub use value::{ForeignObject, GuestValue};
