//! Caller-facing bridge client.
//!
//! `BridgeClient` owns the interpreter worker: it spawns the thread on
//! demand, matches responses to requests by correlation id, and can
//! tear everything down with [`terminate`](BridgeClient::terminate).
//! The heavyweight interpreter never blocks the caller's runtime; all
//! evaluation happens on the worker thread.

use std::sync::{Arc, Mutex};

use log::{debug, info};
use tokio::sync::oneshot;

use crate::engine::RunOutcome;
use crate::interpreter::Interpreter;
use crate::protocol::{RunResponse, WorkerRequest};
use crate::worker::{spawn_worker, WorkerHandle};

/// Factory the client uses to build an interpreter inside the worker
/// thread. Called once per worker incarnation.
pub type SharedFactory = dyn Fn() -> anyhow::Result<Box<dyn Interpreter>> + Send + Sync;

/// Error type for bridge operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Interpreter initialization failed: {0}")]
    Init(String),

    #[error("Worker exited before responding")]
    WorkerGone,
}

struct ClientState {
    worker: Option<WorkerHandle>,
    next_correlation_id: u64,
    preload_sent: bool,
}

/// Client for the interpreter worker.
pub struct BridgeClient {
    factory: Arc<SharedFactory>,
    preamble: Option<String>,
    state: Mutex<ClientState>,
}

impl BridgeClient {
    /// Create a client. No interpreter is built until
    /// [`preload`](BridgeClient::preload) or the first run.
    pub fn new(
        factory: impl Fn() -> anyhow::Result<Box<dyn Interpreter>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            factory: Arc::new(factory),
            preamble: None,
            state: Mutex::new(ClientState {
                worker: None,
                next_correlation_id: 1,
                preload_sent: false,
            }),
        }
    }

    /// Fixed source evaluated once per interpreter, right after it is
    /// built.
    pub fn with_preamble(mut self, source: impl Into<String>) -> Self {
        self.preamble = Some(source.into());
        self
    }

    /// Start building the interpreter in the background.
    ///
    /// Idempotent per worker incarnation: repeated calls send at most
    /// one warm-up command.
    pub fn preload(&self) {
        let mut state = self.state.lock().unwrap();
        if state.preload_sent {
            debug!("[bridge-client] Preload already requested");
            return;
        }
        let worker = self.ensure_worker(&mut state);
        let sent = worker.tx.send(WorkerRequest::Init).is_ok();
        state.preload_sent = sent;
    }

    /// Execute `source` with `stdin` as the complete buffered input.
    ///
    /// Concurrent calls are serialized by the worker; each caller gets
    /// the response matching its own request. A paused outcome means
    /// the program performed a blocking read with nothing buffered;
    /// re-run the same source with the full input supplied.
    pub async fn run(&self, source: &str, stdin: Option<&str>) -> Result<RunOutcome, BridgeError> {
        let (correlation_id, tx, pending) = {
            let mut state = self.state.lock().unwrap();
            let correlation_id = state.next_correlation_id;
            state.next_correlation_id += 1;
            let worker = self.ensure_worker(&mut state);
            (correlation_id, worker.tx.clone(), worker.pending.clone())
        };

        let (response_tx, response_rx) = oneshot::channel();
        pending.lock().unwrap().insert(correlation_id, response_tx);

        let request = WorkerRequest::Run {
            correlation_id,
            source: source.to_string(),
            stdin: stdin.map(str::to_string),
        };
        if tx.send(request).is_err() {
            // worker gone; unless terminate already resolved this
            // request with an interrupted result, fail it
            if pending.lock().unwrap().remove(&correlation_id).is_some() {
                return Err(BridgeError::WorkerGone);
            }
        }

        let response = response_rx.await.map_err(|_| BridgeError::WorkerGone)?;
        response.into_outcome().map_err(BridgeError::Init)
    }

    /// Execute and return just the result value.
    ///
    /// A null or missing value falls back to the textual rendering. A
    /// run that pauses for input yields `None`.
    pub async fn run_value(
        &self,
        source: &str,
    ) -> Result<Option<serde_json::Value>, BridgeError> {
        match self.run(source, None).await? {
            RunOutcome::Completed(run) => Ok(match run.value {
                Some(value) if !value.is_null() => Some(value),
                _ => run.value_text.map(serde_json::Value::String),
            }),
            RunOutcome::Paused(_) => Ok(None),
        }
    }

    /// Tear down the worker.
    ///
    /// Every in-flight request resolves immediately with an interrupted
    /// result (`"Execution interrupted"` on stderr). The next call
    /// spawns a fresh worker and a fresh warm-up cycle; correlation ids
    /// keep increasing across incarnations.
    pub fn terminate(&self) {
        let worker = {
            let mut state = self.state.lock().unwrap();
            state.preload_sent = false;
            state.worker.take()
        };
        let worker = match worker {
            Some(worker) => worker,
            None => return,
        };

        let drained: Vec<_> = {
            let mut pending = worker.pending.lock().unwrap();
            pending.drain().collect()
        };
        if !drained.is_empty() {
            info!(
                "[bridge-client] Interrupting {} in-flight request(s)",
                drained.len()
            );
        }
        for (correlation_id, sender) in drained {
            let _ = sender.send(RunResponse::interrupted(correlation_id));
        }
        // dropping the handle closes the command channel; the thread
        // exits once its current evaluation finishes
    }

    fn ensure_worker<'a>(&self, state: &'a mut ClientState) -> &'a WorkerHandle {
        state.worker.get_or_insert_with(|| {
            info!("[bridge-client] Spawning interpreter worker");
            spawn_worker(Arc::clone(&self.factory), self.preamble.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{EvalError, RunIo};
    use crate::value::GuestValue;

    struct Echo;

    impl Interpreter for Echo {
        fn eval(&mut self, source: &str, io: RunIo<'_>) -> Result<GuestValue, EvalError> {
            io.stdout.write_line(source);
            Ok(GuestValue::Null)
        }
    }

    fn echo_client() -> BridgeClient {
        BridgeClient::new(|| Ok(Box::new(Echo) as Box<dyn Interpreter>))
    }

    #[tokio::test]
    async fn test_run_round_trip() {
        let client = echo_client();
        match client.run("hello", None).await.unwrap() {
            RunOutcome::Completed(run) => assert_eq!(run.stdout, "hello"),
            RunOutcome::Paused(_) => panic!("expected completion"),
        }
    }

    #[tokio::test]
    async fn test_terminate_without_worker_is_a_noop() {
        let client = echo_client();
        client.terminate();
        match client.run("still works", None).await.unwrap() {
            RunOutcome::Completed(run) => assert_eq!(run.stdout, "still works"),
            RunOutcome::Paused(_) => panic!("expected completion"),
        }
    }

    #[tokio::test]
    async fn test_correlation_ids_keep_increasing_after_terminate() {
        let client = echo_client();
        client.run("a", None).await.unwrap();
        let before = client.state.lock().unwrap().next_correlation_id;
        client.terminate();
        client.run("b", None).await.unwrap();
        let after = client.state.lock().unwrap().next_correlation_id;
        assert!(after > before);
    }

    #[tokio::test]
    async fn test_run_value_falls_back_to_text_for_null_result() {
        let client = echo_client();
        let value = client.run_value("anything").await.unwrap();
        assert_eq!(value, Some(serde_json::Value::String("null".to_string())));
    }
}
