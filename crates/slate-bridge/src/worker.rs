//! Dedicated interpreter thread.
//!
//! The engine holds non-`Send` guest values, so it is built inside the
//! thread from a shared factory and never leaves it. Commands arrive on
//! an unbounded channel and are processed one at a time, which is what
//! serializes concurrent callers and makes initialization single-flight.
//! Responses resolve the oneshot senders registered in the shared
//! pending map.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, warn};
use tokio::sync::{mpsc, oneshot};

use crate::client::SharedFactory;
use crate::engine::ExecutionEngine;
use crate::protocol::{RunResponse, WorkerRequest};

pub(crate) type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<RunResponse>>>>;

/// Handle the client keeps for one worker incarnation. Dropping it
/// closes the command channel and lets the thread exit.
pub(crate) struct WorkerHandle {
    pub(crate) tx: mpsc::UnboundedSender<WorkerRequest>,
    pub(crate) pending: PendingMap,
}

/// Spawn the interpreter thread.
pub(crate) fn spawn_worker(factory: Arc<SharedFactory>, preamble: Option<String>) -> WorkerHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<WorkerRequest>();
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
    let worker_pending = pending.clone();

    std::thread::spawn(move || {
        let mut engine = ExecutionEngine::new(move || factory());
        if let Some(source) = preamble {
            engine = engine.with_preamble(source);
        }

        while let Some(request) = rx.blocking_recv() {
            match request {
                WorkerRequest::Init => {
                    // stays uninitialized on failure; the next run
                    // retries and reports the failure to its caller
                    if let Err(e) = engine.ensure_ready() {
                        warn!("[bridge-worker] Warm-up failed: {}", e);
                    }
                }
                WorkerRequest::Run {
                    correlation_id,
                    source,
                    stdin,
                } => {
                    let response = match engine.execute(&source, stdin.as_deref()) {
                        Ok(outcome) => RunResponse::from_outcome(correlation_id, outcome),
                        Err(e) => RunResponse::failed(correlation_id, e.to_string()),
                    };
                    resolve(&worker_pending, response);
                }
            }
        }
        debug!("[bridge-worker] Command channel closed, exiting");
    });

    WorkerHandle { tx, pending }
}

/// Send `response` to whoever registered its correlation id. A missing
/// entry means the request was already resolved by termination.
fn resolve(pending: &PendingMap, response: RunResponse) {
    let sender = pending.lock().unwrap().remove(&response.correlation_id);
    match sender {
        Some(sender) => {
            if sender.send(response).is_err() {
                debug!("[bridge-worker] Caller went away before its response arrived");
            }
        }
        None => debug!(
            "[bridge-worker] No pending request for id {}, dropping response",
            response.correlation_id
        ),
    }
}
