//! End-to-end tests for the bridge client and its interpreter worker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use slate_bridge::{BridgeClient, EvalError, GuestValue, Interpreter, RunIo, RunOutcome};

/// Line-oriented scripted interpreter.
///
/// `print X` writes X to stdout, `read` echoes one buffered input line
/// (pausing when none is left), `fail X` raises a guest error,
/// `sleep N` blocks for N milliseconds, `set X` records a flag on the
/// interpreter, `get X` prints whether the flag is set, and `value N`
/// makes N the final value.
struct Scripted {
    flags: Vec<String>,
}

impl Scripted {
    fn new() -> Self {
        Scripted { flags: Vec::new() }
    }
}

impl Interpreter for Scripted {
    fn eval(&mut self, source: &str, io: RunIo<'_>) -> Result<GuestValue, EvalError> {
        let mut result = GuestValue::Null;
        for line in source.lines() {
            if let Some(text) = line.strip_prefix("print ") {
                io.stdout.write_line(text);
            } else if line == "read" {
                if !io.input.has_next() {
                    return Err(EvalError::input_requested(Some("input: ".to_string())));
                }
                let value = io.input.pop_next();
                io.stdout.write_line(format!("read {}", value));
            } else if let Some(text) = line.strip_prefix("fail ") {
                return Err(EvalError::guest(text));
            } else if let Some(ms) = line.strip_prefix("sleep ") {
                let ms: u64 = ms.parse().unwrap();
                std::thread::sleep(Duration::from_millis(ms));
            } else if let Some(name) = line.strip_prefix("set ") {
                self.flags.push(name.to_string());
            } else if let Some(name) = line.strip_prefix("get ") {
                let set = self.flags.iter().any(|flag| flag == name);
                io.stdout.write_line(format!("{}={}", name, set));
            } else if let Some(n) = line.strip_prefix("value ") {
                result = GuestValue::Int(n.parse().unwrap());
            }
        }
        Ok(result)
    }
}

fn counting_client(builds: &Arc<AtomicUsize>) -> BridgeClient {
    let builds = builds.clone();
    BridgeClient::new(move || {
        builds.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Scripted::new()) as Box<dyn Interpreter>)
    })
}

fn expect_completed(outcome: RunOutcome) -> slate_bridge::CompletedRun {
    match outcome {
        RunOutcome::Completed(run) => run,
        RunOutcome::Paused(run) => panic!("expected completion, got pause: {:?}", run),
    }
}

#[tokio::test]
async fn test_run_completes_without_input() {
    let builds = Arc::new(AtomicUsize::new(0));
    let client = counting_client(&builds);

    let run = expect_completed(client.run("print hello\nvalue 5", None).await.unwrap());
    assert_eq!(run.stdout, "hello");
    assert_eq!(run.stderr, "");
    assert_eq!(run.value, Some(serde_json::json!(5)));
}

#[tokio::test]
async fn test_preload_builds_interpreter_once() {
    let builds = Arc::new(AtomicUsize::new(0));
    let client = counting_client(&builds);

    client.preload();
    client.preload();
    client.run("print warm", None).await.unwrap();

    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pause_then_resume_with_input() {
    let builds = Arc::new(AtomicUsize::new(0));
    let client = counting_client(&builds);
    let source = "print start\nread\nprint done";

    match client.run(source, None).await.unwrap() {
        RunOutcome::Paused(run) => {
            assert_eq!(run.prompt.as_deref(), Some("input: "));
            assert_eq!(run.stdout, "start");
        }
        RunOutcome::Completed(_) => panic!("expected pause"),
    }

    let run = expect_completed(client.run(source, Some("answer\n")).await.unwrap());
    assert_eq!(run.stdout, "start\nread answer\ndone");
    assert_eq!(run.stderr, "");
}

#[tokio::test]
async fn test_interpreter_state_persists_across_runs() {
    let builds = Arc::new(AtomicUsize::new(0));
    let client = counting_client(&builds);

    client.run("set counter", None).await.unwrap();
    let run = expect_completed(client.run("get counter", None).await.unwrap());
    assert_eq!(run.stdout, "counter=true");
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_preamble_state_is_visible_to_runs() {
    let client = BridgeClient::new(|| Ok(Box::new(Scripted::new()) as Box<dyn Interpreter>))
        .with_preamble("set backend\nprint warmup noise");

    let run = expect_completed(client.run("get backend", None).await.unwrap());
    assert_eq!(run.stdout, "backend=true");
}

#[tokio::test]
async fn test_guest_error_leaves_worker_usable() {
    let builds = Arc::new(AtomicUsize::new(0));
    let client = counting_client(&builds);

    let run = expect_completed(client.run("fail kaput", None).await.unwrap());
    assert_eq!(run.stderr, "kaput");
    assert_eq!(run.value, Some(serde_json::Value::Null));

    let run = expect_completed(client.run("print again", None).await.unwrap());
    assert_eq!(run.stdout, "again");
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_initialization_failure_surfaces_and_retries() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let client = BridgeClient::new(move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            anyhow::bail!("no runtime");
        }
        Ok(Box::new(Scripted::new()) as Box<dyn Interpreter>)
    });

    let err = client.run("print x", None).await.unwrap_err();
    assert!(err.to_string().contains("no runtime"));

    let run = expect_completed(client.run("print x", None).await.unwrap());
    assert_eq!(run.stdout, "x");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_runs_get_matching_results() {
    let builds = Arc::new(AtomicUsize::new(0));
    let client = Arc::new(counting_client(&builds));

    let mut handles = Vec::new();
    for n in 0..3 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            (n, client.run(&format!("print task {}", n), None).await)
        }));
    }

    for handle in handles {
        let (n, outcome) = handle.await.unwrap();
        let run = expect_completed(outcome.unwrap());
        assert_eq!(run.stdout, format!("task {}", n));
    }
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_terminate_interrupts_in_flight_runs() {
    let builds = Arc::new(AtomicUsize::new(0));
    let client = Arc::new(counting_client(&builds));

    // both runs sleep, so whichever the worker picks up first is still
    // evaluating when terminate fires and the other is still queued
    let first = tokio::spawn({
        let client = client.clone();
        async move { client.run("sleep 2000\nprint first", None).await }
    });
    let second = tokio::spawn({
        let client = client.clone();
        async move { client.run("sleep 2000\nprint second", None).await }
    });

    // let both requests land in the pending map
    tokio::time::sleep(Duration::from_millis(200)).await;
    client.terminate();

    for handle in [first, second] {
        let run = expect_completed(handle.await.unwrap().unwrap());
        assert_eq!(run.stderr, "Execution interrupted");
        assert_eq!(run.stdout, "");
        assert_eq!(run.value, Some(serde_json::Value::Null));
    }

    // the next run gets a fresh worker and a fresh interpreter
    let run = expect_completed(client.run("print fresh", None).await.unwrap());
    assert_eq!(run.stdout, "fresh");
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_terminate_discards_interpreter_state() {
    let builds = Arc::new(AtomicUsize::new(0));
    let client = counting_client(&builds);

    client.run("set sticky", None).await.unwrap();
    client.terminate();

    let run = expect_completed(client.run("get sticky", None).await.unwrap());
    assert_eq!(run.stdout, "sticky=false");
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_run_value_returns_final_value() {
    let builds = Arc::new(AtomicUsize::new(0));
    let client = counting_client(&builds);

    let value = client.run_value("value 41").await.unwrap();
    assert_eq!(value, Some(serde_json::json!(41)));
}
