//! Typed cell outputs and the adapter from bridge run results.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use slate_bridge::CompletedRun;

/// One cell output in nbformat shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum CellOutput {
    /// A block of stream text, `name` is `stdout` or `stderr`.
    Stream { name: String, text: String },
    /// The value produced by the cell, keyed by mime type.
    ExecuteResult {
        data: serde_json::Map<String, JsonValue>,
    },
    /// Rich display payload, keyed by mime type.
    DisplayData {
        data: serde_json::Map<String, JsonValue>,
    },
    /// An execution error.
    Error {
        ename: String,
        evalue: String,
        traceback: Vec<String>,
    },
}

impl CellOutput {
    pub fn stream(name: impl Into<String>, text: impl Into<String>) -> Self {
        CellOutput::Stream {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn display_data(mime: impl Into<String>, content: JsonValue) -> Self {
        let mut data = serde_json::Map::new();
        data.insert(mime.into(), content);
        CellOutput::DisplayData { data }
    }

    pub fn error(ename: impl Into<String>, evalue: impl Into<String>) -> Self {
        CellOutput::Error {
            ename: ename.into(),
            evalue: evalue.into(),
            traceback: Vec::new(),
        }
    }
}

/// Translate a completed bridge run into cell outputs.
///
/// Stream text comes first, then one `display_data` per captured
/// image, then the result value. A null value (statements, failed
/// runs) produces no `execute_result`.
pub fn outputs_from_run(run: &CompletedRun) -> Vec<CellOutput> {
    let mut outputs = Vec::new();

    if !run.stdout.is_empty() {
        outputs.push(CellOutput::stream("stdout", run.stdout.clone()));
    }
    if !run.stderr.is_empty() {
        outputs.push(CellOutput::stream("stderr", run.stderr.clone()));
    }
    for image in &run.images {
        outputs.push(CellOutput::display_data(
            "image/png",
            JsonValue::String(image.clone()),
        ));
    }

    let mut data = serde_json::Map::new();
    match (&run.value, &run.value_text) {
        (Some(value), text) if !value.is_null() => {
            data.insert("application/json".to_string(), value.clone());
            if let Some(text) = text {
                data.insert("text/plain".to_string(), JsonValue::String(text.clone()));
            }
        }
        (Some(_), _) => {}
        (None, Some(text)) => {
            data.insert("text/plain".to_string(), JsonValue::String(text.clone()));
        }
        (None, None) => {}
    }
    if !data.is_empty() {
        outputs.push(CellOutput::ExecuteResult { data });
    }

    outputs
}
