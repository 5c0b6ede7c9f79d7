//! slate-notebook - Notebook cell and output model.
//!
//! Parses and serializes the two interchange formats the app reads
//! (markup-tagged cell documents and nbformat-style JSON), and adapts
//! bridge run results into nbformat-style cell outputs. Parsing never
//! rejects a document: text in neither format loads as a single code
//! cell holding the input verbatim.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

mod markup;
pub mod outputs;

/// Notebook format version written by this crate.
pub const NBFORMAT: u32 = 5;
/// Minor format version written by this crate.
pub const NBFORMAT_MINOR: u32 = 1;

/// Errors from notebook file handling.
#[derive(Debug, thiserror::Error)]
pub enum NotebookError {
    #[error("Failed to read or write notebook file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize notebook: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Kind of a notebook cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    #[default]
    Code,
    Markdown,
}

/// One notebook cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default = "generate_cell_id", deserialize_with = "id_from_value")]
    pub id: String,
    /// Unknown kinds load as code; a missing `cell_type` does too.
    #[serde(rename = "cell_type", default, deserialize_with = "kind_from_value")]
    pub kind: CellKind,
    /// Cell text. Accepts either a single string or an array of line
    /// strings on input; always a single string in memory and on
    /// output.
    #[serde(default, deserialize_with = "source_from_value")]
    pub source: String,
    #[serde(default, deserialize_with = "map_from_value")]
    pub metadata: serde_json::Map<String, JsonValue>,
    /// Outputs carry whatever the document stored; see [`outputs`] for
    /// the typed shapes this crate produces.
    #[serde(default, deserialize_with = "outputs_from_value")]
    pub outputs: Vec<JsonValue>,
}

impl Cell {
    /// New code cell with a fresh id.
    pub fn code(source: impl Into<String>) -> Self {
        Cell {
            id: generate_cell_id(),
            kind: CellKind::Code,
            source: source.into(),
            metadata: serde_json::Map::new(),
            outputs: Vec::new(),
        }
    }

    /// New markdown cell with a fresh id.
    pub fn markdown(source: impl Into<String>) -> Self {
        Cell {
            id: generate_cell_id(),
            kind: CellKind::Markdown,
            source: source.into(),
            metadata: serde_json::Map::new(),
            outputs: Vec::new(),
        }
    }
}

/// A notebook document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    #[serde(default = "default_nbformat", deserialize_with = "nbformat_from_value")]
    pub nbformat: u32,
    #[serde(
        default = "default_nbformat_minor",
        deserialize_with = "nbformat_minor_from_value"
    )]
    pub nbformat_minor: u32,
    #[serde(default, deserialize_with = "map_from_value")]
    pub metadata: serde_json::Map<String, JsonValue>,
    #[serde(default, deserialize_with = "cells_from_value")]
    pub cells: Vec<Cell>,
}

impl Default for Notebook {
    fn default() -> Self {
        Self::new()
    }
}

impl Notebook {
    /// New empty notebook at the current format version.
    pub fn new() -> Self {
        Notebook {
            nbformat: NBFORMAT,
            nbformat_minor: NBFORMAT_MINOR,
            metadata: serde_json::Map::new(),
            cells: Vec::new(),
        }
    }

    /// Parse a notebook from text.
    ///
    /// Tries the markup cell format first (documents starting with
    /// `<`), then nbformat-style JSON. Text in neither format becomes
    /// a single code cell holding the input verbatim, so no document
    /// is ever rejected.
    ///
    /// Within a JSON document, a null or wrong-typed field loads as
    /// that field's default; only text that fails to parse as JSON at
    /// all takes the verbatim-cell fallback.
    pub fn parse(text: &str) -> Notebook {
        if text.trim_start().starts_with('<') {
            if let Some(notebook) = markup::parse_cells(text) {
                return notebook;
            }
        }
        match serde_json::from_str::<Notebook>(text) {
            Ok(notebook) => notebook,
            Err(_) => Notebook {
                cells: vec![Cell::code(text)],
                ..Notebook::new()
            },
        }
    }

    /// Pretty-printed JSON interchange form.
    pub fn to_json_string(&self) -> Result<String, NotebookError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a notebook from a file, using the same format cascade as
    /// [`Notebook::parse`].
    pub fn load_from_file(path: &Path) -> Result<Notebook, NotebookError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Notebook::parse(&text))
    }

    /// Write the notebook to a file as pretty-printed JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<(), NotebookError> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

fn default_nbformat() -> u32 {
    NBFORMAT
}

fn default_nbformat_minor() -> u32 {
    NBFORMAT_MINOR
}

pub(crate) fn generate_cell_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// Field deserializers are total: a null or wrong-typed field becomes
// that field's default, so one bad field never rejects the document.

fn kind_from_value<'de, D>(deserializer: D) -> Result<CellKind, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)?.as_str() {
        Some("markdown") => CellKind::Markdown,
        _ => CellKind::Code,
    })
}

fn id_from_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::String(id) => id,
        _ => generate_cell_id(),
    })
}

fn source_from_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::String(text) => text,
        JsonValue::Array(lines) => lines.iter().filter_map(JsonValue::as_str).collect(),
        _ => String::new(),
    })
}

fn map_from_value<'de, D>(
    deserializer: D,
) -> Result<serde_json::Map<String, JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::Object(map) => map,
        _ => serde_json::Map::new(),
    })
}

fn outputs_from_value<'de, D>(deserializer: D) -> Result<Vec<JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::Array(outputs) => outputs,
        _ => Vec::new(),
    })
}

fn cells_from_value<'de, D>(deserializer: D) -> Result<Vec<Cell>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::Array(cells) => cells
            .into_iter()
            .map(|cell| {
                serde_json::from_value(cell).unwrap_or_else(|_| Cell::code(String::new()))
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn nbformat_from_value<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(version_or(JsonValue::deserialize(deserializer)?, NBFORMAT))
}

fn nbformat_minor_from_value<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(version_or(
        JsonValue::deserialize(deserializer)?,
        NBFORMAT_MINOR,
    ))
}

fn version_or(value: JsonValue, fallback: u32) -> u32 {
    value
        .as_u64()
        .and_then(|version| u32::try_from(version).ok())
        .unwrap_or(fallback)
}
