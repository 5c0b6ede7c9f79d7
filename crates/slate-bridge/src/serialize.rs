//! Conversion of guest values into transport-safe data.
//!
//! The transport model is `serde_json::Value`: null, booleans, numbers,
//! strings, arrays, and string-keyed objects, with no reference
//! semantics. Conversion is total. Anything the transport model cannot
//! carry degrades to text instead of failing: functions become
//! `"[function]"`, non-finite floats and unconvertible foreign objects
//! fall back to their textual rendering, and cyclic references collapse
//! to `"[...]"` / `"{...}"` markers. A node shared acyclically converts
//! once and is reused.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value as JsonValue;

use crate::value::GuestValue;

/// Placeholder for function values.
pub const FUNCTION_TEXT: &str = "[function]";
/// Marker for a list that cycles back into itself.
pub const LIST_CYCLE_TEXT: &str = "[...]";
/// Marker for a map that cycles back into itself.
pub const MAP_CYCLE_TEXT: &str = "{...}";

/// A guest value prepared for the boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedValue {
    /// Structural transport form.
    pub value: Option<JsonValue>,
    /// Textual rendering, always produced.
    pub text: Option<String>,
}

/// Convert a guest value into its transport form plus repr text.
pub fn serialize_value(value: &GuestValue) -> SerializedValue {
    let mut visited = HashMap::new();
    let converted = to_transport(value, &mut visited);
    SerializedValue {
        value: Some(converted),
        text: Some(value.repr()),
    }
}

/// Walk one node. `visited` maps container identity to its converted
/// form; a `None` entry marks a conversion still in progress, which is
/// how a true cycle is recognized.
fn to_transport(value: &GuestValue, visited: &mut HashMap<usize, Option<JsonValue>>) -> JsonValue {
    match value {
        GuestValue::Null => JsonValue::Null,
        GuestValue::Bool(value) => JsonValue::Bool(*value),
        GuestValue::Int(value) => JsonValue::from(*value),
        GuestValue::Float(value) => match serde_json::Number::from_f64(*value) {
            Some(number) => JsonValue::Number(number),
            // NaN and the infinities are not JSON numbers
            None => JsonValue::String(value.to_string()),
        },
        GuestValue::Str(text) => JsonValue::String(text.clone()),
        GuestValue::Function(_) => JsonValue::String(FUNCTION_TEXT.to_string()),
        GuestValue::List(items) => {
            let key = Rc::as_ptr(items) as usize;
            match visited.get(&key) {
                Some(Some(done)) => done.clone(),
                Some(None) => JsonValue::String(LIST_CYCLE_TEXT.to_string()),
                None => {
                    visited.insert(key, None);
                    let converted = JsonValue::Array(
                        items
                            .borrow()
                            .iter()
                            .map(|item| to_transport(item, visited))
                            .collect(),
                    );
                    visited.insert(key, Some(converted.clone()));
                    converted
                }
            }
        }
        GuestValue::Map(entries) => {
            let key = Rc::as_ptr(entries) as usize;
            match visited.get(&key) {
                Some(Some(done)) => done.clone(),
                Some(None) => JsonValue::String(MAP_CYCLE_TEXT.to_string()),
                None => {
                    visited.insert(key, None);
                    let mut object = serde_json::Map::new();
                    for (name, entry) in entries.borrow().iter() {
                        object.insert(name.clone(), to_transport(entry, visited));
                    }
                    let converted = JsonValue::Object(object);
                    visited.insert(key, Some(converted.clone()));
                    converted
                }
            }
        }
        GuestValue::Foreign(object) => {
            let key = Rc::as_ptr(object) as *const () as usize;
            match visited.get(&key) {
                Some(Some(done)) => done.clone(),
                Some(None) => JsonValue::String(object.repr()),
                None => {
                    visited.insert(key, None);
                    let converted = match object.to_plain() {
                        Ok(plain) => to_transport(&plain, visited),
                        Err(_) => JsonValue::String(object.repr()),
                    };
                    visited.insert(key, Some(converted.clone()));
                    converted
                }
            }
        }
    }
}
