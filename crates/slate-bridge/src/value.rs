//! Guest runtime values.
//!
//! `GuestValue` is the interpreter-native value model: what a guest
//! program produces before anything crosses the isolation boundary.
//! Lists and maps are reference-counted so a guest graph can share
//! nodes and contain cycles; both `repr` and the serializer tolerate
//! that.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// An opaque guest object with no direct transport shape.
///
/// Embedders implement this for interpreter types the bridge cannot
/// represent structurally. `to_plain` converts the object into plain
/// guest data, which is then serialized normally; when that fails the
/// object's `repr` text is used instead.
pub trait ForeignObject {
    /// Short type label, e.g. `"DataFrame"`.
    fn type_name(&self) -> &str;

    /// Human-readable rendering of the object.
    fn repr(&self) -> String;

    /// Convert into plain guest data (primitives, lists, maps).
    fn to_plain(&self) -> anyhow::Result<GuestValue>;
}

/// A value produced by the guest interpreter.
#[derive(Clone)]
pub enum GuestValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Sequence with identity; may share nodes with, or cycle back
    /// into, the containing graph.
    List(Rc<RefCell<Vec<GuestValue>>>),
    /// String-keyed mapping with identity.
    Map(Rc<RefCell<BTreeMap<String, GuestValue>>>),
    /// Functions never cross the boundary; only the name survives.
    Function(String),
    /// Opaque embedder object, converted via [`ForeignObject`].
    Foreign(Rc<dyn ForeignObject>),
}

impl GuestValue {
    /// List value from items.
    pub fn list(items: Vec<GuestValue>) -> Self {
        GuestValue::List(Rc::new(RefCell::new(items)))
    }

    /// Map value from entries.
    pub fn map(entries: BTreeMap<String, GuestValue>) -> Self {
        GuestValue::Map(Rc::new(RefCell::new(entries)))
    }

    /// String value.
    pub fn str(text: impl Into<String>) -> Self {
        GuestValue::Str(text.into())
    }

    /// Guest-facing type label.
    pub fn type_name(&self) -> &str {
        match self {
            GuestValue::Null => "null",
            GuestValue::Bool(_) => "bool",
            GuestValue::Int(_) => "int",
            GuestValue::Float(_) => "float",
            GuestValue::Str(_) => "str",
            GuestValue::List(_) => "list",
            GuestValue::Map(_) => "map",
            GuestValue::Function(_) => "function",
            GuestValue::Foreign(object) => object.type_name(),
        }
    }

    /// Native string rendering.
    ///
    /// Terminates on cyclic graphs: a container re-entered while it is
    /// still being rendered prints as `[...]` or `{...}`. A top-level
    /// string renders unquoted; strings inside containers are quoted.
    pub fn repr(&self) -> String {
        if let GuestValue::Str(text) = self {
            return text.clone();
        }
        let mut out = String::new();
        let mut active = Vec::new();
        self.write_repr(&mut out, &mut active);
        out
    }

    fn write_repr(&self, out: &mut String, active: &mut Vec<usize>) {
        match self {
            GuestValue::Null => out.push_str("null"),
            GuestValue::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
            GuestValue::Int(value) => out.push_str(&value.to_string()),
            GuestValue::Float(value) => out.push_str(&value.to_string()),
            GuestValue::Str(text) => push_quoted(out, text),
            GuestValue::List(items) => {
                let key = Rc::as_ptr(items) as usize;
                if active.contains(&key) {
                    out.push_str("[...]");
                    return;
                }
                active.push(key);
                out.push('[');
                for (index, item) in items.borrow().iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    item.write_repr(out, active);
                }
                out.push(']');
                active.pop();
            }
            GuestValue::Map(entries) => {
                let key = Rc::as_ptr(entries) as usize;
                if active.contains(&key) {
                    out.push_str("{...}");
                    return;
                }
                active.push(key);
                out.push('{');
                for (index, (name, value)) in entries.borrow().iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    push_quoted(out, name);
                    out.push_str(": ");
                    value.write_repr(out, active);
                }
                out.push('}');
                active.pop();
            }
            GuestValue::Function(name) => {
                out.push_str("<function ");
                out.push_str(name);
                out.push('>');
            }
            GuestValue::Foreign(object) => out.push_str(&object.repr()),
        }
    }
}

impl fmt::Display for GuestValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

fn push_quoted(out: &mut String, text: &str) {
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
}
