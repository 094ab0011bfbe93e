// Opaque resource records.
//
// The backend is the source of truth for every field; the console never
// validates or enriches records beyond display formatting, so they stay
// as raw JSON objects rather than typed structs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single resource record as exchanged with the backend.
///
/// A persisted record carries a unique `id`; records under construction
/// (an open create dialog) don't have one yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// The record's `id` field, if persisted.
    pub fn id(&self) -> Option<&Value> {
        self.0.get("id")
    }

    /// The `id` rendered for use in a URL path segment.
    ///
    /// Backends use both numeric and string ids; either renders without
    /// JSON quoting.
    pub fn id_segment(&self) -> Option<String> {
        match self.id()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// A field rendered as display text. Null and missing fields render
    /// empty; scalars render without JSON quoting.
    pub fn display(&self, field: &str) -> String {
        match self.0.get(field) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Bool(b)) => if *b { "yes" } else { "no" }.to_owned(),
            Some(other) => other.to_string(),
        }
    }

    /// A string field, if present and a string.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Interpret a JSON value as a record. Non-objects yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn id_segment_renders_numbers_and_strings_unquoted() {
        assert_eq!(record(json!({"id": 7})).id_segment().unwrap(), "7");
        assert_eq!(record(json!({"id": "ab3"})).id_segment().unwrap(), "ab3");
        assert!(record(json!({"name": "x"})).id_segment().is_none());
    }

    #[test]
    fn display_formats_scalars() {
        let r = record(json!({"name": "Dune", "stock": 3, "publish": true, "note": null}));
        assert_eq!(r.display("name"), "Dune");
        assert_eq!(r.display("stock"), "3");
        assert_eq!(r.display("publish"), "yes");
        assert_eq!(r.display("note"), "");
        assert_eq!(r.display("missing"), "");
    }

    #[test]
    fn from_value_rejects_non_objects() {
        assert!(Record::from_value(json!([1, 2])).is_none());
        assert!(Record::from_value(json!("str")).is_none());
    }
}
