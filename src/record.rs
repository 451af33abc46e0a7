use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Backend-assigned record identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Str(String),
}

impl RecordId {
    /// Read an id from its JSON form; `false`/`null` (unsaved) yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(RecordId::Int),
            Value::String(s) if !s.is_empty() => Some(RecordId::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Int(i) => Value::from(*i),
            RecordId::Str(s) => Value::from(s.clone()),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<i32> for RecordId {
    fn from(id: i32) -> Self {
        RecordId::Int(id.into())
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Str(id.to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(i) => write!(f, "{}", i),
            RecordId::Str(s) => f.write_str(s),
        }
    }
}

/// One backend record: field name -> value, as returned by `search_read`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn id(&self) -> Option<RecordId> {
        self.0.get("id").and_then(RecordId::from_value)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    /// Overlay `values` onto this record.
    pub fn merge(&mut self, values: &Map<String, Value>) {
        for (key, value) in values {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn integer_and_string_ids() {
        assert_eq!(record(json!({"id": 42})).id(), Some(RecordId::Int(42)));
        assert_eq!(record(json!({"id": "abc"})).id(), Some(RecordId::Str("abc".into())));
        assert_eq!(record(json!({"id": false})).id(), None);
        assert_eq!(record(json!({"name": "x"})).id(), None);
    }

    #[test]
    fn typed_getters() {
        let r = record(json!({"id": 3, "name": "item 3"}));
        assert_eq!(r.get_str("name"), Some("item 3"));
        assert_eq!(r.get_i64("id"), Some(3));
        assert_eq!(r.get_i64("name"), None);
    }

    #[test]
    fn merge_overwrites_fields() {
        let mut r = record(json!({"id": 3, "name": "item 3"}));
        let patch = json!({"name": "renamed", "active": false});
        r.merge(patch.as_object().unwrap());
        assert_eq!(r.get_str("name"), Some("renamed"));
        assert_eq!(r.get("active"), Some(&json!(false)));
        assert_eq!(r.id(), Some(RecordId::Int(3)));
    }

    #[test]
    fn id_display() {
        assert_eq!(RecordId::from(7).to_string(), "7");
        assert_eq!(RecordId::from("x7").to_string(), "x7");
        assert_eq!(RecordId::Int(7).to_value(), json!(7));
    }
}
