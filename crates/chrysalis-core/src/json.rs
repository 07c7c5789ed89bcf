//! Bridge between [`Value`] graphs and `serde_json`.

use crate::value::{Value, format_date};
use serde_json::{Map, Number};

/// Errors encoding a value graph as JSON.
#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    #[error("converting circular structure to JSON")]
    CircularStructure,
}

impl Value {
    /// Build a plain value graph from parsed JSON. Key order is preserved.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(fields) => Value::plain(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Value::from_json(value))),
            ),
        }
    }

    /// Encode the graph as JSON.
    ///
    /// Undefined fields are omitted, undefined array slots and non-finite
    /// numbers become `null`, dates become RFC 3339 strings, sets become
    /// arrays and maps become objects. Class tags are dropped.
    pub fn to_json(&self) -> Result<serde_json::Value, JsonError> {
        let mut path = Vec::new();
        encode(self, &mut path)
    }
}

fn encode(value: &Value, path: &mut Vec<usize>) -> Result<serde_json::Value, JsonError> {
    Ok(match value {
        Value::Undefined | Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::Number((*n).into()),
        Value::Float(n) => Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Date(d) => serde_json::Value::String(format_date(d)),
        Value::Array(items) | Value::Set(items) => serde_json::Value::Array(
            items
                .iter()
                .map(|item| encode(item, path))
                .collect::<Result<_, _>>()?,
        ),
        Value::Map(entries) => {
            let mut out = Map::new();
            for (key, entry) in entries {
                if !entry.is_undefined() {
                    out.insert(key.clone(), encode(entry, path)?);
                }
            }
            serde_json::Value::Object(out)
        }
        Value::Object(obj) => {
            let id = value.object_id().unwrap_or_default();
            if path.contains(&id) {
                return Err(JsonError::CircularStructure);
            }
            path.push(id);
            let mut out = Map::new();
            for (key, field) in obj.borrow().fields() {
                if !field.is_undefined() {
                    out.insert(key.clone(), encode(field, path)?);
                }
            }
            path.pop();
            serde_json::Value::Object(out)
        }
    })
}
