//! Document model
//!
//! Stored documents are JSON objects. Field paths use dot notation
//! (`data.target_id`); when a path crosses an array every element is visited,
//! so `versions.id` resolves to the `id` of each embedded version.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::effects::StoreError;

/// A stored document
pub type Document = Map<String, Value>;

/// Field holding a document's identity
pub const ID_FIELD: &str = "_id";

/// Encode a value as a document
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::decode(format!(
            "expected an object, got {}",
            kind_name(&other)
        ))),
        Err(err) => Err(StoreError::decode(err.to_string())),
    }
}

/// Decode a document into a typed value
pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(doc)).map_err(|e| StoreError::decode(e.to_string()))
}

/// Resolve every value reachable at `path`, fanning out across arrays
pub fn resolve_path<'a>(doc: &'a Document, path: &str) -> Vec<&'a Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    if let Some((first, rest)) = segments.split_first() {
        if let Some(value) = doc.get(*first) {
            collect(value, rest, &mut out);
        }
    }
    out
}

fn collect<'a>(value: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Value::Object(map) => {
            if let Some(next) = map.get(*head) {
                collect(next, rest, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect(item, segments, out);
            }
        }
        _ => {}
    }
}

/// Exact lookup without array fan-out
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Set a value at `path`, creating intermediate objects
pub fn set_path(doc: &mut Document, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut current = doc;
    for segment in parents {
        let entry = current
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = match entry.as_object_mut() {
            Some(map) => map,
            None => return,
        };
    }
    current.insert((*last).to_string(), value);
}

/// Remove the value at `path`, returning it if present
pub fn remove_path(doc: &mut Document, path: &str) -> Option<Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = segments.split_last()?;
    let mut current = doc;
    for segment in parents {
        current = current.get_mut(*segment)?.as_object_mut()?;
    }
    current.remove(*last)
}

/// Short type name of a JSON value, for error details
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_resolve_fans_out_across_arrays() {
        let d = doc(json!({
            "_id": "a",
            "versions": [{"id": "v1"}, {"id": "v2"}, {"name": "no id"}]
        }));

        let ids = resolve_path(&d, "versions.id");
        assert_eq!(ids, vec![&json!("v1"), &json!("v2")]);
        assert!(resolve_path(&d, "missing.field").is_empty());
    }

    #[test]
    fn test_set_and_remove_nested() {
        let mut d = Document::new();
        set_path(&mut d, "data.target_id", json!("t1"));
        assert_eq!(get_path(&d, "data.target_id"), Some(&json!("t1")));

        let removed = remove_path(&mut d, "data.target_id");
        assert_eq!(removed, Some(json!("t1")));
        assert_eq!(get_path(&d, "data.target_id"), None);
        assert!(d.contains_key("data"));
    }

    #[test]
    fn test_to_document_rejects_scalars() {
        assert!(to_document(&42).is_err());
        assert!(to_document(&json!({"a": 1})).is_ok());
    }
}
