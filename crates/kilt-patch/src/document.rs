//! Path helpers over JSON documents
//!
//! Paths use dot notation relative to the value passed in. Missing or
//! `null` intermediates are created as objects; any other shape in the
//! way is reported as [`PatchError::Application`].

use serde_json::{Map, Value};

use crate::error::{PatchError, PatchResult};

/// Get value at `path`
#[must_use]
pub fn get_path<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = root;
    for segment in path.split('.') {
        match current {
            Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}

/// Set value at `path`, replacing what was there
///
/// # Errors
/// Returns error if an intermediate value is neither an object nor absent
pub fn set_path(root: &mut Value, path: &str, value: Value) -> PatchResult<()> {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };
    object_at(root, parents)?.insert((*last).to_string(), value);
    Ok(())
}

/// Append `item` to the list at `path`, creating the list if needed
///
/// # Errors
/// Returns error if the path holds something other than a list
pub fn append_path(root: &mut Value, path: &str, item: Value) -> PatchResult<()> {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };
    let slot = object_at(root, parents)?
        .entry((*last).to_string())
        .or_insert(Value::Null);
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    match slot {
        Value::Array(items) => {
            items.push(item);
            Ok(())
        }
        other => Err(PatchError::application(
            path,
            format!("expected a list, found {}", kind(other)),
        )),
    }
}

/// Recursively copy entries of `defaults` missing from `target`
///
/// Existing entries always win; nested objects are filled key by key.
pub fn merge_defaults(target: &mut Value, defaults: &Value) {
    let (Value::Object(target), Value::Object(defaults)) = (target, defaults) else {
        return;
    };
    for (key, default) in defaults {
        match target.get_mut(key) {
            Some(existing) => merge_defaults(existing, default),
            None => {
                target.insert(key.clone(), default.clone());
            }
        }
    }
}

fn object_at<'v>(root: &'v mut Value, segments: &[&str]) -> PatchResult<&'v mut Map<String, Value>> {
    let mut current = root;
    for (i, segment) in segments.iter().enumerate() {
        let map = as_object(current, &segments[..i])?;
        current = map.entry((*segment).to_string()).or_insert(Value::Null);
    }
    as_object(current, segments)
}

fn as_object<'v>(value: &'v mut Value, at: &[&str]) -> PatchResult<&'v mut Map<String, Value>> {
    if value.is_null() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => Ok(map),
        other => Err(PatchError::application(
            if at.is_empty() { ".".to_string() } else { at.join(".") },
            format!("expected an object, found {}", kind(other)),
        )),
    }
}

/// Short name of a JSON value's type
pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
