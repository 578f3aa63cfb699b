//! Substitution resolution
//!
//! Turns a merged [`Tree`](crate::tree::Tree) into plain JSON values.
//! Substitutions are looked up against the final tree, so a later layer
//! can change what an earlier substitution points at.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::{HoconError, HoconResult};
use crate::path::ConfigPath;
use crate::tree::Node;

pub(crate) struct Resolver<'a> {
    root: &'a IndexMap<String, Node>,
    visiting: Vec<ConfigPath>,
    resolved: HashMap<ConfigPath, Option<Value>>,
}

enum Part {
    Value(Value),
    Space(String),
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(root: &'a IndexMap<String, Node>) -> Self {
        Self {
            root,
            visiting: Vec::new(),
            resolved: HashMap::new(),
        }
    }

    pub(crate) fn resolve_root(&mut self) -> HoconResult<Value> {
        let root = self.root;
        Ok(Value::Object(self.resolve_object(root, &ConfigPath::root())?))
    }

    /// Resolve the value stored at `path`, `None` if nothing is there
    ///
    /// Successful lookups are memoised for the lifetime of the resolver.
    pub(crate) fn lookup(&mut self, path: &ConfigPath) -> HoconResult<Option<Value>> {
        if let Some(value) = self.resolved.get(path) {
            return Ok(value.clone());
        }
        if self.visiting.contains(path) {
            return Err(HoconError::Cycle { path: path.clone() });
        }
        self.visiting.push(path.clone());
        let result = self.lookup_inner(path);
        self.visiting.pop();
        if let Ok(value) = &result {
            self.resolved.insert(path.clone(), value.clone());
        }
        result
    }

    fn lookup_inner(&mut self, path: &ConfigPath) -> HoconResult<Option<Value>> {
        let segments = path.segments();
        if segments.is_empty() {
            return self.resolve_root().map(Some);
        }

        let mut map = self.root;
        for (i, segment) in segments.iter().enumerate() {
            let Some(node) = map.get(segment) else {
                return Ok(None);
            };
            let here = ConfigPath::new(segments[..=i].to_vec());
            if i + 1 == segments.len() {
                return self.resolve(node, &here);
            }
            match node {
                Node::Object(child) => map = child,
                other => {
                    let Some(value) = self.resolve(other, &here)? else {
                        return Ok(None);
                    };
                    return Ok(descend(&value, &segments[i + 1..]));
                }
            }
        }
        Ok(None)
    }

    fn resolve_object(
        &mut self,
        map: &'a IndexMap<String, Node>,
        at: &ConfigPath,
    ) -> HoconResult<Map<String, Value>> {
        let mut out = Map::new();
        for (key, node) in map {
            if let Some(value) = self.resolve(node, &at.child(key.clone()))? {
                out.insert(key.clone(), value);
            }
        }
        Ok(out)
    }

    fn resolve(&mut self, node: &'a Node, at: &ConfigPath) -> HoconResult<Option<Value>> {
        match node {
            Node::Scalar(value) => Ok(Some(value.clone())),
            Node::Space(space) => Ok(Some(Value::String(space.clone()))),
            Node::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    if let Some(value) = self.resolve(item, &at.child(i.to_string()))? {
                        out.push(value);
                    }
                }
                Ok(Some(Value::Array(out)))
            }
            Node::Object(map) => Ok(Some(Value::Object(self.resolve_object(map, at)?))),
            Node::Subst { path, optional } => match self.lookup(path)? {
                Some(value) => Ok(Some(value)),
                None if *optional => Ok(None),
                None => Err(HoconError::Unresolved { path: path.clone() }),
            },
            Node::Prev {
                path,
                value,
                optional,
            } => {
                let resolved = match value {
                    Some(prev) => self.resolve(prev, at)?,
                    None => None,
                };
                match resolved {
                    None if !*optional => Err(HoconError::Unresolved { path: path.clone() }),
                    other => Ok(other),
                }
            }
            Node::OrElse(primary, fallback) => match self.resolve(primary, at)? {
                Some(value) => Ok(Some(value)),
                None => self.resolve(fallback, at),
            },
            Node::Concat(pieces) => self.concat(pieces, at),
        }
    }

    fn concat(&mut self, pieces: &'a [Node], at: &ConfigPath) -> HoconResult<Option<Value>> {
        let mut parts = Vec::with_capacity(pieces.len());
        let mut saw_null = false;
        for piece in pieces {
            match piece {
                Node::Space(space) => parts.push(Part::Space(space.clone())),
                other => match self.resolve(other, at)? {
                    Some(Value::Null) => saw_null = true,
                    Some(value) => parts.push(Part::Value(value)),
                    None => {}
                },
            }
        }

        let mut values: Vec<Value> = parts
            .iter()
            .filter_map(|part| match part {
                Part::Value(value) => Some(value.clone()),
                Part::Space(_) => None,
            })
            .collect();

        match values.len() {
            0 => return Ok(saw_null.then_some(Value::Null)),
            1 => return Ok(values.pop()),
            _ => {}
        }

        if values.iter().all(Value::is_array) {
            let joined = values
                .into_iter()
                .flat_map(|value| match value {
                    Value::Array(items) => items,
                    _ => Vec::new(),
                })
                .collect();
            return Ok(Some(Value::Array(joined)));
        }

        if values.iter().all(Value::is_object) {
            let mut merged = Value::Object(Map::new());
            for value in values {
                merge_values(&mut merged, value);
            }
            return Ok(Some(merged));
        }

        if values.iter().any(|v| v.is_array() || v.is_object()) {
            return Err(HoconError::Concat {
                path: at.clone(),
                message: "cannot mix lists, objects and simple values".to_string(),
            });
        }

        Ok(Some(Value::String(join_simple(&parts))))
    }
}

/// Join simple values keeping only the whitespace found between two of them
fn join_simple(parts: &[Part]) -> String {
    let mut out = String::new();
    let mut pending_space = String::new();
    let mut emitted = false;
    for part in parts {
        match part {
            Part::Space(space) => {
                if emitted {
                    pending_space.push_str(space);
                }
            }
            Part::Value(value) => {
                out.push_str(&pending_space);
                pending_space.clear();
                out.push_str(&simple_text(value));
                emitted = true;
            }
        }
    }
    out
}

fn simple_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn descend(value: &Value, rest: &[String]) -> Option<Value> {
    let mut current = value;
    for segment in rest {
        current = current.as_object()?.get(segment)?;
    }
    Some(current.clone())
}

/// Deep merge `overlay` into `base`: objects merge by key, anything else replaces
pub(crate) fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value;
        }
    }
}
