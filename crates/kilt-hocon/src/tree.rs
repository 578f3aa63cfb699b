//! Merged, not yet resolved configuration tree
//!
//! Fields are folded into the tree in order. Objects merge key by key,
//! anything else replaces the earlier value. Substitutions stay symbolic
//! until resolution, except self-references which capture the value the
//! field held when it was reassigned.

use indexmap::IndexMap;
use serde_json::Value;

use crate::parser::{Expr, Field, FieldOp};
use crate::path::ConfigPath;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Scalar(Value),
    Space(String),
    Array(Vec<Node>),
    Object(IndexMap<String, Node>),
    Subst {
        path: ConfigPath,
        optional: bool,
    },
    /// Self-reference to the value a field held before being reassigned
    Prev {
        path: ConfigPath,
        value: Option<Box<Node>>,
        optional: bool,
    },
    /// Lone optional substitution that falls back to the earlier value
    OrElse(Box<Node>, Box<Node>),
    Concat(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tree {
    pub(crate) root: IndexMap<String, Node>,
    /// Absolute path of this tree, `None` for detached objects (array items)
    base: Option<ConfigPath>,
}

impl Tree {
    pub(crate) fn new(base: Option<ConfigPath>) -> Self {
        Self {
            root: IndexMap::new(),
            base,
        }
    }

    /// Fold fields into the tree under `prefix`
    pub(crate) fn apply(&mut self, prefix: &ConfigPath, fields: Vec<Field>) {
        for field in fields {
            self.assign(&prefix.join(&field.path), field.op, field.value);
        }
    }

    pub(crate) fn assign(&mut self, path: &ConfigPath, op: FieldOp, expr: Expr) {
        let absolute = self.base.as_ref().map(|base| base.join(path));
        let prev = self.take(path);

        match (op, expr) {
            (FieldOp::Assign, Expr::Object(fields)) => {
                let existing = match prev {
                    Some(Node::Object(map)) => map,
                    _ => IndexMap::new(),
                };
                let mut sub = Tree {
                    root: existing,
                    base: absolute,
                };
                for field in fields {
                    sub.assign(&field.path, field.op, field.value);
                }
                self.put(path, Node::Object(sub.root));
            }
            (op, expr) => {
                let mut node = lower(expr, absolute.as_ref(), prev.as_ref());
                match op {
                    FieldOp::Append => {
                        let previous = Node::Prev {
                            path: absolute.unwrap_or_else(|| path.clone()),
                            value: prev.map(Box::new),
                            optional: true,
                        };
                        node = Node::Concat(vec![previous, node]);
                    }
                    FieldOp::Assign => {
                        let lone_optional = matches!(node, Node::Subst { optional: true, .. });
                        if let (true, Some(prev)) = (lone_optional, prev) {
                            node = Node::OrElse(Box::new(node), Box::new(prev));
                        }
                    }
                }
                self.put(path, node);
            }
        }
    }

    /// Detach the node at `path`, leaving a placeholder so key order is kept
    fn take(&mut self, path: &ConfigPath) -> Option<Node> {
        let (last, parents) = path.segments().split_last()?;
        let mut map = &mut self.root;
        for segment in parents {
            match map.get_mut(segment) {
                Some(Node::Object(child)) => map = child,
                _ => return None,
            }
        }
        map.get_mut(last)
            .map(|slot| std::mem::replace(slot, Node::Scalar(Value::Null)))
    }

    fn put(&mut self, path: &ConfigPath, node: Node) {
        let Some((last, parents)) = path.segments().split_last() else {
            return;
        };
        let mut map = &mut self.root;
        for segment in parents {
            let entry = map
                .entry(segment.clone())
                .or_insert_with(|| Node::Object(IndexMap::new()));
            if !matches!(entry, Node::Object(_)) {
                *entry = Node::Object(IndexMap::new());
            }
            let Node::Object(child) = entry else {
                return;
            };
            map = child;
        }
        map.insert(last.clone(), node);
    }
}

fn lower(expr: Expr, self_path: Option<&ConfigPath>, prev: Option<&Node>) -> Node {
    match expr {
        Expr::Null => Node::Scalar(Value::Null),
        Expr::Bool(b) => Node::Scalar(Value::Bool(b)),
        Expr::Number(n) => Node::Scalar(Value::Number(n)),
        Expr::Str(s) => Node::Scalar(Value::String(s)),
        Expr::Space(s) => Node::Space(s),
        Expr::Array(items) => Node::Array(
            items
                .into_iter()
                .map(|item| lower(item, self_path, prev))
                .collect(),
        ),
        Expr::Object(fields) => {
            let mut sub = Tree::new(None);
            for field in fields {
                sub.assign(&field.path, field.op, field.value);
            }
            Node::Object(sub.root)
        }
        Expr::Subst { path, optional } => {
            if self_path == Some(&path) {
                Node::Prev {
                    path,
                    value: prev.cloned().map(Box::new),
                    optional,
                }
            } else {
                Node::Subst { path, optional }
            }
        }
        Expr::Concat(pieces) => Node::Concat(
            pieces
                .into_iter()
                .map(|piece| lower(piece, self_path, prev))
                .collect(),
        ),
    }
}
