//! Dirty-field bookkeeping and dirty-value extraction.
//!
//! `DirtyFields` mirrors the shape of the form values. Edits mark paths
//! (marks are sticky until the next commit, even if the value is reverted);
//! commits recompute the whole map from `(current, baseline)` via
//! [`DirtyFields::diff`].

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::path::FieldPath;

#[derive(Debug, Clone, PartialEq, Eq)]
enum DirtyNode {
    /// The whole subtree at this path is dirty.
    Leaf,
    Branch(BTreeMap<String, DirtyNode>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirtyFields {
    root: BTreeMap<String, DirtyNode>,
}

impl DirtyFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value-equality diff between two trees, at the finest path where
    /// they differ.
    pub fn diff(current: &Value, baseline: &Value) -> Self {
        match diff_node(current, baseline) {
            Some(DirtyNode::Branch(root)) => Self { root },
            // Root objects are never leaves unless one side is not an object.
            Some(DirtyNode::Leaf) => {
                let mut root = BTreeMap::new();
                if let Value::Object(map) = current {
                    for key in map.keys() {
                        root.insert(key.clone(), DirtyNode::Leaf);
                    }
                }
                Self { root }
            }
            None => Self::default(),
        }
    }

    pub fn mark(&mut self, path: &FieldPath) {
        let segments = path.segments();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut level = &mut self.root;
        for segment in parents {
            let node = level
                .entry(segment.clone())
                .or_insert_with(|| DirtyNode::Branch(BTreeMap::new()));
            match node {
                // An ancestor is already wholly dirty.
                DirtyNode::Leaf => return,
                DirtyNode::Branch(children) => level = children,
            }
        }
        level.insert(last.clone(), DirtyNode::Leaf);
    }

    /// True if `path` itself, or an ancestor, is marked dirty.
    pub fn is_marked(&self, path: &FieldPath) -> bool {
        let mut level = &self.root;
        for (i, segment) in path.segments().iter().enumerate() {
            match level.get(segment) {
                None => return false,
                Some(DirtyNode::Leaf) => return true,
                Some(DirtyNode::Branch(children)) => {
                    if i == path.len() - 1 {
                        return false;
                    }
                    level = children;
                }
            }
        }
        false
    }

    /// True if `path` is present in the dirty tree at all: marked itself,
    /// covered by a marked ancestor, or holding marked descendants.
    pub fn touches(&self, path: &FieldPath) -> bool {
        let mut level = &self.root;
        for segment in path.segments() {
            match level.get(segment) {
                None => return false,
                Some(DirtyNode::Leaf) => return true,
                Some(DirtyNode::Branch(children)) => level = children,
            }
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn clear(&mut self) {
        self.root.clear();
    }

    /// Every marked path, in tree order.
    pub fn paths(&self) -> Vec<FieldPath> {
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        collect_paths(&self.root, &mut prefix, &mut out);
        out
    }
}

fn diff_node(current: &Value, baseline: &Value) -> Option<DirtyNode> {
    match (current, baseline) {
        (Value::Object(cur), Value::Object(base)) => {
            let mut children = BTreeMap::new();
            for (key, value) in cur {
                match base.get(key) {
                    Some(old) => {
                        if let Some(node) = diff_node(value, old) {
                            children.insert(key.clone(), node);
                        }
                    }
                    None => {
                        children.insert(key.clone(), DirtyNode::Leaf);
                    }
                }
            }
            for key in base.keys() {
                if !cur.contains_key(key) {
                    children.insert(key.clone(), DirtyNode::Leaf);
                }
            }
            (!children.is_empty()).then_some(DirtyNode::Branch(children))
        }
        (Value::Array(cur), Value::Array(base)) => {
            let mut children = BTreeMap::new();
            for i in 0..cur.len().max(base.len()) {
                let node = match (cur.get(i), base.get(i)) {
                    (Some(a), Some(b)) => diff_node(a, b),
                    _ => Some(DirtyNode::Leaf),
                };
                if let Some(node) = node {
                    children.insert(i.to_string(), node);
                }
            }
            (!children.is_empty()).then_some(DirtyNode::Branch(children))
        }
        (a, b) => (a != b).then_some(DirtyNode::Leaf),
    }
}

fn collect_paths(
    level: &BTreeMap<String, DirtyNode>,
    prefix: &mut Vec<String>,
    out: &mut Vec<FieldPath>,
) {
    for (segment, node) in level {
        prefix.push(segment.clone());
        match node {
            DirtyNode::Leaf => {
                if let Ok(path) = FieldPath::from_segments(prefix.iter().cloned()) {
                    out.push(path);
                }
            }
            DirtyNode::Branch(children) => collect_paths(children, prefix, out),
        }
        prefix.pop();
    }
}

/// Extract the subset of `values` addressed by `dirty`, keeping the shape
/// of `values`. Paths marked dirty but absent from `values` are skipped.
pub fn compute_dirty(values: &Value, dirty: &DirtyFields) -> Value {
    extract_level(values, &dirty.root).unwrap_or_else(|| Value::Object(Map::new()))
}

fn extract_level(value: &Value, level: &BTreeMap<String, DirtyNode>) -> Option<Value> {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, node) in level {
                if let Some(child) = map.get(key) {
                    if let Some(extracted) = extract_node(child, node) {
                        out.insert(key.clone(), extracted);
                    }
                }
            }
            Some(Value::Object(out))
        }
        Value::Array(items) => {
            let mut picked: Vec<(usize, Value)> = Vec::new();
            for (key, node) in level {
                let Ok(index) = key.parse::<usize>() else {
                    continue;
                };
                if let Some(child) = items.get(index) {
                    if let Some(extracted) = extract_node(child, node) {
                        picked.push((index, extracted));
                    }
                }
            }
            // Positional slots keep indices meaningful; gaps are null.
            let len = picked.iter().map(|(i, _)| i + 1).max().unwrap_or(0);
            let mut out = vec![Value::Null; len];
            for (index, extracted) in picked {
                out[index] = extracted;
            }
            Some(Value::Array(out))
        }
        // Branch over a scalar: the shape changed under the mark, take it whole.
        other => Some(other.clone()),
    }
}

fn extract_node(value: &Value, node: &DirtyNode) -> Option<Value> {
    match node {
        DirtyNode::Leaf => Some(value.clone()),
        DirtyNode::Branch(children) => extract_level(value, children),
    }
}
