//! FormStore - explicit value store with a committed baseline.
//!
//! Holds the live values, the last committed baseline and the dirty-field
//! bookkeeping. Only the form actor writes to it.

use serde_json::{Map, Value};

use crate::dirty::{compute_dirty, DirtyFields};
use crate::path::{get_path, set_path, FieldPath};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetValueOptions {
    pub should_dirty: bool,
}

impl SetValueOptions {
    pub fn dirty() -> Self {
        Self { should_dirty: true }
    }

    pub fn clean() -> Self {
        Self {
            should_dirty: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormStore {
    values: Value,
    baseline: Value,
    dirty: DirtyFields,
}

impl Default for FormStore {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

impl FormStore {
    pub fn new(defaults: Value) -> Self {
        let defaults = normalize_root(defaults);
        Self {
            values: defaults.clone(),
            baseline: defaults,
            dirty: DirtyFields::new(),
        }
    }

    pub fn values(&self) -> &Value {
        &self.values
    }

    pub fn baseline(&self) -> &Value {
        &self.baseline
    }

    pub fn dirty_fields(&self) -> &DirtyFields {
        &self.dirty
    }

    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        get_path(&self.values, path)
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_values(&self) -> Value {
        compute_dirty(&self.values, &self.dirty)
    }

    /// Write a value. Returns true if the stored value changed.
    pub fn set_value(&mut self, path: &FieldPath, value: Value, options: SetValueOptions) -> bool {
        let changed = self.get(path) != Some(&value);
        set_path(&mut self.values, path, value);
        if options.should_dirty {
            self.dirty.mark(path);
        }
        changed
    }

    /// Commit `values` as the new baseline. Dirty state is recomputed,
    /// which leaves it empty.
    pub fn reset(&mut self, values: Value) {
        let values = normalize_root(values);
        self.baseline = values.clone();
        self.values = values;
        self.dirty = DirtyFields::diff(&self.values, &self.baseline);
    }

    /// Commit `baseline` and keep `overrides` on top of it as pending edits.
    /// Dirty state is recomputed against the new baseline.
    pub fn commit_with_overrides(&mut self, baseline: Value, overrides: Vec<(FieldPath, Value)>) {
        let baseline = normalize_root(baseline);
        let mut merged = baseline.clone();
        for (path, value) in overrides {
            set_path(&mut merged, &path, value);
        }
        self.dirty = DirtyFields::diff(&merged, &baseline);
        self.baseline = baseline;
        self.values = merged;
    }
}

fn normalize_root(values: Value) -> Value {
    match values {
        Value::Object(_) => values,
        Value::Null => Value::Object(Map::new()),
        other => {
            tracing::warn!(kind = %value_kind(&other), "Form values must be an object, discarding");
            Value::Object(Map::new())
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
