//! FieldRegistry - per-field auto-submit listeners, validation rules and
//! change hooks, keyed by validated field path.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::FormError;
use crate::handler::AutoSubmitListener;
use crate::path::{get_path, FieldPath};
use crate::validation::{validate_fields, FieldErrors, Rule};

/// Caller hook run on every change event of a field, before the engine
/// reacts to it.
pub type ChangeHook = Arc<dyn Fn(&FieldPath, &Value) + Send + Sync>;

#[derive(Clone, Default)]
pub struct RegisterOptions {
    pub on_auto_submit: Option<Arc<dyn AutoSubmitListener>>,
    pub rules: Vec<Rule>,
    pub on_change: Option<ChangeHook>,
}

impl fmt::Debug for RegisterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterOptions")
            .field("on_auto_submit", &self.on_auto_submit.is_some())
            .field("rules", &self.rules)
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}

impl RegisterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_auto_submit<L>(mut self, listener: L) -> Self
    where
        L: AutoSubmitListener + 'static,
    {
        self.on_auto_submit = Some(Arc::new(listener));
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn required(self) -> Self {
        self.rule(Rule::Required)
    }

    pub fn on_change<F>(mut self, hook: F) -> Self
    where
        F: Fn(&FieldPath, &Value) + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(hook));
        self
    }
}

#[derive(Clone, Default)]
struct FieldEntry {
    listener: Option<Arc<dyn AutoSubmitListener>>,
    rules: Vec<Rule>,
    on_change: Option<ChangeHook>,
}

#[derive(Clone, Default)]
pub struct FieldRegistry {
    fields: BTreeMap<FieldPath, FieldEntry>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) a field. The path is checked once here
    /// against the shape of `schema`: it must already exist there, or
    /// address a new slot of an existing array. An empty schema (no known
    /// values yet) accepts any path.
    pub fn register(
        &mut self,
        path: FieldPath,
        options: RegisterOptions,
        schema: &Value,
    ) -> Result<(), FormError> {
        if !fits_schema(&path, schema) {
            return Err(FormError::UnknownField {
                path: path.to_string(),
            });
        }

        let entry = self.fields.entry(path).or_default();
        // Fields re-register on every mount; keep a listener that was set
        // before unless a new one is given.
        if options.on_auto_submit.is_some() {
            entry.listener = options.on_auto_submit;
        }
        entry.rules = options.rules;
        entry.on_change = options.on_change;
        Ok(())
    }

    /// Drop the given fields, or every field when `paths` is `None`.
    pub fn unregister(&mut self, paths: Option<&[FieldPath]>) {
        match paths {
            Some(paths) => {
                for path in paths {
                    self.fields.remove(path);
                }
            }
            None => self.fields.clear(),
        }
    }

    /// Drop fields whose path no longer fits `schema`. Returns the dropped
    /// paths.
    pub fn retain_fitting(&mut self, schema: &Value) -> Vec<FieldPath> {
        let dropped: Vec<FieldPath> = self
            .fields
            .keys()
            .filter(|path| !fits_schema(path, schema))
            .cloned()
            .collect();
        for path in &dropped {
            self.fields.remove(path);
        }
        dropped
    }

    pub fn is_registered(&self, path: &FieldPath) -> bool {
        self.fields.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn listener(&self, path: &FieldPath) -> Option<Arc<dyn AutoSubmitListener>> {
        self.fields.get(path).and_then(|e| e.listener.clone())
    }

    pub fn listeners(
        &self,
    ) -> impl Iterator<Item = (&FieldPath, &Arc<dyn AutoSubmitListener>)> + '_ {
        self.fields
            .iter()
            .filter_map(|(path, entry)| entry.listener.as_ref().map(|l| (path, l)))
    }

    pub fn change_hook(&self, path: &FieldPath) -> Option<ChangeHook> {
        self.fields.get(path).and_then(|e| e.on_change.clone())
    }

    pub fn validate(&self, values: &Value) -> FieldErrors {
        validate_fields(
            self.fields
                .iter()
                .map(|(path, entry)| (path, entry.rules.as_slice())),
            values,
        )
    }
}

fn fits_schema(path: &FieldPath, schema: &Value) -> bool {
    let schema_known = match schema {
        Value::Object(map) => !map.is_empty(),
        _ => false,
    };
    if !schema_known || get_path(schema, path).is_some() {
        return true;
    }
    match path.parent() {
        Some(parent) => matches!(get_path(schema, &parent), Some(Value::Array(_))),
        None => false,
    }
}
