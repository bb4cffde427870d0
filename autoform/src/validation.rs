//! Per-field validation rules.
//!
//! Rules are declared when a field is registered and run over the whole
//! form before each submission. The coordinator only looks at whether the
//! resulting error map is empty.

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::path::{get_path, FieldPath};

/// Inline error messages keyed by field path.
pub type FieldErrors = BTreeMap<String, String>;

pub type CustomValidator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

#[derive(Clone)]
pub enum Rule {
    Required,
    Min(f64),
    Max(f64),
    MinLength(usize),
    MaxLength(usize),
    Pattern(Regex),
    Custom(CustomValidator),
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Required => write!(f, "Required"),
            Rule::Min(v) => write!(f, "Min({v})"),
            Rule::Max(v) => write!(f, "Max({v})"),
            Rule::MinLength(v) => write!(f, "MinLength({v})"),
            Rule::MaxLength(v) => write!(f, "MaxLength({v})"),
            Rule::Pattern(re) => write!(f, "Pattern({})", re.as_str()),
            Rule::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl Rule {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Rule::Custom(Arc::new(f))
    }

    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Rule::Pattern(Regex::new(pattern)?))
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            Rule::Required => {
                if is_empty(value) {
                    Err("This field is required".to_string())
                } else {
                    Ok(())
                }
            }
            Rule::Min(min) => match as_number(value) {
                Some(n) if n < *min => Err(format!("Value must be at least {min}")),
                _ => Ok(()),
            },
            Rule::Max(max) => match as_number(value) {
                Some(n) if n > *max => Err(format!("Value must be at most {max}")),
                _ => Ok(()),
            },
            Rule::MinLength(min) => match length(value) {
                Some(len) if len < *min => Err(format!("Length must be at least {min}")),
                _ => Ok(()),
            },
            Rule::MaxLength(max) => match length(value) {
                Some(len) if len > *max => Err(format!("Length must be at most {max}")),
                _ => Ok(()),
            },
            Rule::Pattern(re) => match value {
                Value::String(s) if !re.is_match(s) => {
                    Err(format!("Value does not match {}", re.as_str()))
                }
                _ => Ok(()),
            },
            // A panicking validator fails its field instead of the form.
            Rule::Custom(func) => match catch_unwind(AssertUnwindSafe(|| func(value))) {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("Custom validator panicked");
                    Err("Validation failed".to_string())
                }
            },
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// First failing rule for one value. Empty optional values skip the
/// remaining rules, custom validators excepted.
pub fn validate_value(rules: &[Rule], value: Option<&Value>) -> Result<(), String> {
    let value = value.unwrap_or(&Value::Null);
    let required = rules.iter().any(|r| matches!(r, Rule::Required));

    for rule in rules {
        if !required && is_empty(value) && !matches!(rule, Rule::Custom(_)) {
            continue;
        }
        rule.check(value)?;
    }
    Ok(())
}

pub fn validate_fields<'a, I>(fields: I, values: &Value) -> FieldErrors
where
    I: IntoIterator<Item = (&'a FieldPath, &'a [Rule])>,
{
    let mut errors = FieldErrors::new();
    for (path, rules) in fields {
        if rules.is_empty() {
            continue;
        }
        if let Err(message) = validate_value(rules, get_path(values, path)) {
            errors.insert(path.to_string(), message);
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_rejects_empty_values() {
        let rules = [Rule::Required];
        assert!(validate_value(&rules, None).is_err());
        assert!(validate_value(&rules, Some(&json!("  "))).is_err());
        assert!(validate_value(&rules, Some(&json!([]))).is_err());
        assert!(validate_value(&rules, Some(&json!(0))).is_ok());
        assert!(validate_value(&rules, Some(&json!(false))).is_ok());
    }

    #[test]
    fn test_bounds_accept_numeric_strings() {
        let rules = [Rule::Min(0.0), Rule::Max(100.0)];
        assert!(validate_value(&rules, Some(&json!(50))).is_ok());
        assert!(validate_value(&rules, Some(&json!("101"))).is_err());
        assert_eq!(
            validate_value(&rules, Some(&json!(-1))),
            Err("Value must be at least 0".to_string())
        );
    }

    #[test]
    fn test_optional_empty_value_skips_rules() {
        let rules = [Rule::MinLength(3), Rule::pattern("^#[0-9A-F]{6}$").unwrap()];
        assert!(validate_value(&rules, Some(&json!(""))).is_ok());
        assert!(validate_value(&rules, Some(&json!("#FF0000"))).is_ok());
        assert!(validate_value(&rules, Some(&json!("red"))).is_err());
    }

    #[test]
    fn test_custom_validator_runs_on_missing_values() {
        let rules = [Rule::custom(|v| {
            if v.is_null() {
                Err("missing".to_string())
            } else {
                Ok(())
            }
        })];
        assert_eq!(validate_value(&rules, None), Err("missing".to_string()));
    }

    #[test]
    fn test_panicking_custom_validator_fails_field() {
        let rules = [Rule::custom(|_| panic!("validator bug"))];
        assert_eq!(
            validate_value(&rules, Some(&json!("x"))),
            Err("Validation failed".to_string())
        );
    }

    #[test]
    fn test_validate_fields_collects_by_path() {
        let name = FieldPath::parse("area.name").unwrap();
        let load = FieldPath::parse("load").unwrap();
        let name_rules = vec![Rule::Required];
        let load_rules = vec![Rule::Max(10.0)];
        let values = json!({"area": {"name": ""}, "load": 5});

        let errors = validate_fields(
            [
                (&name, name_rules.as_slice()),
                (&load, load_rules.as_slice()),
            ],
            &values,
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["area.name"], "This field is required");
    }
}
