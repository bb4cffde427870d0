//! Field paths - validated dot/bracket addresses into a value tree.
//!
//! `areas.north[0].color` parses to the segments `areas`, `north`, `0`,
//! `color`. Segments are kept as strings and resolved against the node they
//! address: an object looks the segment up as a key, an array parses it as
//! an index. `a[0]` and `a.0` therefore name the same field.

use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("Field path is empty")]
    Empty,

    #[error("Empty segment at position {position} in field path '{path}'")]
    EmptySegment { path: String, position: usize },

    #[error("Unterminated bracket in field path '{path}'")]
    UnterminatedBracket { path: String },

    #[error("Empty brackets in field path '{path}'")]
    EmptyBracket { path: String },
}

/// Parsed field path. Equality and hashing are on the segments, so
/// differently spelled paths to the same field compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        // A segment may legitimately be empty right after a closing bracket
        // (`a[0].b`), never anywhere else.
        let mut after_bracket = false;
        let mut chars = raw.char_indices().peekable();

        while let Some((pos, ch)) = chars.next() {
            match ch {
                '.' => {
                    if current.is_empty() && !after_bracket {
                        return Err(PathError::EmptySegment {
                            path: raw.to_string(),
                            position: pos,
                        });
                    }
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    }
                    after_bracket = false;
                    if chars.peek().is_none() {
                        return Err(PathError::EmptySegment {
                            path: raw.to_string(),
                            position: pos + 1,
                        });
                    }
                }
                '[' => {
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    } else if segments.is_empty() {
                        return Err(PathError::EmptySegment {
                            path: raw.to_string(),
                            position: pos,
                        });
                    }
                    let mut inner = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == ']' {
                            closed = true;
                            break;
                        }
                        inner.push(c);
                    }
                    if !closed {
                        return Err(PathError::UnterminatedBracket {
                            path: raw.to_string(),
                        });
                    }
                    let inner = unquote(inner.trim());
                    if inner.is_empty() {
                        return Err(PathError::EmptyBracket {
                            path: raw.to_string(),
                        });
                    }
                    segments.push(inner.to_string());
                    after_bracket = true;
                }
                _ => {
                    if after_bracket && current.is_empty() && !segments.is_empty() {
                        // `a[0]b` - a bracket must be followed by `.`, `[` or the end.
                        return Err(PathError::EmptySegment {
                            path: raw.to_string(),
                            position: pos,
                        });
                    }
                    current.push(ch);
                }
            }
        }

        if !current.is_empty() {
            segments.push(current);
        }

        Ok(Self { segments })
    }

    pub fn from_segments<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        if let Some(position) = segments.iter().position(|s| s.is_empty()) {
            return Err(PathError::EmptySegment {
                path: segments.join("."),
                position,
            });
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path of the enclosing container, `None` for top-level fields.
    pub fn parent(&self) -> Option<FieldPath> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn child(&self, segment: impl Into<String>) -> FieldPath {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

fn unquote(s: &str) -> &str {
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for FieldPath {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&String> for FieldPath {
    type Error = PathError;

    fn try_from(value: &String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

/// Anything a caller may name a field with.
pub trait IntoFieldPath {
    fn into_field_path(self) -> Result<FieldPath, PathError>;
}

impl IntoFieldPath for FieldPath {
    fn into_field_path(self) -> Result<FieldPath, PathError> {
        Ok(self)
    }
}

impl IntoFieldPath for &FieldPath {
    fn into_field_path(self) -> Result<FieldPath, PathError> {
        Ok(self.clone())
    }
}

impl IntoFieldPath for &str {
    fn into_field_path(self) -> Result<FieldPath, PathError> {
        FieldPath::parse(self)
    }
}

impl IntoFieldPath for String {
    fn into_field_path(self) -> Result<FieldPath, PathError> {
        FieldPath::parse(&self)
    }
}

impl IntoFieldPath for &String {
    fn into_field_path(self) -> Result<FieldPath, PathError> {
        FieldPath::parse(self)
    }
}

// ============================================================================
// Value tree access
// ============================================================================

fn step<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

pub fn get_path<'a>(root: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    path.segments
        .iter()
        .try_fold(root, |node, segment| step(node, segment))
}

pub fn has_path(root: &Value, path: &FieldPath) -> bool {
    get_path(root, path).is_some()
}

/// Write `value` at `path`, creating intermediate containers. A missing
/// container becomes an array when the next segment is an index.
pub fn set_path(root: &mut Value, path: &FieldPath, value: Value) {
    let Some(last) = path.segments.len().checked_sub(1) else {
        return;
    };
    let mut node = root;

    for (i, segment) in path.segments.iter().enumerate() {
        let next_is_index = path
            .segments
            .get(i + 1)
            .map(|s| s.parse::<usize>().is_ok())
            .unwrap_or(false);

        let index = match node {
            Value::Array(_) => segment.parse::<usize>().ok(),
            _ => None,
        };

        if index.is_none() && !node.is_object() {
            *node = Value::Object(Map::new());
        }

        let slot = match (node, index) {
            (Value::Array(items), Some(idx)) => {
                if items.len() <= idx {
                    items.resize(idx + 1, Value::Null);
                }
                &mut items[idx]
            }
            (Value::Object(map), _) => map.entry(segment.clone()).or_insert(Value::Null),
            // Unreachable: non-containers were replaced by an object above.
            (other, _) => other,
        };

        if i == last {
            *slot = value;
            return;
        }

        if !slot.is_object() && !slot.is_array() {
            *slot = if next_is_index {
                Value::Array(Vec::new())
            } else {
                Value::Object(Map::new())
            };
        }
        node = slot;
    }
}
