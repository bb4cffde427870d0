//! Error types for the form engine.

use crate::path::PathError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum FormError {
    #[error("Invalid field path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("Unknown field '{path}': not part of the form values")]
    UnknownField { path: String },

    #[error("Failed to spawn form actor: {0}")]
    Spawn(String),

    #[error("Form actor RPC error: {0}")]
    Rpc(String),
}

/// Failure of a submit handler or field listener. The coordinator never
/// inspects the cause; every variant surfaces the same way.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("{0}")]
    Rejected(String),

    #[error("Submit handler panicked: {0}")]
    Panicked(String),
}

impl SubmitError {
    pub fn rejected(err: impl std::fmt::Display) -> Self {
        SubmitError::Rejected(err.to_string())
    }
}

impl From<String> for SubmitError {
    fn from(value: String) -> Self {
        SubmitError::Rejected(value)
    }
}

impl From<&str> for SubmitError {
    fn from(value: &str) -> Self {
        SubmitError::Rejected(value.to_string())
    }
}

impl From<std::io::Error> for SubmitError {
    fn from(value: std::io::Error) -> Self {
        SubmitError::Rejected(value.to_string())
    }
}

impl From<serde_json::Error> for SubmitError {
    fn from(value: serde_json::Error) -> Self {
        SubmitError::Rejected(value.to_string())
    }
}

impl From<anyhow::Error> for SubmitError {
    fn from(value: anyhow::Error) -> Self {
        SubmitError::Rejected(format!("{value:#}"))
    }
}
