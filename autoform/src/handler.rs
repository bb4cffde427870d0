//! Caller-supplied callbacks: whole-form submit handler, per-field
//! auto-submit listeners, validation error handler.
//!
//! Each trait has a blanket impl for plain closures so callers can pass
//! `|data| async move { ... }` directly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;

use crate::error::SubmitError;
use crate::validation::FieldErrors;

/// What started a submission cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTrigger {
    /// Debounced auto-submit after an edit
    Auto,
    /// Explicit `submit()` call (the form's submit button)
    Manual,
}

/// Payload handed to the whole-form handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitData {
    pub submission_id: String,
    pub values: Value,
    pub dirty_values: Value,
    pub trigger: SubmitTrigger,
}

#[async_trait]
pub trait SubmitHandler: Send + Sync {
    async fn submit(&self, data: SubmitData) -> Result<(), SubmitError>;
}

#[async_trait]
impl<F, Fut> SubmitHandler for F
where
    F: Fn(SubmitData) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), SubmitError>> + Send + 'static,
{
    async fn submit(&self, data: SubmitData) -> Result<(), SubmitError> {
        (self)(data).await
    }
}

/// Per-field listener, invoked with the field's current value when the
/// field is part of an auto-submitted dirty set.
#[async_trait]
pub trait AutoSubmitListener: Send + Sync {
    async fn on_auto_submit(&self, value: Value) -> Result<(), SubmitError>;
}

#[async_trait]
impl<F, Fut> AutoSubmitListener for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), SubmitError>> + Send + 'static,
{
    async fn on_auto_submit(&self, value: Value) -> Result<(), SubmitError> {
        (self)(value).await
    }
}

/// Called when a submission attempt is stopped by validation.
pub trait SubmitErrorHandler: Send + Sync {
    fn on_submit_error(&self, errors: &FieldErrors);
}

impl<F> SubmitErrorHandler for F
where
    F: Fn(&FieldErrors) + Send + Sync,
{
    fn on_submit_error(&self, errors: &FieldErrors) {
        (self)(errors)
    }
}
