//! Autoform - auto-submitting form engine
//!
//! Tracks which fields changed since the last committed baseline, debounces
//! auto-submit requests, keeps one submission in flight per form and keeps
//! edits made while a submission is running.

pub mod actors;
pub mod config;
pub mod dirty;
pub mod error;
pub mod form;
pub mod guard;
pub mod handler;
pub mod i18n;
pub mod notify;
pub mod path;
pub mod registry;
pub mod script;
pub mod store;
pub mod validation;

pub use config::{EngineSettings, FormConfig};
pub use error::{FormError, SubmitError};
pub use form::{FieldBinding, Form, FormHandle};
pub use guard::{NavigationDecision, UnloadGuard};
pub use handler::{SubmitData, SubmitTrigger};
pub use path::FieldPath;
pub use registry::RegisterOptions;
pub use store::SetValueOptions;
pub use validation::Rule;

pub use shared_types::{
    AutoSubmit, AutoSubmitConfig, FormPhase, FormStateSnapshot, SubmitButtonState, SubmitOutcome,
};
