//! Shared types between the form engine and the web front-end
//!
//! These types are used by both:
//! - the `autoform` engine (native Rust)
//! - front-end components consuming the generated TypeScript bindings
//!
//! Serializable with serde for JSON

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

// ============================================================================
// Auto-submit configuration
// ============================================================================

/// Auto-submit option as written by callers: `false`, `true` or
/// `{ "enable": true, "wait": 750 }`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "form.ts")]
#[serde(untagged)]
pub enum AutoSubmit {
    Toggle(bool),
    Config {
        enable: bool,
        #[serde(default)]
        #[ts(type = "number | null")]
        wait: Option<u64>,
    },
}

impl Default for AutoSubmit {
    fn default() -> Self {
        AutoSubmit::Toggle(false)
    }
}

impl From<bool> for AutoSubmit {
    fn from(value: bool) -> Self {
        AutoSubmit::Toggle(value)
    }
}

/// Normalized auto-submit configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, TS)]
#[ts(export, export_to = "form.ts")]
pub struct AutoSubmitConfig {
    pub enable: bool,
    /// Debounce window in milliseconds. `None` submits on the next turn.
    #[ts(type = "number | null")]
    pub wait: Option<u64>,
}

impl AutoSubmitConfig {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn enabled() -> Self {
        Self {
            enable: true,
            wait: None,
        }
    }

    pub fn with_wait(wait_ms: u64) -> Self {
        Self {
            enable: true,
            wait: Some(wait_ms),
        }
    }
}

impl From<bool> for AutoSubmitConfig {
    fn from(enable: bool) -> Self {
        Self { enable, wait: None }
    }
}

impl From<AutoSubmit> for AutoSubmitConfig {
    fn from(value: AutoSubmit) -> Self {
        match value {
            AutoSubmit::Toggle(enable) => Self { enable, wait: None },
            AutoSubmit::Config { enable, wait } => Self { enable, wait },
        }
    }
}

// ============================================================================
// Form state
// ============================================================================

/// Submission lifecycle phase of a form instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, TS)]
#[ts(export, export_to = "form.ts")]
#[serde(rename_all = "snake_case")]
pub enum FormPhase {
    #[default]
    Idle,
    Scheduled,
    Submitting,
    SettledOk,
    SettledError,
}

impl FormPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormPhase::Idle => "idle",
            FormPhase::Scheduled => "scheduled",
            FormPhase::Submitting => "submitting",
            FormPhase::SettledOk => "settled_ok",
            FormPhase::SettledError => "settled_error",
        }
    }
}

impl std::fmt::Display for FormPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable state of a form, published after every transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, TS)]
#[ts(export, export_to = "form.ts")]
pub struct FormStateSnapshot {
    pub phase: FormPhase,
    pub is_dirty: bool,
    pub is_submitting: bool,
    pub is_submit_successful: bool,
    /// True while async default values are being fetched
    pub is_loading: bool,
    pub show_loader: bool,
    pub submit_count: u32,
    pub dirty_paths: Vec<String>,
    /// Inline validation errors by field path
    pub errors: BTreeMap<String, String>,
    pub last_submission_id: Option<String>,
}

/// View model for the manual submit button.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "form.ts")]
pub struct SubmitButtonState {
    pub visible: bool,
    pub enabled: bool,
    pub label: String,
}

/// Result of a submission cycle as reported to manual submitters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "form.ts")]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Submitted {
        submission_id: String,
        #[ts(type = "unknown")]
        dirty_values: serde_json::Value,
    },
    Invalid {
        errors: BTreeMap<String, String>,
    },
    Rejected {
        submission_id: String,
        message: String,
    },
}

impl SubmitOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmitOutcome::Submitted { .. })
    }
}

// ============================================================================
// Message catalog keys
// ============================================================================

pub const MSG_SUBMIT_IN_PROGRESS: &str = "form.submit.inProgress";
pub const MSG_SUBMIT_ERROR: &str = "form.submit.error";
pub const MSG_LOAD_ERROR: &str = "form.load.error";
pub const MSG_SAVE: &str = "global.save";
