//! FormActor message types.
//!
//! Public commands come from `FormHandle` and `FieldBinding`; the internal
//! ones are posted back by the actor's own timer and submission tasks.

use ractor::RpcReplyPort;
use serde_json::Value;
use shared_types::{FormStateSnapshot, SubmitButtonState, SubmitOutcome};

use crate::error::{FormError, SubmitError};
use crate::path::FieldPath;
use crate::registry::RegisterOptions;
use crate::store::SetValueOptions;

#[derive(Debug)]
pub enum FormMsg {
    Register {
        path: FieldPath,
        options: RegisterOptions,
        reply: RpcReplyPort<Result<(), FormError>>,
    },
    /// `None` drops every field.
    Unregister {
        paths: Option<Vec<FieldPath>>,
        reply: RpcReplyPort<()>,
    },
    /// Native change event of a registered field.
    FieldChanged { path: FieldPath, value: Value },
    /// Programmatic write. `options: None` dirties the field iff
    /// auto-submit is enabled.
    SetValue {
        path: FieldPath,
        value: Value,
        options: Option<SetValueOptions>,
        reply: RpcReplyPort<()>,
    },
    GetValue {
        path: FieldPath,
        reply: RpcReplyPort<Option<Value>>,
    },
    GetValues {
        reply: RpcReplyPort<Value>,
    },
    GetDirtyValues {
        reply: RpcReplyPort<Value>,
    },
    GetState {
        reply: RpcReplyPort<FormStateSnapshot>,
    },
    GetSubmitButton {
        reply: RpcReplyPort<SubmitButtonState>,
    },
    /// Explicit submit; replies once the serving cycle settles.
    Submit {
        reply: RpcReplyPort<SubmitOutcome>,
    },
    /// Commit `values` (or the current baseline) and drop pending edits.
    Reset {
        values: Option<Value>,
        reply: RpcReplyPort<()>,
    },

    // Internal
    DebounceElapsed {
        generation: u64,
    },
    SubmissionSettled {
        submission_id: String,
        result: Result<(), SubmitError>,
    },
    DefaultValuesLoaded {
        result: Result<Value, String>,
    },
    HideLoader {
        generation: u64,
    },
}
