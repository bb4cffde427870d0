//! FormActor state: the value store, field registry, submission bookkeeping
//! and the snapshot published to observers.

use chrono::{DateTime, Utc};
use ractor::RpcReplyPort;
use serde_json::Value;
use shared_types::{
    AutoSubmitConfig, FormPhase, FormStateSnapshot, SubmitButtonState, SubmitOutcome, MSG_SAVE,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::StateChangeCallback;
use crate::guard::{GuardToken, UnloadGuard};
use crate::handler::{SubmitErrorHandler, SubmitHandler, SubmitTrigger};
use crate::i18n::Translator;
use crate::notify::Notifier;
use crate::path::FieldPath;
use crate::registry::FieldRegistry;
use crate::store::FormStore;
use crate::validation::FieldErrors;

/// Per-instance debounce timer. Every re-arm bumps the generation so an
/// elapsed message from a cancelled timer is recognised as stale.
#[derive(Debug, Default)]
pub struct Debounce {
    pub generation: u64,
    pub armed: bool,
    pub task: Option<JoinHandle<()>>,
}

impl Debounce {
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.armed = false;
    }
}

#[derive(Debug, Default)]
pub struct Loader {
    pub visible: bool,
    pub generation: u64,
    pub hide_task: Option<JoinHandle<()>>,
}

impl Loader {
    pub fn show(&mut self) {
        if let Some(task) = self.hide_task.take() {
            task.abort();
        }
        self.generation += 1;
        self.visible = true;
    }
}

/// The one submission in flight.
pub struct PendingSubmission {
    pub id: String,
    pub values: Value,
    pub dirty_values: Value,
    pub had_dirty_fields: bool,
    /// Set when the form is reset while this submission runs; its values
    /// are then not committed.
    pub superseded: bool,
    pub trigger: SubmitTrigger,
    pub started_at: DateTime<Utc>,
    pub token: GuardToken,
    pub waiters: Vec<RpcReplyPort<SubmitOutcome>>,
}

/// A submission requested while another one was in flight.
pub struct DeferredSubmission {
    pub trigger: SubmitTrigger,
    pub waiters: Vec<RpcReplyPort<SubmitOutcome>>,
}

pub struct FormActorState {
    pub form_id: String,
    pub store: FormStore,
    pub registry: FieldRegistry,
    pub auto_submit: AutoSubmitConfig,
    pub wait: Option<Duration>,
    pub on_submit: Option<Arc<dyn SubmitHandler>>,
    pub on_submit_error: Option<Arc<dyn SubmitErrorHandler>>,
    pub on_state_change: Option<StateChangeCallback>,
    pub hide_submit_button: bool,
    pub submit_button_text: Option<String>,
    pub disable_loader: bool,
    pub loader_delay: Duration,
    pub notifier: Arc<dyn Notifier>,
    pub translator: Arc<dyn Translator>,
    pub guard: UnloadGuard,

    pub debounce: Debounce,
    pub pending: Option<PendingSubmission>,
    pub deferred: Option<DeferredSubmission>,
    /// Paths dirtied while `pending` is set, in first-edit order.
    pub changed_during_submit: Vec<FieldPath>,
    pub errors: FieldErrors,
    pub is_submit_successful: bool,
    pub submit_count: u32,
    pub last_submission_id: Option<String>,
    pub is_loading: bool,
    pub loader: Loader,
    pub state_tx: watch::Sender<FormStateSnapshot>,
}

impl FormActorState {
    pub fn phase(&self) -> FormPhase {
        if self.pending.is_some() {
            FormPhase::Submitting
        } else if self.debounce.armed {
            FormPhase::Scheduled
        } else {
            FormPhase::Idle
        }
    }

    pub fn note_changed_during_submit(&mut self, path: &FieldPath) {
        if self.pending.is_some() && !self.changed_during_submit.contains(path) {
            self.changed_during_submit.push(path.clone());
        }
    }

    pub fn defer(&mut self, trigger: SubmitTrigger, reply: Option<RpcReplyPort<SubmitOutcome>>) {
        let deferred = self.deferred.get_or_insert_with(|| DeferredSubmission {
            trigger,
            waiters: Vec::new(),
        });
        if trigger == SubmitTrigger::Manual {
            deferred.trigger = SubmitTrigger::Manual;
        }
        if let Some(reply) = reply {
            deferred.waiters.push(reply);
        }
    }

    pub fn snapshot(&self, phase: FormPhase) -> FormStateSnapshot {
        FormStateSnapshot {
            phase,
            is_dirty: self.store.is_dirty(),
            is_submitting: self.pending.is_some(),
            is_submit_successful: self.is_submit_successful,
            is_loading: self.is_loading,
            show_loader: self.loader.visible && !self.disable_loader,
            submit_count: self.submit_count,
            dirty_paths: self
                .store
                .dirty_fields()
                .paths()
                .iter()
                .map(ToString::to_string)
                .collect(),
            errors: self.errors.clone(),
            last_submission_id: self.last_submission_id.clone(),
        }
    }

    /// Publish a snapshot with an explicit phase (used for the transient
    /// settled phases).
    pub fn publish(&self, phase: FormPhase) {
        let snapshot = self.snapshot(phase);
        let modified = self.state_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot.clone();
                true
            }
        });
        if modified {
            if let Some(callback) = &self.on_state_change {
                callback(&snapshot);
            }
        }
    }

    pub fn publish_current(&self) {
        self.publish(self.phase());
    }

    pub fn submit_button(&self) -> SubmitButtonState {
        SubmitButtonState {
            visible: !self.hide_submit_button && !self.auto_submit.enable,
            enabled: self.store.is_dirty() && self.pending.is_none(),
            label: self
                .submit_button_text
                .clone()
                .unwrap_or_else(|| self.translator.t(MSG_SAVE)),
        }
    }

    pub fn abort_tasks(&mut self) {
        self.debounce.cancel();
        if let Some(task) = self.loader.hide_task.take() {
            task.abort();
        }
    }
}
