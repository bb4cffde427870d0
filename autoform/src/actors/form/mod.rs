//! FormActor - submission coordinator for one form instance.
//!
//! Owns the value store and field registry, debounces auto-submit requests,
//! keeps at most one submission in flight and defers the next one until the
//! current one settles. Timers and submission work run in spawned tasks that
//! post their result back to the actor, so every state change happens on the
//! actor's mailbox.

mod messages;
mod state;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use serde_json::{Map, Value};
use shared_types::{
    FormPhase, FormStateSnapshot, SubmitOutcome, MSG_LOAD_ERROR, MSG_SUBMIT_ERROR,
    MSG_SUBMIT_IN_PROGRESS,
};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;

pub use messages::FormMsg;
pub use state::FormActorState;

use crate::config::{DefaultValues, FormConfig};
use crate::error::SubmitError;
use crate::handler::{SubmitData, SubmitTrigger};
use crate::path::{get_path, FieldPath};
use crate::registry::FieldRegistry;
use crate::store::{FormStore, SetValueOptions};
use state::{Debounce, Loader, PendingSubmission};

type SubmitCall = BoxFuture<'static, Result<(), SubmitError>>;

#[derive(Debug, Default)]
pub struct FormActor;

pub struct FormArguments {
    pub form_id: String,
    pub config: FormConfig,
    pub state_tx: watch::Sender<FormStateSnapshot>,
}

#[async_trait]
impl Actor for FormActor {
    type Msg = FormMsg;
    type State = FormActorState;
    type Arguments = FormArguments;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let FormArguments {
            form_id,
            config,
            state_tx,
        } = args;
        tracing::info!(
            actor_id = %myself.get_id(),
            form_id = %form_id,
            auto_submit = config.auto_submit.enable,
            "FormActor starting"
        );

        let wait = config.effective_wait();
        let FormConfig {
            default_values,
            auto_submit,
            on_submit,
            on_submit_error,
            on_state_change,
            hide_submit_button,
            submit_button_text,
            disable_loader,
            loader_delay,
            notifier,
            translator,
            guard,
            ..
        } = config;

        let (initial, loader) = match default_values {
            DefaultValues::Static(values) => (values, None),
            DefaultValues::Async(loader) => (Value::Object(Map::new()), Some(loader)),
        };

        let state = FormActorState {
            form_id,
            store: FormStore::new(initial),
            registry: FieldRegistry::new(),
            auto_submit,
            wait,
            on_submit,
            on_submit_error,
            on_state_change,
            hide_submit_button,
            submit_button_text,
            disable_loader,
            loader_delay,
            notifier,
            translator,
            guard,
            debounce: Debounce::default(),
            pending: None,
            deferred: None,
            changed_during_submit: Vec::new(),
            errors: Default::default(),
            is_submit_successful: false,
            submit_count: 0,
            last_submission_id: None,
            is_loading: loader.is_some(),
            loader: Loader::default(),
            state_tx,
        };

        if let Some(loader) = loader {
            let myself_clone = myself.clone();
            tokio::spawn(async move {
                let result = loader().await.map_err(|e| format!("{e:#}"));
                if let Err(e) = myself_clone.send_message(FormMsg::DefaultValuesLoaded { result }) {
                    tracing::debug!(error = %e, "Form stopped before default values loaded");
                }
            });
        }

        state.publish_current();
        Ok(state)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            FormMsg::Register {
                path,
                options,
                reply,
            } => {
                let result = state
                    .registry
                    .register(path.clone(), options, state.store.baseline());
                match &result {
                    Ok(()) => tracing::debug!(form_id = %state.form_id, path = %path, "Field registered"),
                    Err(e) => tracing::warn!(form_id = %state.form_id, error = %e, "Field registration rejected"),
                }
                let _ = reply.send(result);
            }
            FormMsg::Unregister { paths, reply } => {
                state.registry.unregister(paths.as_deref());
                let _ = reply.send(());
            }
            FormMsg::FieldChanged { path, value } => {
                self.handle_field_changed(&myself, state, path, value);
            }
            FormMsg::SetValue {
                path,
                value,
                options,
                reply,
            } => {
                self.handle_set_value(&myself, state, path, value, options);
                let _ = reply.send(());
            }
            FormMsg::GetValue { path, reply } => {
                let _ = reply.send(state.store.get(&path).cloned());
            }
            FormMsg::GetValues { reply } => {
                let _ = reply.send(state.store.values().clone());
            }
            FormMsg::GetDirtyValues { reply } => {
                let _ = reply.send(state.store.dirty_values());
            }
            FormMsg::GetState { reply } => {
                let _ = reply.send(state.snapshot(state.phase()));
            }
            FormMsg::GetSubmitButton { reply } => {
                let _ = reply.send(state.submit_button());
            }
            FormMsg::Submit { reply } => {
                self.handle_submit(&myself, state, reply);
            }
            FormMsg::Reset { values, reply } => {
                state.debounce.cancel();
                if let Some(pending) = state.pending.as_mut() {
                    pending.superseded = true;
                }
                let values = values.unwrap_or_else(|| state.store.baseline().clone());
                state.store.reset(values);
                state.errors.clear();
                state.changed_during_submit.clear();
                tracing::debug!(form_id = %state.form_id, "Form reset");
                state.publish_current();
                let _ = reply.send(());
            }
            FormMsg::DebounceElapsed { generation } => {
                self.handle_debounce_elapsed(&myself, state, generation);
            }
            FormMsg::SubmissionSettled {
                submission_id,
                result,
            } => {
                self.handle_submission_settled(&myself, state, submission_id, result);
            }
            FormMsg::DefaultValuesLoaded { result } => {
                state.is_loading = false;
                match result {
                    Ok(values) => {
                        tracing::info!(form_id = %state.form_id, "Default values loaded");
                        Self::apply_loaded_defaults(state, values);
                    }
                    Err(e) => {
                        tracing::warn!(form_id = %state.form_id, error = %e, "Failed to load default values");
                        let message = state.translator.t(MSG_LOAD_ERROR);
                        state.notifier.notify_error(&message, &e);
                    }
                }
                state.publish_current();
            }
            FormMsg::HideLoader { generation } => {
                if generation == state.loader.generation && state.pending.is_none() {
                    state.loader.visible = false;
                    state.loader.hide_task = None;
                    state.publish_current();
                }
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.abort_tasks();
        if let Some(pending) = state.pending.take() {
            tracing::warn!(
                form_id = %state.form_id,
                submission_id = %pending.id,
                "FormActor stopped with a submission in flight"
            );
        }
        tracing::info!(actor_id = %myself.get_id(), form_id = %state.form_id, "FormActor stopped");
        Ok(())
    }
}

impl FormActor {
    fn handle_field_changed(
        &self,
        myself: &ActorRef<FormMsg>,
        state: &mut FormActorState,
        path: FieldPath,
        value: Value,
    ) {
        if let Some(hook) = state.registry.change_hook(&path) {
            if std::panic::catch_unwind(AssertUnwindSafe(|| hook(&path, &value))).is_err() {
                tracing::warn!(form_id = %state.form_id, path = %path, "Change hook panicked");
            }
        }
        state.store.set_value(&path, value, SetValueOptions::dirty());
        state.note_changed_during_submit(&path);
        if state.auto_submit.enable {
            Self::request_submit(myself, state);
        }
        state.publish_current();
    }

    fn handle_set_value(
        &self,
        myself: &ActorRef<FormMsg>,
        state: &mut FormActorState,
        path: FieldPath,
        value: Value,
        options: Option<SetValueOptions>,
    ) {
        let options = options.unwrap_or(SetValueOptions {
            should_dirty: state.auto_submit.enable,
        });
        if options.should_dirty {
            state.note_changed_during_submit(&path);
        }
        let changed = state.store.set_value(&path, value, options);
        if state.auto_submit.enable && options.should_dirty && changed {
            Self::request_submit(myself, state);
        }
        state.publish_current();
    }

    fn handle_submit(
        &self,
        myself: &ActorRef<FormMsg>,
        state: &mut FormActorState,
        reply: RpcReplyPort<SubmitOutcome>,
    ) {
        if state.pending.is_some() {
            tracing::debug!(form_id = %state.form_id, "Submit requested while submitting, deferring");
            state.defer(SubmitTrigger::Manual, Some(reply));
            return;
        }
        state.debounce.cancel();
        Self::start_submission(myself, state, SubmitTrigger::Manual, vec![reply]);
    }

    fn handle_debounce_elapsed(
        &self,
        myself: &ActorRef<FormMsg>,
        state: &mut FormActorState,
        generation: u64,
    ) {
        if generation != state.debounce.generation || !state.debounce.armed {
            tracing::trace!(form_id = %state.form_id, generation, "Ignoring stale debounce");
            return;
        }
        state.debounce.armed = false;
        state.debounce.task = None;

        if state.pending.is_some() {
            tracing::debug!(form_id = %state.form_id, "Submission in flight, deferring auto-submit");
            state.defer(SubmitTrigger::Auto, None);
            state.publish_current();
            return;
        }
        Self::start_submission(myself, state, SubmitTrigger::Auto, Vec::new());
    }

    fn handle_submission_settled(
        &self,
        myself: &ActorRef<FormMsg>,
        state: &mut FormActorState,
        submission_id: String,
        result: Result<(), SubmitError>,
    ) {
        let is_current = matches!(&state.pending, Some(p) if p.id == submission_id);
        if !is_current {
            tracing::warn!(
                form_id = %state.form_id,
                submission_id = %submission_id,
                "Ignoring result of a stale submission"
            );
            return;
        }
        let Some(PendingSubmission {
            id,
            values,
            dirty_values,
            had_dirty_fields,
            superseded,
            trigger,
            started_at,
            token,
            waiters,
        }) = state.pending.take()
        else {
            return;
        };
        let changed = std::mem::take(&mut state.changed_during_submit);
        let elapsed_ms = (Utc::now() - started_at).num_milliseconds();

        let phase = match result {
            Ok(()) => {
                if superseded {
                    tracing::debug!(
                        form_id = %state.form_id,
                        submission_id = %id,
                        "Form reset during submission, keeping the reset baseline"
                    );
                } else if had_dirty_fields {
                    let live = state.store.values();
                    let overrides: Vec<(FieldPath, Value)> = changed
                        .iter()
                        .filter_map(|path| get_path(live, path).map(|v| (path.clone(), v.clone())))
                        .collect();
                    state.store.commit_with_overrides(values, overrides);
                }
                state.is_submit_successful = true;
                tracing::info!(
                    form_id = %state.form_id,
                    submission_id = %id,
                    trigger = ?trigger,
                    elapsed_ms,
                    changed_during_submit = changed.len(),
                    "Submission succeeded"
                );
                for waiter in waiters {
                    let _ = waiter.send(SubmitOutcome::Submitted {
                        submission_id: id.clone(),
                        dirty_values: dirty_values.clone(),
                    });
                }
                FormPhase::SettledOk
            }
            Err(err) => {
                state.is_submit_successful = false;
                tracing::warn!(
                    form_id = %state.form_id,
                    submission_id = %id,
                    trigger = ?trigger,
                    elapsed_ms,
                    error = %err,
                    "Submission failed"
                );
                let message = state.translator.t(MSG_SUBMIT_ERROR);
                state.notifier.notify_error(&message, &err.to_string());
                for waiter in waiters {
                    let _ = waiter.send(SubmitOutcome::Rejected {
                        submission_id: id.clone(),
                        message: err.to_string(),
                    });
                }
                FormPhase::SettledError
            }
        };
        drop(token);

        Self::schedule_loader_hide(myself, state);
        state.publish(phase);

        if let Some(deferred) = state.deferred.take() {
            Self::start_submission(myself, state, deferred.trigger, deferred.waiters);
        } else {
            state.publish_current();
        }
    }

    /// Commit loaded defaults as the baseline. Edits made while loading stay
    /// on top as pending edits, and fields registered before the values
    /// were known are re-checked against them.
    fn apply_loaded_defaults(state: &mut FormActorState, values: Value) {
        let edits: Vec<(FieldPath, Value)> = state
            .store
            .dirty_fields()
            .paths()
            .into_iter()
            .filter_map(|path| state.store.get(&path).cloned().map(|v| (path, v)))
            .collect();
        state.store.commit_with_overrides(values, edits);

        let dropped = state.registry.retain_fitting(state.store.baseline());
        if !dropped.is_empty() {
            let paths: Vec<String> = dropped.iter().map(ToString::to_string).collect();
            tracing::warn!(
                form_id = %state.form_id,
                paths = ?paths,
                "Unregistering fields missing from loaded default values"
            );
        }
    }

    /// (Re)arm the debounce timer. Any earlier timer is cancelled.
    fn request_submit(myself: &ActorRef<FormMsg>, state: &mut FormActorState) {
        if let Some(task) = state.debounce.task.take() {
            task.abort();
        }
        state.debounce.generation += 1;
        state.debounce.armed = true;
        let generation = state.debounce.generation;

        match state.wait {
            None => {
                if let Err(e) = myself.send_message(FormMsg::DebounceElapsed { generation }) {
                    tracing::warn!(form_id = %state.form_id, error = %e, "Failed to schedule auto-submit");
                }
            }
            Some(wait) => {
                let myself_clone = myself.clone();
                state.debounce.task = Some(tokio::spawn(async move {
                    tokio::time::sleep(wait).await;
                    let _ = myself_clone.send_message(FormMsg::DebounceElapsed { generation });
                }));
            }
        }
    }

    fn start_submission(
        myself: &ActorRef<FormMsg>,
        state: &mut FormActorState,
        trigger: SubmitTrigger,
        waiters: Vec<RpcReplyPort<SubmitOutcome>>,
    ) {
        let errors = state.registry.validate(state.store.values());
        if !errors.is_empty() {
            tracing::info!(
                form_id = %state.form_id,
                error_count = errors.len(),
                "Submission stopped by validation"
            );
            state.errors = errors.clone();
            state.is_submit_successful = false;
            if let Some(handler) = &state.on_submit_error {
                handler.on_submit_error(&errors);
            }
            for waiter in waiters {
                let _ = waiter.send(SubmitOutcome::Invalid {
                    errors: errors.clone(),
                });
            }
            state.publish(FormPhase::SettledError);
            state.publish_current();
            return;
        }
        state.errors.clear();

        let submission_id = ulid::Ulid::new().to_string();
        let values = state.store.values().clone();
        let dirty_values = state.store.dirty_values();
        let had_dirty_fields = state.store.is_dirty();

        let mut calls: Vec<SubmitCall> = Vec::new();
        if state.auto_submit.enable {
            let dirty = state.store.dirty_fields();
            for (path, listener) in state.registry.listeners() {
                if !dirty.touches(path) {
                    continue;
                }
                let Some(value) = get_path(&values, path).cloned() else {
                    continue;
                };
                tracing::debug!(form_id = %state.form_id, path = %path, "Dispatching field listener");
                let listener = Arc::clone(listener);
                calls.push(Box::pin(async move { listener.on_auto_submit(value).await }));
            }
        }
        let listener_count = calls.len();
        if let Some(handler) = &state.on_submit {
            let handler = Arc::clone(handler);
            let data = SubmitData {
                submission_id: submission_id.clone(),
                values: values.clone(),
                dirty_values: dirty_values.clone(),
                trigger,
            };
            calls.push(Box::pin(async move { handler.submit(data).await }));
        }

        let token = state.guard.acquire(state.translator.t(MSG_SUBMIT_IN_PROGRESS));
        state.pending = Some(PendingSubmission {
            id: submission_id.clone(),
            values,
            dirty_values,
            had_dirty_fields,
            superseded: false,
            trigger,
            started_at: Utc::now(),
            token,
            waiters,
        });
        state.submit_count += 1;
        state.is_submit_successful = false;
        state.last_submission_id = Some(submission_id.clone());
        state.loader.show();

        tracing::info!(
            form_id = %state.form_id,
            submission_id = %submission_id,
            trigger = ?trigger,
            listener_count,
            "Submission started"
        );
        state.publish(FormPhase::Submitting);

        let myself_clone = myself.clone();
        tokio::spawn(async move {
            let result = run_submission(calls).await;
            if let Err(e) = myself_clone.send_message(FormMsg::SubmissionSettled {
                submission_id,
                result,
            }) {
                tracing::warn!(error = %e, "Form stopped before submission settled");
            }
        });
    }

    fn schedule_loader_hide(myself: &ActorRef<FormMsg>, state: &mut FormActorState) {
        if state.loader_delay.is_zero() {
            state.loader.visible = false;
            return;
        }
        let generation = state.loader.generation;
        let delay = state.loader_delay;
        let myself_clone = myself.clone();
        state.loader.hide_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = myself_clone.send_message(FormMsg::HideLoader { generation });
        }));
    }
}

/// Run listeners and the whole-form handler concurrently, each to
/// completion. Reports the first failure in call order; a panicking handler
/// counts as a failure.
async fn run_submission(calls: Vec<SubmitCall>) -> Result<(), SubmitError> {
    let guarded = calls.into_iter().map(|call| async move {
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(SubmitError::Panicked(panic_message(payload.as_ref()))),
        }
    });
    join_all(guarded).await.into_iter().collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
