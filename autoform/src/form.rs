//! Form - composition root and caller-facing handle.
//!
//! `Form::spawn` starts one `FormActor` per form instance; `FormHandle` wraps
//! its mailbox with typed async calls and a watch channel of state snapshots.

use ractor::{Actor, ActorRef};
use serde_json::Value;
use shared_types::{FormStateSnapshot, SubmitButtonState, SubmitOutcome};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::actors::form::{FormActor, FormArguments, FormMsg};
use crate::config::FormConfig;
use crate::error::FormError;
use crate::path::{FieldPath, IntoFieldPath};
use crate::registry::RegisterOptions;
use crate::store::SetValueOptions;

pub struct Form;

impl Form {
    pub async fn spawn(config: FormConfig) -> Result<FormHandle, FormError> {
        let form_id = ulid::Ulid::new().to_string();
        let (state_tx, state_rx) = watch::channel(FormStateSnapshot::default());
        let (actor, handle) = Actor::spawn(
            Some(format!("form:{form_id}")),
            FormActor,
            FormArguments {
                form_id: form_id.clone(),
                config,
                state_tx,
            },
        )
        .await
        .map_err(|e| FormError::Spawn(e.to_string()))?;

        Ok(FormHandle {
            form_id,
            actor,
            state_rx,
            join: Arc::new(Mutex::new(Some(handle))),
        })
    }
}

#[derive(Clone)]
pub struct FormHandle {
    form_id: String,
    actor: ActorRef<FormMsg>,
    state_rx: watch::Receiver<FormStateSnapshot>,
    join: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl std::fmt::Debug for FormHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormHandle")
            .field("form_id", &self.form_id)
            .finish_non_exhaustive()
    }
}

impl FormHandle {
    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    /// Register a field and get the binding its change events go through.
    pub async fn register(
        &self,
        path: impl IntoFieldPath,
        options: RegisterOptions,
    ) -> Result<FieldBinding, FormError> {
        let path = path.into_field_path()?;
        let field_path = path.clone();
        ractor::call!(self.actor, |reply| FormMsg::Register {
            path: field_path,
            options,
            reply,
        })
        .map_err(rpc_error)??;

        Ok(FieldBinding {
            path,
            actor: self.actor.clone(),
        })
    }

    /// Drop listeners and rules of the given fields. Values stay.
    pub async fn unregister<I, P>(&self, paths: I) -> Result<(), FormError>
    where
        I: IntoIterator<Item = P>,
        P: IntoFieldPath,
    {
        let paths = paths
            .into_iter()
            .map(IntoFieldPath::into_field_path)
            .collect::<Result<Vec<_>, _>>()?;
        ractor::call!(self.actor, |reply| FormMsg::Unregister {
            paths: Some(paths),
            reply,
        })
        .map_err(rpc_error)
    }

    pub async fn unregister_all(&self) -> Result<(), FormError> {
        ractor::call!(self.actor, |reply| FormMsg::Unregister { paths: None, reply })
            .map_err(rpc_error)
    }

    /// Programmatic write. Dirties the field (and schedules an auto-submit)
    /// only when auto-submit is enabled.
    pub async fn set_value(&self, path: impl IntoFieldPath, value: Value) -> Result<(), FormError> {
        self.write(path.into_field_path()?, value, None).await
    }

    pub async fn set_value_with(
        &self,
        path: impl IntoFieldPath,
        value: Value,
        options: SetValueOptions,
    ) -> Result<(), FormError> {
        self.write(path.into_field_path()?, value, Some(options)).await
    }

    async fn write(
        &self,
        path: FieldPath,
        value: Value,
        options: Option<SetValueOptions>,
    ) -> Result<(), FormError> {
        ractor::call!(self.actor, |reply| FormMsg::SetValue {
            path,
            value,
            options,
            reply,
        })
        .map_err(rpc_error)
    }

    pub async fn get_value(&self, path: impl IntoFieldPath) -> Result<Option<Value>, FormError> {
        let path = path.into_field_path()?;
        ractor::call!(self.actor, |reply| FormMsg::GetValue { path, reply }).map_err(rpc_error)
    }

    pub async fn get_values(&self) -> Result<Value, FormError> {
        ractor::call!(self.actor, |reply| FormMsg::GetValues { reply }).map_err(rpc_error)
    }

    pub async fn dirty_values(&self) -> Result<Value, FormError> {
        ractor::call!(self.actor, |reply| FormMsg::GetDirtyValues { reply }).map_err(rpc_error)
    }

    pub async fn state(&self) -> Result<FormStateSnapshot, FormError> {
        ractor::call!(self.actor, |reply| FormMsg::GetState { reply }).map_err(rpc_error)
    }

    /// Latest published snapshot, without a round trip to the actor.
    pub fn current_state(&self) -> FormStateSnapshot {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FormStateSnapshot> {
        self.state_rx.clone()
    }

    /// Wait until a published snapshot satisfies `predicate`.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<FormStateSnapshot, FormError>
    where
        F: FnMut(&FormStateSnapshot) -> bool,
    {
        let mut rx = self.state_rx.clone();
        let snapshot = rx
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .map_err(|e| FormError::Rpc(e.to_string()))?;
        Ok(snapshot.clone())
    }

    /// Submit now. Resolves once the serving submission cycle settles; while
    /// a submission is in flight the request joins the next cycle.
    pub async fn submit(&self) -> Result<SubmitOutcome, FormError> {
        ractor::call!(self.actor, |reply| FormMsg::Submit { reply }).map_err(rpc_error)
    }

    /// Commit `values` as the new baseline, or discard edits with `None`.
    pub async fn reset(&self, values: Option<Value>) -> Result<(), FormError> {
        ractor::call!(self.actor, |reply| FormMsg::Reset { values, reply }).map_err(rpc_error)
    }

    pub async fn submit_button(&self) -> Result<SubmitButtonState, FormError> {
        ractor::call!(self.actor, |reply| FormMsg::GetSubmitButton { reply }).map_err(rpc_error)
    }

    /// Stop the actor and wait for it to exit. An in-flight submission is
    /// abandoned and its guard released.
    pub async fn stop(&self) -> Result<(), FormError> {
        self.actor.stop(Some("form closed".to_string()));
        if let Some(handle) = self.join.lock().await.take() {
            handle.await.map_err(rpc_error)?;
        }
        Ok(())
    }
}

/// Change-event entry point of one registered field.
#[derive(Clone)]
pub struct FieldBinding {
    path: FieldPath,
    actor: ActorRef<FormMsg>,
}

impl std::fmt::Debug for FieldBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBinding").field("path", &self.path).finish()
    }
}

impl FieldBinding {
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Deliver a native change event. Always dirties the field.
    pub fn on_change(&self, value: Value) -> Result<(), FormError> {
        self.actor
            .cast(FormMsg::FieldChanged {
                path: self.path.clone(),
                value,
            })
            .map_err(rpc_error)
    }
}

fn rpc_error(e: impl std::fmt::Display) -> FormError {
    FormError::Rpc(e.to_string())
}
