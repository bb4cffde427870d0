//! Shared helpers for form engine integration tests.

#![allow(dead_code)]

use autoform::handler::SubmitData;
use autoform::{FormConfig, FormError, FormHandle, FormPhase, FormStateSnapshot, SubmitError};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Whole-form handler that records every call and can be switched to fail.
#[derive(Clone, Default)]
pub struct RecordingHandler {
    calls: Arc<Mutex<Vec<SubmitData>>>,
    fail: Arc<AtomicBool>,
    latency: Duration,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<SubmitData> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Install this handler as the form's `on_submit`.
    pub fn install(&self, config: FormConfig) -> FormConfig {
        let handler = self.clone();
        config.on_submit(move |data: SubmitData| {
            let handler = handler.clone();
            async move {
                handler.calls.lock().unwrap().push(data);
                if !handler.latency.is_zero() {
                    tokio::time::sleep(handler.latency).await;
                }
                if handler.fail.load(Ordering::SeqCst) {
                    return Err(SubmitError::rejected("NetworkError: connection reset"));
                }
                Ok(())
            }
        })
    }
}

/// Per-field listener that records the values it was called with.
#[derive(Clone, Default)]
pub struct RecordingListener {
    values: Arc<Mutex<Vec<Value>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> Vec<Value> {
        self.values.lock().unwrap().clone()
    }

    pub fn options(&self) -> autoform::RegisterOptions {
        let values = self.values.clone();
        autoform::RegisterOptions::new().on_auto_submit(move |value: Value| {
            let values = values.clone();
            async move {
                values.lock().unwrap().push(value);
                Ok::<(), SubmitError>(())
            }
        })
    }
}

/// Collects every phase published through `on_state_change`.
#[derive(Clone, Default)]
pub struct PhaseLog {
    phases: Arc<Mutex<Vec<FormPhase>>>,
}

impl PhaseLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, config: FormConfig) -> FormConfig {
        let phases = self.phases.clone();
        config.on_state_change(move |snapshot: &FormStateSnapshot| {
            phases.lock().unwrap().push(snapshot.phase);
        })
    }

    pub fn phases(&self) -> Vec<FormPhase> {
        self.phases.lock().unwrap().clone()
    }
}

/// Wait until `count` submissions have started and the form is idle again.
pub async fn settle(form: &FormHandle, count: u32) -> FormStateSnapshot {
    wait_for(form, |s| s.submit_count >= count && s.phase == FormPhase::Idle).await
}

pub async fn wait_for<F>(form: &FormHandle, predicate: F) -> FormStateSnapshot
where
    F: FnMut(&FormStateSnapshot) -> bool,
{
    let result: Result<FormStateSnapshot, FormError> =
        tokio::time::timeout(SETTLE_TIMEOUT, form.wait_for(predicate))
            .await
            .expect("timed out waiting for form state");
    result.expect("form state channel closed")
}
