//! Edit-script replay used by the `autoform` binary.
//!
//! A script seeds a form with default values, applies a sequence of edits,
//! sleeps and explicit submits, then waits for the form to go idle.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{AutoSubmit, FormPhase, FormStateSnapshot};
use std::path::Path;
use std::time::Duration;

use crate::config::{EngineSettings, FormConfig};
use crate::error::SubmitError;
use crate::form::Form;
use crate::handler::SubmitData;
use crate::store::SetValueOptions;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    #[serde(default = "empty_object")]
    pub defaults: Value,
    #[serde(default)]
    pub auto_submit: AutoSubmit,
    /// Make the echo handler reject every submission.
    #[serde(default)]
    pub fail_submit: bool,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Set { path: String, value: Value },
    SleepMs(u64),
    Submit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptReport {
    pub state: FormStateSnapshot,
    pub values: Value,
    pub submissions: Vec<Value>,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl Script {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse script {}", path.display()))
    }

    pub async fn run(self, settings: &EngineSettings) -> anyhow::Result<ScriptReport> {
        let submissions = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorded = submissions.clone();
        let fail = self.fail_submit;
        let latency = Duration::from_millis(self.latency_ms);

        let config = FormConfig::from_settings(settings)
            .default_values(self.defaults)
            .auto_submit(self.auto_submit)
            .on_submit(move |data: SubmitData| {
                let recorded = recorded.clone();
                async move {
                    tokio::time::sleep(latency).await;
                    tracing::info!(
                        submission_id = %data.submission_id,
                        trigger = ?data.trigger,
                        dirty = %data.dirty_values,
                        "Echo handler received submission"
                    );
                    if fail {
                        return Err(SubmitError::rejected("echo handler configured to fail"));
                    }
                    if let Ok(mut recorded) = recorded.lock() {
                        recorded.push(data.dirty_values);
                    }
                    Ok(())
                }
            });

        let form = Form::spawn(config).await?;
        for step in self.steps {
            match step {
                Step::Set { path, value } => {
                    form.set_value_with(path.as_str(), value, SetValueOptions::dirty())
                        .await?;
                }
                Step::SleepMs(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
                Step::Submit => {
                    let outcome = form.submit().await?;
                    tracing::info!(outcome = ?outcome, "Manual submit finished");
                }
            }
        }

        tokio::time::timeout(SETTLE_TIMEOUT, form.wait_for(|s| s.phase == FormPhase::Idle))
            .await
            .context("Form did not settle")??;

        let report = ScriptReport {
            state: form.state().await?,
            values: form.get_values().await?,
            submissions: submissions
                .lock()
                .map(|s| s.clone())
                .unwrap_or_default(),
        };
        form.stop().await?;
        Ok(report)
    }
}
