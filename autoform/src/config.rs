//! Form configuration and engine-wide settings.

use futures::future::BoxFuture;
use serde_json::{Map, Value};
use shared_types::{AutoSubmitConfig, FormStateSnapshot};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::guard::UnloadGuard;
use crate::handler::{SubmitErrorHandler, SubmitHandler};
use crate::i18n::{Catalog, Translator};
use crate::notify::{Notifier, TracingNotifier};

pub const DEFAULT_LOADER_DELAY_MS: u64 = 750;

/// Engine defaults read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Debounce applied when auto-submit is enabled without an explicit wait.
    pub default_wait_ms: Option<u64>,
    /// How long the loader stays visible after a submission settles.
    pub loader_delay_ms: u64,
    pub locale: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_wait_ms: None,
            loader_delay_ms: DEFAULT_LOADER_DELAY_MS,
            locale: "en".to_string(),
        }
    }
}

impl EngineSettings {
    /// Read `AUTOFORM_DEFAULT_WAIT_MS`, `AUTOFORM_LOADER_DELAY_MS` and
    /// `AUTOFORM_LOCALE`. Unset or unparseable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_wait_ms: env_u64("AUTOFORM_DEFAULT_WAIT_MS").or(defaults.default_wait_ms),
            loader_delay_ms: env_u64("AUTOFORM_LOADER_DELAY_MS").unwrap_or(defaults.loader_delay_ms),
            locale: std::env::var("AUTOFORM_LOCALE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.locale),
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key = key, value = %raw, error = %e, "Ignoring invalid setting");
            None
        }
    }
}

pub type DefaultValuesLoader =
    Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<Value>> + Send>;

pub enum DefaultValues {
    Static(Value),
    /// Fetched once when the form starts.
    Async(DefaultValuesLoader),
}

impl Default for DefaultValues {
    fn default() -> Self {
        DefaultValues::Static(Value::Object(Map::new()))
    }
}

impl fmt::Debug for DefaultValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValues::Static(v) => f.debug_tuple("Static").field(v).finish(),
            DefaultValues::Async(_) => f.write_str("Async(..)"),
        }
    }
}

pub type StateChangeCallback = Arc<dyn Fn(&FormStateSnapshot) + Send + Sync>;

pub struct FormConfig {
    pub default_values: DefaultValues,
    pub auto_submit: AutoSubmitConfig,
    pub on_submit: Option<Arc<dyn SubmitHandler>>,
    pub on_submit_error: Option<Arc<dyn SubmitErrorHandler>>,
    pub on_state_change: Option<StateChangeCallback>,
    pub hide_submit_button: bool,
    pub submit_button_text: Option<String>,
    pub disable_loader: bool,
    pub loader_delay: Duration,
    pub default_wait: Option<Duration>,
    pub notifier: Arc<dyn Notifier>,
    pub translator: Arc<dyn Translator>,
    pub guard: UnloadGuard,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self::from_settings(&EngineSettings::default())
    }
}

impl fmt::Debug for FormConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormConfig")
            .field("default_values", &self.default_values)
            .field("auto_submit", &self.auto_submit)
            .field("on_submit", &self.on_submit.is_some())
            .field("hide_submit_button", &self.hide_submit_button)
            .field("disable_loader", &self.disable_loader)
            .field("loader_delay", &self.loader_delay)
            .finish_non_exhaustive()
    }
}

impl FormConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            default_values: DefaultValues::default(),
            auto_submit: AutoSubmitConfig::disabled(),
            on_submit: None,
            on_submit_error: None,
            on_state_change: None,
            hide_submit_button: false,
            submit_button_text: None,
            disable_loader: false,
            loader_delay: Duration::from_millis(settings.loader_delay_ms),
            default_wait: settings.default_wait_ms.map(Duration::from_millis),
            notifier: Arc::new(TracingNotifier),
            translator: Arc::new(Catalog::for_locale(&settings.locale)),
            guard: UnloadGuard::global(),
        }
    }

    pub fn default_values(mut self, values: Value) -> Self {
        self.default_values = DefaultValues::Static(values);
        self
    }

    pub fn async_default_values<F, Fut>(mut self, loader: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.default_values = DefaultValues::Async(Box::new(move || Box::pin(loader())));
        self
    }

    /// Accepts `bool`, `AutoSubmit` or `AutoSubmitConfig`.
    pub fn auto_submit(mut self, auto_submit: impl Into<AutoSubmitConfig>) -> Self {
        self.auto_submit = auto_submit.into();
        self
    }

    pub fn on_submit<H>(mut self, handler: H) -> Self
    where
        H: SubmitHandler + 'static,
    {
        self.on_submit = Some(Arc::new(handler));
        self
    }

    pub fn on_submit_error<H>(mut self, handler: H) -> Self
    where
        H: SubmitErrorHandler + 'static,
    {
        self.on_submit_error = Some(Arc::new(handler));
        self
    }

    pub fn on_state_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FormStateSnapshot) + Send + Sync + 'static,
    {
        self.on_state_change = Some(Arc::new(callback));
        self
    }

    pub fn hide_submit_button(mut self, hide: bool) -> Self {
        self.hide_submit_button = hide;
        self
    }

    pub fn submit_button_text(mut self, text: impl Into<String>) -> Self {
        self.submit_button_text = Some(text.into());
        self
    }

    pub fn disable_loader(mut self, disable: bool) -> Self {
        self.disable_loader = disable;
        self
    }

    pub fn loader_delay(mut self, delay: Duration) -> Self {
        self.loader_delay = delay;
        self
    }

    pub fn notifier<N>(mut self, notifier: N) -> Self
    where
        N: Notifier + 'static,
    {
        self.notifier = Arc::new(notifier);
        self
    }

    pub fn translator<T>(mut self, translator: T) -> Self
    where
        T: Translator + 'static,
    {
        self.translator = Arc::new(translator);
        self
    }

    pub fn guard(mut self, guard: UnloadGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Debounce window actually used for auto-submit, `None` for immediate.
    pub fn effective_wait(&self) -> Option<Duration> {
        self.auto_submit
            .wait
            .map(Duration::from_millis)
            .or(self.default_wait)
            .filter(|wait| !wait.is_zero())
    }
}
