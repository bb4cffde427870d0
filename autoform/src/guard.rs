//! UnloadGuard - blocks tab close and in-app navigation while a submission
//! is in flight.
//!
//! The guard is shared state behind a cloneable handle. Forms use the
//! process-wide instance from [`UnloadGuard::global`] unless given another
//! one. Each in-flight submission holds a [`GuardToken`]; the guard blocks
//! while at least one token is alive, and dropping the token is the only
//! way to release it, so every settle path (including unwinding) clears it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

static GLOBAL_GUARD: OnceLock<UnloadGuard> = OnceLock::new();

#[derive(Debug, Default)]
struct GuardInner {
    next_id: AtomicU64,
    /// Active tokens and the message each one asks to show.
    active: Mutex<BTreeMap<u64, String>>,
}

#[derive(Debug, Clone, Default)]
pub struct UnloadGuard {
    inner: Arc<GuardInner>,
}

/// Outcome of asking whether in-app navigation may proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    Proceed,
    /// Ask the user to confirm, showing this message.
    Confirm(String),
}

impl UnloadGuard {
    /// A guard isolated from every other guard.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> UnloadGuard {
        GLOBAL_GUARD.get_or_init(UnloadGuard::new).clone()
    }

    pub fn acquire(&self, message: impl Into<String>) -> GuardToken {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, message.into());
        tracing::debug!(token = id, "Unload guard engaged");
        GuardToken {
            id,
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn is_blocking(&self) -> bool {
        !self.lock().is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    /// Message to return from a `beforeunload` handler, if closing must be
    /// confirmed.
    pub fn before_unload(&self) -> Option<String> {
        self.lock().values().next().cloned()
    }

    pub fn confirm_navigation(&self) -> NavigationDecision {
        match self.before_unload() {
            Some(message) => NavigationDecision::Confirm(message),
            None => NavigationDecision::Proceed,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<u64, String>> {
        self.inner
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Keeps the guard engaged until dropped.
#[derive(Debug)]
pub struct GuardToken {
    id: u64,
    inner: Arc<GuardInner>,
}

impl GuardToken {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for GuardToken {
    fn drop(&mut self) {
        self.inner
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.id);
        tracing::debug!(token = self.id, "Unload guard released");
    }
}
