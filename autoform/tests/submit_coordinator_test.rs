//! Submission coordinator tests
//!
//! Covers debounce, single-flight submission, edits made while a submission
//! is in flight, rejection handling and the unload guard lifecycle.

mod support;

use autoform::notify::RecordingNotifier;
use autoform::{
    AutoSubmitConfig, Form, FormConfig, FormPhase, RegisterOptions, SetValueOptions, SubmitData,
    SubmitError, SubmitOutcome, SubmitTrigger, UnloadGuard,
};
use serde_json::{json, Value};
use shared_types::MSG_SUBMIT_ERROR;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use support::{settle, wait_for, PhaseLog, RecordingHandler, RecordingListener};

fn base_config() -> FormConfig {
    FormConfig::new().guard(UnloadGuard::new())
}

#[tokio::test]
async fn test_auto_submit_sends_values_and_commits_baseline() {
    let handler = RecordingHandler::new();
    let config = handler.install(
        base_config()
            .default_values(json!({"x": 1, "label": "north"}))
            .auto_submit(true),
    );
    let form = Form::spawn(config).await.unwrap();

    form.set_value("x", json!(5)).await.unwrap();
    let state = settle(&form, 1).await;

    let calls = handler.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].values, json!({"x": 5, "label": "north"}));
    assert_eq!(calls[0].dirty_values, json!({"x": 5}));
    assert_eq!(calls[0].trigger, SubmitTrigger::Auto);
    assert!(!state.is_dirty);
    assert!(state.is_submit_successful);
    assert_eq!(form.get_value("x").await.unwrap(), Some(json!(5)));

    form.stop().await.unwrap();
}

#[tokio::test]
async fn test_field_listener_fires_without_form_handler() {
    let listener = RecordingListener::new();
    let form = Form::spawn(
        base_config()
            .default_values(json!({"color": "#000000", "name": "north"}))
            .auto_submit(true),
    )
    .await
    .unwrap();

    let color = form.register("color", listener.options()).await.unwrap();
    let name = RecordingListener::new();
    form.register("name", name.options()).await.unwrap();

    color.on_change(json!("#FF0000")).unwrap();
    let state = settle(&form, 1).await;

    assert_eq!(listener.values(), vec![json!("#FF0000")]);
    assert!(name.values().is_empty());
    assert!(!state.is_dirty);

    form.stop().await.unwrap();
}

#[tokio::test]
async fn test_debounce_collapses_rapid_edits() {
    let handler = RecordingHandler::new();
    let config = handler.install(
        base_config()
            .default_values(json!({"title": ""}))
            .auto_submit(AutoSubmitConfig::with_wait(750)),
    );
    let form = Form::spawn(config).await.unwrap();
    let title = form.register("title", RegisterOptions::new()).await.unwrap();

    for value in ["d", "dr", "draft"] {
        title.on_change(json!(value)).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
    assert_eq!(handler.count(), 0);
    assert_eq!(form.state().await.unwrap().phase, FormPhase::Scheduled);

    settle(&form, 1).await;
    tokio::time::sleep(Duration::from_millis(900)).await;

    let calls = handler.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].dirty_values, json!({"title": "draft"}));

    form.stop().await.unwrap();
}

#[tokio::test]
async fn test_one_submission_in_flight_and_edit_survives() {
    let handler = RecordingHandler::with_latency(Duration::from_millis(200));
    let config = handler.install(
        base_config()
            .default_values(json!({"a": "first-baseline"}))
            .auto_submit(true),
    );
    let form = Form::spawn(config).await.unwrap();
    let a = form.register("a", RegisterOptions::new()).await.unwrap();

    a.on_change(json!("one")).unwrap();
    wait_for(&form, |s| s.is_submitting).await;

    a.on_change(json!("two")).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let during = form.state().await.unwrap();
    assert!(during.is_submitting);
    assert_eq!(during.submit_count, 1);

    // The second edit runs in its own cycle once the first settles.
    let state = settle(&form, 2).await;
    let calls = handler.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].values["a"], json!("one"));
    assert_eq!(calls[1].values["a"], json!("two"));
    assert_eq!(form.get_value("a").await.unwrap(), Some(json!("two")));
    assert!(!state.is_dirty);

    form.stop().await.unwrap();
}

#[tokio::test]
async fn test_edit_during_manual_submit_stays_dirty() {
    let handler = RecordingHandler::with_latency(Duration::from_millis(200));
    let config = handler.install(base_config().default_values(json!({"a": "", "b": ""})));
    let form = Form::spawn(config).await.unwrap();
    let a = form.register("a", RegisterOptions::new()).await.unwrap();

    a.on_change(json!("one")).unwrap();
    let submitting = {
        let form = form.clone();
        tokio::spawn(async move { form.submit().await })
    };
    wait_for(&form, |s| s.is_submitting).await;
    a.on_change(json!("two")).unwrap();

    let outcome = submitting.await.unwrap().unwrap();
    assert!(outcome.is_submitted());

    let state = settle(&form, 1).await;
    assert_eq!(form.get_value("a").await.unwrap(), Some(json!("two")));
    assert!(state.is_dirty);
    assert_eq!(state.dirty_paths, vec!["a".to_string()]);
    assert_eq!(form.dirty_values().await.unwrap(), json!({"a": "two"}));
    assert_eq!(handler.count(), 1);

    form.stop().await.unwrap();
}

#[tokio::test]
async fn test_empty_dirty_set_skips_listeners_and_keeps_baseline() {
    let handler = RecordingHandler::new();
    let listener = RecordingListener::new();
    let config = handler.install(
        base_config()
            .default_values(json!({"color": "#000000"}))
            .auto_submit(true),
    );
    let form = Form::spawn(config).await.unwrap();
    form.register("color", listener.options()).await.unwrap();

    let outcome = form.submit().await.unwrap();

    assert!(matches!(
        outcome,
        SubmitOutcome::Submitted { ref dirty_values, .. } if *dirty_values == json!({})
    ));
    assert!(listener.values().is_empty());
    assert_eq!(handler.count(), 1);
    assert_eq!(handler.calls()[0].trigger, SubmitTrigger::Manual);
    assert_eq!(form.get_values().await.unwrap(), json!({"color": "#000000"}));
    assert!(!form.state().await.unwrap().is_dirty);

    form.stop().await.unwrap();
}

#[tokio::test]
async fn test_rejection_notifies_once_and_retry_succeeds() {
    let handler = RecordingHandler::new();
    handler.set_failing(true);
    let notifier = RecordingNotifier::new();
    let config = handler.install(
        base_config()
            .default_values(json!({"city": "", "zip": ""}))
            .notifier(notifier.clone()),
    );
    let form = Form::spawn(config).await.unwrap();
    let city = form.register("city", RegisterOptions::new()).await.unwrap();
    let zip = form.register("zip", RegisterOptions::new()).await.unwrap();

    city.on_change(json!("Lyon")).unwrap();
    zip.on_change(json!("69001")).unwrap();
    let outcome = form.submit().await.unwrap();

    assert!(matches!(outcome, SubmitOutcome::Rejected { ref message, .. } if message.contains("NetworkError")));
    let notifications = notifier.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].message, "Failed to save changes");
    assert!(notifications[0].detail.contains("connection reset"));

    let state = form.state().await.unwrap();
    assert!(state.is_dirty);
    assert!(!state.is_submit_successful);
    assert_eq!(form.get_value("city").await.unwrap(), Some(json!("Lyon")));

    handler.set_failing(false);
    let retry = form.submit().await.unwrap();
    assert!(retry.is_submitted());
    let calls = handler.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].dirty_values, calls[1].dirty_values);
    assert!(!form.state().await.unwrap().is_dirty);
    assert_eq!(notifier.len(), 1);

    form.stop().await.unwrap();
}

#[tokio::test]
async fn test_auto_submit_error_leaves_form_dirty() {
    let handler = RecordingHandler::new();
    handler.set_failing(true);
    let notifier = RecordingNotifier::new();
    let phases = PhaseLog::new();
    let config = phases.install(handler.install(
        base_config()
            .default_values(json!({"note": "a"}))
            .auto_submit(true)
            .notifier(notifier.clone()),
    ));
    let form = Form::spawn(config).await.unwrap();

    form.set_value("note", json!("b")).await.unwrap();
    let state = settle(&form, 1).await;

    assert!(state.is_dirty);
    assert_eq!(form.get_value("note").await.unwrap(), Some(json!("b")));
    assert_eq!(notifier.len(), 1);
    assert!(phases.phases().contains(&FormPhase::SettledError));
    assert!(!phases.phases().contains(&FormPhase::SettledOk));

    form.stop().await.unwrap();
}

#[tokio::test]
async fn test_guard_only_blocks_while_submitting() {
    let guard = UnloadGuard::new();
    let seen_blocking = Arc::new(AtomicBool::new(false));
    let seen = seen_blocking.clone();
    let guard_in_handler = guard.clone();
    let config = FormConfig::new()
        .guard(guard.clone())
        .default_values(json!({"x": 0}))
        .auto_submit(AutoSubmitConfig::with_wait(100))
        .on_submit(move |_data: SubmitData| {
            let seen = seen.clone();
            let guard = guard_in_handler.clone();
            async move {
                seen.store(guard.is_blocking(), Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<(), SubmitError>(())
            }
        });
    let form = Form::spawn(config).await.unwrap();

    form.set_value("x", json!(1)).await.unwrap();
    assert_eq!(form.state().await.unwrap().phase, FormPhase::Scheduled);
    assert!(!guard.is_blocking());

    wait_for(&form, |s| s.phase == FormPhase::Submitting).await;
    assert!(guard.is_blocking());
    assert!(guard.before_unload().is_some());

    settle(&form, 1).await;
    assert!(seen_blocking.load(Ordering::SeqCst));
    assert!(!guard.is_blocking());
    assert!(guard.before_unload().is_none());

    form.stop().await.unwrap();
}

async fn exploding_handler(_data: SubmitData) -> Result<(), SubmitError> {
    panic!("handler exploded")
}

#[tokio::test]
async fn test_panicking_handler_releases_guard() {
    let guard = UnloadGuard::new();
    let notifier = RecordingNotifier::new();
    let config = FormConfig::new()
        .guard(guard.clone())
        .notifier(notifier.clone())
        .default_values(json!({"x": 0}))
        .on_submit(exploding_handler);
    let form = Form::spawn(config).await.unwrap();

    form.set_value_with("x", json!(1), SetValueOptions::dirty())
        .await
        .unwrap();
    let outcome = form.submit().await.unwrap();

    assert!(matches!(outcome, SubmitOutcome::Rejected { ref message, .. } if message.contains("handler exploded")));
    assert!(!guard.is_blocking());
    assert_eq!(notifier.len(), 1);
    assert!(form.state().await.unwrap().is_dirty);

    form.stop().await.unwrap();
}

#[tokio::test]
async fn test_forms_debounce_independently() {
    let first_handler = RecordingHandler::new();
    let second_handler = RecordingHandler::new();
    let first = Form::spawn(first_handler.install(
        base_config()
            .default_values(json!({"x": 0}))
            .auto_submit(AutoSubmitConfig::with_wait(50)),
    ))
    .await
    .unwrap();
    let second = Form::spawn(second_handler.install(
        base_config()
            .default_values(json!({"y": 0}))
            .auto_submit(AutoSubmitConfig::with_wait(400)),
    ))
    .await
    .unwrap();

    second.set_value("y", json!(1)).await.unwrap();
    first.set_value("x", json!(1)).await.unwrap();

    settle(&first, 1).await;
    assert_eq!(first_handler.count(), 1);
    assert_eq!(second_handler.count(), 0);
    assert_eq!(second.state().await.unwrap().phase, FormPhase::Scheduled);

    settle(&second, 1).await;
    assert_eq!(second_handler.count(), 1);

    first.stop().await.unwrap();
    second.stop().await.unwrap();
}

#[tokio::test]
async fn test_submit_cancels_pending_debounce() {
    let handler = RecordingHandler::new();
    let config = handler.install(
        base_config()
            .default_values(json!({"x": 0}))
            .auto_submit(AutoSubmitConfig::with_wait(300)),
    );
    let form = Form::spawn(config).await.unwrap();

    form.set_value("x", json!(1)).await.unwrap();
    let outcome = form.submit().await.unwrap();
    assert!(outcome.is_submitted());

    tokio::time::sleep(Duration::from_millis(450)).await;
    assert_eq!(handler.count(), 1);
    assert_eq!(handler.calls()[0].trigger, SubmitTrigger::Manual);

    form.stop().await.unwrap();
}

#[tokio::test]
async fn test_settled_phases_are_published() {
    let handler = RecordingHandler::new();
    let phases = PhaseLog::new();
    let config = phases.install(handler.install(
        base_config()
            .default_values(json!({"x": 0}))
            .auto_submit(true),
    ));
    let form = Form::spawn(config).await.unwrap();

    form.set_value("x", json!(1)).await.unwrap();
    settle(&form, 1).await;

    let phases = phases.phases();
    let scheduled = phases.iter().position(|p| *p == FormPhase::Scheduled).unwrap();
    let submitting = phases.iter().position(|p| *p == FormPhase::Submitting).unwrap();
    let settled = phases.iter().position(|p| *p == FormPhase::SettledOk).unwrap();
    assert!(scheduled < submitting && submitting < settled);
    assert_eq!(phases.last(), Some(&FormPhase::Idle));

    form.stop().await.unwrap();
}

#[tokio::test]
async fn test_error_notification_uses_translator() {
    let handler = RecordingHandler::new();
    handler.set_failing(true);
    let notifier = RecordingNotifier::new();
    let config = handler.install(
        base_config()
            .default_values(json!({"x": 0}))
            .notifier(notifier.clone())
            .translator(autoform::i18n::Catalog::english().with(MSG_SUBMIT_ERROR, "Could not save")),
    );
    let form = Form::spawn(config).await.unwrap();
    form.set_value_with("x", json!(2), SetValueOptions::dirty())
        .await
        .unwrap();

    form.submit().await.unwrap();
    assert_eq!(notifier.notifications()[0].message, "Could not save");

    form.stop().await.unwrap();
}

fn rejecting_listener(reason: &'static str) -> RegisterOptions {
    RegisterOptions::new().on_auto_submit(move |_value: Value| async move {
        Err::<(), SubmitError>(SubmitError::rejected(reason))
    })
}

#[tokio::test]
async fn test_rejecting_listeners_notify_once_and_handler_finishes() {
    let guard = UnloadGuard::new();
    let notifier = RecordingNotifier::new();
    let phases = PhaseLog::new();
    let completed = Arc::new(AtomicBool::new(false));
    let done = completed.clone();
    let config = phases.install(
        FormConfig::new()
            .guard(guard.clone())
            .notifier(notifier.clone())
            .default_values(json!({"color": "#000000", "size": 1}))
            .auto_submit(AutoSubmitConfig::with_wait(50))
            .on_submit(move |_data: SubmitData| {
                let done = done.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    done.store(true, Ordering::SeqCst);
                    Ok::<(), SubmitError>(())
                }
            }),
    );
    let form = Form::spawn(config).await.unwrap();
    form.register("color", rejecting_listener("color rejected"))
        .await
        .unwrap();
    form.register("size", rejecting_listener("size rejected"))
        .await
        .unwrap();

    form.set_value("color", json!("#FF0000")).await.unwrap();
    form.set_value("size", json!(2)).await.unwrap();
    let state = settle(&form, 1).await;

    assert_eq!(state.submit_count, 1);
    assert!(completed.load(Ordering::SeqCst));
    assert_eq!(notifier.len(), 1);
    assert!(notifier.notifications()[0].detail.contains("rejected"));
    assert!(state.is_dirty);
    assert!(!state.is_submit_successful);
    assert!(!guard.is_blocking());
    assert!(phases.phases().contains(&FormPhase::SettledError));
    assert_eq!(form.get_value("color").await.unwrap(), Some(json!("#FF0000")));

    form.stop().await.unwrap();
}

#[tokio::test]
async fn test_reset_during_submission_keeps_reset_values() {
    let handler = RecordingHandler::with_latency(Duration::from_millis(200));
    let config = handler.install(base_config().default_values(json!({"x": 1})));
    let form = Form::spawn(config).await.unwrap();

    form.set_value_with("x", json!(2), SetValueOptions::dirty())
        .await
        .unwrap();
    let submitting = {
        let form = form.clone();
        tokio::spawn(async move { form.submit().await })
    };
    wait_for(&form, |s| s.is_submitting).await;
    form.reset(Some(json!({"x": 9}))).await.unwrap();

    let outcome = submitting.await.unwrap().unwrap();
    assert!(outcome.is_submitted());
    let state = settle(&form, 1).await;

    assert_eq!(handler.calls()[0].values, json!({"x": 2}));
    assert_eq!(form.get_values().await.unwrap(), json!({"x": 9}));
    assert!(!state.is_dirty);

    // The reset values are the baseline, not the submitted ones.
    form.set_value_with("x", json!(3), SetValueOptions::dirty())
        .await
        .unwrap();
    form.reset(None).await.unwrap();
    assert_eq!(form.get_value("x").await.unwrap(), Some(json!(9)));

    form.stop().await.unwrap();
}
