mod common;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use common::{humanizer, sample_chat, CountingChat, RecordingObserver, Reply, ScriptedProvider};
use humanize::config::{MemorySettings, Settings};
use humanize::errors::{HumanizeError, StepError};
use humanize::events::{event_bus, HumanizeEvent, Observer};
use humanize::executor::Humanizer;
use humanize::orchestrator::{RunAllCoordinator, RunOutcome};
use humanize::provider::Provider;

const ORDER: [&str; 4] = ["humanize", "show_dont_tell", "repetition", "pacing"];

#[tokio::test]
async fn runs_every_step_in_order() {
    let chat = CountingChat::new(sample_chat());
    let provider = ScriptedProvider::texts(&["one", "two", "three", "four"]);
    let mut settings = Settings::default();
    for key in ORDER {
        settings.set_prompt_override(key, format!("{key}: {{{{message}}}}"));
    }
    let h = humanizer(chat.clone(), provider.clone(), settings);

    let report = h.run_all(4).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.completed, 4);
    assert_eq!(report.total, 4);
    assert!(report.errors.is_empty());
    assert_eq!(chat.text(4), "four");

    // Each step sees the previous step's output.
    let prompts = provider.prompts.lock().clone();
    assert_eq!(
        prompts,
        vec![
            "humanize: It is cold. Temperature will be low. You should prepare accordingly.",
            "show_dont_tell: one",
            "repetition: two",
            "pacing: three",
        ]
    );
    assert_eq!((chat.replaced(), chat.saved()), (4, 4));
}

#[tokio::test]
async fn failed_step_does_not_stop_the_run() {
    let chat = CountingChat::new(sample_chat());
    let provider = ScriptedProvider::new(vec![
        Reply::Text("one".into()),
        Reply::Text("  ".into()),
        Reply::Text("three".into()),
        Reply::Text("four".into()),
    ]);
    let h = humanizer(chat.clone(), provider.clone(), Settings::default());

    let report = h.run_all(2).await.unwrap();

    assert_eq!(provider.calls(), 4);
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.completed, 3);
    assert_eq!(report.error_codes(), vec![("show_dont_tell".to_string(), "EmptyResponse")]);
    assert_eq!(chat.text(2), "four");
}

#[tokio::test]
async fn generator_errors_are_collected() {
    let chat = CountingChat::new(sample_chat());
    let provider = ScriptedProvider::new(vec![
        Reply::Fail("timeout".into()),
        Reply::Text("two".into()),
        Reply::Fail("overloaded".into()),
        Reply::Text("four".into()),
    ]);
    let h = humanizer(chat, provider, Settings::default());

    let report = h.run_all(0).await.unwrap();

    assert_eq!(report.completed, 2);
    assert_eq!(report.errors.len(), 2);
    assert_eq!(report.errors[0].step_key, "humanize");
    assert_eq!(report.errors[0].error, StepError::Generation("timeout".into()));
    assert_eq!(report.errors[1].step_key, "repetition");
}

#[tokio::test]
async fn ineligible_message_fails_every_step_without_calls() {
    let chat = CountingChat::new(sample_chat());
    let provider = ScriptedProvider::texts(&[]);
    let h = humanizer(chat.clone(), provider.clone(), Settings::default());

    let report = h.run_all(1).await.unwrap();

    assert_eq!(report.completed, 0);
    assert_eq!(report.errors.len(), 4);
    assert!(report.errors.iter().all(|f| f.error == StepError::NotEligible));
    assert_eq!(provider.calls(), 0);
    assert_eq!(chat.replaced(), 0);
}

/// Cancels the run as soon as the first step reports back.
struct CancelAfterFirst {
    coordinator: Arc<RunAllCoordinator>,
}

impl Observer for CancelAfterFirst {
    fn notify(&self, event: &HumanizeEvent) {
        if let HumanizeEvent::RunAllStepFinished { position: 0, .. } = event {
            assert!(self.coordinator.request_cancel());
        }
    }
}

#[tokio::test]
async fn cancel_between_steps_skips_the_rest() {
    let chat = CountingChat::new(sample_chat());
    let provider = ScriptedProvider::texts(&["one", "two", "three", "four"]);
    let coordinator = Arc::new(RunAllCoordinator::default());
    let h = humanizer(chat.clone(), provider.clone(), Settings::default())
        .with_coordinator(coordinator.clone())
        .with_observer(Arc::new(CancelAfterFirst { coordinator: coordinator.clone() }));

    let report = h.run_all(4).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Cancelled);
    assert_eq!(report.completed, 1);
    assert!(report.errors.is_empty());
    assert_eq!(report.skipped(), 3);
    assert_eq!(provider.calls(), 1);
    assert_eq!(chat.text(4), "one");
    assert!(!coordinator.is_running());
}

/// Provider that parks each call until the test releases it.
struct GatedProvider {
    entered: Notify,
    release: Notify,
    calls: AtomicUsize,
}

impl GatedProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self { entered: Notify::new(), release: Notify::new(), calls: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl Provider for GatedProvider {
    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.entered.notify_one();
        self.release.notified().await;
        Ok(format!("pass {n}"))
    }
}

fn gated_humanizer(chat: Arc<CountingChat>, provider: Arc<GatedProvider>) -> Arc<Humanizer> {
    Arc::new(
        Humanizer::new(chat, provider, Arc::new(MemorySettings::new(Settings::default())))
            .with_step_delay(Duration::from_millis(5)),
    )
}

#[tokio::test]
async fn second_run_is_rejected_while_first_is_running() {
    let chat = CountingChat::new(sample_chat());
    let provider = GatedProvider::new();
    let h = gated_humanizer(chat.clone(), provider.clone());

    let first = tokio::spawn({
        let h = h.clone();
        async move { h.run_all(4).await }
    });
    provider.entered.notified().await;

    let second = h.run_all(2).await;
    assert!(matches!(second, Err(HumanizeError::AlreadyRunning)));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    for _ in 0..3 {
        provider.release.notify_one();
        provider.entered.notified().await;
    }
    provider.release.notify_one();

    let report = first.await.unwrap().unwrap();
    assert_eq!(report.completed, 4);
    assert!(report.errors.is_empty());
    assert_eq!(chat.text(4), "pass 4");
    assert_eq!(chat.text(2), sample_chat()[2].text);
    assert!(!h.coordinator().is_running());
}

#[tokio::test]
async fn in_flight_step_finishes_before_cancel_applies() {
    let chat = CountingChat::new(sample_chat());
    let provider = GatedProvider::new();
    let h = gated_humanizer(chat.clone(), provider.clone());

    let run = tokio::spawn({
        let h = h.clone();
        async move { h.run_all(4).await }
    });
    provider.entered.notified().await;
    assert!(h.request_cancel_run_all());
    provider.release.notify_one();

    let report = run.await.unwrap().unwrap();
    assert_eq!(report.outcome, RunOutcome::Cancelled);
    assert_eq!(report.completed, 1);
    assert_eq!(chat.text(4), "pass 1");
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert!(!h.request_cancel_run_all());
}

#[tokio::test]
async fn cancel_during_delay_stops_immediately() {
    let chat = CountingChat::new(sample_chat());
    let provider = ScriptedProvider::texts(&["one", "two"]);
    let (tx, mut rx) = event_bus();
    let h = Arc::new(
        humanizer(chat, provider.clone(), Settings::default())
            .with_step_delay(Duration::from_secs(30))
            .with_observer(Arc::new(tx)),
    );

    let run = tokio::spawn({
        let h = h.clone();
        async move { h.run_all(4).await }
    });
    loop {
        if let HumanizeEvent::RunAllStepFinished { position: 0, .. } = rx.recv().await.unwrap() {
            break;
        }
    }
    assert!(h.request_cancel_run_all());

    let report = tokio::time::timeout(Duration::from_secs(5), run).await.unwrap().unwrap().unwrap();
    assert_eq!(report.outcome, RunOutcome::Cancelled);
    assert_eq!(report.completed, 1);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn progress_and_final_report_are_published() {
    let chat = CountingChat::new(sample_chat());
    let observer = Arc::new(RecordingObserver::default());
    let h = humanizer(chat, ScriptedProvider::texts(&["a", "", "c", "d"]), Settings::default())
        .with_observer(observer.clone());

    let report = h.run_all(4).await.unwrap();
    let events = observer.events();

    let progress: Vec<(usize, String)> = events
        .iter()
        .filter_map(|e| match e {
            HumanizeEvent::RunAllProgress { position, step_key, .. } => Some((*position, step_key.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        progress,
        ORDER.iter().enumerate().map(|(i, k)| (i, k.to_string())).collect::<Vec<_>>()
    );

    // Silent steps publish no per-step toasts.
    assert!(!events.iter().any(|e| matches!(
        e,
        HumanizeEvent::StepStarted { .. } | HumanizeEvent::StepSucceeded { .. } | HumanizeEvent::StepFailed { .. }
    )));
    assert_eq!(
        events.iter().filter(|e| matches!(e, HumanizeEvent::MessageUpdated { .. })).count(),
        3
    );
    assert_eq!(
        events.last(),
        Some(&HumanizeEvent::RunAllFinished { message_index: 4, report: report.clone() })
    );
    assert_eq!(report.summary(), "Completed 3/4 steps (1 failed)");
}
