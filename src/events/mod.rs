//! Notifications emitted by the core. Hosts subscribe with an [`Observer`]
//! and decide how to present them.

use tokio::sync::broadcast;

use crate::errors::StepError;
use crate::orchestrator::{RunAllReport, RunOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HumanizeEvent {
    StepStarted { message_index: usize, step_key: String, step_name: String },
    StepSucceeded { message_index: usize, step_key: String },
    StepFailed { message_index: usize, step_key: String, error: StepError },
    ContextTrimmed { message_index: usize, step_key: String, dropped: usize },
    /// The stored text changed; displays showing this message should refresh.
    MessageUpdated { message_index: usize },
    RunAllProgress { message_index: usize, position: usize, total: usize, step_key: String, step_name: String },
    RunAllStepFinished { message_index: usize, position: usize, total: usize, step_key: String, error: Option<StepError> },
    RunAllCancelRequested,
    RunAllFinished { message_index: usize, report: RunAllReport },
}

impl HumanizeEvent {
    pub fn level(&self) -> Level {
        match self {
            HumanizeEvent::StepStarted { .. }
            | HumanizeEvent::MessageUpdated { .. }
            | HumanizeEvent::RunAllProgress { .. }
            | HumanizeEvent::RunAllCancelRequested => Level::Info,
            HumanizeEvent::StepSucceeded { .. } => Level::Success,
            HumanizeEvent::StepFailed { error, .. } => match error {
                StepError::NotEligible | StepError::EmptyMessage => Level::Warning,
                _ => Level::Error,
            },
            HumanizeEvent::ContextTrimmed { .. } => Level::Warning,
            HumanizeEvent::RunAllStepFinished { error, .. } => {
                if error.is_some() { Level::Warning } else { Level::Info }
            }
            HumanizeEvent::RunAllFinished { report, .. } => match report.outcome {
                RunOutcome::Cancelled => Level::Warning,
                RunOutcome::Completed if report.errors.is_empty() => Level::Success,
                RunOutcome::Completed => Level::Warning,
            },
        }
    }

    /// Human-readable status line.
    pub fn status(&self) -> String {
        match self {
            HumanizeEvent::StepStarted { step_name, .. } => format!("{step_name}: rewriting message..."),
            HumanizeEvent::StepSucceeded { .. } => "Message humanized!".to_string(),
            HumanizeEvent::StepFailed { step_key, .. } => format!("Step '{step_key}' failed"),
            HumanizeEvent::ContextTrimmed { dropped, .. } => {
                format!("Context trimmed to fit the prompt budget ({dropped} older turn(s) left out)")
            }
            HumanizeEvent::MessageUpdated { message_index } => format!("Message {message_index} updated"),
            HumanizeEvent::RunAllProgress { position, total, step_name, .. } => {
                format!("Step {}/{}: {}", position + 1, total, step_name)
            }
            HumanizeEvent::RunAllStepFinished { position, total, step_key, error, .. } => match error {
                None => format!("Step {}/{} ({}) done", position + 1, total, step_key),
                Some(_) => format!("Step {}/{} ({}) failed, continuing", position + 1, total, step_key),
            },
            HumanizeEvent::RunAllCancelRequested => "Cancelling after the current step...".to_string(),
            HumanizeEvent::RunAllFinished { report, .. } => report.summary(),
        }
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            HumanizeEvent::StepFailed { error, .. } => Some(error.to_string()),
            HumanizeEvent::RunAllStepFinished { error: Some(e), .. } => Some(e.to_string()),
            HumanizeEvent::RunAllFinished { report, .. } if !report.errors.is_empty() => Some(
                report
                    .errors
                    .iter()
                    .map(|f| format!("{}: {}", f.step_key, f.error))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            _ => None,
        }
    }
}

pub trait Observer: Send + Sync {
    fn notify(&self, event: &HumanizeEvent);
}

pub type EventTx = broadcast::Sender<HumanizeEvent>;
pub type EventRx = broadcast::Receiver<HumanizeEvent>;

const CAPACITY: usize = 64;

pub fn event_bus() -> (EventTx, EventRx) {
    broadcast::channel(CAPACITY)
}

impl Observer for EventTx {
    fn notify(&self, event: &HumanizeEvent) {
        // No receivers is fine; nobody is listening.
        let _ = self.send(event.clone());
    }
}
