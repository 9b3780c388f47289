use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{HumanizeError, Result, StepError};
use crate::events::HumanizeEvent;
use crate::executor::Humanizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub step_key: String,
    pub error: StepError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunAllReport {
    pub outcome: RunOutcome,
    pub completed: usize,
    pub total: usize,
    pub errors: Vec<StepFailure>,
}

impl RunAllReport {
    /// Steps never attempted because the run was cancelled.
    pub fn skipped(&self) -> usize {
        self.total - self.completed - self.errors.len()
    }

    pub fn error_codes(&self) -> Vec<(String, &'static str)> {
        self.errors.iter().map(|f| (f.step_key.clone(), f.error.code())).collect()
    }

    pub fn summary(&self) -> String {
        match self.outcome {
            RunOutcome::Cancelled => format!("Cancelled after {}/{} steps", self.completed, self.total),
            RunOutcome::Completed if self.errors.is_empty() => {
                format!("All {} steps completed!", self.total)
            }
            RunOutcome::Completed => format!(
                "Completed {}/{} steps ({} failed)",
                self.completed,
                self.total,
                self.errors.len()
            ),
        }
    }
}

/// Mutable state of one run-all invocation.
#[derive(Debug)]
pub struct RunAllSession {
    pub steps: Vec<String>,
    pub current_index: usize,
    pub cancelled: bool,
    pub completed_count: usize,
    pub errors: Vec<StepFailure>,
}

impl RunAllSession {
    pub fn new(steps: Vec<String>) -> Self {
        Self { steps, current_index: 0, cancelled: false, completed_count: 0, errors: Vec::new() }
    }

    fn record(&mut self, step_key: String, error: Option<StepError>) {
        match error {
            Some(error) => self.errors.push(StepFailure { step_key, error }),
            None => self.completed_count += 1,
        }
        self.current_index += 1;
    }

    fn is_exhausted(&self) -> bool {
        self.current_index >= self.steps.len()
    }

    pub fn into_report(self) -> RunAllReport {
        RunAllReport {
            outcome: if self.cancelled { RunOutcome::Cancelled } else { RunOutcome::Completed },
            completed: self.completed_count,
            total: self.steps.len(),
            errors: self.errors,
        }
    }
}

struct ActiveRun {
    id: Uuid,
    message_index: usize,
    cancel: CancellationToken,
}

/// Process-wide slot for the single run-all session allowed at a time.
#[derive(Default)]
pub struct RunAllCoordinator {
    active: Mutex<Option<ActiveRun>>,
}

impl RunAllCoordinator {
    pub fn try_start(&self, message_index: usize) -> Result<RunGuard<'_>> {
        let mut active = self.active.lock();
        if active.is_some() {
            return Err(HumanizeError::AlreadyRunning);
        }
        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        *active = Some(ActiveRun { id, message_index, cancel: cancel.clone() });
        Ok(RunGuard { coordinator: self, id, cancel })
    }

    /// Returns false when no session is running.
    pub fn request_cancel(&self) -> bool {
        match self.active.lock().as_ref() {
            Some(run) => {
                run.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn active_message(&self) -> Option<usize> {
        self.active.lock().as_ref().map(|r| r.message_index)
    }

    fn finish(&self, id: Uuid) {
        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|r| r.id == id) {
            *active = None;
        }
    }
}

/// Holds the coordinator slot; releases it when dropped.
pub struct RunGuard<'a> {
    coordinator: &'a RunAllCoordinator,
    id: Uuid,
    cancel: CancellationToken,
}

impl RunGuard<'_> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.finish(self.id);
    }
}

impl Humanizer {
    /// Apply every registered step to one message, in registry order.
    /// Step failures are recorded and the run moves on.
    pub async fn run_all(&self, message_index: usize) -> Result<RunAllReport> {
        let guard = self.coordinator.try_start(message_index).inspect_err(|_| {
            warn!(requested = message_index, active = ?self.coordinator.active_message(), "run-all already in progress");
        })?;
        let mut session = RunAllSession::new(self.registry.keys().into_iter().map(String::from).collect());
        let total = session.steps.len();
        info!(run = %guard.id(), message_index, total, "run-all started");

        while !session.is_exhausted() {
            if guard.is_cancelled() {
                session.cancelled = true;
                break;
            }

            let position = session.current_index;
            let key = session.steps[position].clone();
            let step_name = self.registry.get(&key).map_or(key.as_str(), |s| s.name).to_string();
            self.emit(HumanizeEvent::RunAllProgress {
                message_index,
                position,
                total,
                step_key: key.clone(),
                step_name,
            });

            let result = self.run_step(message_index, Some(&key), true).await;
            self.emit(HumanizeEvent::RunAllStepFinished {
                message_index,
                position,
                total,
                step_key: key.clone(),
                error: result.error.clone(),
            });
            session.record(key, result.error);

            if !session.is_exhausted() {
                tokio::select! {
                    biased;
                    _ = guard.token().cancelled() => {
                        session.cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.step_delay) => {}
                }
            }
        }

        let report = session.into_report();
        info!(
            run = %guard.id(),
            completed = report.completed,
            failed = report.errors.len(),
            cancelled = report.outcome == RunOutcome::Cancelled,
            "run-all finished"
        );
        drop(guard);

        self.emit(HumanizeEvent::RunAllFinished { message_index, report: report.clone() });
        Ok(report)
    }

    /// Ask the running session, if any, to stop before its next step.
    pub fn request_cancel_run_all(&self) -> bool {
        let requested = self.coordinator.request_cancel();
        if requested {
            info!("run-all cancellation requested");
            self.emit(HumanizeEvent::RunAllCancelRequested);
        }
        requested
    }
}
