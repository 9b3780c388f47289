use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::chat::{ChatStore, ChatTurn};
use crate::config::{Settings, SettingsStore};
use crate::errors::StepError;
use crate::events::{HumanizeEvent, Observer};
use crate::orchestrator::RunAllCoordinator;
use crate::prompt::{self, AssembledPrompt};
use crate::provider::DynProvider;
use crate::steps::StepRegistry;

pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub step_key: String,
    pub error: Option<StepError>,
}

impl StepResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_reason(&self) -> Option<&'static str> {
        self.error.as_ref().map(StepError::code)
    }
}

/// A step that passed its preconditions, with the prompt ready to send.
#[derive(Debug, Clone)]
pub struct PreparedStep {
    pub step_key: String,
    pub step_name: String,
    pub prompt: AssembledPrompt,
}

/// Rewrites chat messages through the step catalog. Owns the host
/// collaborators and the run-all coordinator.
pub struct Humanizer {
    pub(crate) chat: Arc<dyn ChatStore>,
    pub(crate) provider: DynProvider,
    pub(crate) settings: Arc<dyn SettingsStore>,
    pub(crate) registry: StepRegistry,
    pub(crate) observers: Vec<Arc<dyn Observer>>,
    pub(crate) coordinator: Arc<RunAllCoordinator>,
    pub(crate) step_delay: Duration,
}

impl Humanizer {
    pub fn new(
        chat: Arc<dyn ChatStore>,
        provider: DynProvider,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            chat,
            provider,
            settings,
            registry: StepRegistry::default(),
            observers: Vec::new(),
            coordinator: Arc::new(RunAllCoordinator::default()),
            step_delay: DEFAULT_STEP_DELAY,
        }
    }

    pub fn with_registry(mut self, registry: StepRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Share a coordinator so several humanizers exclude each other's runs.
    pub fn with_coordinator(mut self, coordinator: Arc<RunAllCoordinator>) -> Self {
        self.coordinator = coordinator;
        self
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn coordinator(&self) -> Arc<RunAllCoordinator> {
        self.coordinator.clone()
    }

    pub(crate) fn emit(&self, event: HumanizeEvent) {
        for o in &self.observers {
            o.notify(&event);
        }
    }

    /// Rewrite one message with one step. `None` uses the selected step.
    pub async fn execute_step(&self, message_index: usize, step_key: Option<&str>) -> StepResult {
        self.run_step(message_index, step_key, false).await
    }

    /// Check preconditions and build the prompt without generating.
    pub fn preview(&self, message_index: usize, step_key: Option<&str>) -> Result<PreparedStep, StepError> {
        let settings = self.settings.get();
        let key = step_key.unwrap_or(&settings.selected_step).to_string();
        self.prepare(&self.chat.snapshot(), message_index, &key, &settings)
    }

    /// Silent runs report only through the returned result; run-all
    /// publishes its own progress instead.
    pub(crate) async fn run_step(&self, message_index: usize, step_key: Option<&str>, silent: bool) -> StepResult {
        let settings = self.settings.get();
        let key = step_key.unwrap_or(&settings.selected_step).to_string();

        match self.try_step(message_index, &key, &settings, silent).await {
            Ok(()) => {
                info!(message_index, step = %key, "message rewritten");
                if !silent {
                    self.emit(HumanizeEvent::StepSucceeded { message_index, step_key: key.clone() });
                }
                StepResult { step_key: key, error: None }
            }
            Err(e) => {
                warn!(message_index, step = %key, reason = e.code(), "step failed: {e}");
                if !silent {
                    self.emit(HumanizeEvent::StepFailed {
                        message_index,
                        step_key: key.clone(),
                        error: e.clone(),
                    });
                }
                StepResult { step_key: key, error: Some(e) }
            }
        }
    }

    fn prepare(
        &self,
        history: &[ChatTurn],
        message_index: usize,
        key: &str,
        settings: &Settings,
    ) -> Result<PreparedStep, StepError> {
        let message = history.get(message_index).ok_or(StepError::MessageNotFound(message_index))?;
        if message.is_user {
            return Err(StepError::NotEligible);
        }
        if message.text.trim().is_empty() {
            return Err(StepError::EmptyMessage);
        }
        let template = self.registry.resolve_template(key, &settings.prompt_overrides)?;
        let step_name = self.registry.get(key).map_or(key, |s| s.name).to_string();

        let prompt = prompt::assemble(
            &template,
            history,
            message_index,
            settings.context_depth,
            settings.prompt_budget,
        );
        debug!(
            step = key,
            prompt_chars = prompt.text.chars().count(),
            context_turns = prompt.context_turns,
            "prompt assembled"
        );
        Ok(PreparedStep { step_key: key.to_string(), step_name, prompt })
    }

    async fn try_step(
        &self,
        message_index: usize,
        key: &str,
        settings: &Settings,
        silent: bool,
    ) -> Result<(), StepError> {
        let prepared = self.prepare(&self.chat.snapshot(), message_index, key, settings)?;

        if !silent {
            self.emit(HumanizeEvent::StepStarted {
                message_index,
                step_key: prepared.step_key.clone(),
                step_name: prepared.step_name.clone(),
            });
            if prepared.prompt.truncated {
                self.emit(HumanizeEvent::ContextTrimmed {
                    message_index,
                    step_key: prepared.step_key.clone(),
                    dropped: prepared.prompt.dropped_turns,
                });
            }
        }

        let reply = self
            .provider
            .generate(&prepared.prompt.text)
            .await
            .map_err(|e| StepError::Generation(e.to_string()))?;
        if reply.trim().is_empty() {
            return Err(StepError::EmptyResponse);
        }

        self.chat
            .replace_text(message_index, &reply)
            .map_err(|_| StepError::MessageNotFound(message_index))?;
        if let Err(e) = self.chat.save() {
            error!(message_index, "chat save failed: {e}");
        }
        self.emit(HumanizeEvent::MessageUpdated { message_index });
        Ok(())
    }
}
