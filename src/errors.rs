use thiserror::Error;

/// Why a single step did not rewrite its message. The message is left
/// untouched for every variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("message {0} not found")] MessageNotFound(usize),
    #[error("can only humanize AI messages")] NotEligible,
    #[error("message is empty")] EmptyMessage,
    #[error("unknown step: {0}")] UnknownStep(String),
    #[error("failed to generate rewritten text")] EmptyResponse,
    #[error("generation failed: {0}")] Generation(String),
}

impl StepError {
    /// Stable kind name, suitable for logs and reports.
    pub fn code(&self) -> &'static str {
        match self {
            StepError::MessageNotFound(_) => "MessageNotFound",
            StepError::NotEligible => "NotEligible",
            StepError::EmptyMessage => "EmptyMessage",
            StepError::UnknownStep(_) => "UnknownStepError",
            StepError::EmptyResponse => "EmptyResponse",
            StepError::Generation(_) => "GenerationFailure",
        }
    }
}

#[derive(Error, Debug)]
pub enum HumanizeError {
    #[error("a run-all session is already in progress")] AlreadyRunning,
    #[error("settings error: {0}")] Settings(String),
    #[error("chat error: {0}")] Chat(String),
    #[error(transparent)] Io(#[from] std::io::Error),
    #[error(transparent)] Step(#[from] StepError),
}

pub type Result<T> = std::result::Result<T, HumanizeError>;
