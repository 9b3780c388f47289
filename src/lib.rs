//! Message rewriting core: assemble a prompt from a step template and the
//! preceding chat turns, generate a replacement, and apply it in place.

pub mod chat;
pub mod cli;
pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod executor;
pub mod log;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod steps;
pub mod ux;

pub use chat::{ChatStore, ChatTurn};
pub use config::{Settings, SettingsStore};
pub use errors::{HumanizeError, StepError};
pub use events::{HumanizeEvent, Observer};
pub use executor::{Humanizer, StepResult};
pub use orchestrator::{RunAllReport, RunOutcome};
pub use provider::Provider;
pub use steps::StepRegistry;
