use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::ProviderKind;
use crate::config::ProviderSettings;

pub mod openai;
pub mod anthropic;
pub mod ollama;

/// Single-shot text generation: one rendered prompt in, one reply out.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

pub type DynProvider = Arc<dyn Provider>;

pub fn make_provider(settings: &ProviderSettings) -> Result<DynProvider> {
    let timeout = Duration::from_secs(settings.timeout_secs);
    match settings.kind {
        ProviderKind::OpenAI => Ok(Arc::new(openai::OpenAIProvider::new(
            settings.model.clone(),
            settings.timeout_secs,
        ))),
        ProviderKind::Anthropic => {
            let api_key = std::env::var("ANTHROPIC_API_KEY")
                .map_err(|_| anyhow!("ANTHROPIC_API_KEY env var is not set"))?;
            Ok(Arc::new(anthropic::Anthropic {
                model: settings.model.clone(),
                api_key,
                timeout,
                api_base: "https://api.anthropic.com".into(),
                api_version: "2023-06-01".into(),
            }))
        }
        ProviderKind::Ollama => Ok(Arc::new(ollama::Ollama {
            model: settings.model.clone(),
            url: settings
                .ollama_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".into()),
            timeout,
        })),
    }
}
