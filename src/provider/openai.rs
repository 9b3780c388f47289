use async_trait::async_trait;
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// OpenAI chat completions, sending the rendered prompt as a single user
/// message with no system scaffolding.
pub struct OpenAIProvider {
    model: String,
    client: Client,
    timeout_secs: u64,
    api_base: String,
}

impl OpenAIProvider {
    pub fn new(model: String, timeout_secs: u64) -> Self {
        Self {
            model,
            client: Client::new(),
            timeout_secs,
            api_base: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
        }
    }
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[async_trait]
impl super::Provider for OpenAIProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY env var is not set"))?;

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": prompt }
            ],
            "temperature": 0.8,
        });

        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        tracing::debug!(%url, model = %self.model, prompt_chars = prompt.chars().count(), "openai request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        tracing::debug!(%status, body_bytes = text.len(), "openai response");

        if !status.is_success() {
            return Err(anyhow!("OpenAI API error ({}): {}", status, text));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse OpenAI response: {e}\nRaw: {text}"))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
