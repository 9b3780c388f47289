use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs_err as fs;
use serde::Serialize;
use serde_json::to_string_pretty;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::provider::{DynProvider, Provider};

/// Install the stderr subscriber. `RUST_LOG` wins over `debug`.
pub fn init_tracing(debug: bool) {
    let fallback = if debug { "humanize=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn tx_dir(root: &Path, tx: Uuid) -> PathBuf {
    root.join(".humanize").join("tx").join(tx.to_string())
}

#[derive(Debug, Serialize)]
struct Exchange<'a> {
    seq: usize,
    timestamp: DateTime<Utc>,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Provider wrapper that writes every prompt and reply under
/// `.humanize/tx/<id>/` before handing the reply back.
pub struct TranscriptRecorder {
    inner: DynProvider,
    dir: PathBuf,
    seq: AtomicUsize,
}

impl TranscriptRecorder {
    pub fn new(inner: DynProvider, root: &Path, tx: Uuid) -> Self {
        Self { inner, dir: tx_dir(root, tx), seq: AtomicUsize::new(0) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn save(&self, exchange: &Exchange<'_>) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let p = self.dir.join(format!("{:03}.exchange.json", exchange.seq));
        fs::write(&p, to_string_pretty(exchange)?)?;
        Ok(p)
    }
}

#[async_trait]
impl Provider for TranscriptRecorder {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.inner.generate(prompt).await;

        let exchange = Exchange {
            seq,
            timestamp: Utc::now(),
            prompt,
            response: result.as_ref().ok().map(String::as_str),
            error: result.as_ref().err().map(|e| e.to_string()),
        };
        match self.save(&exchange) {
            Ok(p) => tracing::debug!(path = %p.display(), "exchange saved"),
            Err(e) => tracing::warn!("could not save exchange {seq}: {e}"),
        }
        result
    }
}
