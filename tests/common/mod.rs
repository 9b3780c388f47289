#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use humanize::chat::{ChatStore, ChatTurn, MemoryChat};
use humanize::config::{MemorySettings, Settings};
use humanize::errors::Result as CoreResult;
use humanize::events::{HumanizeEvent, Observer};
use humanize::executor::Humanizer;
use humanize::provider::Provider;

pub enum Reply {
    Text(String),
    Fail(String),
}

/// Provider that plays back scripted replies and records every prompt.
/// Once the script runs out it echoes the prompt's last line with a suffix.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self { replies: Mutex::new(replies.into()), prompts: Mutex::new(Vec::new()) })
    }

    pub fn texts(replies: &[&str]) -> Arc<Self> {
        Self::new(replies.iter().map(|r| Reply::Text(r.to_string())).collect())
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        match self.replies.lock().pop_front() {
            Some(Reply::Text(t)) => Ok(t),
            Some(Reply::Fail(e)) => Err(anyhow!(e)),
            None => Ok(format!("{} (revised)", prompt.lines().last().unwrap_or_default())),
        }
    }
}

/// Chat store that counts mutations and saves.
pub struct CountingChat {
    inner: MemoryChat,
    pub replaced: AtomicUsize,
    pub saved: AtomicUsize,
}

impl CountingChat {
    pub fn new(turns: Vec<ChatTurn>) -> Arc<Self> {
        Arc::new(Self { inner: MemoryChat::new(turns), replaced: AtomicUsize::new(0), saved: AtomicUsize::new(0) })
    }

    pub fn text(&self, index: usize) -> String {
        self.inner.snapshot()[index].text.clone()
    }

    pub fn replaced(&self) -> usize {
        self.replaced.load(Ordering::SeqCst)
    }

    pub fn saved(&self) -> usize {
        self.saved.load(Ordering::SeqCst)
    }
}

impl ChatStore for CountingChat {
    fn snapshot(&self) -> Vec<ChatTurn> {
        self.inner.snapshot()
    }

    fn replace_text(&self, index: usize, text: &str) -> CoreResult<()> {
        self.replaced.fetch_add(1, Ordering::SeqCst);
        self.inner.replace_text(index, text)
    }

    fn save(&self) -> CoreResult<()> {
        self.saved.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<HumanizeEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<HumanizeEvent> {
        self.events.lock().clone()
    }
}

impl Observer for RecordingObserver {
    fn notify(&self, event: &HumanizeEvent) {
        self.events.lock().push(event.clone());
    }
}

pub fn sample_chat() -> Vec<ChatTurn> {
    vec![
        ChatTurn::character("Eve", "Welcome aboard. I am the navigator of this vessel."),
        ChatTurn::user("Where are we headed?"),
        ChatTurn::character("Eve", "We are headed to the northern islands. It is a logical destination."),
        ChatTurn::user("Sounds cold."),
        ChatTurn::character("Eve", "It is cold. Temperature will be low. You should prepare accordingly."),
    ]
}

pub fn humanizer(
    chat: Arc<CountingChat>,
    provider: Arc<ScriptedProvider>,
    settings: Settings,
) -> Humanizer {
    Humanizer::new(chat, provider, Arc::new(MemorySettings::new(settings)))
        .with_step_delay(Duration::from_millis(5))
}
