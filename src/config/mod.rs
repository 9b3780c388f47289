use fs_err as fs;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::cli::ProviderKind;
use crate::errors::{HumanizeError, Result};
use crate::steps::DEFAULT_STEP;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub model: String,
    pub timeout_secs: u64,
    pub ollama_url: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::OpenAI,
            model: "gpt-4.1-mini".into(),
            timeout_secs: 120,
            ollama_url: Some("http://localhost:11434".into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub enabled: bool,
    pub context_depth: usize,
    pub selected_step: String,
    /// Total prompt size in characters. Context is trimmed to fit when set.
    pub prompt_budget: Option<usize>,
    pub prompt_overrides: BTreeMap<String, String>,
    pub provider: ProviderSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            context_depth: 5,
            selected_step: DEFAULT_STEP.into(),
            prompt_budget: None,
            prompt_overrides: BTreeMap::new(),
            provider: ProviderSettings::default(),
        }
    }
}

impl Settings {
    pub fn set_prompt_override(&mut self, key: &str, template: impl Into<String>) {
        self.prompt_overrides.insert(key.to_string(), template.into());
    }

    /// Drop the override so the step's default template applies again.
    pub fn restore_default_prompt(&mut self, key: &str) -> bool {
        self.prompt_overrides.remove(key).is_some()
    }

    pub fn has_override(&self, key: &str) -> bool {
        self.prompt_overrides.get(key).is_some_and(|t| !t.trim().is_empty())
    }
}

pub trait SettingsStore: Send + Sync {
    fn get(&self) -> Settings;
    fn set(&self, settings: Settings);
    /// Write pending changes to backing storage.
    fn flush(&self) -> Result<()>;

    fn update(&self, f: &mut dyn FnMut(&mut Settings)) {
        let mut s = self.get();
        f(&mut s);
        self.set(s);
    }
}

#[derive(Debug, Default)]
pub struct MemorySettings {
    inner: RwLock<Settings>,
}

impl MemorySettings {
    pub fn new(settings: Settings) -> Self {
        Self { inner: RwLock::new(settings) }
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self) -> Settings {
        self.inner.read().clone()
    }

    fn set(&self, settings: Settings) {
        *self.inner.write() = settings;
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Settings kept in a TOML file. A missing file starts from defaults.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    inner: RwLock<Settings>,
    dirty: RwLock<bool>,
}

impl FileSettings {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let settings = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            toml::from_str(&raw)
                .map_err(|e| HumanizeError::Settings(format!("{}: {}", path.display(), e)))?
        } else {
            tracing::debug!(path = %path.display(), "settings file missing, using defaults");
            Settings::default()
        };
        Ok(Self { path, inner: RwLock::new(settings), dirty: RwLock::new(false) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettings {
    fn get(&self) -> Settings {
        self.inner.read().clone()
    }

    fn set(&self, settings: Settings) {
        *self.inner.write() = settings;
        *self.dirty.write() = true;
    }

    fn flush(&self) -> Result<()> {
        if !*self.dirty.read() {
            return Ok(());
        }
        let raw = toml::to_string_pretty(&*self.inner.read())
            .map_err(|e| HumanizeError::Settings(e.to_string()))?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, raw)?;
        *self.dirty.write() = false;
        tracing::info!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}
