use fs_err as fs;
use parking_lot::RwLock;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::{ChatStore, ChatTurn};
use crate::errors::{HumanizeError, Result};

enum Line {
    /// Header metadata or anything else without a `mes` field.
    Other(String),
    Message { raw: String, value: Value, edited: bool },
}

impl Line {
    fn message(&self) -> Option<&Value> {
        match self {
            Line::Message { value, .. } => Some(value),
            Line::Other(_) => None,
        }
    }
}

/// Chat transcript stored as JSON Lines. Lines carrying a `mes` field are
/// messages. Only edited messages are re-serialized on save; every other
/// line is written back byte for byte.
pub struct JsonlChat {
    path: PathBuf,
    lines: RwLock<Vec<Line>>,
}

impl JsonlChat {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let raw = fs::read_to_string(&path)?;
        let mut lines = Vec::new();
        for (n, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(line).map_err(|e| {
                HumanizeError::Chat(format!("{}:{}: {}", path.display(), n + 1, e))
            })?;
            if value.get("mes").is_some() {
                lines.push(Line::Message { raw: line.to_string(), value, edited: false });
            } else {
                lines.push(Line::Other(line.to_string()));
            }
        }
        tracing::debug!(path = %path.display(), lines = lines.len(), "chat loaded");
        Ok(Self { path, lines: RwLock::new(lines) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn to_turn(v: &Value) -> ChatTurn {
    serde_json::from_value(v.clone()).unwrap_or_else(|_| ChatTurn {
        name: v.get("name").and_then(Value::as_str).map(str::to_string),
        is_user: v.get("is_user").and_then(Value::as_bool).unwrap_or(false),
        text: v.get("mes").and_then(Value::as_str).unwrap_or_default().to_string(),
    })
}

impl ChatStore for JsonlChat {
    fn snapshot(&self) -> Vec<ChatTurn> {
        self.lines.read().iter().filter_map(Line::message).map(to_turn).collect()
    }

    fn replace_text(&self, index: usize, text: &str) -> Result<()> {
        let mut lines = self.lines.write();
        let line = lines
            .iter_mut()
            .filter(|l| l.message().is_some())
            .nth(index)
            .ok_or_else(|| HumanizeError::Chat(format!("message {index} not found")))?;
        if let Line::Message { value, edited, .. } = line {
            value["mes"] = Value::String(text.to_string());
            *edited = true;
        }
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let mut out = String::new();
        for line in self.lines.read().iter() {
            match line {
                Line::Other(raw) | Line::Message { raw, edited: false, .. } => out.push_str(raw),
                // Key order survives through serde_json's `preserve_order`.
                Line::Message { value, edited: true, .. } => out.push_str(
                    &serde_json::to_string(value).map_err(|e| HumanizeError::Chat(e.to_string()))?,
                ),
            }
            out.push('\n');
        }
        fs::write(&self.path, out)?;
        tracing::debug!(path = %self.path.display(), "chat saved");
        Ok(())
    }
}
