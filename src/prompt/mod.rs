use crate::chat::ChatTurn;
use crate::context::{self, context_budget, serialize_context, trim_to_budget};

pub const CONTEXT_PLACEHOLDER: &str = "{{context}}";
pub const MESSAGE_PLACEHOLDER: &str = "{{message}}";

/// Substitute the first `{{context}}` and the first `{{message}}` of
/// `template`. Inserted text is never scanned for placeholders.
pub fn render(template: &str, context: &str, message: &str) -> String {
    let mut slots: Vec<(usize, &str, &str)> = Vec::with_capacity(2);
    if let Some(at) = template.find(CONTEXT_PLACEHOLDER) {
        slots.push((at, CONTEXT_PLACEHOLDER, context));
    }
    if let Some(at) = template.find(MESSAGE_PLACEHOLDER) {
        slots.push((at, MESSAGE_PLACEHOLDER, message));
    }
    slots.sort_by_key(|(at, _, _)| *at);

    let mut out = String::with_capacity(template.len() + context.len() + message.len());
    let mut cursor = 0;
    for (at, token, value) in slots {
        out.push_str(&template[cursor..at]);
        out.push_str(value);
        cursor = at + token.len();
    }
    out.push_str(&template[cursor..]);
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub text: String,
    pub context_turns: usize,
    pub truncated: bool,
    pub dropped_turns: usize,
}

/// Build the final prompt for the message at `target_index`.
/// `budget` is the total prompt size in characters, if one is enforced.
pub fn assemble(
    template: &str,
    history: &[ChatTurn],
    target_index: usize,
    depth: usize,
    budget: Option<usize>,
) -> AssembledPrompt {
    let message = history.get(target_index).map(|t| t.text.as_str()).unwrap_or_default();
    let mut turns = context::build_context(history, target_index, depth);

    let mut truncated = false;
    let mut dropped_turns = 0;
    if let Some(total) = budget {
        let max_chars = context_budget(total, template, message);
        let trimmed = trim_to_budget(&turns, max_chars);
        tracing::debug!(max_chars, kept = trimmed.turns.len(), dropped = trimmed.dropped, "context budget applied");
        truncated = trimmed.truncated;
        dropped_turns = trimmed.dropped;
        turns = trimmed.turns;
    }

    let text = render(template, &serialize_context(&turns), message);
    AssembledPrompt { text, context_turns: turns.len(), truncated, dropped_turns }
}
