use crate::chat::ChatTurn;

pub mod budget;

pub use budget::{context_budget, trim_to_budget, TrimOutcome};

pub const NO_CONTEXT: &str = "(No previous context)";
pub const ENTRY_SEPARATOR: &str = "\n\n";

/// Collect the turns preceding `target_index`, at most `depth` of them,
/// oldest first. Turns without text are skipped.
pub fn build_context(history: &[ChatTurn], target_index: usize, depth: usize) -> Vec<ChatTurn> {
    if depth == 0 {
        return Vec::new();
    }
    let end = target_index.min(history.len());
    let start = end.saturating_sub(depth);
    history[start..end]
        .iter()
        .filter(|t| !t.text.trim().is_empty())
        .cloned()
        .collect()
}

pub fn format_entry(turn: &ChatTurn) -> String {
    format!("{}: {}", turn.speaker_label(), turn.text)
}

pub fn serialize_context(turns: &[ChatTurn]) -> String {
    if turns.is_empty() {
        return NO_CONTEXT.to_string();
    }
    turns
        .iter()
        .map(format_entry)
        .collect::<Vec<_>>()
        .join(ENTRY_SEPARATOR)
}
