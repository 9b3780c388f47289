use crate::chat::ChatTurn;
use crate::prompt::{CONTEXT_PLACEHOLDER, MESSAGE_PLACEHOLDER};

use super::format_entry;

/// Characters reserved for the model's instructions around the prompt.
pub const SAFETY_MARGIN: i64 = 500;
/// Cost of the separator added with each accepted entry.
pub const JOIN_OVERHEAD: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimOutcome {
    /// Kept turns, oldest first.
    pub turns: Vec<ChatTurn>,
    pub truncated: bool,
    pub dropped: usize,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Template length without the placeholder tokens it contains.
pub fn template_fixed_len(template: &str) -> usize {
    let mut len = char_len(template);
    for token in [CONTEXT_PLACEHOLDER, MESSAGE_PLACEHOLDER] {
        if template.contains(token) {
            len -= char_len(token);
        }
    }
    len
}

/// Characters left for context once the template and message are placed.
/// May be zero or negative, in which case no trimming applies.
pub fn context_budget(total: usize, template: &str, message: &str) -> i64 {
    total as i64 - template_fixed_len(template) as i64 - char_len(message) as i64 - SAFETY_MARGIN
}

/// Keep the turns closest to the target that fit in `max_chars`.
pub fn trim_to_budget(turns: &[ChatTurn], max_chars: i64) -> TrimOutcome {
    if max_chars <= 0 {
        return TrimOutcome { turns: turns.to_vec(), truncated: false, dropped: 0 };
    }
    let limit = max_chars as usize;

    let mut kept: Vec<ChatTurn> = Vec::new();
    let mut used = 0usize;
    let mut truncated = false;
    for turn in turns.iter().rev() {
        let cost = char_len(&format_entry(turn)) + JOIN_OVERHEAD;
        if used + cost > limit {
            truncated = true;
            break;
        }
        used += cost;
        kept.push(turn.clone());
    }
    kept.reverse();

    let dropped = turns.len() - kept.len();
    TrimOutcome { turns: kept, truncated, dropped }
}
