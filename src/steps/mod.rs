use std::collections::BTreeMap;

use crate::errors::StepError;

pub const DEFAULT_STEP: &str = "humanize";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDefinition {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub default_template: &'static str,
}

fn humanize_template() -> &'static str {
r#"Rewrite the current output. The conversation should flow more naturally and the dialogue should be more human-like, with the characters not being too logical or robotic. Keep the same general content and meaning, but make it sound more natural.

Recent conversation for reference:
{{context}}

Original message to rewrite:
{{message}}

Reply with the rewritten message only."#
}

fn show_dont_tell_template() -> &'static str {
r#"Revise the message below so that it shows instead of tells. Replace stated emotions and summaries with concrete actions, body language, sensory detail and dialogue. Do not add new plot events and keep the same length, roughly.

Recent conversation for reference:
{{context}}

Message to revise:
{{message}}

Reply with the revised message only."#
}

fn repetition_template() -> &'static str {
r#"Edit the message below to remove repetition. Cut phrases, images and sentence openings that repeat within the message or echo the recent conversation too closely. Vary sentence structure. Keep everything that carries meaning.

Recent conversation for reference:
{{context}}

Message to edit:
{{message}}

Reply with the edited message only."#
}

fn pacing_template() -> &'static str {
r#"Tighten the pacing of the message below. Remove filler, hedging and over-explanation so the scene moves forward, and end on a beat that invites the user to respond. Never speak or act for the user.

Recent conversation for reference:
{{context}}

Message to tighten:
{{message}}

Reply with the tightened message only."#
}

/// Ordered catalog of improvement steps. Run-all walks it in this order.
#[derive(Debug, Clone)]
pub struct StepRegistry {
    steps: Vec<StepDefinition>,
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new(vec![
            StepDefinition {
                key: "humanize",
                name: "Natural Dialogue",
                description: "Make the dialogue flow like real people talking.",
                default_template: humanize_template(),
            },
            StepDefinition {
                key: "show_dont_tell",
                name: "Show, Don't Tell",
                description: "Swap stated feelings for action and sensory detail.",
                default_template: show_dont_tell_template(),
            },
            StepDefinition {
                key: "repetition",
                name: "Cut Repetition",
                description: "Remove repeated phrasing within the message and against recent turns.",
                default_template: repetition_template(),
            },
            StepDefinition {
                key: "pacing",
                name: "Tighten Pacing",
                description: "Trim filler and end on a beat the user can answer.",
                default_template: pacing_template(),
            },
        ])
    }
}

impl StepRegistry {
    /// Later entries with a duplicate key are ignored.
    pub fn new(steps: Vec<StepDefinition>) -> Self {
        let mut out: Vec<StepDefinition> = Vec::with_capacity(steps.len());
        for s in steps {
            if out.iter().any(|o| o.key == s.key) {
                tracing::warn!(key = s.key, "duplicate step key ignored");
                continue;
            }
            out.push(s);
        }
        Self { steps: out }
    }

    pub fn get(&self, key: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepDefinition> {
        self.steps.iter()
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.key).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The user's override for `key` when one is set, otherwise the default.
    pub fn resolve_template(
        &self,
        key: &str,
        overrides: &BTreeMap<String, String>,
    ) -> Result<String, StepError> {
        let step = self.get(key).ok_or_else(|| StepError::UnknownStep(key.to_string()))?;
        match overrides.get(key) {
            Some(t) if !t.trim().is_empty() => Ok(t.clone()),
            _ => Ok(step.default_template.to_string()),
        }
    }
}
