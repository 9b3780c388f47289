use colored::Colorize;

use crate::config::Settings;
use crate::events::{HumanizeEvent, Level, Observer};
use crate::executor::PreparedStep;
use crate::orchestrator::{RunAllReport, RunOutcome};
use crate::steps::StepRegistry;

/// Prints notifications to the terminal as they happen.
pub struct ConsoleObserver;

impl Observer for ConsoleObserver {
    fn notify(&self, event: &HumanizeEvent) {
        if let HumanizeEvent::MessageUpdated { .. } | HumanizeEvent::RunAllFinished { .. } = event {
            return;
        }
        println!("{}", render_event(event));
    }
}

fn badge(level: Level) -> colored::ColoredString {
    match level {
        Level::Info => "[INFO]".cyan().bold(),
        Level::Success => "[DONE]".green().bold(),
        Level::Warning => "[WARN]".yellow().bold(),
        Level::Error => "[FAIL]".red().bold(),
    }
}

pub fn render_event(event: &HumanizeEvent) -> String {
    match event.reason() {
        Some(r) => format!("{} {}: {}", badge(event.level()), event.status(), r),
        None => format!("{} {}", badge(event.level()), event.status()),
    }
}

pub fn show_steps(registry: &StepRegistry, settings: &Settings) {
    println!("\n=== STEPS ===");
    for (i, s) in registry.iter().enumerate() {
        let selected = if s.key == settings.selected_step { "*".green().bold() } else { " ".normal() };
        let custom = if settings.has_override(s.key) { "  [custom prompt]".yellow() } else { "".normal() };
        println!("{} {}. {} ({}){}", selected, i + 1, s.name.bold(), s.key, custom);
        println!("     {}", s.description);
    }
    println!();
}

pub fn show_settings(settings: &Settings) {
    let budget = match settings.prompt_budget {
        Some(b) => format!("{b} chars"),
        None => "off".to_string(),
    };
    println!("\n=== SETTINGS ===");
    println!("  {}: {}", "Enabled".bold(), settings.enabled);
    println!("  {}: {}", "Context depth".bold(), settings.context_depth);
    println!("  {}: {}", "Selected step".bold(), settings.selected_step);
    println!("  {}: {}", "Prompt budget".bold(), budget);
    println!("  {}: {:?} / {}", "Provider".bold(), settings.provider.kind, settings.provider.model);
    if !settings.prompt_overrides.is_empty() {
        let keys: Vec<&str> = settings.prompt_overrides.keys().map(String::as_str).collect();
        println!("  {}: {}", "Custom prompts".bold(), keys.join(", "));
    }
    println!();
}

pub fn show_preview(prepared: &PreparedStep) {
    println!("\n=== PROMPT: {} ({}) ===", prepared.step_name.bold(), prepared.step_key);
    println!("{}", prepared.prompt.text);
    let mut meta = format!(
        "\n{} chars, {} context turn(s)",
        prepared.prompt.text.chars().count(),
        prepared.prompt.context_turns
    );
    if prepared.prompt.truncated {
        meta.push_str(&format!(", {} trimmed for budget", prepared.prompt.dropped_turns));
    }
    println!("{}", meta.dimmed());
}

pub fn print_run_report(report: &RunAllReport) {
    let title = match report.outcome {
        RunOutcome::Completed if report.errors.is_empty() => report.summary().green().bold(),
        RunOutcome::Completed => report.summary().yellow().bold(),
        RunOutcome::Cancelled => report.summary().yellow().bold(),
    };
    println!(
        "\n{}",
        "┏━━━━━━━━━━━━━━━━━━━━━━━ Run-All Results ━━━━━━━━━━━━━━━━━━━┓".bold()
    );
    println!("  {}", title);
    println!(
        "  {}: {}   {}: {}   {}: {}",
        "Completed".green().bold(), report.completed,
        "Failed".red().bold(), report.errors.len(),
        "Skipped".bold(), report.skipped()
    );
    println!("{}", "┗━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┛".bold());
    for f in &report.errors {
        println!("  - {} [{}]: {}", f.step_key.bold(), f.error.code(), f.error);
    }
}
