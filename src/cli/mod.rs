use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(name = "openai", alias = "open-ai")]
    OpenAI,
    Anthropic,
    Ollama,
}

#[derive(Parser, Debug)]
#[command(name = "humanize", version, about = "Rewrite AI chat messages through prompt-driven improvement steps")]
pub struct Args {
    #[arg(long, global = true, default_value = "humanize.toml")]
    pub settings: PathBuf,

    #[arg(long, global = true, value_enum)]
    pub provider: Option<ProviderKind>,

    #[arg(long, global = true)]
    pub model: Option<String>,

    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct Target {
    /// Chat transcript (JSONL)
    #[arg(long)]
    pub chat: PathBuf,

    /// Message index, counting messages from 0
    #[arg(long)]
    pub message: usize,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the improvement steps
    Steps,

    /// Rewrite one message with one step
    Rewrite {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        step: Option<String>,
        #[arg(long, default_value_t = false)]
        save_transcripts: bool,
    },

    /// Apply every step in order to one message (Ctrl-C cancels)
    RunAll {
        #[command(flatten)]
        target: Target,
        #[arg(long, default_value_t = false)]
        save_transcripts: bool,
    },

    /// Print the prompt a step would send, without generating
    Preview {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        step: Option<String>,
    },

    /// Manage per-step prompt overrides
    Prompt {
        #[command(subcommand)]
        action: PromptAction,
    },

    /// Show or change settings
    Configure {
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
        #[arg(long)]
        depth: Option<usize>,
        #[arg(long, conflicts_with = "no_budget")]
        budget: Option<usize>,
        #[arg(long)]
        no_budget: bool,
        #[arg(long)]
        select: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum PromptAction {
    /// Print the effective template of a step
    Show { key: String },
    /// Replace a step's template with the contents of a file
    Set {
        key: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Restore a step's default template
    Reset { key: String },
}
