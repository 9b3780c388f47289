use anyhow::{bail, Context};
use clap::Parser;
use fs_err as fs;
use std::future::Future;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use uuid::Uuid;

use humanize::chat::JsonlChat;
use humanize::cli::{Args, Command, PromptAction, Target};
use humanize::config::{FileSettings, MemorySettings, Settings, SettingsStore};
use humanize::executor::{Humanizer, StepResult};
use humanize::prompt::MESSAGE_PLACEHOLDER;
use humanize::provider::{self, DynProvider};
use humanize::steps::StepRegistry;
use humanize::{log, ux};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    log::init_tracing(args.debug);

    let store = FileSettings::open(&args.settings)?;
    let registry = StepRegistry::default();

    match args.command {
        Command::Steps => {
            ux::show_steps(&registry, &store.get());
        }

        Command::Rewrite { ref target, ref step, save_transcripts } => {
            let h = build_humanizer(&args, &store, target, save_transcripts)?;
            let result = h.execute_step(target.message, step.as_deref()).await;
            // The console observer has already reported any failure.
            return Ok(ExitCode::from(rewrite_exit_code(&result)));
        }

        Command::RunAll { ref target, save_transcripts } => {
            let h = Arc::new(build_humanizer(&args, &store, target, save_transcripts)?);
            let canceller = {
                let h = h.clone();
                tokio::spawn(async move {
                    let ctrl_c = || async { tokio::signal::ctrl_c().await.is_ok() };
                    if let Some(code) = handle_interrupts(&h, ctrl_c).await {
                        eprintln!("interrupted");
                        std::process::exit(code);
                    }
                })
            };
            let report = h.run_all(target.message).await;
            canceller.abort();
            ux::print_run_report(&report?);
        }

        Command::Preview { ref target, ref step } => {
            let settings = effective_settings(&args, &store);
            let chat = Arc::new(JsonlChat::open(&target.chat)?);
            let h = Humanizer::new(
                chat,
                Arc::new(NoProvider),
                Arc::new(MemorySettings::new(settings)),
            );
            let prepared = h.preview(target.message, step.as_deref())?;
            ux::show_preview(&prepared);
        }

        Command::Prompt { ref action } => match action {
            PromptAction::Show { key } => {
                let template = registry.resolve_template(key, &store.get().prompt_overrides)?;
                println!("{template}");
            }
            PromptAction::Set { key, file } => {
                if !registry.contains(key) {
                    bail!("unknown step: {key}");
                }
                let template = fs::read_to_string(file)?;
                if !template.contains(MESSAGE_PLACEHOLDER) {
                    tracing::warn!("template for '{key}' has no {MESSAGE_PLACEHOLDER} placeholder");
                }
                store.update(&mut |s| s.set_prompt_override(key, template.clone()));
                store.flush()?;
                println!("Custom prompt saved for '{key}'");
            }
            PromptAction::Reset { key } => {
                if !registry.contains(key) {
                    bail!("unknown step: {key}");
                }
                store.update(&mut |s| {
                    s.restore_default_prompt(key);
                });
                store.flush()?;
                println!("Default prompt restored for '{key}'");
            }
        },

        Command::Configure { enable, disable, depth, budget, no_budget, ref select } => {
            if let Some(key) = select {
                if !registry.contains(key) {
                    bail!("unknown step: {key}");
                }
            }
            store.update(&mut |s| {
                if enable { s.enabled = true; }
                if disable { s.enabled = false; }
                if let Some(d) = depth { s.context_depth = d; }
                if let Some(b) = budget { s.prompt_budget = Some(b); }
                if no_budget { s.prompt_budget = None; }
                if let Some(key) = select { s.selected_step = key.clone(); }
            });
            store.flush()?;
            ux::show_settings(&store.get());
            println!("saved to {}", store.path().display());
        }
    }

    Ok(ExitCode::SUCCESS)
}

const INTERRUPTED: i32 = 130;

/// First interrupt asks run-all to stop after the current step. A second one
/// returns the exit code to abort with, even mid-generation. `None` once the
/// signal source is gone.
async fn handle_interrupts<F, Fut>(h: &Humanizer, mut interrupted: F) -> Option<i32>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let mut cancel_requested = false;
    while interrupted().await {
        if cancel_requested {
            return Some(INTERRUPTED);
        }
        h.request_cancel_run_all();
        cancel_requested = true;
    }
    None
}

fn rewrite_exit_code(result: &StepResult) -> u8 {
    if result.is_success() { 0 } else { 1 }
}

/// Stored settings with the command-line provider flags applied on top.
fn effective_settings(args: &Args, store: &FileSettings) -> Settings {
    let mut s = store.get();
    if let Some(kind) = args.provider {
        s.provider.kind = kind;
    }
    if let Some(model) = &args.model {
        s.provider.model = model.clone();
    }
    if let Some(t) = args.timeout_secs {
        s.provider.timeout_secs = t;
    }
    s
}

fn build_humanizer(
    args: &Args,
    store: &FileSettings,
    target: &Target,
    save_transcripts: bool,
) -> anyhow::Result<Humanizer> {
    let settings = effective_settings(args, store);
    if !settings.enabled {
        bail!("humanize is disabled (run `humanize configure --enable`)");
    }

    let chat = Arc::new(
        JsonlChat::open(&target.chat)
            .with_context(|| format!("failed to open chat {}", target.chat.display()))?,
    );
    tracing::info!(chat = %chat.path().display(), message = target.message, "chat opened");
    let mut prov: DynProvider = provider::make_provider(&settings.provider)?;
    if save_transcripts {
        let tx = Uuid::new_v4();
        let recorder = log::TranscriptRecorder::new(prov, Path::new("."), tx);
        println!("transcripts: {}", recorder.dir().display());
        prov = Arc::new(recorder);
    }

    Ok(Humanizer::new(chat, prov, Arc::new(MemorySettings::new(settings)))
        .with_observer(Arc::new(ux::ConsoleObserver)))
}

/// Stand-in for `preview`, which never generates.
struct NoProvider;

#[async_trait::async_trait]
impl humanize::Provider for NoProvider {
    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        bail!("preview does not generate")
    }
}
