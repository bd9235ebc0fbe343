///
/// This module implements the CLI interface for streakforge — command
/// parsing, collaborator assembly and the main entrypoints.
///
/// All core business logic (scheduling, generation, git orchestration) lives
/// in the [`streakforge-core`] crate. This module is strictly CLI glue.
///
/// ## How To Use
/// - For command-line users: use the installed `streakforge` binary with
///   `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed
///   [`Cli`].
///
/// Secrets are read from the environment: `GITHUB_TOKEN` for the git remote,
/// `MCP_API_KEY` for the AI content tier.
///
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use streakforge_core::analytics::JsonlStore;
use streakforge_core::config::Settings;
use streakforge_core::contribute::{run_loop, run_pass, targets_from};
use streakforge_core::generate::{GeneratorStack, Tier};
use streakforge_core::markov::MarkovGenerator;
use streakforge_core::mcp::McpClient;
use streakforge_core::notify::LogNotifier;

use crate::load_config::{load_config, NotificationSettings};

/// CLI for streakforge: keep configured repositories looking alive.
#[derive(Parser)]
#[clap(
    name = "streakforge",
    version,
    about = "Generate, commit and push synthetic activity across configured repositories"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run contribution passes using the given config file
    Run {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Execute a single pass and exit instead of looping forever
        #[clap(long)]
        once: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run { config, once } => {
            let loaded = load_config(config)?;
            let settings = loaded.settings;
            tracing::info!(command = "run", once, "Starting contribution process");

            let credential = std::env::var("GITHUB_TOKEN").ok();
            if credential.is_none() {
                tracing::warn!(
                    "GITHUB_TOKEN not set; only repositories with explicit URLs can be processed"
                );
            }

            let stack = build_stack(&settings);
            let notifier = build_notifier(loaded.notifications);
            let store = JsonlStore::new(settings.analytics_path.clone())?;
            let mut targets = targets_from(&settings);

            if once {
                let report = run_pass(
                    &settings,
                    &stack,
                    &notifier,
                    &store,
                    credential.as_deref(),
                    &mut targets,
                )
                .await;
                tracing::info!(summary = %report.summary(), "Single pass complete");
                println!("run summary: {}", report.summary());
            } else {
                run_loop(
                    &settings,
                    &stack,
                    &notifier,
                    &store,
                    credential.as_deref(),
                    &mut targets,
                )
                .await;
            }
            Ok(())
        }
    }
}

/// Assemble the fallback chain from settings: optional AI tier, optional
/// Markov tier, unconditional template floor. A tier that cannot be
/// constructed (missing key, unreadable corpus) is disabled with a warning
/// rather than failing the run.
fn build_stack(settings: &Settings) -> GeneratorStack {
    let mut tiers = Vec::new();

    if let Some(mcp_settings) = &settings.generation.mcp {
        match McpClient::from_env(mcp_settings) {
            Ok(client) => tiers.push(Tier {
                generator: Arc::new(client),
                entry_chance: mcp_settings.chance,
            }),
            Err(e) => tracing::warn!(error = %e, "AI content tier disabled"),
        }
    }

    if let Some(markov_settings) = &settings.generation.markov {
        match MarkovGenerator::from_corpus_file(&markov_settings.corpus_path) {
            Ok(markov) => tiers.push(Tier {
                generator: Arc::new(markov),
                entry_chance: markov_settings.chance,
            }),
            Err(e) => tracing::warn!(error = %e, "Markov content tier disabled"),
        }
    }

    GeneratorStack::with_floor(tiers)
}

fn build_notifier(notifications: NotificationSettings) -> LogNotifier {
    if notifications.enabled {
        LogNotifier::new(notifications.min_level)
    } else {
        LogNotifier::silent()
    }
}
