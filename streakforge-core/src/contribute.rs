//! High-level pipeline: orchestrates schedule → generate → commit → push for
//! every configured repository.
//!
//! Each pass walks the repository list (sequentially, or across a bounded
//! worker pool in parallel mode), decides per repository whether it is due,
//! produces content through the fallback chain, materializes commits behind
//! the empty-diff guard and pushes. Failures are isolated per repository:
//! one broken remote never aborts the rest of the pass.
//!
//! # Major Types
//! - [`RepoTarget`]: a configured repository plus its last-contribution time
//! - [`RunReport`]: aggregate outcome of one pass, per-repository
//!
//! # Collaborators
//! The pass emits [`Event`]s through a [`Notifier`] and appends
//! [`ContributionRecord`]s to a [`ContributionStore`] — both are traits so
//! tests substitute mocks.
//!
//! # Error Handling
//! Configuration errors abort before any repository is touched (the settings
//! are validated at load time). Everything else is captured in the
//! per-repository outcome and reported, never propagated.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::analytics::ContributionRecord;
use crate::analyze::{self, RepoProfile};
use crate::config::{IntervalDistribution, RepoConfig, Settings};
use crate::contract::{ContributionStore, Notifier};
use crate::error::Result;
use crate::generate::{Artifact, Complexity, ContentRequest, GeneratorStack, Language};
use crate::notify::Event;
use crate::repo::GitWorkspace;
use crate::schedule::{self, Decision};

/// A configured repository plus the run-scoped state the scheduler consults.
/// The last-contribution timestamp is owned here and written only by the
/// pipeline, after a confirmed push.
#[derive(Debug, Clone)]
pub struct RepoTarget {
    pub config: RepoConfig,
    pub last_contribution: Option<DateTime<Utc>>,
}

impl RepoTarget {
    pub fn new(config: RepoConfig) -> Self {
        RepoTarget {
            config,
            last_contribution: None,
        }
    }
}

/// Build the run-scoped targets from validated settings.
pub fn targets_from(settings: &Settings) -> Vec<RepoTarget> {
    settings
        .repositories
        .iter()
        .cloned()
        .map(RepoTarget::new)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeStatus {
    Completed { commits: usize },
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct RepoOutcome {
    pub slug: String,
    pub status: OutcomeStatus,
}

/// Aggregate result of one pass over all targets.
#[derive(Debug)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<RepoOutcome>,
}

impl RunReport {
    pub fn completed(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Completed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Failed { .. }))
    }

    fn count(&self, predicate: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| predicate(&outcome.status))
            .count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} completed, {} skipped, {} failed",
            self.completed(),
            self.skipped(),
            self.failed()
        )
    }
}

/// Run one pass over all targets.
pub async fn run_pass<N, S>(
    settings: &Settings,
    stack: &GeneratorStack,
    notifier: &N,
    store: &S,
    credential: Option<&str>,
    targets: &mut [RepoTarget],
) -> RunReport
where
    N: Notifier,
    S: ContributionStore,
{
    let started_at = Utc::now();
    info!(
        repositories = targets.len(),
        parallel = settings.parallel.enabled,
        "Starting contribution pass"
    );

    let outcomes = if settings.parallel.enabled && targets.len() > 1 {
        stream::iter(targets.iter_mut())
            .map(|target| process_target(settings, stack, notifier, store, credential, target))
            .buffer_unordered(settings.parallel.workers.max(1))
            .collect::<Vec<_>>()
            .await
    } else {
        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets.iter_mut() {
            outcomes.push(process_target(settings, stack, notifier, store, credential, target).await);
        }
        outcomes
    };

    let report = RunReport {
        started_at,
        finished_at: Utc::now(),
        outcomes,
    };
    info!(summary = %report.summary(), "Contribution pass finished");
    emit(
        notifier,
        Event::info("Run completed", report.summary()),
    )
    .await;
    report
}

/// Run passes forever, sleeping a drawn interval between them.
pub async fn run_loop<N, S>(
    settings: &Settings,
    stack: &GeneratorStack,
    notifier: &N,
    store: &S,
    credential: Option<&str>,
    targets: &mut Vec<RepoTarget>,
) where
    N: Notifier,
    S: ContributionStore,
{
    loop {
        run_pass(settings, stack, notifier, store, credential, targets).await;
        let sleep_hours = {
            let mut rng = rand::thread_rng();
            schedule::draw_interval_hours(
                &settings.cadence,
                IntervalDistribution::Uniform,
                &mut rng,
            )
        };
        info!(sleep_hours, "Sleeping until next pass");
        let seconds = (sleep_hours * 3600.0).max(1.0);
        tokio::time::sleep(std::time::Duration::from_secs_f64(seconds)).await;
    }
}

async fn process_target<N, S>(
    settings: &Settings,
    stack: &GeneratorStack,
    notifier: &N,
    store: &S,
    credential: Option<&str>,
    target: &mut RepoTarget,
) -> RepoOutcome
where
    N: Notifier,
    S: ContributionStore,
{
    let slug = target.config.slug.clone();
    match contribute_to(settings, stack, notifier, store, credential, target).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(repo = %slug, error = %err, "Repository pipeline failed");
            emit(
                notifier,
                Event::error("Repository failed", format!("{slug}: {err}")),
            )
            .await;
            RepoOutcome {
                slug,
                status: OutcomeStatus::Failed {
                    reason: err.to_string(),
                },
            }
        }
    }
}

async fn contribute_to<N, S>(
    settings: &Settings,
    stack: &GeneratorStack,
    notifier: &N,
    store: &S,
    credential: Option<&str>,
    target: &mut RepoTarget,
) -> Result<RepoOutcome>
where
    N: Notifier,
    S: ContributionStore,
{
    let slug = target.config.slug.clone();
    let now = Utc::now();

    let decision = {
        let mut rng = rand::thread_rng();
        schedule::decide(
            &settings.cadence,
            &settings.patterns,
            target.last_contribution,
            now,
            &mut rng,
        )
    };
    let commits = match decision {
        Decision::Skip { due_in_hours } => {
            info!(repo = %slug, due_in_hours, "Not due yet, skipping");
            emit(
                notifier,
                Event::info(
                    "Repository skipped",
                    format!("{slug} is due in {due_in_hours:.1}h"),
                ),
            )
            .await;
            return Ok(RepoOutcome {
                slug,
                status: OutcomeStatus::Skipped {
                    reason: format!("due in {due_in_hours:.1}h"),
                },
            });
        }
        Decision::Act { commits } => commits,
    };

    let workspace =
        GitWorkspace::for_target(&target.config, &settings.workdir, credential, &settings.identity)?;
    workspace.ensure_ready().await?;

    let profile = match analyze::profile_workspace(workspace.path()) {
        Ok(profile) => Some(profile),
        Err(err) => {
            warn!(repo = %slug, error = %err, "Repository analysis failed, generating without context");
            None
        }
    };

    let mut files = Vec::new();
    let mut hashes = Vec::new();
    let mut fallbacks: Vec<&'static str> = Vec::new();
    for _ in 0..commits {
        let request = build_request(&slug, profile.clone(), settings);
        let pick = stack.produce(&request).await;
        if let Some(tier) = pick.fell_back_from {
            fallbacks.push(tier);
        }
        let artifact = Artifact::from_content(pick.content, request.timestamp);
        let created = workspace
            .commit_artifact(&artifact, settings.split_commits.as_ref())
            .await?;
        if created.is_empty() {
            debug!(repo = %slug, file = %artifact.file_name, "Generated content changed nothing");
            continue;
        }
        files.push(artifact.file_name);
        hashes.extend(created);
    }

    if hashes.is_empty() {
        info!(repo = %slug, "No effective changes this pass");
        return Ok(RepoOutcome {
            slug,
            status: OutcomeStatus::Skipped {
                reason: "no effective changes".to_string(),
            },
        });
    }

    workspace.push(&settings.push).await?;
    target.last_contribution = Some(Utc::now());

    let record = ContributionRecord {
        repository: slug.clone(),
        timestamp: Utc::now(),
        files,
        commit_hashes: hashes.clone(),
    };
    if let Err(err) = store.append(&record).await {
        warn!(repo = %slug, error = %err, "Failed to append contribution record");
        emit(
            notifier,
            Event::warning(
                "Analytics append failed",
                format!("{slug}: {err}"),
            ),
        )
        .await;
    }

    for tier in &fallbacks {
        let event = if *tier == "mcp" {
            Event::error(
                "AI generation fell back",
                format!("{slug}: {tier} tier failed, lower tier served the content"),
            )
        } else {
            Event::warning(
                "Content generation degraded",
                format!("{slug}: {tier} tier failed, lower tier served the content"),
            )
        };
        emit(notifier, event).await;
    }

    emit(
        notifier,
        Event::info(
            "Contribution pushed",
            format!("{slug}: {} commit(s)", hashes.len()),
        ),
    )
    .await;

    Ok(RepoOutcome {
        slug,
        status: OutcomeStatus::Completed {
            commits: hashes.len(),
        },
    })
}

fn build_request(slug: &str, profile: Option<RepoProfile>, settings: &Settings) -> ContentRequest {
    let mut rng = rand::thread_rng();
    let kinds = &settings.generation.content_kinds;
    let kind = kinds[rng.gen_range(0..kinds.len())];
    let language = profile
        .as_ref()
        .and_then(|p| p.dominant_language)
        .unwrap_or_else(|| {
            const LANGUAGES: [Language; 3] =
                [Language::Python, Language::JavaScript, Language::Rust];
            LANGUAGES[rng.gen_range(0..LANGUAGES.len())]
        });
    const COMPLEXITIES: [Complexity; 3] = [Complexity::Low, Complexity::Medium, Complexity::High];
    let complexity = COMPLEXITIES[rng.gen_range(0..COMPLEXITIES.len())];
    ContentRequest {
        repo_slug: slug.to_string(),
        kind,
        language,
        complexity,
        profile,
        timestamp: Utc::now(),
    }
}

async fn emit<N: Notifier>(notifier: &N, event: Event) {
    if let Err(err) = notifier.notify(event).await {
        warn!(error = %err, "Notifier failed to deliver event");
    }
}
