use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ContribError, Result};
use crate::generate::ContentKind;

/// Immutable, validated settings for a run. Built once by the config loader,
/// read-only everywhere else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub repositories: Vec<RepoConfig>,
    /// Directory that holds one working copy per repository.
    pub workdir: PathBuf,
    pub cadence: Cadence,
    pub patterns: PatternConfig,
    pub generation: GenerationConfig,
    pub split_commits: Option<SplitCommitPolicy>,
    pub push: PushPolicy,
    pub parallel: ParallelConfig,
    /// Append-only JSON-lines file of contribution records.
    pub analytics_path: PathBuf,
    pub identity: CommitIdentity,
}

/// One configured contribution target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    /// `owner/name` identifier, also used to derive the working-copy directory.
    pub slug: String,
    /// Explicit remote URL. When absent the URL is derived from the slug and
    /// the bearer credential supplied through the environment.
    pub url: Option<String>,
    pub branch: String,
}

/// Commit-count and interval bounds for the scheduling decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Cadence {
    pub min_commits: u32,
    pub max_commits: u32,
    pub min_interval_hours: f64,
    pub max_interval_hours: f64,
}

impl Default for Cadence {
    fn default() -> Self {
        Cadence {
            min_commits: 1,
            max_commits: 3,
            min_interval_hours: 12.0,
            max_interval_hours: 24.0,
        }
    }
}

/// Activity shaping applied to the interval draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    pub distribution: IntervalDistribution,
    /// When set, due moments outside the window are deferred to its next start.
    pub working_hours: Option<WorkingHours>,
    /// Multiplier applied to intervals whose due moment lands on a weekend.
    /// 1.0 leaves weekends untouched.
    pub weekend_scale: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        PatternConfig {
            distribution: IntervalDistribution::Uniform,
            working_hours: None,
            weekend_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalDistribution {
    Uniform,
    Poisson,
}

/// Hour-of-day window (UTC), `start` inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: u32,
    pub end: u32,
}

/// Which content strategies participate and how often they are entered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub content_kinds: Vec<ContentKind>,
    pub markov: Option<MarkovSettings>,
    pub mcp: Option<McpSettings>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            content_kinds: vec![ContentKind::Code, ContentKind::Docs],
            markov: None,
            mcp: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkovSettings {
    pub corpus_path: PathBuf,
    /// Probability of entering the chain at the Markov tier when the AI tier
    /// was not chosen.
    pub chance: f64,
}

/// External AI content service. The API key comes from the environment, never
/// from the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpSettings {
    pub endpoint: String,
    pub max_retries: u32,
    pub timeout_secs: u64,
    /// Probability of entering the chain at the AI tier.
    pub chance: f64,
}

impl Default for McpSettings {
    fn default() -> Self {
        McpSettings {
            endpoint: "https://api.mcp.dev/v1".to_string(),
            max_retries: 3,
            timeout_secs: 15,
            chance: 1.0,
        }
    }
}

/// Bound the line count of individual commits by partitioning large artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitCommitPolicy {
    pub max_lines_per_commit: usize,
    pub message_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushPolicy {
    /// Pull-and-retry attempts after a rejected push before the repository is
    /// skipped for the run.
    pub pull_retries: u32,
}

impl Default for PushPolicy {
    fn default() -> Self {
        PushPolicy { pull_retries: 2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelConfig {
    pub enabled: bool,
    pub workers: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        ParallelConfig {
            enabled: false,
            workers: 4,
        }
    }
}

/// Author identity written into each working copy's local git config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

impl Default for CommitIdentity {
    fn default() -> Self {
        CommitIdentity {
            name: "streakforge".to_string(),
            email: "streakforge@users.noreply.github.com".to_string(),
        }
    }
}

impl Settings {
    /// Eager validation, run once at load time. Any error here aborts the run
    /// before a single repository is processed.
    pub fn validate(&self) -> Result<()> {
        if self.repositories.is_empty() {
            return Err(ContribError::Config(
                "no repositories configured".to_string(),
            ));
        }
        for repo in &self.repositories {
            if repo.slug.is_empty() {
                return Err(ContribError::Config("repository with empty slug".to_string()));
            }
            if repo.url.is_none() && repo.slug.split('/').count() != 2 {
                return Err(ContribError::Config(format!(
                    "repository '{}' is not of the form owner/name and has no explicit url",
                    repo.slug
                )));
            }
            if repo.branch.is_empty() {
                return Err(ContribError::Config(format!(
                    "repository '{}' has an empty branch",
                    repo.slug
                )));
            }
        }

        let c = &self.cadence;
        if c.min_commits == 0 {
            return Err(ContribError::Config("min_commits must be at least 1".to_string()));
        }
        if c.min_commits > c.max_commits {
            return Err(ContribError::Config(format!(
                "min_commits ({}) exceeds max_commits ({})",
                c.min_commits, c.max_commits
            )));
        }
        if c.min_interval_hours < 0.0 || c.max_interval_hours < 0.0 {
            return Err(ContribError::Config("intervals must be non-negative".to_string()));
        }
        if c.min_interval_hours > c.max_interval_hours {
            return Err(ContribError::Config(format!(
                "min_interval ({}) exceeds max_interval ({})",
                c.min_interval_hours, c.max_interval_hours
            )));
        }

        if self.patterns.weekend_scale <= 0.0 {
            return Err(ContribError::Config("weekend_scale must be positive".to_string()));
        }
        if let Some(wh) = &self.patterns.working_hours {
            if wh.start >= wh.end || wh.end > 24 {
                return Err(ContribError::Config(format!(
                    "working hours {}..{} are not a valid window",
                    wh.start, wh.end
                )));
            }
        }

        if self.generation.content_kinds.is_empty() {
            return Err(ContribError::Config(
                "at least one content kind must be enabled".to_string(),
            ));
        }
        if let Some(markov) = &self.generation.markov {
            if !(0.0..=1.0).contains(&markov.chance) {
                return Err(ContribError::Config(
                    "markov chance must be within [0, 1]".to_string(),
                ));
            }
        }
        if let Some(mcp) = &self.generation.mcp {
            if mcp.endpoint.is_empty() {
                return Err(ContribError::Config("mcp endpoint must not be empty".to_string()));
            }
            if !(0.0..=1.0).contains(&mcp.chance) {
                return Err(ContribError::Config(
                    "mcp chance must be within [0, 1]".to_string(),
                ));
            }
        }

        if let Some(split) = &self.split_commits {
            if split.max_lines_per_commit == 0 {
                return Err(ContribError::Config(
                    "max_lines_per_commit must be at least 1".to_string(),
                ));
            }
        }

        if self.parallel.enabled && self.parallel.workers == 0 {
            return Err(ContribError::Config(
                "parallel workers must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn trace_loaded(&self) {
        info!(
            repositories = self.repositories.len(),
            workdir = %self.workdir.display(),
            parallel = self.parallel.enabled,
            "Loaded settings"
        );
        debug!(?self, "Settings loaded (full debug)");
    }
}
