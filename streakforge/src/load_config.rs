/// `load_config` module: loads and adapts a static YAML config into the
/// core's validated [`Settings`].
///
/// This module is the only place where untrusted YAML is parsed and mapped to
/// rich, strongly-typed internal structs.
///
/// # Responsibilities
/// - Parse user-supplied YAML configuration files into type-safe Rust structs
/// - Map loosely-typed YAML keys (e.g., string distribution names) to enums
/// - Apply documented defaults for every omitted section
/// - Validate eagerly: any bounds error is surfaced here, before a single
///   repository is processed
///
/// # Errors
/// All errors in this module use `anyhow::Error` for context-rich
/// diagnostics, surfaced at the CLI boundary.
///
/// Secrets never live in the file: the git credential and the AI service key
/// are read from the environment by the CLI.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use tracing::{error, info, warn};

use streakforge_core::config::{
    Cadence, CommitIdentity, GenerationConfig, IntervalDistribution, MarkovSettings, McpSettings,
    ParallelConfig, PatternConfig, PushPolicy, RepoConfig, Settings, SplitCommitPolicy,
    WorkingHours,
};
use streakforge_core::generate::ContentKind;
use streakforge_core::notify::Level;

/// What the CLI needs beyond the core settings.
#[derive(Debug)]
pub struct LoadedConfig {
    pub settings: Settings,
    pub notifications: NotificationSettings,
}

#[derive(Debug, Clone, Copy)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub min_level: Level,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RepoEntry {
    Slug(String),
    Detailed {
        name: String,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        branch: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    repositories: Vec<RepoEntry>,
    #[serde(default = "default_workdir")]
    workdir: PathBuf,
    #[serde(default = "default_branch")]
    branch: String,
    #[serde(default = "default_min_commits")]
    min_commits: u32,
    #[serde(default = "default_max_commits")]
    max_commits: u32,
    #[serde(default = "default_min_interval")]
    min_interval: f64,
    #[serde(default = "default_max_interval")]
    max_interval: f64,
    #[serde(default)]
    split_commits: Option<RawSplitCommits>,
    #[serde(default)]
    intelligent_patterns: Option<RawPatterns>,
    #[serde(default)]
    generation: Option<RawGeneration>,
    #[serde(default)]
    push: Option<RawPush>,
    #[serde(default)]
    parallel: Option<RawParallel>,
    #[serde(default)]
    analytics: Option<RawAnalytics>,
    #[serde(default)]
    notifications: Option<RawNotifications>,
    #[serde(default)]
    committer: Option<RawCommitter>,
}

fn default_workdir() -> PathBuf {
    PathBuf::from("./repos")
}
fn default_branch() -> String {
    "main".to_string()
}
fn default_min_commits() -> u32 {
    1
}
fn default_max_commits() -> u32 {
    3
}
fn default_min_interval() -> f64 {
    12.0
}
fn default_max_interval() -> f64 {
    24.0
}

#[derive(Debug, Deserialize)]
struct RawSplitCommits {
    #[serde(default)]
    enabled: bool,
    max_lines_per_commit: usize,
    message_prefix: String,
}

#[derive(Debug, Deserialize)]
struct RawPatterns {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    time_distribution: Option<String>,
    #[serde(default)]
    working_hours: Option<RawWindow>,
    #[serde(default)]
    weekend_scale: Option<f64>,
    #[serde(default)]
    content_types: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawWindow {
    start: u32,
    end: u32,
}

#[derive(Debug, Deserialize)]
struct RawGeneration {
    #[serde(default)]
    markov: Option<RawMarkov>,
    #[serde(default)]
    mcp: Option<RawMcp>,
}

#[derive(Debug, Deserialize)]
struct RawMarkov {
    corpus_path: PathBuf,
    #[serde(default = "default_markov_chance")]
    chance: f64,
}

fn default_markov_chance() -> f64 {
    0.3
}

#[derive(Debug, Deserialize)]
struct RawMcp {
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    max_retries: Option<u32>,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default)]
    chance: Option<f64>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct RawPush {
    #[serde(default)]
    pull_retries: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawParallel {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    workers: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawAnalytics {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RawNotifications {
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default)]
    min_level: Option<Level>,
}

#[derive(Debug, Deserialize)]
struct RawCommitter {
    name: String,
    email: String,
}

/// Load a static YAML config file and adapt it into validated [`Settings`].
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<LoadedConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let loaded = adapt(raw)?;
    loaded.settings.validate()?;
    loaded.settings.trace_loaded();
    Ok(loaded)
}

fn adapt(raw: RawConfig) -> Result<LoadedConfig> {
    let default_branch = raw.branch;
    let repositories = raw
        .repositories
        .into_iter()
        .map(|entry| match entry {
            RepoEntry::Slug(slug) => RepoConfig {
                slug,
                url: None,
                branch: default_branch.clone(),
            },
            RepoEntry::Detailed { name, url, branch } => RepoConfig {
                slug: name,
                url,
                branch: branch.unwrap_or_else(|| default_branch.clone()),
            },
        })
        .collect();

    let cadence = Cadence {
        min_commits: raw.min_commits,
        max_commits: raw.max_commits,
        min_interval_hours: raw.min_interval,
        max_interval_hours: raw.max_interval,
    };

    let (patterns, content_kinds) = adapt_patterns(raw.intelligent_patterns);

    let generation = match raw.generation {
        Some(generation) => GenerationConfig {
            content_kinds,
            markov: generation.markov.map(|markov| MarkovSettings {
                corpus_path: markov.corpus_path,
                chance: markov.chance,
            }),
            mcp: generation.mcp.and_then(|mcp| {
                if !mcp.enabled {
                    return None;
                }
                let defaults = McpSettings::default();
                Some(McpSettings {
                    endpoint: mcp.endpoint.unwrap_or(defaults.endpoint),
                    max_retries: mcp.max_retries.unwrap_or(defaults.max_retries),
                    timeout_secs: mcp.timeout_secs.unwrap_or(defaults.timeout_secs),
                    chance: mcp.chance.unwrap_or(defaults.chance),
                })
            }),
        },
        None => GenerationConfig {
            content_kinds,
            ..GenerationConfig::default()
        },
    };

    let split_commits = raw.split_commits.and_then(|split| {
        if split.enabled {
            Some(SplitCommitPolicy {
                max_lines_per_commit: split.max_lines_per_commit,
                message_prefix: split.message_prefix,
            })
        } else {
            None
        }
    });

    let push = match raw.push {
        Some(push) => PushPolicy {
            pull_retries: push.pull_retries.unwrap_or_else(|| PushPolicy::default().pull_retries),
        },
        None => PushPolicy::default(),
    };

    let parallel = match raw.parallel {
        Some(parallel) => ParallelConfig {
            enabled: parallel.enabled,
            workers: parallel.workers.unwrap_or_else(|| ParallelConfig::default().workers),
        },
        None => ParallelConfig::default(),
    };

    let analytics_path = raw
        .analytics
        .map(|analytics| analytics.path)
        .unwrap_or_else(|| PathBuf::from("./contributions.jsonl"));

    let identity = match raw.committer {
        Some(committer) => CommitIdentity {
            name: committer.name,
            email: committer.email,
        },
        None => CommitIdentity::default(),
    };

    let notifications = match raw.notifications {
        Some(notifications) => NotificationSettings {
            enabled: notifications.enabled,
            min_level: notifications.min_level.unwrap_or(Level::Info),
        },
        None => NotificationSettings {
            enabled: true,
            min_level: Level::Info,
        },
    };

    Ok(LoadedConfig {
        settings: Settings {
            repositories,
            workdir: raw.workdir,
            cadence,
            patterns,
            generation,
            split_commits,
            push,
            parallel,
            analytics_path,
            identity,
        },
        notifications,
    })
}

fn adapt_patterns(raw: Option<RawPatterns>) -> (PatternConfig, Vec<ContentKind>) {
    let default_kinds = GenerationConfig::default().content_kinds;
    let Some(raw) = raw else {
        return (PatternConfig::default(), default_kinds);
    };

    let content_kinds = match raw.content_types.as_deref() {
        Some(names) if !names.is_empty() => {
            let mut kinds = Vec::new();
            for name in names {
                match name.as_str() {
                    "code" => kinds.push(ContentKind::Code),
                    "docs" | "documentation" => kinds.push(ContentKind::Docs),
                    "data" | "config" => kinds.push(ContentKind::Data),
                    other => {
                        warn!(kind = other, "Unknown content type, ignoring");
                    }
                }
            }
            if kinds.is_empty() {
                default_kinds
            } else {
                kinds
            }
        }
        _ => default_kinds,
    };

    if !raw.enabled {
        return (PatternConfig::default(), content_kinds);
    }

    let distribution = match raw.time_distribution.as_deref() {
        Some("poisson") => IntervalDistribution::Poisson,
        Some("uniform") | None => IntervalDistribution::Uniform,
        Some(other) => {
            warn!(
                distribution = other,
                "Unknown time distribution, defaulting to uniform"
            );
            IntervalDistribution::Uniform
        }
    };

    let patterns = PatternConfig {
        distribution,
        working_hours: raw.working_hours.map(|window| WorkingHours {
            start: window.start,
            end: window.end,
        }),
        weekend_scale: raw.weekend_scale.unwrap_or(1.0),
    };
    (patterns, content_kinds)
}
