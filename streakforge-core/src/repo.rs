//! Git working-copy management, driven through the git CLI.
//!
//! Each repository owns a deterministic directory under the configured
//! workdir. The workspace knows how to bootstrap itself (including from an
//! empty remote, where HEAD is unborn until the first commit), guard against
//! empty-diff commits, partition oversized artifacts into bounded commits,
//! and push with a bounded pull-and-retry on rejection.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::{CommitIdentity, PushPolicy, RepoConfig, SplitCommitPolicy};
use crate::error::{ContribError, Result};
use crate::generate::Artifact;

#[derive(Debug)]
pub struct GitWorkspace {
    slug: String,
    remote_url: String,
    branch: String,
    path: PathBuf,
    identity: CommitIdentity,
}

impl GitWorkspace {
    /// Resolve a configured target into a workspace rooted under `workdir`.
    ///
    /// Without an explicit URL the remote is derived from the slug and the
    /// bearer credential, the same `https://{token}@github.com/{slug}.git`
    /// form the hosted remote accepts.
    pub fn for_target(
        config: &RepoConfig,
        workdir: &Path,
        token: Option<&str>,
        identity: &CommitIdentity,
    ) -> Result<Self> {
        let remote_url = match &config.url {
            Some(url) => url.clone(),
            None => {
                let token = token.ok_or_else(|| {
                    ContribError::Config(format!(
                        "repository '{}' has no explicit url and no credential is available",
                        config.slug
                    ))
                })?;
                format!("https://{token}@github.com/{}.git", config.slug)
            }
        };
        let dir_name = config.slug.replace('/', "_").replace(':', "_");
        Ok(GitWorkspace {
            slug: config.slug.clone(),
            remote_url,
            branch: config.branch.clone(),
            path: workdir.join(dir_name),
            identity: identity.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    async fn git(&self, operation: &str, args: &[&str]) -> Result<String> {
        run_git(&self.slug, operation, Some(&self.path), args).await
    }

    /// Bring the working copy up to date: clone on first contact, otherwise
    /// fetch and fast-forward. Tolerates an empty remote by creating the
    /// configured branch locally so the first push establishes it.
    pub async fn ensure_ready(&self) -> Result<()> {
        if !self.path.join(".git").exists() {
            if self.path.exists() {
                // Stale non-repository leftovers; reclone from scratch.
                std::fs::remove_dir_all(&self.path)?;
            }
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let path_str = self.path.to_string_lossy().into_owned();
            run_git(
                &self.slug,
                "clone",
                None,
                &["clone", &self.remote_url, &path_str],
            )
            .await?;
            info!(repo = %self.slug, path = %self.path.display(), "Cloned repository");

            self.git("config", &["config", "user.name", &self.identity.name])
                .await?;
            self.git("config", &["config", "user.email", &self.identity.email])
                .await?;
            self.checkout_branch().await?;
        } else {
            self.git("fetch", &["fetch", "origin"]).await?;
            self.checkout_branch().await?;
            if self.remote_branch_exists().await? {
                self.git("pull", &["pull", "--ff-only", "origin", &self.branch])
                    .await?;
            }
            debug!(repo = %self.slug, "Working copy refreshed");
        }
        Ok(())
    }

    async fn checkout_branch(&self) -> Result<()> {
        if self
            .git("checkout", &["checkout", &self.branch])
            .await
            .is_err()
        {
            // Branch absent locally and on the remote (or the remote is
            // empty and HEAD is unborn): create it here.
            self.git("checkout", &["checkout", "-b", &self.branch])
                .await?;
        }
        Ok(())
    }

    async fn remote_branch_exists(&self) -> Result<bool> {
        let heads = self
            .git(
                "ls-remote",
                &["ls-remote", "--heads", "origin", &self.branch],
            )
            .await?;
        Ok(!heads.is_empty())
    }

    /// Whether the working tree differs from HEAD (or holds anything at all
    /// while HEAD is unborn).
    pub async fn changed(&self) -> Result<bool> {
        let status = self.git("status", &["status", "--porcelain"]).await?;
        Ok(!status.is_empty())
    }

    async fn commit_file(&self, file_name: &str, message: &str) -> Result<String> {
        self.git("add", &["add", file_name]).await?;
        self.git("commit", &["commit", "-m", message]).await?;
        self.git("rev-parse", &["rev-parse", "HEAD"]).await
    }

    /// Write the artifact and create one commit — or several, when the split
    /// policy applies. Returns the created commit hashes; an empty result
    /// means the tree did not change and the empty-diff guard suppressed the
    /// commit.
    pub async fn commit_artifact(
        &self,
        artifact: &Artifact,
        split: Option<&SplitCommitPolicy>,
    ) -> Result<Vec<String>> {
        let target = self.path.join(&artifact.file_name);
        let chunks = match split {
            Some(policy) if artifact.content.lines().count() > policy.max_lines_per_commit => {
                partition_lines(&artifact.content, policy.max_lines_per_commit)
            }
            _ => vec![artifact.content.clone()],
        };
        let total = chunks.len();

        let mut hashes = Vec::new();
        let mut accumulated = String::new();
        for (index, chunk) in chunks.iter().enumerate() {
            if total > 1 {
                // Grow the file chunk by chunk, newline-terminated so each
                // commit's diff is exactly one bounded block of added lines.
                accumulated.push_str(chunk);
                accumulated.push('\n');
            } else {
                accumulated = chunk.clone();
            }
            std::fs::write(&target, &accumulated)?;

            if !self.changed().await? {
                debug!(
                    repo = %self.slug,
                    file = %artifact.file_name,
                    "Working tree unchanged, suppressing commit"
                );
                continue;
            }

            let message = if total > 1 {
                let prefix = split
                    .map(|policy| policy.message_prefix.as_str())
                    .unwrap_or("Update");
                format!("{prefix} {}/{}", index + 1, total)
            } else {
                artifact.message.clone()
            };
            let hash = self.commit_file(&artifact.file_name, &message).await?;
            debug!(repo = %self.slug, commit = %hash, "Created commit");
            hashes.push(hash);
        }
        Ok(hashes)
    }

    /// Push the branch, integrating remote divergence with a bounded number
    /// of pull-and-retry rounds before giving up.
    pub async fn push(&self, policy: &PushPolicy) -> Result<()> {
        let mut attempt: u32 = 0;
        loop {
            match self.git("push", &["push", "origin", &self.branch]).await {
                Ok(_) => {
                    info!(repo = %self.slug, branch = %self.branch, "Pushed to remote");
                    return Ok(());
                }
                Err(err) if attempt < policy.pull_retries => {
                    attempt += 1;
                    warn!(
                        repo = %self.slug,
                        attempt,
                        pull_retries = policy.pull_retries,
                        error = %err,
                        "Push rejected, pulling and retrying"
                    );
                    self.git("pull", &["pull", "--rebase", "origin", &self.branch])
                        .await?;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Partition content into line-bounded chunks, preserving line order.
/// Pure and deterministic: identical input and threshold always produce
/// identical partitions.
pub fn partition_lines(content: &str, max_lines: usize) -> Vec<String> {
    let lines: Vec<&str> = content.lines().collect();
    lines
        .chunks(max_lines.max(1))
        .map(|chunk| chunk.join("\n"))
        .collect()
}

async fn run_git(repo: &str, operation: &str, cwd: Option<&Path>, args: &[&str]) -> Result<String> {
    let mut command = Command::new("git");
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }
    command.args(args);
    let output = command.output().await.map_err(|e| ContribError::Git {
        repo: repo.to_string(),
        operation: operation.to_string(),
        detail: format!("failed to launch git: {e}"),
    })?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        Err(ContribError::Git {
            repo: repo.to_string(),
            operation: operation.to_string(),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
