use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::contract::ContributionStore;
use crate::error::Result;

/// Append-only record of one successful contribution. Only ever created
/// after the push was confirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionRecord {
    pub repository: String,
    pub timestamp: DateTime<Utc>,
    pub files: Vec<String>,
    pub commit_hashes: Vec<String>,
}

impl ContributionRecord {
    pub fn commit_count(&self) -> usize {
        self.commit_hashes.len()
    }
}

/// JSON-lines store: one serialized record per line. Appends are serialized
/// behind a mutex so concurrent workers cannot interleave partial lines.
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonlStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(JsonlStore {
            path,
            guard: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl ContributionStore for JsonlStore {
    async fn append(&self, record: &ContributionRecord) -> Result<()> {
        let line = serde_json::to_string(record)
            .map_err(|e| crate::error::ContribError::Generate(format!(
                "failed to serialize contribution record: {e}"
            )))?;
        let _serialized = self.guard.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        debug!(path = %self.path.display(), repository = %record.repository, "Appended contribution record");
        Ok(())
    }
}
