use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::contract::Notifier;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Info => write!(f, "info"),
            Level::Warning => write!(f, "warning"),
            Level::Error => write!(f, "error"),
        }
    }
}

/// A structured notification emitted by the pipeline on significant outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub level: Level,
    pub title: String,
    pub message: String,
}

impl Event {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Event {
            level: Level::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Event {
            level: Level::Warning,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Event {
            level: Level::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Log-backed notifier: renders events as tracing records. Events below
/// `min_level` are dropped; a silent notifier drops everything.
#[derive(Debug)]
pub struct LogNotifier {
    min_level: Level,
    enabled: bool,
}

impl LogNotifier {
    pub fn new(min_level: Level) -> Self {
        LogNotifier {
            min_level,
            enabled: true,
        }
    }

    pub fn silent() -> Self {
        LogNotifier {
            min_level: Level::Error,
            enabled: false,
        }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        LogNotifier::new(Level::Info)
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: Event) -> Result<()> {
        if !self.enabled || event.level < self.min_level {
            return Ok(());
        }
        match event.level {
            Level::Info => info!(title = %event.title, "{}", event.message),
            Level::Warning => warn!(title = %event.title, "{}", event.message),
            Level::Error => error!(title = %event.title, "{}", event.message),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_by_severity() {
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
    }

    #[tokio::test]
    async fn log_notifier_accepts_all_levels() {
        let notifier = LogNotifier::default();
        for event in [
            Event::info("run", "completed"),
            Event::warning("repo", "skipped"),
            Event::error("push", "rejected"),
        ] {
            notifier.notify(event).await.expect("logging cannot fail");
        }
    }
}
