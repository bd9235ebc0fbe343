//! # contract: collaborator interfaces for the contribution pipeline
//!
//! This module defines the traits the orchestrator depends on, so every
//! external effect — content generation, notification delivery, analytics
//! persistence — can be swapped for a real client, a local implementation or
//! a deterministic mock in tests.
//!
//! ## Interface & Extensibility
//! - Implement [`ContentGenerator`] to add a content strategy; the fallback
//!   chain in [`crate::generate::GeneratorStack`] iterates strategies in
//!   priority order.
//! - Implement [`Notifier`] to route structured events somewhere other than
//!   the log-backed default.
//! - Implement [`ContributionStore`] for alternative analytics backends; the
//!   store must tolerate concurrent appends.
//!
//! ## Mocking & Testing
//! All traits are annotated for `mockall` so consumers can generate
//! deterministic mocks for unit and integration tests (exported behind the
//! `test-export-mocks` feature).

use async_trait::async_trait;

use mockall::automock;

use crate::analytics::ContributionRecord;
use crate::error::Result;
use crate::generate::{ContentRequest, GeneratedContent};
use crate::notify::Event;

/// A single content strategy: one tier of the fallback chain.
///
/// Implementations must return non-empty content on success; an empty body is
/// treated as a failure by the chain. Errors never reach the end caller —
/// the chain absorbs them and moves to the next tier.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Stable identifier used in logs and fallback events.
    fn name(&self) -> &'static str;

    /// Produce one piece of committable content for the request.
    async fn generate(&self, request: &ContentRequest) -> Result<GeneratedContent>;
}

/// Receives structured events on significant outcomes (run completed,
/// repository skipped, push failed, content fallback). The core emits;
/// delivery is the implementor's business.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: Event) -> Result<()>;
}

/// Append-only sink for contribution records. A record is appended only
/// after the underlying push succeeded. Implementations must tolerate
/// appends from concurrent workers.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContributionStore: Send + Sync {
    async fn append(&self, record: &ContributionRecord) -> Result<()>;
}
