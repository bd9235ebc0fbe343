//! Client for the MCP content-generation API.
//!
//! Speaks the service's small JSON contract directly: a task payload goes
//! out, generated text comes back. Transport failures, timeouts and 5xx
//! responses are retried under the configured [`RetryPolicy`]; authentication
//! rejections are surfaced immediately so the fallback chain takes over
//! without burning the retry budget.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::McpSettings;
use crate::contract::ContentGenerator;
use crate::error::{ContribError, Result};
use crate::generate::{ContentRequest, GeneratedContent};
use crate::retry::RetryPolicy;

pub struct McpClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    retry: RetryPolicy,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct McpResponse {
    code: Option<String>,
    message: Option<String>,
}

impl McpClient {
    pub fn new(settings: &McpSettings, api_key: impl Into<String>) -> Result<Self> {
        let timeout_secs = settings.timeout_secs;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ContribError::Network {
                operation: "mcp client construction".to_string(),
                source: e,
            })?;
        info!(
            endpoint = %settings.endpoint,
            max_retries = settings.max_retries,
            timeout_secs,
            "Initialized MCP client"
        );
        Ok(McpClient {
            http,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            retry: RetryPolicy::with_max_attempts(settings.max_retries.max(1)),
            timeout_secs,
        })
    }

    /// Replace the retry policy, e.g. to tighten delays.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Construct from `MCP_API_KEY` in the environment.
    pub fn from_env(settings: &McpSettings) -> Result<Self> {
        let api_key = std::env::var("MCP_API_KEY").map_err(|_| {
            ContribError::Config("MCP_API_KEY not set; AI content tier unavailable".to_string())
        })?;
        McpClient::new(settings, api_key)
    }

    async fn request_content(&self, request: &ContentRequest) -> Result<GeneratedContent> {
        let url = format!("{}/generate/code", self.endpoint);
        let mut context = serde_json::json!({
            "purpose": "github-contribution",
            "complexity": request.complexity,
            "repository": request.repo_slug,
        });
        if let Some(profile) = &request.profile {
            context["dominant_language"] = serde_json::json!(profile.dominant_language);
            context["naming_style"] = serde_json::json!(profile.naming_style);
        }
        let payload = serde_json::json!({
            "task": "code_generation",
            "kind": request.kind,
            "language": request.language,
            "context": context,
        });

        debug!(url = %url, "Requesting generated content from MCP");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ContribError::from_reqwest("mcp generate", self.timeout_secs, e))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ContribError::Auth {
                operation: "mcp generate".to_string(),
                detail: format!("service rejected credential with HTTP {}", status.as_u16()),
            });
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ContribError::Api {
                operation: "mcp generate".to_string(),
                status: status.as_u16(),
                detail,
            });
        }

        let body: McpResponse = response
            .json()
            .await
            .map_err(|e| ContribError::from_reqwest("mcp response decode", self.timeout_secs, e))?;

        let code = body
            .code
            .filter(|code| !code.trim().is_empty())
            .ok_or_else(|| {
                ContribError::Generate("mcp returned an empty content field".to_string())
            })?;
        let message = body.message.filter(|m| !m.trim().is_empty()).unwrap_or_else(|| {
            format!(
                "Update {} at {}",
                request.repo_slug,
                request.timestamp.format("%Y-%m-%d %H:%M")
            )
        });

        Ok(GeneratedContent {
            body: code,
            extension: request.extension(),
            message,
        })
    }
}

#[async_trait]
impl ContentGenerator for McpClient {
    fn name(&self) -> &'static str {
        "mcp"
    }

    async fn generate(&self, request: &ContentRequest) -> Result<GeneratedContent> {
        self.retry
            .run("mcp generate", || self.request_content(request))
            .await
    }
}
