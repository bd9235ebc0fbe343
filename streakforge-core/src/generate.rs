//! Content model and the fallback chain over content strategies.
//!
//! A strategy implements [`crate::contract::ContentGenerator`]; the
//! [`GeneratorStack`] owns an ordered list of strategies (AI service first,
//! then Markov, then templates) and absorbs every failure by moving down the
//! list. Entry into the list is probabilistic and configuration-driven, so a
//! run can be, say, 30% Markov-flavoured without the AI tier ever failing.
//!
//! The stack's contract: [`GeneratorStack::produce`] never errors and never
//! returns empty content.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analyze::RepoProfile;
use crate::contract::ContentGenerator;
use crate::error::Result;

/// What family of file a strategy should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Code,
    Docs,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    Rust,
}

impl Language {
    pub fn extension(&self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::JavaScript => "js",
            Language::Rust => "rs",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// One request for one piece of committable content. Created per file,
/// consumed immediately, discarded.
#[derive(Debug, Clone)]
pub struct ContentRequest {
    pub repo_slug: String,
    pub kind: ContentKind,
    pub language: Language,
    pub complexity: Complexity,
    /// Inferred attributes of the target working copy, used to bias content
    /// relevance. Absent when analysis failed or was skipped.
    pub profile: Option<RepoProfile>,
    pub timestamp: DateTime<Utc>,
}

impl ContentRequest {
    pub fn extension(&self) -> &'static str {
        match self.kind {
            ContentKind::Code => self.language.extension(),
            ContentKind::Docs => "md",
            ContentKind::Data => "json",
        }
    }
}

/// What a strategy hands back: body, extension and a commit message.
#[derive(Debug, Clone)]
pub struct GeneratedContent {
    pub body: String,
    pub extension: &'static str,
    pub message: String,
}

/// A generated file ready for the commit step.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub content: String,
    pub message: String,
}

impl Artifact {
    /// Timestamped, collision-free file name in the working copy root.
    pub fn from_content(content: GeneratedContent, timestamp: DateTime<Utc>) -> Self {
        let short_id = uuid::Uuid::new_v4().simple().to_string();
        let file_name = format!(
            "contribution_{}_{}.{}",
            timestamp.format("%Y%m%d_%H%M%S"),
            &short_id[..8],
            content.extension
        );
        Artifact {
            file_name,
            content: content.body,
            message: content.message,
        }
    }
}

const COMMIT_MESSAGES: &[&str] = &[
    "Maintain contribution streak",
    "Daily code update",
    "Automated contribution",
    "Keeping the streak alive",
    "Consistency is key",
    "Update documentation",
    "Add example code",
    "Refresh project data",
];

/// Final fallback tier: templated content that always succeeds.
#[derive(Debug, Default)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    fn render(&self, request: &ContentRequest) -> GeneratedContent {
        let mut rng = rand::thread_rng();
        let stamp = request.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
        let seed: u32 = rng.gen_range(4..=999);
        let message = COMMIT_MESSAGES[rng.gen_range(0..COMMIT_MESSAGES.len())].to_string();

        let body = match request.kind {
            ContentKind::Code => code_template(request.language, &stamp, seed, request.complexity),
            ContentKind::Docs => docs_template(&request.repo_slug, &stamp, seed, request.complexity),
            ContentKind::Data => data_template(&request.repo_slug, &stamp, seed),
        };

        GeneratedContent {
            body,
            extension: request.extension(),
            message,
        }
    }
}

#[async_trait]
impl ContentGenerator for TemplateGenerator {
    fn name(&self) -> &'static str {
        "template"
    }

    async fn generate(&self, request: &ContentRequest) -> Result<GeneratedContent> {
        Ok(self.render(request))
    }
}

fn code_template(language: Language, stamp: &str, seed: u32, complexity: Complexity) -> String {
    let mut body = match language {
        Language::Python => format!(
            "# Generated update\n# Timestamp: {stamp}\n\n\
             def process_data(items):\n    \"\"\"Process the given data items.\"\"\"\n    \
             return [item * 2 for item in items]\n\n\n\
             data = [1, 2, 3, {seed}]\nprint(f\"Result: {{process_data(data)}}\")\n"
        ),
        Language::JavaScript => format!(
            "// Generated update\n// Timestamp: {stamp}\n\n\
             function processData(items) {{\n  return items.map((item) => item * 2);\n}}\n\n\
             const data = [1, 2, 3, {seed}];\nconsole.log(`Result: ${{processData(data)}}`);\n"
        ),
        Language::Rust => format!(
            "// Generated update\n// Timestamp: {stamp}\n\n\
             fn process_data(items: &[u32]) -> Vec<u32> {{\n    \
             items.iter().map(|item| item * 2).collect()\n}}\n\n\
             fn main() {{\n    let data = [1, 2, 3, {seed}];\n    \
             println!(\"{{:?}}\", process_data(&data));\n}}\n"
        ),
    };
    if complexity != Complexity::Low {
        let extra = match language {
            Language::Python => format!(
                "\n\ndef checksum(items):\n    return sum(items) % {seed}\n"
            ),
            Language::JavaScript => format!(
                "\n\nfunction checksum(items) {{\n  \
                 return items.reduce((a, b) => a + b, 0) % {seed};\n}}\n"
            ),
            Language::Rust => format!(
                "\n\nfn checksum(items: &[u32]) -> u32 {{\n    \
                 items.iter().sum::<u32>() % {seed}\n}}\n"
            ),
        };
        body.push_str(&extra);
    }
    body
}

fn docs_template(slug: &str, stamp: &str, seed: u32, complexity: Complexity) -> String {
    let mut body = format!(
        "# Project Update\n\n## Latest Changes - {stamp}\n\n\
         - Added new functionality for data processing\n\
         - Fixed issue #{seed}\n\
         - Updated documentation for {slug}\n"
    );
    if complexity != Complexity::Low {
        body.push_str(
            "\n## Next Steps\n\n\
             - [ ] Implement advanced features\n\
             - [ ] Add more test coverage\n\
             - [ ] Review performance metrics\n",
        );
    }
    body
}

fn data_template(slug: &str, stamp: &str, seed: u32) -> String {
    format!(
        "{{\n  \"repository\": \"{slug}\",\n  \"generated_at\": \"{stamp}\",\n  \
         \"revision\": {seed},\n  \"status\": \"active\"\n}}\n"
    )
}

/// One rung of the fallback chain.
pub struct Tier {
    pub generator: Arc<dyn ContentGenerator>,
    /// Probability of entering the chain at this tier, evaluated top-down.
    /// The last tier is the unconditional floor.
    pub entry_chance: f64,
}

/// Result of a stack invocation.
#[derive(Debug, Clone)]
pub struct GeneratedPick {
    pub content: GeneratedContent,
    /// Strategy that produced the content.
    pub tier: &'static str,
    /// Highest-priority strategy that was attempted and failed before the
    /// content was produced, if any.
    pub fell_back_from: Option<&'static str>,
}

/// Ordered fallback chain over content strategies.
///
/// Entry is drawn probabilistically from the configured per-tier chances;
/// from the entry point downwards each failing tier yields to the next. The
/// final templated tier cannot fail, and even a misconfigured stack is backed
/// by a built-in plain-text floor, so `produce` upholds the never-empty,
/// never-erroring contract unconditionally.
pub struct GeneratorStack {
    tiers: Vec<Tier>,
}

impl GeneratorStack {
    pub fn new(tiers: Vec<Tier>) -> Self {
        GeneratorStack { tiers }
    }

    /// Conventional assembly: optional AI tier, optional Markov tier,
    /// unconditional template floor.
    pub fn with_floor(mut tiers: Vec<Tier>) -> Self {
        tiers.push(Tier {
            generator: Arc::new(TemplateGenerator),
            entry_chance: 1.0,
        });
        GeneratorStack { tiers }
    }

    fn pick_entry(&self, rng: &mut impl Rng) -> usize {
        let last = self.tiers.len().saturating_sub(1);
        for (index, tier) in self.tiers.iter().enumerate() {
            if index == last {
                break;
            }
            if rng.gen_bool(tier.entry_chance.clamp(0.0, 1.0)) {
                return index;
            }
        }
        last
    }

    pub async fn produce(&self, request: &ContentRequest) -> GeneratedPick {
        let start = {
            let mut rng = rand::thread_rng();
            self.pick_entry(&mut rng)
        };

        let mut fell_back_from: Option<&'static str> = None;
        for tier in &self.tiers[start..] {
            let name = tier.generator.name();
            match tier.generator.generate(request).await {
                Ok(content) if !content.body.trim().is_empty() => {
                    debug!(tier = name, "Content strategy produced output");
                    return GeneratedPick {
                        content,
                        tier: name,
                        fell_back_from,
                    };
                }
                Ok(_) => {
                    warn!(tier = name, "Content strategy returned empty output, falling back");
                    fell_back_from.get_or_insert(name);
                }
                Err(e) => {
                    warn!(tier = name, error = %e, "Content strategy failed, falling back");
                    fell_back_from.get_or_insert(name);
                }
            }
        }

        // Unreachable with a template floor in place, but the contract holds
        // even without one.
        GeneratedPick {
            content: GeneratedContent {
                body: format!("Contribution at {}\n", request.timestamp.to_rfc3339()),
                extension: "txt",
                message: "Automated contribution".to_string(),
            },
            tier: "builtin",
            fell_back_from,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockContentGenerator;
    use crate::error::ContribError;

    fn request(kind: ContentKind) -> ContentRequest {
        ContentRequest {
            repo_slug: "acme/widgets".to_string(),
            kind,
            language: Language::Python,
            complexity: Complexity::Medium,
            profile: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn template_generator_never_returns_empty_content() {
        let generator = TemplateGenerator;
        for kind in [ContentKind::Code, ContentKind::Docs, ContentKind::Data] {
            let content = generator
                .generate(&request(kind))
                .await
                .expect("template tier cannot fail");
            assert!(!content.body.trim().is_empty());
            assert!(!content.message.is_empty());
        }
    }

    #[tokio::test]
    async fn extension_follows_requested_kind() {
        let generator = TemplateGenerator;
        let code = generator.generate(&request(ContentKind::Code)).await.unwrap();
        assert_eq!(code.extension, "py");
        let docs = generator.generate(&request(ContentKind::Docs)).await.unwrap();
        assert_eq!(docs.extension, "md");
        let data = generator.generate(&request(ContentKind::Data)).await.unwrap();
        assert_eq!(data.extension, "json");
    }

    #[tokio::test]
    async fn failing_tier_falls_through_to_the_floor() {
        let mut failing = MockContentGenerator::new();
        failing.expect_name().return_const("mcp");
        failing.expect_generate().returning(|_| {
            Err(ContribError::Api {
                operation: "generate".into(),
                status: 500,
                detail: "boom".into(),
            })
        });

        let stack = GeneratorStack::with_floor(vec![Tier {
            generator: Arc::new(failing),
            entry_chance: 1.0,
        }]);

        let pick = stack.produce(&request(ContentKind::Docs)).await;
        assert_eq!(pick.tier, "template");
        assert_eq!(pick.fell_back_from, Some("mcp"));
        assert!(!pick.content.body.is_empty());
    }

    #[tokio::test]
    async fn empty_output_counts_as_failure() {
        let mut hollow = MockContentGenerator::new();
        hollow.expect_name().return_const("markov");
        hollow.expect_generate().returning(|_| {
            Ok(GeneratedContent {
                body: "   ".to_string(),
                extension: "md",
                message: "m".to_string(),
            })
        });

        let stack = GeneratorStack::with_floor(vec![Tier {
            generator: Arc::new(hollow),
            entry_chance: 1.0,
        }]);

        let pick = stack.produce(&request(ContentKind::Docs)).await;
        assert_eq!(pick.tier, "template");
        assert_eq!(pick.fell_back_from, Some("markov"));
    }

    #[tokio::test]
    async fn zero_entry_chance_skips_a_tier_without_calling_it() {
        let mut untouched = MockContentGenerator::new();
        untouched.expect_name().return_const("mcp");
        untouched.expect_generate().times(0);

        let stack = GeneratorStack::with_floor(vec![Tier {
            generator: Arc::new(untouched),
            entry_chance: 0.0,
        }]);

        let pick = stack.produce(&request(ContentKind::Code)).await;
        assert_eq!(pick.tier, "template");
        assert_eq!(pick.fell_back_from, None);
    }

    #[test]
    fn artifact_names_carry_extension_and_stay_unique() {
        let content = GeneratedContent {
            body: "x".to_string(),
            extension: "md",
            message: "m".to_string(),
        };
        let now = Utc::now();
        let a = Artifact::from_content(content.clone(), now);
        let b = Artifact::from_content(content, now);
        assert!(a.file_name.ends_with(".md"));
        assert_ne!(a.file_name, b.file_name, "same-second artifacts must not collide");
    }
}
