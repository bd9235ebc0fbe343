//! Markov-chain text generator trained from a historical corpus.
//!
//! Order-1 word chain: each word maps to the words observed after it. Good
//! enough to produce plausible filler prose and commit messages without any
//! network dependency. A corpus with fewer than two words fails construction,
//! which removes the tier from the fallback chain rather than risking empty
//! output later.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use rand::Rng;
use tracing::info;

use crate::contract::ContentGenerator;
use crate::error::{ContribError, Result};
use crate::generate::{ContentKind, ContentRequest, GeneratedContent};

pub struct MarkovGenerator {
    chain: HashMap<String, Vec<String>>,
    starts: Vec<String>,
}

impl MarkovGenerator {
    pub fn train(corpus: &str) -> Result<Self> {
        let words: Vec<&str> = corpus.split_whitespace().collect();
        if words.len() < 2 {
            return Err(ContribError::Generate(
                "markov corpus holds fewer than two words".to_string(),
            ));
        }

        let mut chain: HashMap<String, Vec<String>> = HashMap::new();
        for pair in words.windows(2) {
            chain
                .entry(pair[0].to_string())
                .or_default()
                .push(pair[1].to_string());
        }
        let starts = words
            .iter()
            .filter(|w| w.chars().next().is_some_and(|c| c.is_uppercase()))
            .map(|w| w.to_string())
            .collect::<Vec<_>>();
        let starts = if starts.is_empty() {
            vec![words[0].to_string()]
        } else {
            starts
        };

        info!(
            states = chain.len(),
            starts = starts.len(),
            "Trained markov chain from corpus"
        );
        Ok(MarkovGenerator { chain, starts })
    }

    pub fn from_corpus_file(path: &Path) -> Result<Self> {
        let corpus = std::fs::read_to_string(path).map_err(|e| {
            ContribError::Config(format!(
                "markov corpus {} is unreadable: {e}",
                path.display()
            ))
        })?;
        MarkovGenerator::train(&corpus)
    }

    /// Walk the chain for up to `max_words` words.
    fn sample(&self, rng: &mut impl Rng, max_words: usize) -> String {
        let mut current = self.starts[rng.gen_range(0..self.starts.len())].clone();
        let mut words = vec![current.clone()];
        for _ in 1..max_words.max(1) {
            let Some(next_words) = self.chain.get(&current) else {
                break;
            };
            current = next_words[rng.gen_range(0..next_words.len())].clone();
            words.push(current.clone());
        }
        words.join(" ")
    }

    fn render(&self, request: &ContentRequest) -> GeneratedContent {
        let mut rng = rand::thread_rng();
        let message = self.sample(&mut rng, 7);
        let body = match request.kind {
            ContentKind::Docs => {
                let heading = self.sample(&mut rng, 5);
                let paragraphs: Vec<String> =
                    (0..3).map(|_| self.sample(&mut rng, 40)).collect();
                format!("# {heading}\n\n{}\n", paragraphs.join("\n\n"))
            }
            ContentKind::Code => {
                let commentary = self.sample(&mut rng, 25);
                let note = self.sample(&mut rng, 12);
                format!(
                    "{} {commentary}\n{} {note}\n",
                    comment_marker(request),
                    comment_marker(request)
                )
            }
            ContentKind::Data => {
                let note = self.sample(&mut rng, 15);
                format!(
                    "{{\n  \"note\": \"{}\",\n  \"generated_at\": \"{}\"\n}}\n",
                    note.replace('"', "'"),
                    request.timestamp.to_rfc3339()
                )
            }
        };
        GeneratedContent {
            body,
            extension: request.extension(),
            message,
        }
    }
}

fn comment_marker(request: &ContentRequest) -> &'static str {
    match request.kind {
        ContentKind::Code => match request.language {
            crate::generate::Language::Python => "#",
            crate::generate::Language::JavaScript | crate::generate::Language::Rust => "//",
        },
        _ => "#",
    }
}

#[async_trait]
impl ContentGenerator for MarkovGenerator {
    fn name(&self) -> &'static str {
        "markov"
    }

    async fn generate(&self, request: &ContentRequest) -> Result<GeneratedContent> {
        Ok(self.render(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{Complexity, Language};
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const CORPUS: &str = "The quick brown fox jumps over the lazy dog. \
                          The dog barks and the fox runs away. \
                          Every update keeps the project moving forward.";

    fn request(kind: ContentKind) -> ContentRequest {
        ContentRequest {
            repo_slug: "acme/widgets".to_string(),
            kind,
            language: Language::Python,
            complexity: Complexity::Low,
            profile: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn training_rejects_a_degenerate_corpus() {
        assert!(MarkovGenerator::train("").is_err());
        assert!(MarkovGenerator::train("single").is_err());
        assert!(MarkovGenerator::train("two words").is_ok());
    }

    #[test]
    fn samples_are_non_empty_and_bounded() {
        let markov = MarkovGenerator::train(CORPUS).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let text = markov.sample(&mut rng, 10);
            assert!(!text.is_empty());
            assert!(text.split_whitespace().count() <= 10);
        }
    }

    #[test]
    fn sampling_is_deterministic_for_a_seeded_rng() {
        let markov = MarkovGenerator::train(CORPUS).unwrap();
        let a = markov.sample(&mut StdRng::seed_from_u64(42), 20);
        let b = markov.sample(&mut StdRng::seed_from_u64(42), 20);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn generated_content_is_never_empty() {
        let markov = MarkovGenerator::train(CORPUS).unwrap();
        for kind in [ContentKind::Code, ContentKind::Docs, ContentKind::Data] {
            let content = markov.generate(&request(kind)).await.unwrap();
            assert!(!content.body.trim().is_empty());
            assert!(!content.message.is_empty());
        }
    }
}
