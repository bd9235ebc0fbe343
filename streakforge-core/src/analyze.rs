//! Lightweight working-copy analysis used to bias content generation.
//!
//! Failure here must never block generation: callers treat any error as
//! "no profile" and proceed.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::generate::Language;

/// Inferred attributes of a repository's working copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoProfile {
    pub dominant_language: Option<Language>,
    pub naming_style: Option<NamingStyle>,
    pub tracked_files: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingStyle {
    Snake,
    Camel,
    Kebab,
}

/// Walk the working copy and infer dominant language and file-naming style.
pub fn profile_workspace(root: &Path) -> Result<RepoProfile> {
    let mut extension_counts: HashMap<&'static str, usize> = HashMap::new();
    let mut style_counts: HashMap<NamingStyle, usize> = HashMap::new();
    let mut tracked_files = 0usize;

    visit_dir(root, &mut |path| {
        tracked_files += 1;
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            let slot = match ext {
                "py" => Some("py"),
                "js" | "ts" | "jsx" | "tsx" => Some("js"),
                "rs" => Some("rs"),
                _ => None,
            };
            if let Some(slot) = slot {
                *extension_counts.entry(slot).or_insert(0) += 1;
            }
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if let Some(style) = classify_stem(stem) {
                *style_counts.entry(style).or_insert(0) += 1;
            }
        }
    })?;

    let dominant_language = extension_counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(ext, _)| match ext {
            "py" => Language::Python,
            "js" => Language::JavaScript,
            _ => Language::Rust,
        });

    let naming_style = style_counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(style, _)| style);

    let profile = RepoProfile {
        dominant_language,
        naming_style,
        tracked_files,
    };
    debug!(?profile, root = %root.display(), "Profiled working copy");
    Ok(profile)
}

fn visit_dir(dir: &Path, visit: &mut impl FnMut(&Path)) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            // Skip vcs metadata and build output, same as the flattening walk.
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name == ".git" || name == "target" || name == "node_modules" {
                continue;
            }
            visit_dir(&path, visit)?;
        } else if path.is_file() {
            visit(&path);
        }
    }
    Ok(())
}

fn classify_stem(stem: &str) -> Option<NamingStyle> {
    let snake = regex::Regex::new(r"^[a-z0-9]+(_[a-z0-9]+)+$").unwrap();
    let kebab = regex::Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)+$").unwrap();
    let camel = regex::Regex::new(r"^[a-z]+[A-Z][A-Za-z0-9]*$").unwrap();
    if snake.is_match(stem) {
        Some(NamingStyle::Snake)
    } else if kebab.is_match(stem) {
        Some(NamingStyle::Kebab)
    } else if camel.is_match(stem) {
        Some(NamingStyle::Camel)
    } else {
        None
    }
}
