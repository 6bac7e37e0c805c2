//! Candidate discovery: intent buckets, keyword globs and scope globs over a
//! single project walk.

use crate::config::SearchConfig;
use crate::error::ScoutError;
use crate::intent::{IntentBucketProvider, IntentCategory};
use crate::language::Language;
use crate::walker::WalkEntry;
use globset::{Glob, GlobBuilder, GlobSetBuilder};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;

/// Which discovery phase first produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    Intent,
    Keyword,
    Scope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileCandidate {
    /// Root-relative, `/`-separated
    pub path: String,
    pub size: u64,
    pub language: Language,
    pub source: DiscoverySource,
}

#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Deduplicated candidates in discovery order, capped
    pub candidates: Vec<FileCandidate>,
    /// Distinct candidates found before the cap
    pub total: usize,
}

/// Everything one discovery run needs
pub struct DiscoveryInput<'a> {
    pub root: &'a Path,
    pub entries: &'a [WalkEntry],
    pub intents: &'a [IntentCategory],
    pub keywords: &'a [String],
    pub scope: Option<&'a [String]>,
    pub provider: &'a dyn IntentBucketProvider,
}

/// Run the three phases concurrently and merge them in phase order.
pub fn discover(input: &DiscoveryInput<'_>, config: &SearchConfig) -> crate::Result<Discovery> {
    let (intent_paths, keyword_paths, scope_paths) = std::thread::scope(|s| {
        let intent = s.spawn(|| intent_phase(input));
        let keyword = s.spawn(|| keyword_phase(input.entries, input.keywords, config));
        let scope = s.spawn(|| match input.scope {
            Some(patterns) if !patterns.is_empty() => {
                scope_phase(input.entries, patterns, config.scope_glob_cap)
            }
            _ => Ok(Vec::new()),
        });

        let panicked = |phase: &str| ScoutError::ThreadPool(format!("{phase} discovery panicked"));
        Ok::<_, ScoutError>((
            intent.join().map_err(|_| panicked("intent"))?,
            keyword.join().map_err(|_| panicked("keyword"))??,
            scope.join().map_err(|_| panicked("scope"))??,
        ))
    })?;

    debug!(
        "discovery phases: {} intent, {} keyword, {} scope",
        intent_paths.len(),
        keyword_paths.len(),
        scope_paths.len()
    );

    let by_path: HashMap<&str, &WalkEntry> = input
        .entries
        .iter()
        .filter(|e| e.is_file())
        .map(|e| (e.path.as_str(), e))
        .collect();

    let phases = [
        (DiscoverySource::Intent, intent_paths),
        (DiscoverySource::Keyword, keyword_paths),
        (DiscoverySource::Scope, scope_paths),
    ];

    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();
    for (source, paths) in phases {
        for path in paths {
            let path = normalize_candidate(&path);
            if seen.contains(&path) {
                continue;
            }
            let Some(entry) = by_path.get(path.as_str()) else {
                debug!("Skipping {path}: not part of the walked tree");
                continue;
            };
            if entry.size > config.max_file_bytes {
                debug!("Skipping {path}: {} bytes exceeds the size limit", entry.size);
                continue;
            }
            seen.insert(path.clone());
            candidates.push(FileCandidate {
                path,
                size: entry.size,
                language: entry.language,
                source,
            });
        }
    }

    let total = candidates.len();
    candidates.truncate(config.candidate_cap);
    Ok(Discovery { candidates, total })
}

/// Root-relative `/` form of a path supplied by a bucket provider or glob
fn normalize_candidate(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.trim_start_matches("./").to_string()
}

fn intent_phase(input: &DiscoveryInput<'_>) -> Vec<String> {
    if input.intents.is_empty() {
        return Vec::new();
    }
    input
        .provider
        .buckets(input.root, input.entries)
        .files_for(input.intents)
}

/// `**/*{keyword}*` for the leading keywords, matched case-insensitively
/// against file names.
fn keyword_phase(
    entries: &[WalkEntry],
    keywords: &[String],
    config: &SearchConfig,
) -> crate::Result<Vec<String>> {
    let mut found: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for keyword in keywords.iter().take(config.keyword_limit) {
        let matcher = GlobBuilder::new(&format!("**/*{}*", globset_escape(keyword)))
            .case_insensitive(true)
            .literal_separator(true)
            .build()
            .map_err(|e| ScoutError::GlobPattern(e.to_string()))?
            .compile_matcher();

        for entry in entries.iter().filter(|e| e.is_file()) {
            if found.len() >= config.keyword_glob_cap {
                return Ok(found);
            }
            if matcher.is_match(&entry.path) && seen.insert(entry.path.as_str()) {
                found.push(entry.path.clone());
            }
        }
    }
    Ok(found)
}

fn globset_escape(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '*' | '?' | '[' | ']' | '{' | '}' | '\\' => format!("[{c}]"),
            _ => c.to_string(),
        })
        .collect()
}

fn scope_phase(
    entries: &[WalkEntry],
    patterns: &[String],
    cap: usize,
) -> crate::Result<Vec<String>> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.trim_start_matches("./");
        builder.add(Glob::new(pattern).map_err(|e| ScoutError::GlobPattern(e.to_string()))?);
    }
    let set = builder
        .build()
        .map_err(|e| ScoutError::GlobPattern(e.to_string()))?;

    Ok(entries
        .iter()
        .filter(|e| e.is_file() && set.is_match(&e.path))
        .take(cap)
        .map(|e| e.path.clone())
        .collect())
}
