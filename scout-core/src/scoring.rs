//! Relevance scoring for discovered candidates.
//!
//! Scores are kept in integer tenths until the very end so equal inputs
//! always produce bit-identical relevances.

use crate::keywords::query_words;
use crate::structure::records::{FileStructure, StructuralAnalysis};
use regex::Regex;
use std::sync::LazyLock;

const KEYWORD_TENTHS: u32 = 2;
const WORD_TENTHS: u32 = 1;
const INFRA_TENTHS: u32 = 2;
const INFRA_CAP_TENTHS: u32 = 6;
const IMPORT_TENTHS: u32 = 1;
const MAX_TENTHS: u32 = 10;

static IMPORT_QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"import|dependenc|require|package|module").unwrap());

/// Scores file contents against one query.
pub struct RelevanceScorer {
    query_lower: String,
    keywords: Vec<String>,
    words: Vec<String>,
    wants_imports: bool,
}

impl RelevanceScorer {
    pub fn new(query: &str, keywords: &[String]) -> Self {
        let query_lower = query.to_lowercase();
        Self {
            wants_imports: IMPORT_QUERY.is_match(&query_lower),
            words: query_words(query),
            keywords: keywords.to_vec(),
            query_lower,
        }
    }

    /// Text overlap between the query and `path` + `content`
    pub fn base_tenths(&self, path: &str, content: &str) -> u32 {
        let haystack = format!("{}\n{}", path.to_lowercase(), content.to_lowercase());

        let keyword_hits = self
            .keywords
            .iter()
            .filter(|k| haystack.contains(k.as_str()))
            .count() as u32;
        let word_hits = self
            .words
            .iter()
            .filter(|w| haystack.contains(w.as_str()))
            .count() as u32;

        (keyword_hits * KEYWORD_TENTHS + word_hits * WORD_TENTHS).min(MAX_TENTHS)
    }

    /// Infrastructure and import signals from a file's structure.
    ///
    /// Prose and unknown files never receive a bonus.
    pub fn structural_bonus_tenths(&self, structure: &FileStructure) -> u32 {
        if !structure.language.is_structure_eligible() {
            return 0;
        }

        let infra_hits = structure
            .infrastructure_names()
            .iter()
            .filter(|name| {
                self.query_lower.contains(name.as_str())
                    || self.keywords.iter().any(|k| name.contains(k.as_str()))
            })
            .count() as u32;
        let mut bonus = (infra_hits * INFRA_TENTHS).min(INFRA_CAP_TENTHS);

        if self.wants_imports && !structure.imports.is_empty() {
            bonus += IMPORT_TENTHS;
        }
        bonus
    }

    pub fn score_tenths(&self, path: &str, content: &str, analysis: Option<&StructuralAnalysis>) -> u32 {
        let bonus = analysis
            .map(|a| self.structural_bonus_tenths(a.structure()))
            .unwrap_or(0);
        (self.base_tenths(path, content) + bonus).min(MAX_TENTHS)
    }
}

pub fn tenths_to_relevance(tenths: u32) -> f64 {
    f64::from(tenths.min(MAX_TENTHS)) / 10.0
}
