//! Search orchestration: walk, classify, discover, score, assemble.

use crate::config::{Config, SearchConfig};
use crate::discovery::{discover, DiscoveryInput, FileCandidate};
use crate::error::ScoutError;
use crate::intent::{classify, IntentBucketProvider, IntentCategory, PathPatternPreScan};
use crate::keywords::extract_keywords;
use crate::reader::{ContentReader, FsReader};
use crate::scoring::{tenths_to_relevance, RelevanceScorer};
use crate::structure::records::ParseSummary;
use crate::structure::StructuralAnalyzer;
use crate::walker::{ProjectWalker, WalkOptions};
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub project_path: PathBuf,
    /// Extra globs, relative to the project root
    pub scope: Option<Vec<String>>,
    pub include_content: bool,
    pub max_files: usize,
    pub enable_structural_analysis: bool,
    /// Matches must score strictly above this
    pub relevance_threshold: f64,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, project_path: impl Into<PathBuf>) -> Self {
        Self::from_config(query, project_path, &SearchConfig::default())
    }

    /// Request using the limits from a loaded config
    pub fn from_config(
        query: impl Into<String>,
        project_path: impl Into<PathBuf>,
        config: &SearchConfig,
    ) -> Self {
        Self {
            query: query.into(),
            project_path: project_path.into(),
            scope: None,
            include_content: false,
            max_files: config.max_files,
            enable_structural_analysis: true,
            relevance_threshold: config.relevance_threshold,
            timeout: None,
            cancel: None,
        }
    }

    fn validate(&self) -> crate::Result<()> {
        if self.query.trim().is_empty() {
            return Err(ScoutError::InvalidInput("query must not be empty".into()));
        }
        if !(0.0..1.0).contains(&self.relevance_threshold) {
            return Err(ScoutError::InvalidInput(format!(
                "relevance_threshold must be in [0, 1), got {}",
                self.relevance_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileMatch {
    pub path: String,
    pub relevance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ParseSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub matches: Vec<FileMatch>,
    /// Distinct discovered files before the candidate cap
    pub total_files: usize,
    pub keywords: Vec<String>,
    pub intents: Vec<IntentCategory>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// A candidate that survived reading and scoring
#[derive(Debug, Clone)]
struct Scored {
    /// Discovery order, the tie-breaker
    index: usize,
    tenths: u32,
    path: String,
    content: Option<String>,
    summary: Option<ParseSummary>,
}

/// Why a search should stop early
struct Deadline<'a> {
    token: Option<&'a CancelToken>,
    at: Option<Instant>,
}

impl Deadline<'_> {
    fn expired(&self) -> bool {
        self.token.is_some_and(CancelToken::is_cancelled)
            || self.at.is_some_and(|at| Instant::now() >= at)
    }

    fn check(&self) -> crate::Result<()> {
        if self.expired() {
            Err(ScoutError::Cancelled)
        } else {
            Ok(())
        }
    }
}

pub struct SearchEngine {
    config: Config,
    analyzer: StructuralAnalyzer,
    provider: Box<dyn IntentBucketProvider>,
    reader: Arc<dyn ContentReader>,
}

impl SearchEngine {
    pub fn new(
        config: Config,
        analyzer: StructuralAnalyzer,
        provider: Box<dyn IntentBucketProvider>,
        reader: Arc<dyn ContentReader>,
    ) -> Self {
        Self {
            config,
            analyzer,
            provider,
            reader,
        }
    }

    /// Filesystem reads, path pre-scan, best available analyzer
    pub fn with_config(config: Config) -> Self {
        Self::new(
            config,
            StructuralAnalyzer::with_default_backend(),
            Box::new(PathPatternPreScan),
            Arc::new(FsReader),
        )
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn analyzer(&self) -> &StructuralAnalyzer {
        &self.analyzer
    }

    /// Run one search.
    ///
    /// An empty query fails with `INVALID_INPUT` before touching the
    /// filesystem. Every later failure, cancellation included, is wrapped as
    /// `SEARCH_ERROR` and no partial result is returned.
    pub fn search(&self, request: &SearchRequest) -> crate::Result<SearchResult> {
        request.validate()?;

        let started = Instant::now();
        let result = self
            .run(request, started)
            .map_err(|e| ScoutError::search(&request.query, &request.project_path, e))?;

        info!(
            "search {:?}: {} matches from {} files in {}ms",
            request.query,
            result.matches.len(),
            result.total_files,
            result.elapsed.as_millis()
        );
        Ok(result)
    }

    fn run(&self, request: &SearchRequest, started: Instant) -> crate::Result<SearchResult> {
        let deadline = Deadline {
            token: request.cancel.as_ref(),
            at: request.timeout.map(|t| started + t),
        };
        deadline.check()?;

        let root = request.project_path.as_path();
        let entries = ProjectWalker::new(root, WalkOptions::from_config(&self.config)).walk()?;
        deadline.check()?;

        let query_lower = request.query.to_lowercase();
        let intents = classify(&query_lower);
        let keywords = extract_keywords(&request.query);
        debug!("intents {:?}, keywords {:?}", intents, keywords);

        let discovery = discover(
            &DiscoveryInput {
                root,
                entries: &entries,
                intents: &intents,
                keywords: &keywords,
                scope: request.scope.as_deref(),
                provider: self.provider.as_ref(),
            },
            &self.config.search,
        )?;
        deadline.check()?;

        let scorer = RelevanceScorer::new(&request.query, &keywords);
        let scored = self.score_candidates(root, &discovery.candidates, request, &scorer, &deadline)?;
        let matches = assemble(scored, request.relevance_threshold, request.max_files);

        Ok(SearchResult {
            matches,
            total_files: discovery.total,
            keywords,
            intents,
            elapsed: started.elapsed(),
        })
    }

    /// Read, analyze and score candidates on a bounded worker pool.
    fn score_candidates(
        &self,
        root: &Path,
        candidates: &[FileCandidate],
        request: &SearchRequest,
        scorer: &RelevanceScorer,
        deadline: &Deadline<'_>,
    ) -> crate::Result<Vec<Scored>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let workers = self.config.search.workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ScoutError::ThreadPool(e.to_string()))?;

        let (tx_ch, rx_ch) = crossbeam_channel::bounded::<Scored>(workers * 2);

        let cancelled = AtomicBool::new(false);
        let cancelled_ref = &cancelled;

        let mut scored = Vec::with_capacity(candidates.len());
        std::thread::scope(|s| {
            s.spawn(move || {
                pool.install(|| {
                    candidates.par_iter().enumerate().for_each_with(
                        tx_ch,
                        |sender, (index, candidate)| {
                            if cancelled_ref.load(Ordering::Relaxed) {
                                return;
                            }
                            if deadline.expired() {
                                cancelled_ref.store(true, Ordering::Relaxed);
                                return;
                            }
                            let Some(item) = self.score_one(root, index, candidate, request, scorer)
                            else {
                                return;
                            };
                            if sender.send(item).is_err() {
                                cancelled_ref.store(true, Ordering::Relaxed);
                            }
                        },
                    );
                });
            });

            for item in rx_ch.iter() {
                scored.push(item);
            }
        });

        if cancelled.load(Ordering::Relaxed) || deadline.token.is_some_and(CancelToken::is_cancelled) {
            return Err(ScoutError::Cancelled);
        }
        Ok(scored)
    }

    /// Per-file failures drop the file, never the search.
    fn score_one(
        &self,
        root: &Path,
        index: usize,
        candidate: &FileCandidate,
        request: &SearchRequest,
        scorer: &RelevanceScorer,
    ) -> Option<Scored> {
        let content = match self.reader.read(&root.join(&candidate.path)) {
            Ok(content) => content,
            Err(e) => {
                debug!("Skipping {}: {}", candidate.path, e);
                return None;
            }
        };

        let analysis = if request.enable_structural_analysis {
            match self.analyzer.analyze(Path::new(&candidate.path), &content) {
                Ok(analysis) => Some(analysis),
                Err(e) => {
                    debug!("No structure for {}: {}", candidate.path, e);
                    None
                }
            }
        } else {
            None
        };

        let tenths = scorer.score_tenths(&candidate.path, &content, analysis.as_ref());
        Some(Scored {
            index,
            tenths,
            path: candidate.path.clone(),
            content: request.include_content.then_some(content),
            summary: analysis.as_ref().map(ParseSummary::from),
        })
    }
}

/// Threshold, order by relevance then discovery index, truncate.
fn assemble(mut scored: Vec<Scored>, threshold: f64, max_files: usize) -> Vec<FileMatch> {
    scored.retain(|s| tenths_to_relevance(s.tenths) > threshold);
    scored.sort_by(|a, b| b.tenths.cmp(&a.tenths).then_with(|| a.index.cmp(&b.index)));
    scored.truncate(max_files);
    scored
        .into_iter()
        .map(|s| FileMatch {
            path: s.path,
            relevance: tenths_to_relevance(s.tenths),
            content: s.content,
            summary: s.summary,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(index: usize, tenths: u32) -> Scored {
        Scored {
            index,
            tenths,
            path: format!("f{index}.ts"),
            content: None,
            summary: None,
        }
    }

    fn paths(matches: &[FileMatch]) -> Vec<&str> {
        matches.iter().map(|m| m.path.as_str()).collect()
    }

    #[test]
    fn assemble_orders_by_relevance_then_discovery() {
        // Arrival order from workers is arbitrary
        let input = vec![scored(3, 5), scored(0, 5), scored(2, 9), scored(1, 3)];
        let matches = assemble(input, 0.2, 10);
        assert_eq!(paths(&matches), vec!["f2.ts", "f0.ts", "f3.ts", "f1.ts"]);
        assert_eq!(matches[0].relevance, 0.9);
    }

    #[test]
    fn assemble_threshold_is_strict() {
        let input = vec![scored(0, 2), scored(1, 3), scored(2, 0)];
        let matches = assemble(input, 0.2, 10);
        assert_eq!(paths(&matches), vec!["f1.ts"]);
    }

    #[test]
    fn assemble_truncates_after_sorting() {
        let input = (0..5).map(|i| scored(i, 3 + i as u32)).collect();
        let matches = assemble(input, 0.0, 2);
        assert_eq!(paths(&matches), vec!["f4.ts", "f3.ts"]);
    }

    #[test]
    fn empty_query_is_rejected() {
        let request = SearchRequest::new("   ", "/definitely/not/here");
        let err = SearchEngine::with_config(Config::default())
            .search(&request)
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn elapsed_serializes_as_millis() {
        let result = SearchResult {
            matches: Vec::new(),
            total_files: 0,
            keywords: vec!["docker".into()],
            intents: vec![IntentCategory::Containerization],
            elapsed: Duration::from_millis(42),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["elapsed_ms"], 42);
        assert_eq!(json["intents"][0], "containerization");
    }
}
