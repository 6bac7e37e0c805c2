//! Scout Core - Deterministic code-structure search
//!
//! This library walks a project, discovers candidate files from query intent,
//! keywords and caller globs, and ranks them with text overlap plus
//! structural signals extracted per file.

pub mod config;
pub mod discovery;
pub mod error;
pub mod intent;
pub mod keywords;
pub mod language;
pub mod reader;
pub mod scoring;
pub mod search;
pub mod structure;
pub mod walker;

pub use config::Config;
pub use error::{ErrorEnvelope, ScoutError};
pub use intent::{IntentBucketProvider, IntentBuckets, IntentCategory, PathPatternPreScan};
pub use language::Language;
pub use reader::{ContentReader, FsReader};
pub use search::{CancelToken, FileMatch, SearchEngine, SearchRequest, SearchResult};
pub use structure::records::{
    AnalysisQuality, ClassRecord, DependencyRecord, ExportRecord, FileStructure, FunctionRecord,
    ImportRecord, InfraResource, ParseSummary, StructuralAnalysis,
};
pub use structure::{StructuralAnalyzer, StructuralBackend};
pub use walker::{ProjectWalker, WalkEntry, WalkOptions};

/// Result type alias for scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;
