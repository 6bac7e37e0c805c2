//! Error types for scout operations

use serde::Serialize;
use std::path::PathBuf;

/// Structured error payload for machine-readable output.
///
/// Printed by the CLI in `--json` mode and handed to collaborators that render
/// reports, so they never need to match on `ScoutError` variants.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub hint: String,
}

impl ErrorEnvelope {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            hint: hint.into(),
        }
    }
}

impl From<&ScoutError> for ErrorEnvelope {
    fn from(err: &ScoutError) -> Self {
        let hint = match err {
            ScoutError::InvalidInput(_) => "Provide a non-empty query",
            ScoutError::Search { source, .. } => match source.as_ref() {
                ScoutError::GlobPattern(_) => "Check the --scope glob syntax",
                ScoutError::Cancelled => "Raise --timeout-ms or narrow the search scope",
                ScoutError::Io(_) => "Check that the project path exists and is readable",
                _ => "Re-run with RUST_LOG=debug for details",
            },
            ScoutError::ConfigParse(_) => "Fix .codescout.toml or remove it to use defaults",
            ScoutError::UnsupportedLanguage { .. } => "Structural analysis covers source, config and IaC files",
            _ => "Re-run with RUST_LOG=debug for details",
        };
        Self::new(err.code(), err.to_string(), hint)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScoutError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Search for {query:?} in {} failed: {source}", .project_path.display())]
    Search {
        query: String,
        project_path: PathBuf,
        #[source]
        source: Box<ScoutError>,
    },

    #[error("Search cancelled before all files were processed")]
    Cancelled,

    #[error("No structural analysis for {} ({language})", .path.display())]
    UnsupportedLanguage { path: PathBuf, language: String },

    #[error("Grammar parse error for {}: {message}", .path.display())]
    GrammarParse { path: PathBuf, message: String },

    #[error("Manifest parse error in {}: {message}", .path.display())]
    ManifestParse { path: PathBuf, message: String },

    #[error("Glob pattern error: {0}")]
    GlobPattern(String),

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("Config already exists at {}", .0.display())]
    ConfigExists(PathBuf),

    #[error("Worker pool error: {0}")]
    ThreadPool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScoutError {
    /// Stable error code for callers and JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Search { .. } => "SEARCH_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::UnsupportedLanguage { .. } => "UNSUPPORTED_LANGUAGE",
            Self::GrammarParse { .. } => "GRAMMAR_PARSE",
            Self::ManifestParse { .. } => "MANIFEST_PARSE",
            Self::GlobPattern(_) => "GLOB_PATTERN",
            Self::ConfigParse(_) => "CONFIG_PARSE",
            Self::ConfigExists(_) => "CONFIG_EXISTS",
            Self::ThreadPool(_) => "THREAD_POOL",
            Self::Io(_) => "IO",
            Self::Serialization(_) => "SERIALIZATION",
        }
    }

    /// Wrap a discovery failure with the query and path it happened under.
    pub fn search(query: &str, project_path: impl Into<PathBuf>, cause: ScoutError) -> Self {
        Self::Search {
            query: query.to_string(),
            project_path: project_path.into(),
            source: Box::new(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_error_keeps_query_and_cause() {
        let err = ScoutError::search("docker", "/tmp/project", ScoutError::GlobPattern("bad".into()));
        assert_eq!(err.code(), "SEARCH_ERROR");
        let msg = err.to_string();
        assert!(msg.contains("\"docker\""));
        assert!(msg.contains("/tmp/project"));
        assert!(msg.contains("Glob pattern error: bad"));
    }

    #[test]
    fn envelope_carries_code_and_hint() {
        let err = ScoutError::InvalidInput("query must not be empty".into());
        let envelope = ErrorEnvelope::from(&err);
        assert_eq!(envelope.code, "INVALID_INPUT");
        assert_eq!(envelope.hint, "Provide a non-empty query");
    }
}
