//! Configuration for scout

use crate::ScoutError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name looked up at the project root
pub const CONFIG_FILE_NAME: &str = ".codescout.toml";

/// Default configuration as TOML
pub const DEFAULT_CONFIG: &str = r#"# Scout Configuration

[search]
# Maximum matches returned by a search
max_files = 20
# Matches must score strictly above this value
relevance_threshold = 0.2
# Hard cap on merged candidates before any file is read
candidate_cap = 50
# Only the first N extracted keywords drive glob discovery
keyword_limit = 5
# Maximum files contributed by keyword globs
keyword_glob_cap = 50
# Maximum files contributed by caller scope globs
scope_glob_cap = 100
# Worker threads for reading and scoring candidates
workers = 8
# Files larger than this (bytes) are not read
max_file_bytes = 1000000

[walk]
# Maximum directory depth below the project root
max_depth = 12
# Include dot-files and dot-directories
include_hidden = false
# Honor .gitignore / .ignore files
respect_gitignore = true

[ignore]
# Directory or file names excluded from the walk (exact name match)
names = [
    ".git",
    "node_modules",
    "dist",
    "build",
    "target",
    "coverage",
    "__pycache__",
    ".venv",
    "venv",
    ".next",
]
"#;

/// Scout configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub walk: WalkConfig,
    #[serde(default)]
    pub ignore: IgnoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f64,
    #[serde(default = "default_candidate_cap")]
    pub candidate_cap: usize,
    #[serde(default = "default_keyword_limit")]
    pub keyword_limit: usize,
    #[serde(default = "default_keyword_glob_cap")]
    pub keyword_glob_cap: usize,
    #[serde(default = "default_scope_glob_cap")]
    pub scope_glob_cap: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub include_hidden: bool,
    #[serde(default = "default_respect_gitignore")]
    pub respect_gitignore: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoreConfig {
    #[serde(default = "default_ignore_names")]
    pub names: Vec<String>,
}

// Default value functions
fn default_max_files() -> usize {
    20
}
fn default_relevance_threshold() -> f64 {
    0.2
}
fn default_candidate_cap() -> usize {
    50
}
fn default_keyword_limit() -> usize {
    5
}
fn default_keyword_glob_cap() -> usize {
    50
}
fn default_scope_glob_cap() -> usize {
    100
}
fn default_workers() -> usize {
    8
}
fn default_max_file_bytes() -> u64 {
    1_000_000
}
fn default_max_depth() -> usize {
    12
}
fn default_respect_gitignore() -> bool {
    true
}
fn default_ignore_names() -> Vec<String> {
    [
        ".git",
        "node_modules",
        "dist",
        "build",
        "target",
        "coverage",
        "__pycache__",
        ".venv",
        "venv",
        ".next",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            relevance_threshold: default_relevance_threshold(),
            candidate_cap: default_candidate_cap(),
            keyword_limit: default_keyword_limit(),
            keyword_glob_cap: default_keyword_glob_cap(),
            scope_glob_cap: default_scope_glob_cap(),
            workers: default_workers(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            include_hidden: false,
            respect_gitignore: default_respect_gitignore(),
        }
    }
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            names: default_ignore_names(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load `<root>/.codescout.toml` if present, defaults otherwise
    pub fn load_for_project(root: &Path) -> crate::Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the default config into `root`, refusing to overwrite
    pub fn init(root: &Path) -> crate::Result<std::path::PathBuf> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.exists() {
            return Err(ScoutError::ConfigExists(path));
        }
        std::fs::write(&path, DEFAULT_CONFIG)?;
        Ok(path)
    }

    /// Parse config from TOML string
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ScoutError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::Result<()> {
        let threshold = self.search.relevance_threshold;
        if !(0.0..1.0).contains(&threshold) {
            return Err(ScoutError::ConfigParse(format!(
                "relevance_threshold must be in [0, 1), got {}",
                threshold
            )));
        }
        if self.search.workers == 0 {
            return Err(ScoutError::ConfigParse("workers must be at least 1".to_string()));
        }
        Ok(())
    }
}
