//! Query intent classification and the project pre-scan that backs it.

use crate::walker::WalkEntry;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

/// Query classification bucket, in classification order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Containerization,
    Orchestration,
    Dependencies,
    Configuration,
    Build,
    Tests,
}

impl IntentCategory {
    pub const ALL: [IntentCategory; 6] = [
        Self::Containerization,
        Self::Orchestration,
        Self::Dependencies,
        Self::Configuration,
        Self::Build,
        Self::Tests,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Containerization => "containerization",
            Self::Orchestration => "orchestration",
            Self::Dependencies => "dependencies",
            Self::Configuration => "configuration",
            Self::Build => "build",
            Self::Tests => "tests",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Self::Containerization => &CONTAINER_PATTERN,
            Self::Orchestration => &ORCHESTRATION_PATTERN,
            Self::Dependencies => &DEPENDENCY_PATTERN,
            Self::Configuration => &CONFIG_PATTERN,
            Self::Build => &BUILD_PATTERN,
            Self::Tests => &TEST_PATTERN,
        }
    }
}

static CONTAINER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"docker|container").unwrap());

static ORCHESTRATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"kubernetes|\bk8s\b|\bpods?\b|deployment|\bhelm\b").unwrap());

static DEPENDENCY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"dependenc|package|librar").unwrap());

static CONFIG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"config|environment|settings|\benv\b").unwrap());

static BUILD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bbuild|\bci\b|\bcd\b|ci/cd|pipeline|workflow").unwrap());

static TEST_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\btest|\bspecs?\b").unwrap());

/// Every category whose pattern matches the lower-cased query, in category order.
pub fn classify(query_lower: &str) -> Vec<IntentCategory> {
    IntentCategory::ALL
        .into_iter()
        .filter(|category| category.pattern().is_match(query_lower))
        .collect()
}

/// Pre-scanned root-relative file paths per intent category
#[derive(Debug, Clone, Default)]
pub struct IntentBuckets {
    buckets: HashMap<IntentCategory, Vec<String>>,
}

impl IntentBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: IntentCategory, path: impl Into<String>) {
        self.buckets.entry(category).or_default().push(path.into());
    }

    pub fn get(&self, category: IntentCategory) -> &[String] {
        self.buckets.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Concatenated buckets for `categories`, in the given order
    pub fn files_for(&self, categories: &[IntentCategory]) -> Vec<String> {
        categories
            .iter()
            .flat_map(|c| self.get(*c).iter().cloned())
            .collect()
    }
}

/// Supplies intent buckets for a project.
///
/// The engine hands over the entries it already walked; providers backed by a
/// richer external scan may ignore them.
pub trait IntentBucketProvider: Send + Sync {
    fn buckets(&self, root: &Path, entries: &[WalkEntry]) -> IntentBuckets;
}

/// Default provider classifying files by well-known names and locations.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathPatternPreScan;

const DEPENDENCY_MANIFESTS: &[&str] = &[
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "requirements.txt",
    "requirements-dev.txt",
    "pyproject.toml",
    "poetry.lock",
    "pipfile",
    "setup.py",
    "setup.cfg",
    "cargo.toml",
    "cargo.lock",
    "go.mod",
    "go.sum",
    "gemfile",
    "pom.xml",
    "build.gradle",
];

const BUILD_FILES: &[&str] = &[
    "makefile",
    "justfile",
    "jenkinsfile",
    ".gitlab-ci.yml",
    ".travis.yml",
    "azure-pipelines.yml",
    "cloudbuild.yaml",
    "build.rs",
    "build.sh",
];

const K8S_SEGMENTS: &[&str] = &["k8s", "kubernetes", "helm", "charts", "manifests", "kustomize"];

const TEST_SEGMENTS: &[&str] = &["test", "tests", "__tests__", "spec", "specs"];

impl IntentBucketProvider for PathPatternPreScan {
    fn buckets(&self, _root: &Path, entries: &[WalkEntry]) -> IntentBuckets {
        let mut buckets = IntentBuckets::new();
        for entry in entries.iter().filter(|e| e.is_file()) {
            for category in categorize(entry) {
                buckets.insert(category, entry.path.clone());
            }
        }
        buckets
    }
}

fn categorize(entry: &WalkEntry) -> Vec<IntentCategory> {
    let path = entry.path.to_ascii_lowercase();
    let name = path.rsplit('/').next().unwrap_or(&path);
    let segments: Vec<&str> = path.split('/').collect();
    let dirs = &segments[..segments.len().saturating_sub(1)];
    let is_yaml = name.ends_with(".yml") || name.ends_with(".yaml");

    let mut categories = Vec::new();

    if name.starts_with("dockerfile")
        || name.ends_with(".dockerfile")
        || name == ".dockerignore"
        || (is_yaml && (name.starts_with("docker-compose") || name.starts_with("compose")))
    {
        categories.push(IntentCategory::Containerization);
    }

    if is_yaml
        && (dirs.iter().any(|d| K8S_SEGMENTS.contains(d))
            || matches!(name, "chart.yaml" | "values.yaml" | "kustomization.yaml"))
    {
        categories.push(IntentCategory::Orchestration);
    }

    if DEPENDENCY_MANIFESTS.contains(&name)
        || (name.starts_with("requirements") && name.ends_with(".txt"))
    {
        categories.push(IntentCategory::Dependencies);
    }

    if entry.language.is_config()
        || name.starts_with(".env")
        || name.contains("config")
        || name.contains("settings")
    {
        categories.push(IntentCategory::Configuration);
    }

    if BUILD_FILES.contains(&name)
        || path.starts_with(".github/workflows/")
        || path.starts_with(".circleci/")
        || name.starts_with("webpack.")
        || name.starts_with("vite.config")
        || name.starts_with("rollup.config")
    {
        categories.push(IntentCategory::Build);
    }

    if dirs.iter().any(|d| TEST_SEGMENTS.contains(d))
        || name.contains(".test.")
        || name.contains(".spec.")
        || name.starts_with("test_")
        || name.contains("_test.")
    {
        categories.push(IntentCategory::Tests);
    }

    categories
}
