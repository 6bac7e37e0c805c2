use scout_core::{
    CancelToken, Config, ContentReader, FsReader, PathPatternPreScan, ScoutError, SearchEngine,
    SearchRequest, StructuralAnalyzer, WalkOptions,
};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Small service with container files, source and prose
fn create_test_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(root, "Dockerfile", "FROM node:20-alpine\nWORKDIR /app\nEXPOSE 3000\n");
    write(
        root,
        "docker-compose.yml",
        "services:\n  api:\n    build: .\n  db:\n    image: postgres:16\n",
    );
    write(
        root,
        "src/index.ts",
        "import express from 'express';\nexport const app = express();\n",
    );
    write(root, "src/auth/login.ts", "export function login(user: string) {}\n");
    write(root, "lib/tasks.py", "import celery\n\ndef run():\n    pass\n");
    write(root, "README.md", "# Service\nRun it with docker compose up.\n");
    dir
}

fn engine() -> SearchEngine {
    SearchEngine::with_config(Config::default())
}

fn paths(result: &scout_core::SearchResult) -> Vec<&str> {
    result.matches.iter().map(|m| m.path.as_str()).collect()
}

fn search_cause(err: ScoutError) -> ScoutError {
    match err {
        ScoutError::Search { source, .. } => *source,
        other => panic!("expected SEARCH_ERROR, got {other:?}"),
    }
}

/// Counts reads and forwards them to the filesystem
struct CountingReader {
    reads: Arc<AtomicUsize>,
}

impl ContentReader for CountingReader {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        FsReader.read(path)
    }
}

/// Cancels the search from inside the first read
struct CancellingReader {
    token: CancelToken,
}

impl ContentReader for CancellingReader {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.token.cancel();
        FsReader.read(path)
    }
}

/// Fails for one file name and reads everything else
struct FailingReader {
    file_name: &'static str,
}

impl ContentReader for FailingReader {
    fn read(&self, path: &Path) -> io::Result<String> {
        if path.file_name().is_some_and(|n| n == self.file_name) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"));
        }
        FsReader.read(path)
    }
}

#[test]
fn docker_query_ranks_container_files() {
    let project = create_test_project();
    let request = SearchRequest::new("docker compose setup", project.path());
    let result = engine().search(&request).unwrap();

    assert_eq!(result.keywords, vec!["docker", "compose", "setup"]);
    assert_eq!(result.intents, vec![scout_core::IntentCategory::Containerization]);
    assert_eq!(paths(&result), vec!["docker-compose.yml", "Dockerfile"]);
    assert_eq!(result.total_files, 2);

    for m in &result.matches {
        assert!(m.relevance > 0.2 && m.relevance <= 1.0);
        assert!(m.content.is_none());
        assert!(m.summary.as_ref().is_some_and(|s| s.has_infrastructure));
    }
}

#[test]
fn empty_query_reads_nothing() {
    let project = create_test_project();
    let reads = Arc::new(AtomicUsize::new(0));
    let engine = SearchEngine::new(
        Config::default(),
        StructuralAnalyzer::fallback_only(),
        Box::new(PathPatternPreScan),
        Arc::new(CountingReader {
            reads: Arc::clone(&reads),
        }),
    );

    let err = engine
        .search(&SearchRequest::new(" \t\n", project.path()))
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
    assert_eq!(reads.load(Ordering::SeqCst), 0);

    engine
        .search(&SearchRequest::new("docker", project.path()))
        .unwrap();
    assert!(reads.load(Ordering::SeqCst) > 0);
}

#[test]
fn empty_project_finds_nothing() {
    let dir = TempDir::new().unwrap();
    let result = engine()
        .search(&SearchRequest::new("docker", dir.path()))
        .unwrap();
    assert!(result.matches.is_empty());
    assert_eq!(result.total_files, 0);
}

#[test]
fn missing_project_is_a_search_error() {
    let dir = TempDir::new().unwrap();
    let request = SearchRequest::new("docker", dir.path().join("missing"));
    let err = engine().search(&request).unwrap_err();
    assert_eq!(err.code(), "SEARCH_ERROR");
    assert!(matches!(search_cause(err), ScoutError::Io(_)));
}

#[test]
fn invalid_scope_glob_is_a_search_error() {
    let project = create_test_project();
    let mut request = SearchRequest::new("login flow", project.path());
    request.scope = Some(vec!["src/[".to_string()]);
    let err = engine().search(&request).unwrap_err();
    assert_eq!(err.code(), "SEARCH_ERROR");
    assert!(matches!(search_cause(err), ScoutError::GlobPattern(_)));
}

#[test]
fn scope_globs_add_candidates() {
    let project = create_test_project();
    let mut request = SearchRequest::new("celery tasks runner", project.path());
    request.scope = Some(vec!["lib/**/*.py".to_string()]);
    request.include_content = true;
    let result = engine().search(&request).unwrap();

    let task = result
        .matches
        .iter()
        .find(|m| m.path == "lib/tasks.py")
        .unwrap();
    assert!(task.content.as_deref().unwrap().contains("import celery"));
}

#[test]
fn repeated_searches_are_identical() {
    let project = create_test_project();
    let engine = engine();
    let request = SearchRequest::new("docker image for the api service", project.path());

    let first = engine.search(&request).unwrap();
    let second = engine.search(&request).unwrap();
    assert_eq!(first.matches, second.matches);
    assert_eq!(first.total_files, second.total_files);
}

#[test]
fn threshold_and_cap_hold() {
    let dir = TempDir::new().unwrap();
    for i in 0..12 {
        let body = "widget ".repeat(i % 3 + 1) + if i % 2 == 0 { "render" } else { "" };
        write(dir.path(), &format!("src/widget_{i:02}.ts"), &body);
    }
    let mut request = SearchRequest::new("widget render", dir.path());
    request.max_files = 4;
    request.relevance_threshold = 0.3;
    let result = engine().search(&request).unwrap();

    assert_eq!(result.total_files, 12);
    assert_eq!(result.matches.len(), 4);
    assert!(result.matches.iter().all(|m| m.relevance > 0.3));
    assert!(result
        .matches
        .windows(2)
        .all(|w| w[0].relevance >= w[1].relevance));
    // Ties keep discovery order
    assert_eq!(
        paths(&result),
        vec!["src/widget_00.ts", "src/widget_02.ts", "src/widget_04.ts", "src/widget_06.ts"]
    );
}

#[test]
fn structural_analysis_can_be_disabled() {
    let project = create_test_project();
    let mut request = SearchRequest::new("docker compose", project.path());
    request.enable_structural_analysis = false;
    let result = engine().search(&request).unwrap();
    assert!(!result.matches.is_empty());
    assert!(result.matches.iter().all(|m| m.summary.is_none()));
}

#[test]
fn cancelled_search_returns_no_partial_results() {
    let project = create_test_project();
    let token = CancelToken::new();
    let engine = SearchEngine::new(
        Config::default(),
        StructuralAnalyzer::fallback_only(),
        Box::new(PathPatternPreScan),
        Arc::new(CancellingReader {
            token: token.clone(),
        }),
    );

    let mut request = SearchRequest::new("docker compose", project.path());
    request.cancel = Some(token);
    let err = engine.search(&request).unwrap_err();
    assert_eq!(err.code(), "SEARCH_ERROR");
    assert!(matches!(search_cause(err), ScoutError::Cancelled));
}

#[test]
fn zero_timeout_cancels() {
    let project = create_test_project();
    let mut request = SearchRequest::new("docker", project.path());
    request.timeout = Some(Duration::ZERO);
    let err = engine().search(&request).unwrap_err();
    assert!(matches!(search_cause(err), ScoutError::Cancelled));
}

#[test]
fn project_dependencies_are_stable() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "package.json",
        r#"{"dependencies": {"express": "^4.18.0"}, "devDependencies": {"jest": "^29.0.0"}}"#,
    );
    write(
        dir.path(),
        "worker/Cargo.toml",
        "[package]\nname = \"worker\"\n\n[dependencies]\nserde = \"1.0\"\n",
    );

    let analyzer = StructuralAnalyzer::fallback_only();
    let first = analyzer
        .project_dependencies(dir.path(), WalkOptions::default())
        .unwrap();
    let second = analyzer
        .project_dependencies(dir.path(), WalkOptions::default())
        .unwrap();
    assert_eq!(first, second);

    let names: Vec<(&str, &str)> = first
        .iter()
        .map(|d| (d.source.as_str(), d.name.as_str()))
        .collect();
    assert_eq!(
        names,
        vec![
            ("package.json", "express"),
            ("package.json", "jest"),
            ("worker/Cargo.toml", "serde"),
        ]
    );
}

#[test]
fn unreadable_file_is_dropped_alone() {
    let project = create_test_project();
    let engine = SearchEngine::new(
        Config::default(),
        StructuralAnalyzer::fallback_only(),
        Box::new(PathPatternPreScan),
        Arc::new(FailingReader {
            file_name: "Dockerfile",
        }),
    );

    let result = engine
        .search(&SearchRequest::new("docker compose setup", project.path()))
        .unwrap();
    assert_eq!(paths(&result), vec!["docker-compose.yml"]);
    assert_eq!(result.total_files, 2);
}

#[test]
fn unanalyzable_match_keeps_text_score() {
    let project = create_test_project();
    let result = engine()
        .search(&SearchRequest::new("service readme", project.path()))
        .unwrap();

    assert_eq!(paths(&result), vec!["README.md"]);
    let readme = &result.matches[0];
    assert_eq!(readme.relevance, 0.6);
    assert!(readme.summary.is_none());
}
