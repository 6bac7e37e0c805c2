//! Dependency manifest parsing

use crate::error::ScoutError;
use crate::structure::records::{DependencyKind, DependencyRecord};
use crate::walker::{ProjectWalker, WalkOptions};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

/// File names recognized as dependency manifests
pub const MANIFEST_NAMES: &[&str] = &[
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "Cargo.toml",
];

const PACKAGE_JSON_SECTIONS: &[(&str, DependencyKind)] = &[
    ("dependencies", DependencyKind::Production),
    ("devDependencies", DependencyKind::Development),
    ("peerDependencies", DependencyKind::Peer),
    ("optionalDependencies", DependencyKind::Optional),
];

const CARGO_SECTIONS: &[(&str, DependencyKind)] = &[
    ("dependencies", DependencyKind::Production),
    ("dev-dependencies", DependencyKind::Development),
    ("build-dependencies", DependencyKind::Build),
];

/// PEP 508 requirement: name, optional extras, optional version specifier.
static REQUIREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._-]*)\s*(?:\[[^\]]*\])?\s*(\(?\s*(?:===|==|>=|<=|~=|!=|>|<)[^;]*)?")
        .unwrap()
});

pub fn is_manifest(file_name: &str) -> bool {
    MANIFEST_NAMES.contains(&file_name)
}

/// Parse one manifest. `source` is the root-relative path recorded on each
/// dependency; the format is chosen from its file name.
pub fn parse_manifest(
    path: &Path,
    source: &str,
    content: &str,
) -> crate::Result<Vec<DependencyRecord>> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let records = match file_name {
        "package.json" => package_json(path, source, content)?,
        "requirements.txt" => requirements_txt(source, content),
        "pyproject.toml" => pyproject_toml(path, source, content)?,
        "Cargo.toml" => cargo_toml(path, source, content)?,
        _ => Vec::new(),
    };
    Ok(dedup_and_sort(records))
}

/// Every dependency declared by manifests under `root`.
///
/// Unreadable or malformed manifests are skipped.
pub fn project_dependencies(
    root: &Path,
    options: WalkOptions,
) -> crate::Result<Vec<DependencyRecord>> {
    let walker = ProjectWalker::new(root, options);
    let mut records = Vec::new();

    for entry in walker.walk()? {
        if !entry.is_file() || !is_manifest(entry.file_name()) {
            continue;
        }
        let path = root.join(&entry.path);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Skipping unreadable manifest {}: {}", entry.path, e);
                continue;
            }
        };
        match parse_manifest(&path, &entry.path, &content) {
            Ok(found) => records.extend(found),
            Err(e) => debug!("Skipping manifest {}: {}", entry.path, e),
        }
    }

    Ok(dedup_and_sort(records))
}

fn manifest_error(path: &Path, message: impl ToString) -> ScoutError {
    ScoutError::ManifestParse {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

fn record(name: &str, version: &str, kind: DependencyKind, source: &str) -> DependencyRecord {
    let version = version.trim();
    DependencyRecord {
        name: name.to_string(),
        version: if version.is_empty() { "*" } else { version }.to_string(),
        kind,
        source: source.to_string(),
    }
}

/// One record per (name, manifest), first section wins.
fn dedup_and_sort(records: Vec<DependencyRecord>) -> Vec<DependencyRecord> {
    let mut seen = HashSet::new();
    let mut unique: Vec<DependencyRecord> = records
        .into_iter()
        .filter(|r| seen.insert((r.source.clone(), r.name.clone())))
        .collect();
    unique.sort_by(|a, b| a.source.cmp(&b.source).then_with(|| a.name.cmp(&b.name)));
    unique
}

fn package_json(path: &Path, source: &str, content: &str) -> crate::Result<Vec<DependencyRecord>> {
    let json: serde_json::Value =
        serde_json::from_str(content).map_err(|e| manifest_error(path, e))?;

    let mut records = Vec::new();
    for (section, kind) in PACKAGE_JSON_SECTIONS {
        let Some(deps) = json.get(section).and_then(|v| v.as_object()) else {
            continue;
        };
        for (name, version) in deps {
            records.push(record(name, version.as_str().unwrap_or_default(), *kind, source));
        }
    }
    Ok(records)
}

/// Parse a single requirement line into (name, version specifier).
fn requirement(line: &str) -> Option<(String, String)> {
    let caps = REQUIREMENT.captures(line.trim())?;
    let name = caps.get(1)?.as_str().to_string();
    let spec: String = caps
        .get(2)
        .map(|m| m.as_str())
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '(' && *c != ')')
        .collect();
    let spec = match spec.strip_prefix("==") {
        Some(exact) if !exact.starts_with('=') && !exact.contains(',') => exact.to_string(),
        _ => spec,
    };
    Some((name, spec))
}

fn requirements_txt(source: &str, content: &str) -> Vec<DependencyRecord> {
    content
        .lines()
        .map(|line| line.split(" #").next().unwrap_or(line).trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('-'))
        .filter(|line| !line.contains("://"))
        .filter_map(requirement)
        .map(|(name, version)| record(&name, &version, DependencyKind::Production, source))
        .collect()
}

/// Version from a TOML dependency value: a bare string or a table with `version`.
fn toml_version(value: &toml::Value) -> &str {
    match value {
        toml::Value::String(v) => v.as_str(),
        toml::Value::Table(t) => t.get("version").and_then(|v| v.as_str()).unwrap_or_default(),
        _ => "",
    }
}

fn toml_table<'a>(root: &'a toml::Value, keys: &[&str]) -> Option<&'a toml::value::Table> {
    keys.iter()
        .try_fold(root, |value, key| value.get(key))
        .and_then(|v| v.as_table())
}

fn pyproject_toml(path: &Path, source: &str, content: &str) -> crate::Result<Vec<DependencyRecord>> {
    let doc: toml::Value = toml::from_str(content).map_err(|e| manifest_error(path, e))?;
    let mut records = Vec::new();

    let mut poetry_sections: Vec<(&toml::value::Table, DependencyKind)> = Vec::new();
    if let Some(table) = toml_table(&doc, &["tool", "poetry", "dependencies"]) {
        poetry_sections.push((table, DependencyKind::Production));
    }
    if let Some(table) = toml_table(&doc, &["tool", "poetry", "dev-dependencies"]) {
        poetry_sections.push((table, DependencyKind::Development));
    }
    if let Some(groups) = toml_table(&doc, &["tool", "poetry", "group"]) {
        for group in groups.values() {
            if let Some(table) = toml_table(group, &["dependencies"]) {
                poetry_sections.push((table, DependencyKind::Development));
            }
        }
    }
    for (table, kind) in poetry_sections {
        for (name, value) in table {
            if name.eq_ignore_ascii_case("python") {
                continue;
            }
            records.push(record(name, toml_version(value), kind, source));
        }
    }

    let project_lists = [
        doc.get("project")
            .and_then(|p| p.get("dependencies"))
            .and_then(|d| d.as_array())
            .map(|list| (list, DependencyKind::Production)),
    ];
    let optional = toml_table(&doc, &["project", "optional-dependencies"]);
    let optional_lists = optional
        .into_iter()
        .flat_map(|t| t.values())
        .filter_map(|v| v.as_array())
        .map(|list| (list, DependencyKind::Optional));

    for (list, kind) in project_lists.into_iter().flatten().chain(optional_lists) {
        for (name, version) in list.iter().filter_map(|v| v.as_str()).filter_map(requirement) {
            records.push(record(&name, &version, kind, source));
        }
    }

    Ok(records)
}

fn cargo_toml(path: &Path, source: &str, content: &str) -> crate::Result<Vec<DependencyRecord>> {
    let doc: toml::Value = toml::from_str(content).map_err(|e| manifest_error(path, e))?;
    let mut records = Vec::new();

    let sections = CARGO_SECTIONS
        .iter()
        .filter_map(|(key, kind)| Some((toml_table(&doc, &[*key])?, *kind)))
        .chain(
            toml_table(&doc, &["workspace", "dependencies"])
                .map(|table| (table, DependencyKind::Production)),
        );
    for (table, kind) in sections {
        for (name, value) in table {
            records.push(record(name, toml_version(value), kind, source));
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn summary(records: &[DependencyRecord]) -> Vec<(&str, &str, DependencyKind)> {
        records
            .iter()
            .map(|r| (r.name.as_str(), r.version.as_str(), r.kind))
            .collect()
    }

    #[test]
    fn package_json_sections() {
        let content = r#"{
  "name": "web",
  "dependencies": { "react": "^18.2.0", "express": "" },
  "devDependencies": { "jest": "29.0.0", "react": "^18.0.0" },
  "peerDependencies": { "typescript": ">=5" },
  "optionalDependencies": { "fsevents": "2.3.3" }
}"#;
        let records = parse_manifest(Path::new("package.json"), "package.json", content).unwrap();
        assert_eq!(
            summary(&records),
            vec![
                ("express", "*", DependencyKind::Production),
                ("fsevents", "2.3.3", DependencyKind::Optional),
                ("jest", "29.0.0", DependencyKind::Development),
                ("react", "^18.2.0", DependencyKind::Production),
                ("typescript", ">=5", DependencyKind::Peer),
            ]
        );
        assert!(records.iter().all(|r| r.source == "package.json"));
    }

    #[test]
    fn requirements_skip_comments_and_flags() {
        let content = "# pinned\nrequests==2.31.0\n-r base.txt\n\nflask >= 2.0  # web\nuvicorn[standard]\ngit+https://github.com/x/y.git\nDjango>=4.2,<5\n";
        let records =
            parse_manifest(Path::new("requirements.txt"), "requirements.txt", content).unwrap();
        assert_eq!(
            summary(&records),
            vec![
                ("Django", ">=4.2,<5", DependencyKind::Production),
                ("flask", ">=2.0", DependencyKind::Production),
                ("requests", "2.31.0", DependencyKind::Production),
                ("uvicorn", "*", DependencyKind::Production),
            ]
        );
    }

    #[test]
    fn pyproject_poetry_and_pep621() {
        let content = r#"
[project]
name = "svc"
dependencies = ["httpx>=0.27", "pydantic"]

[project.optional-dependencies]
docs = ["mkdocs==1.5.3"]

[tool.poetry.dependencies]
python = "^3.11"
fastapi = "^0.110"
sqlalchemy = { version = "2.0.29", extras = ["asyncio"] }

[tool.poetry.group.dev.dependencies]
pytest = "^8.0"
"#;
        let records =
            parse_manifest(Path::new("pyproject.toml"), "pyproject.toml", content).unwrap();
        assert_eq!(
            summary(&records),
            vec![
                ("fastapi", "^0.110", DependencyKind::Production),
                ("httpx", ">=0.27", DependencyKind::Production),
                ("mkdocs", "1.5.3", DependencyKind::Optional),
                ("pydantic", "*", DependencyKind::Production),
                ("pytest", "^8.0", DependencyKind::Development),
                ("sqlalchemy", "2.0.29", DependencyKind::Production),
            ]
        );
    }

    #[test]
    fn cargo_toml_sections() {
        let content = r#"
[package]
name = "demo"

[dependencies]
serde = { version = "1.0", features = ["derive"] }
local = { path = "../local" }
regex = "1"

[dev-dependencies]
tempfile = "3"

[build-dependencies]
cc = "1.0"
"#;
        let records = parse_manifest(Path::new("Cargo.toml"), "Cargo.toml", content).unwrap();
        assert_eq!(
            summary(&records),
            vec![
                ("cc", "1.0", DependencyKind::Build),
                ("local", "*", DependencyKind::Production),
                ("regex", "1", DependencyKind::Production),
                ("serde", "1.0", DependencyKind::Production),
                ("tempfile", "3", DependencyKind::Development),
            ]
        );
    }

    #[test]
    fn malformed_manifest_is_an_error() {
        let err = parse_manifest(Path::new("package.json"), "package.json", "{ nope").unwrap_err();
        assert_eq!(err.code(), "MANIFEST_PARSE");
    }

    #[test]
    fn project_dependencies_are_idempotent() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies": {"express": "^4"}}"#,
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("api")).unwrap();
        std::fs::write(dir.path().join("api/requirements.txt"), "fastapi\n").unwrap();
        std::fs::write(dir.path().join("api/pyproject.toml"), "not = [valid").unwrap();

        let first = project_dependencies(dir.path(), WalkOptions::default()).unwrap();
        let second = project_dependencies(dir.path(), WalkOptions::default()).unwrap();
        assert_eq!(first, second);

        let sources: Vec<_> = first.iter().map(|r| (r.source.as_str(), r.name.as_str())).collect();
        assert_eq!(
            sources,
            vec![("api/requirements.txt", "fastapi"), ("package.json", "express")]
        );
    }
}
