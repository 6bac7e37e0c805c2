//! Infrastructure resources declared in IaC files or referenced through cloud SDK imports.

use crate::language::Language;
use crate::structure::records::{line_at, ImportRecord, InfraResource, Location};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static TF_PROVIDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^[ \t]*provider\s+"([\w-]+)""#).unwrap());

static TF_RESOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*(?:resource|data)\s+"([\w-]+)"\s+"([\w-]+)""#).unwrap()
});

static DOCKER_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^[ \t]*FROM\s+(?:--platform=\S+\s+)?(\S+)").unwrap()
});

static YAML_DOC_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^---.*$").unwrap());

static K8S_API_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^apiVersion:\s*\S").unwrap());

static K8S_KIND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^kind:\s*["']?([A-Za-z]+)"#).unwrap());

static K8S_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^[ \t]+name:\s*["']?([\w.-]+)"#).unwrap());

static COMPOSE_SERVICES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^services:[ \t]*$").unwrap());

static COMPOSE_SERVICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^  ([\w.-]+):[ \t]*$").unwrap());

/// Module prefixes (or fragments) identifying a cloud or container SDK.
const SDK_PROVIDERS: &[(&str, &[&str])] = &[
    (
        "aws",
        &["boto3", "botocore", "aws-sdk", "@aws-sdk/", "aws_cdk", "aws-cdk-lib", "aws_sdk_", "github.com/aws/"],
    ),
    ("gcp", &["@google-cloud/", "google.cloud", "google-cloud-", "cloud.google.com/go"]),
    ("azure", &["@azure/", "azure.", "azure-", "github.com/azure/"]),
    ("kubernetes", &["kubernetes", "@kubernetes/", "k8s.io/"]),
    ("docker", &["docker", "dockerode"]),
];

/// Resources declared by the file at `path`, plus SDK references among its imports.
pub fn extract(
    path: &Path,
    source: &str,
    language: Language,
    imports: &[ImportRecord],
) -> Vec<InfraResource> {
    let mut resources = match language {
        Language::Terraform => terraform(source),
        Language::Dockerfile => dockerfile(source),
        Language::Yaml => yaml(path, source),
        _ => Vec::new(),
    };
    resources.extend(sdk_references(imports));
    resources
}

fn terraform(source: &str) -> Vec<InfraResource> {
    let mut found: Vec<(usize, InfraResource)> = Vec::new();
    for caps in TF_PROVIDER.captures_iter(source) {
        let Some(provider) = caps.get(1) else { continue };
        found.push((
            provider.start(),
            InfraResource {
                provider: provider.as_str().to_string(),
                kind: "provider".to_string(),
                name: None,
                location: Location::line(line_at(source, provider.start())),
            },
        ));
    }
    for caps in TF_RESOURCE.captures_iter(source) {
        let (Some(kind), Some(name)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let provider = kind.as_str().split('_').next().unwrap_or(kind.as_str());
        found.push((
            kind.start(),
            InfraResource {
                provider: provider.to_string(),
                kind: kind.as_str().to_string(),
                name: Some(name.as_str().to_string()),
                location: Location::line(line_at(source, kind.start())),
            },
        ));
    }
    found.sort_by_key(|(offset, _)| *offset);
    found.into_iter().map(|(_, r)| r).collect()
}

fn dockerfile(source: &str) -> Vec<InfraResource> {
    DOCKER_FROM
        .captures_iter(source)
        .filter_map(|caps| caps.get(1))
        .map(|image| InfraResource {
            provider: "docker".to_string(),
            kind: "image".to_string(),
            name: Some(image.as_str().to_string()),
            location: Location::line(line_at(source, image.start())),
        })
        .collect()
}

fn yaml(path: &Path, source: &str) -> Vec<InfraResource> {
    let mut resources = kubernetes_manifests(source);
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if file_name.contains("compose") || COMPOSE_SERVICES.is_match(source) {
        resources.extend(compose_services(source));
    }
    resources
}

fn kubernetes_manifests(source: &str) -> Vec<InfraResource> {
    let mut resources = Vec::new();
    let mut start = 0;
    let mut bounds: Vec<(usize, usize)> = Vec::new();
    for sep in YAML_DOC_SPLIT.find_iter(source) {
        bounds.push((start, sep.start()));
        start = sep.end();
    }
    bounds.push((start, source.len()));

    for (doc_start, doc_end) in bounds {
        let doc = &source[doc_start..doc_end];
        if !K8S_API_VERSION.is_match(doc) {
            continue;
        }
        let Some(kind) = K8S_KIND.captures(doc).and_then(|c| c.get(1)) else {
            continue;
        };
        let name = K8S_NAME
            .captures(doc)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        resources.push(InfraResource {
            provider: "kubernetes".to_string(),
            kind: kind.as_str().to_ascii_lowercase(),
            name,
            location: Location::line(line_at(source, doc_start + kind.start())),
        });
    }
    resources
}

fn compose_services(source: &str) -> Vec<InfraResource> {
    let Some(header) = COMPOSE_SERVICES.find(source) else {
        return Vec::new();
    };
    let mut resources = Vec::new();
    let mut offset = header.end();
    for line in source[header.end()..].split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() || trimmed.trim_start().starts_with('#') {
            continue;
        }
        if !trimmed.starts_with(' ') && !trimmed.starts_with('\t') {
            break;
        }
        if let Some(service) = COMPOSE_SERVICE.captures(trimmed).and_then(|c| c.get(1)) {
            resources.push(InfraResource {
                provider: "docker".to_string(),
                kind: "service".to_string(),
                name: Some(service.as_str().to_string()),
                location: Location::line(line_at(source, line_start)),
            });
        }
    }
    resources
}

fn sdk_references(imports: &[ImportRecord]) -> Vec<InfraResource> {
    imports
        .iter()
        .filter(|import| import.is_external)
        .filter_map(|import| {
            let module = import.module.to_ascii_lowercase();
            let provider = SDK_PROVIDERS.iter().find_map(|(provider, markers)| {
                markers
                    .iter()
                    .any(|m| module.starts_with(m) || (m.contains('/') && module.contains(m)))
                    .then_some(*provider)
            })?;
            Some(InfraResource {
                provider: provider.to_string(),
                kind: "sdk".to_string(),
                name: Some(import.module.clone()),
                location: import.location,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terraform_providers_and_resources() {
        let source = r#"provider "aws" {
  region = "us-east-1"
}

resource "aws_s3_bucket" "assets" {
  bucket = "assets"
}

data "google_project" "current" {}
"#;
        let found = extract(Path::new("main.tf"), source, Language::Terraform, &[]);
        let summary: Vec<_> = found
            .iter()
            .map(|r| (r.provider.as_str(), r.kind.as_str(), r.name.as_deref(), r.location.start_line))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("aws", "provider", None, 1),
                ("aws", "aws_s3_bucket", Some("assets"), 5),
                ("google", "google_project", Some("current"), 9),
            ]
        );
    }

    #[test]
    fn dockerfile_stages() {
        let source = "FROM node:20 AS build\nRUN npm ci\nfrom --platform=linux/amd64 nginx:alpine\n";
        let found = extract(Path::new("Dockerfile"), source, Language::Dockerfile, &[]);
        let images: Vec<_> = found.iter().filter_map(|r| r.name.as_deref()).collect();
        assert_eq!(images, vec!["node:20", "nginx:alpine"]);
        assert!(found.iter().all(|r| r.provider == "docker" && r.kind == "image"));
        assert_eq!(found[1].location.start_line, 3);
    }

    #[test]
    fn kubernetes_multi_document_manifest() {
        let source = "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n---\napiVersion: v1\nkind: Service\nmetadata:\n  name: web-svc\n";
        let found = extract(Path::new("k8s/web.yaml"), source, Language::Yaml, &[]);
        let kinds: Vec<_> = found
            .iter()
            .map(|r| (r.kind.as_str(), r.name.as_deref(), r.location.start_line))
            .collect();
        assert_eq!(
            kinds,
            vec![("deployment", Some("web"), 2), ("service", Some("web-svc"), 7)]
        );
    }

    #[test]
    fn compose_services_stop_at_next_top_level_key() {
        let source = "version: '3'\nservices:\n  api:\n    image: api\n  # worker disabled\n  db:\n    image: postgres\nvolumes:\n  data:\n";
        let found = extract(Path::new("docker-compose.yml"), source, Language::Yaml, &[]);
        let names: Vec<_> = found.iter().filter_map(|r| r.name.as_deref()).collect();
        assert_eq!(names, vec!["api", "db"]);
        assert_eq!(found[1].location.start_line, 6);
    }

    #[test]
    fn sdk_imports_map_to_providers() {
        let imports = vec![
            ImportRecord::new("boto3", Location::line(1)),
            ImportRecord::new("@google-cloud/storage", Location::line(2)),
            ImportRecord::new("react", Location::line(3)),
            ImportRecord::new("./docker", Location::line(4)),
        ];
        let found = extract(Path::new("app.py"), "", Language::Python, &imports);
        let providers: Vec<_> = found.iter().map(|r| r.provider.as_str()).collect();
        assert_eq!(providers, vec!["aws", "gcp"]);
        assert_eq!(found[1].location.start_line, 2);
    }
}
