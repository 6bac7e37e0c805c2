//! Language detection from file names and extensions

use serde::Serialize;
use std::path::Path;

/// Language of a project file, derived from its extension or well-known name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Rust,
    Go,
    Java,
    Shell,
    Json,
    Yaml,
    Toml,
    Ini,
    Terraform,
    Dockerfile,
    Markdown,
    Text,
    Unknown,
}

impl Language {
    pub fn from_path(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if file_name == "dockerfile"
            || file_name.starts_with("dockerfile.")
            || file_name.ends_with(".dockerfile")
        {
            return Self::Dockerfile;
        }
        if file_name == ".env" || file_name.starts_with(".env.") {
            return Self::Ini;
        }
        if matches!(file_name.as_str(), "makefile" | "jenkinsfile" | "justfile") {
            return Self::Shell;
        }

        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("ts" | "tsx" | "mts" | "cts") => Self::TypeScript,
            Some("js" | "jsx" | "mjs" | "cjs") => Self::JavaScript,
            Some("py" | "pyi") => Self::Python,
            Some("rs") => Self::Rust,
            Some("go") => Self::Go,
            Some("java" | "kt") => Self::Java,
            Some("sh" | "bash" | "zsh") => Self::Shell,
            Some("json") => Self::Json,
            Some("yaml" | "yml") => Self::Yaml,
            Some("toml") => Self::Toml,
            Some("ini" | "cfg" | "conf" | "env" | "properties") => Self::Ini,
            Some("tf" | "tfvars" | "hcl") => Self::Terraform,
            Some("md" | "markdown") => Self::Markdown,
            Some("txt" | "rst") => Self::Text,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::JavaScript => "javascript",
            Self::Python => "python",
            Self::Rust => "rust",
            Self::Go => "go",
            Self::Java => "java",
            Self::Shell => "shell",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Ini => "ini",
            Self::Terraform => "terraform",
            Self::Dockerfile => "dockerfile",
            Self::Markdown => "markdown",
            Self::Text => "text",
            Self::Unknown => "unknown",
        }
    }

    /// Programming languages with import/function structure
    pub fn is_source(self) -> bool {
        matches!(
            self,
            Self::TypeScript | Self::JavaScript | Self::Python | Self::Rust | Self::Go | Self::Java
        )
    }

    pub fn is_config(self) -> bool {
        matches!(self, Self::Json | Self::Yaml | Self::Toml | Self::Ini)
    }

    pub fn is_script(self) -> bool {
        matches!(self, Self::Shell)
    }

    /// Infrastructure-as-code formats
    pub fn is_iac(self) -> bool {
        matches!(self, Self::Terraform | Self::Dockerfile)
    }

    /// Whether structural signals may boost a file's relevance
    pub fn is_structure_eligible(self) -> bool {
        self.is_source() || self.is_config() || self.is_script() || self.is_iac()
    }

    /// JavaScript family, sharing one fallback analyzer
    pub fn is_script_like(self) -> bool {
        matches!(self, Self::TypeScript | Self::JavaScript)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_detection() {
        assert_eq!(Language::from_path(Path::new("src/app.tsx")), Language::TypeScript);
        assert_eq!(Language::from_path(Path::new("index.mjs")), Language::JavaScript);
        assert_eq!(Language::from_path(Path::new("pkg/mod.py")), Language::Python);
        assert_eq!(Language::from_path(Path::new("main.tf")), Language::Terraform);
        assert_eq!(Language::from_path(Path::new("README.md")), Language::Markdown);
        assert_eq!(Language::from_path(Path::new("data.csv")), Language::Unknown);
    }

    #[test]
    fn well_known_file_names() {
        assert_eq!(Language::from_path(Path::new("Dockerfile")), Language::Dockerfile);
        assert_eq!(Language::from_path(Path::new("api.Dockerfile")), Language::Dockerfile);
        assert_eq!(Language::from_path(Path::new("Dockerfile.prod")), Language::Dockerfile);
        assert_eq!(Language::from_path(Path::new(".env.local")), Language::Ini);
        assert_eq!(Language::from_path(Path::new("Makefile")), Language::Shell);
    }

    #[test]
    fn structure_eligibility() {
        assert!(Language::Python.is_structure_eligible());
        assert!(Language::Yaml.is_structure_eligible());
        assert!(Language::Dockerfile.is_structure_eligible());
        assert!(!Language::Markdown.is_structure_eligible());
        assert!(!Language::Unknown.is_structure_eligible());
        assert!(Language::TypeScript.is_script_like());
        assert!(!Language::Python.is_script_like());
    }
}
