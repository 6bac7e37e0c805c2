//! Structural records extracted from source files

use crate::language::Language;
use serde::Serialize;

/// 1-indexed line span in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub start_line: usize,
    pub end_line: usize,
}

impl Location {
    pub fn line(line: usize) -> Self {
        Self {
            start_line: line,
            end_line: line,
        }
    }

    pub fn span(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line: end_line.max(start_line),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRecord {
    pub module: String,
    /// No relative-path prefix; heuristically outside the project
    pub is_external: bool,
    pub location: Location,
}

impl ImportRecord {
    pub fn new(module: impl Into<String>, location: Location) -> Self {
        let module = module.into();
        let is_external = is_external_module(&module);
        Self {
            module,
            is_external,
            location,
        }
    }
}

/// A module reference is internal when it starts with `.` or `/`
pub fn is_external_module(module: &str) -> bool {
    !(module.starts_with('.') || module.starts_with('/'))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Function,
    Class,
    Const,
    Type,
    Interface,
    Default,
    Variable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRecord {
    pub name: String,
    pub kind: ExportKind,
    pub location: Location,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionRecord {
    pub name: String,
    pub location: Location,
    pub is_async: bool,
    /// Name suggests auth, secrets or crypto; a hint, not a guarantee
    pub is_security_sensitive: bool,
}

impl FunctionRecord {
    pub fn new(name: impl Into<String>, location: Location, is_async: bool) -> Self {
        let name = name.into();
        let is_security_sensitive = is_security_sensitive_name(&name);
        Self {
            name,
            location,
            is_async,
            is_security_sensitive,
        }
    }
}

const SECURITY_TERMS: &[&str] = &[
    "auth",
    "login",
    "logout",
    "password",
    "passwd",
    "secret",
    "token",
    "credential",
    "crypt",
    "hash",
    "signature",
    "verify",
    "permission",
    "privilege",
    "session",
    "sanitize",
    "apikey",
    "api_key",
    "oauth",
    "jwt",
];

pub fn is_security_sensitive_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SECURITY_TERMS.iter().any(|term| lower.contains(term))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    Class,
    Interface,
    Type,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassRecord {
    pub name: String,
    pub kind: ClassKind,
    pub methods: Vec<String>,
    pub properties: Vec<String>,
    pub location: Location,
    pub exported: bool,
}

/// Cloud or container resource declared or referenced by a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfraResource {
    /// e.g. `aws`, `docker`, `kubernetes`
    pub provider: String,
    /// e.g. `aws_s3_bucket`, `deployment`, `image`
    pub kind: String,
    pub name: Option<String>,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Production,
    Development,
    Peer,
    Optional,
    Build,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyRecord {
    pub name: String,
    /// `*` when the manifest pins nothing
    pub version: String,
    pub kind: DependencyKind,
    /// Root-relative manifest path
    pub source: String,
}

/// Everything extracted from one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileStructure {
    pub language: Language,
    pub imports: Vec<ImportRecord>,
    pub exports: Vec<ExportRecord>,
    pub functions: Vec<FunctionRecord>,
    pub classes: Vec<ClassRecord>,
    pub infrastructure: Vec<InfraResource>,
}

impl FileStructure {
    pub fn empty(language: Language) -> Self {
        Self {
            language,
            imports: Vec::new(),
            exports: Vec::new(),
            functions: Vec::new(),
            classes: Vec::new(),
            infrastructure: Vec::new(),
        }
    }

    pub fn has_infrastructure(&self) -> bool {
        !self.infrastructure.is_empty()
    }

    /// Distinct lower-cased provider and resource-kind names
    pub fn infrastructure_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for resource in &self.infrastructure {
            for name in [&resource.provider, &resource.kind] {
                let lower = name.to_ascii_lowercase();
                if !lower.is_empty() && !names.contains(&lower) {
                    names.push(lower);
                }
            }
        }
        names
    }
}

/// Which backend produced a structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisQuality {
    Grammar,
    Fallback,
}

/// Structural result tagged with the quality level it was produced at
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "quality", content = "structure", rename_all = "lowercase")]
pub enum StructuralAnalysis {
    Grammar(FileStructure),
    Fallback(FileStructure),
}

impl StructuralAnalysis {
    pub fn structure(&self) -> &FileStructure {
        match self {
            Self::Grammar(s) | Self::Fallback(s) => s,
        }
    }

    pub fn into_structure(self) -> FileStructure {
        match self {
            Self::Grammar(s) | Self::Fallback(s) => s,
        }
    }

    pub fn quality(&self) -> AnalysisQuality {
        match self {
            Self::Grammar(_) => AnalysisQuality::Grammar,
            Self::Fallback(_) => AnalysisQuality::Fallback,
        }
    }
}

/// Lightweight digest attached to search matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseSummary {
    pub language: Language,
    pub has_infrastructure: bool,
    pub function_count: usize,
    pub import_count: usize,
    pub quality: AnalysisQuality,
}

impl From<&StructuralAnalysis> for ParseSummary {
    fn from(analysis: &StructuralAnalysis) -> Self {
        let structure = analysis.structure();
        Self {
            language: structure.language,
            has_infrastructure: structure.has_infrastructure(),
            function_count: structure.functions.len(),
            import_count: structure.imports.len(),
            quality: analysis.quality(),
        }
    }
}

/// 1-indexed line number of a byte offset
pub fn line_at(source: &str, offset: usize) -> usize {
    let mut end = offset.min(source.len());
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    source[..end].bytes().filter(|&b| b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_modules_are_internal() {
        assert!(ImportRecord::new("react", Location::line(1)).is_external);
        assert!(ImportRecord::new("@scope/pkg", Location::line(1)).is_external);
        assert!(!ImportRecord::new("./util", Location::line(1)).is_external);
        assert!(!ImportRecord::new("../lib/x", Location::line(1)).is_external);
        assert!(!ImportRecord::new(".models", Location::line(1)).is_external);
    }

    #[test]
    fn security_tag_is_name_based() {
        assert!(FunctionRecord::new("verifyJwtToken", Location::line(3), false).is_security_sensitive);
        assert!(FunctionRecord::new("hash_password", Location::line(3), false).is_security_sensitive);
        assert!(!FunctionRecord::new("render_list", Location::line(3), false).is_security_sensitive);
    }

    #[test]
    fn line_at_counts_newlines() {
        let source = "a\nb\nc";
        assert_eq!(line_at(source, 0), 1);
        assert_eq!(line_at(source, 2), 2);
        assert_eq!(line_at(source, 4), 3);
        assert_eq!(line_at(source, 100), 3);
    }

    #[test]
    fn infrastructure_names_are_distinct() {
        let mut structure = FileStructure::empty(Language::Terraform);
        for kind in ["aws_s3_bucket", "aws_s3_bucket"] {
            structure.infrastructure.push(InfraResource {
                provider: "aws".into(),
                kind: kind.into(),
                name: None,
                location: Location::line(1),
            });
        }
        assert_eq!(structure.infrastructure_names(), vec!["aws", "aws_s3_bucket"]);
    }
}
