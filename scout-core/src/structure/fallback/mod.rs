//! Grammar-free structural analysis.
//!
//! Every scan here is a bounded pass over the text: no backtracking past the
//! end of input, no recursion on untrusted nesting depth. Malformed input
//! yields partial records, never an error or a panic.

mod blocks;
mod generic;
pub(crate) mod python;
mod script;

use crate::error::ScoutError;
use crate::language::Language;
use crate::structure::records::FileStructure;
use crate::structure::{infra, StructuralBackend};
use std::path::Path;

/// Regex, brace-matching and indentation backend covering every language
/// with structure. Config, script and IaC files get infrastructure records only.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackBackend;

impl StructuralBackend for FallbackBackend {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn supports(&self, language: Language) -> bool {
        language.is_structure_eligible()
    }

    fn analyze(&self, path: &Path, source: &str, language: Language) -> crate::Result<FileStructure> {
        if !self.supports(language) {
            return Err(ScoutError::UnsupportedLanguage {
                path: path.to_path_buf(),
                language: language.to_string(),
            });
        }

        let mut structure = match language {
            l if l.is_script_like() => script::analyze(source, language),
            Language::Python => python::analyze(source),
            Language::Rust => generic::analyze_rust(source),
            Language::Go => generic::analyze_go(source),
            _ => FileStructure::empty(language),
        };
        structure.infrastructure = infra::extract(path, source, language, &structure.imports);
        Ok(structure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_by_language() {
        let backend = FallbackBackend;
        let py = backend
            .analyze(Path::new("a.py"), "import boto3\ndef handler():\n    pass\n", Language::Python)
            .unwrap();
        assert_eq!(py.functions.len(), 1);
        assert_eq!(py.infrastructure[0].provider, "aws");

        let tf = backend
            .analyze(Path::new("main.tf"), "provider \"aws\" {}\n", Language::Terraform)
            .unwrap();
        assert!(tf.functions.is_empty());
        assert!(tf.has_infrastructure());

        let js = backend
            .analyze(Path::new("app.js"), "function start() {}\n", Language::JavaScript)
            .unwrap();
        assert_eq!(js.functions[0].name, "start");
    }

    #[test]
    fn prose_is_unsupported() {
        let err = FallbackBackend
            .analyze(Path::new("README.md"), "# Title", Language::Markdown)
            .unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_LANGUAGE");
    }
}
