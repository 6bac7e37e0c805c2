//! Per-file structural analysis
//!
//! A [`StructuralAnalyzer`] holds an optional grammar backend and the
//! always-available fallback. Results are tagged with the backend quality
//! they were produced at, so callers can tell a tree-sitter parse from a
//! heuristic one.

pub mod fallback;
#[cfg(feature = "grammar")]
pub mod grammar;
pub mod infra;
pub mod manifest;
pub mod records;

use crate::language::Language;
use crate::walker::WalkOptions;
use fallback::FallbackBackend;
use records::{
    ClassRecord, DependencyRecord, ExportRecord, FileStructure, FunctionRecord, ImportRecord,
    StructuralAnalysis,
};
use std::path::Path;
use tracing::debug;

/// A way of turning source text into a [`FileStructure`].
pub trait StructuralBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports(&self, language: Language) -> bool;

    fn analyze(&self, path: &Path, source: &str, language: Language) -> crate::Result<FileStructure>;
}

pub struct StructuralAnalyzer {
    grammar: Option<Box<dyn StructuralBackend>>,
    fallback: FallbackBackend,
}

impl StructuralAnalyzer {
    pub fn new(grammar: Option<Box<dyn StructuralBackend>>) -> Self {
        Self {
            grammar,
            fallback: FallbackBackend,
        }
    }

    pub fn fallback_only() -> Self {
        Self::new(None)
    }

    /// Tree-sitter when the `grammar` feature is enabled and its grammars
    /// load, the fallback otherwise.
    pub fn with_default_backend() -> Self {
        #[cfg(feature = "grammar")]
        let grammar = grammar::TreeSitterBackend::load()
            .map(|backend| Box::new(backend) as Box<dyn StructuralBackend>);
        #[cfg(not(feature = "grammar"))]
        let grammar = None;

        if grammar.is_none() {
            debug!("No grammar backend available, using fallback analysis only");
        }
        Self::new(grammar)
    }

    pub fn has_grammar(&self) -> bool {
        self.grammar.is_some()
    }

    /// Analyze `source` as the file at `path`.
    ///
    /// A grammar failure is retried with the fallback. Languages without
    /// structure fail with `UnsupportedLanguage`.
    pub fn analyze(&self, path: &Path, source: &str) -> crate::Result<StructuralAnalysis> {
        let language = Language::from_path(path);

        if let Some(grammar) = self.grammar.as_deref().filter(|g| g.supports(language)) {
            match grammar.analyze(path, source, language) {
                Ok(structure) => return Ok(StructuralAnalysis::Grammar(structure)),
                Err(e) => debug!(
                    "{} backend failed on {}, retrying with fallback: {}",
                    grammar.name(),
                    path.display(),
                    e
                ),
            }
        }

        self.fallback
            .analyze(path, source, language)
            .map(StructuralAnalysis::Fallback)
    }

    /// Read and analyze a file from disk.
    pub fn analyze_file(&self, path: &Path) -> crate::Result<StructuralAnalysis> {
        let source = std::fs::read_to_string(path)?;
        self.analyze(path, &source)
    }

    pub fn get_imports(&self, path: &Path, source: &str) -> crate::Result<Vec<ImportRecord>> {
        Ok(self.analyze(path, source)?.into_structure().imports)
    }

    pub fn get_exports(&self, path: &Path, source: &str) -> crate::Result<Vec<ExportRecord>> {
        Ok(self.analyze(path, source)?.into_structure().exports)
    }

    pub fn get_functions(&self, path: &Path, source: &str) -> crate::Result<Vec<FunctionRecord>> {
        Ok(self.analyze(path, source)?.into_structure().functions)
    }

    pub fn get_classes(&self, path: &Path, source: &str) -> crate::Result<Vec<ClassRecord>> {
        Ok(self.analyze(path, source)?.into_structure().classes)
    }

    /// Dependencies declared by every manifest under `root`, sorted.
    pub fn project_dependencies(
        &self,
        root: &Path,
        options: WalkOptions,
    ) -> crate::Result<Vec<DependencyRecord>> {
        manifest::project_dependencies(root, options)
    }
}

impl Default for StructuralAnalyzer {
    fn default() -> Self {
        Self::with_default_backend()
    }
}
