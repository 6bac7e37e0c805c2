//! Project walker: deterministic inventory of a project tree.

use crate::config::Config;
use crate::language::Language;
use ignore::WalkBuilder;
use serde::Serialize;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One walked entry, addressed relative to the project root
#[derive(Debug, Clone, Serialize)]
pub struct WalkEntry {
    /// Root-relative path with `/` separators
    pub path: String,
    pub kind: EntryKind,
    pub extension: Option<String>,
    pub language: Language,
    pub size: u64,
}

impl WalkEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Final path segment
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Walk settings
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Names excluded by exact path-segment match
    pub exclude: HashSet<String>,
    pub include_hidden: bool,
    pub max_depth: usize,
    pub respect_gitignore: bool,
}

impl WalkOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            exclude: config.ignore.names.iter().cloned().collect(),
            include_hidden: config.walk.include_hidden,
            max_depth: config.walk.max_depth,
            respect_gitignore: config.walk.respect_gitignore,
        }
    }
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct ProjectWalker {
    root: PathBuf,
    options: WalkOptions,
}

impl ProjectWalker {
    pub fn new(root: impl AsRef<Path>, options: WalkOptions) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            options,
        }
    }

    /// Walk the tree. Fails only when the root itself is not a directory;
    /// unreadable entries below it are skipped.
    pub fn walk(&self) -> crate::Result<Vec<WalkEntry>> {
        if !self.root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("project root {} is not a directory", self.root.display()),
            )
            .into());
        }

        let respect = self.options.respect_gitignore;
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(!self.options.include_hidden)
            .git_ignore(respect)
            .git_global(respect)
            .git_exclude(respect)
            .ignore(respect)
            .parents(respect)
            .max_depth(Some(self.options.max_depth))
            .sort_by_file_name(|a, b| a.cmp(b));

        let excluded = self.options.exclude.clone();
        builder.filter_entry(move |entry| {
            entry.depth() == 0
                || !entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| excluded.contains(name))
        });

        let mut entries = Vec::new();
        for result in builder.build() {
            let entry = match result {
                Ok(e) => e,
                Err(e) => {
                    debug!("skipping unreadable entry: {e}");
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }

            let Some(file_type) = entry.file_type() else {
                continue;
            };
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                continue;
            };

            let path = entry.path();
            let size = match kind {
                EntryKind::File => entry.metadata().map(|m| m.len()).unwrap_or(0),
                EntryKind::Directory => 0,
            };
            let (extension, language) = match kind {
                EntryKind::File => (
                    path.extension()
                        .and_then(|e| e.to_str())
                        .map(|e| e.to_ascii_lowercase()),
                    Language::from_path(path),
                ),
                EntryKind::Directory => (None, Language::Unknown),
            };

            entries.push(WalkEntry {
                path: normalize_path(&self.root, path),
                kind,
                extension,
                language,
                size,
            });
        }

        debug!(
            "walked {} entries under {}",
            entries.len(),
            self.root.display()
        );
        Ok(entries)
    }
}

/// Root-relative, `/`-separated form of `path`; the key candidates dedup on.
pub fn normalize_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
