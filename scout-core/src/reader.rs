//! File content access for the search engine

use std::io;
use std::path::Path;

/// Source of file contents during a search.
///
/// Injected into [`crate::SearchEngine`] so callers can serve contents from
/// an editor buffer or count reads in tests.
pub trait ContentReader: Send + Sync {
    fn read(&self, path: &Path) -> io::Result<String>;
}

/// Reads straight from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl ContentReader for FsReader {
    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}
