// src/fs/mock.rs

use super::FileSystem;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEntry {
    File,
    Dir,
}

/// In-memory filesystem: a set of known paths, each a file or a directory.
///
/// Adding an entry implicitly adds all of its ancestors as directories.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), MockEntry::File);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), MockEntry::Dir);
    }

    fn insert(&self, path: &Path, entry: MockEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            entries
                .entry(ancestor.to_path_buf())
                .or_insert(MockEntry::Dir);
        }
        entries.insert(path.to_path_buf(), entry);
    }

    fn lookup(&self, path: &Path) -> Option<MockEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(path).copied()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.lookup(path).is_some()
    }

    fn is_file(&self, path: &Path) -> bool {
        self.lookup(path) == Some(MockEntry::File)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.lookup(path) == Some(MockEntry::Dir)
    }
}
