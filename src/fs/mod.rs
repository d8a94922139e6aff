// src/fs/mod.rs

//! Filesystem queries used while validating a run configuration.
//!
//! The builder only asks questions about paths; it never reads or writes.
//! Keeping these behind a trait lets the validation rules be tested without
//! touching the disk.

use std::fmt::Debug;
use std::path::Path;

pub mod mock;

/// Abstract, read-only view of the filesystem.
pub trait FileSystem: Send + Sync + Debug {
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
}

/// Implementation that uses `std::fs` metadata.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}
