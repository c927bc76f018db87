//! Filesystem abstraction shared by the embedded tree and real directories.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                     FileSystem                         │
//! │   open_file / open / metadata / walk                   │
//! ├──────────────────┬──────────────────┬──────────────────┤
//! │ Manager          │ Dir              │ Resources        │
//! │ (in-memory tree) │ (real directory) │ (either, by env) │
//! └──────────────────┴──────────────────┴──────────────────┘
//! ```
//!
//! The archive codec only depends on this trait, so a bundle can be produced
//! from a real directory as well as from an already embedded tree.

mod dir;

use std::fs::Metadata;
use std::io::{Read, Seek, Write};

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::options::OpenOptions;

pub use dir::{Dir, DirFile};

// =============================================================================
// FileInfo
// =============================================================================

/// Stat information for a file or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    name: String,
    size: u64,
    is_dir: bool,
    modified: DateTime<Utc>,
}

impl FileInfo {
    /// Create file information.
    pub fn new(name: impl Into<String>, size: u64, is_dir: bool, modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            size,
            is_dir,
            modified,
        }
    }

    /// Build from std metadata of an on-disk entry.
    pub fn from_metadata(name: impl Into<String>, metadata: &Metadata) -> Self {
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let size = if metadata.is_dir() { 0 } else { metadata.len() };
        Self::new(name, size, metadata.is_dir(), modified)
    }

    /// Base name of the entry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Content length in bytes (0 for directories).
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether the entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Last modification time.
    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }
}

// =============================================================================
// Walk
// =============================================================================

/// Visitor outcome during a walk.
///
/// Aborting is expressed by returning `Err` from the visitor; the error is
/// handed back unchanged to the caller of `walk`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    /// Keep going.
    Continue,
    /// Do not descend into the current directory. Ignored for files.
    SkipDir,
}

// =============================================================================
// Traits
// =============================================================================

/// An open file handle.
pub trait File: Read + Write + Seek + Send {
    /// Stat the open entry.
    fn metadata(&self) -> Result<FileInfo>;
}

/// Primitives to work with a hierarchy of files.
///
/// Paths are slash-separated and rooted at `/`.
pub trait FileSystem: Send + Sync {
    /// Handle type returned by [`FileSystem::open_file`].
    type File: File;

    /// Generalized open call; most callers use [`FileSystem::open`].
    fn open_file(&self, path: &str, options: &OpenOptions) -> Result<Self::File>;

    /// Open an entry read-only.
    fn open(&self, path: &str) -> Result<Self::File> {
        self.open_file(path, &OpenOptions::new())
    }

    /// Stat an entry without opening it.
    fn metadata(&self, path: &str) -> Result<FileInfo>;

    /// Walk the hierarchy rooted at `path` in pre-order, calling `visitor`
    /// with the path and information of every entry, including `path` itself.
    fn walk<F>(&self, path: &str, visitor: F) -> Result<()>
    where
        F: FnMut(&str, &FileInfo) -> Result<WalkControl>;
}
