//! Process-wide resource manager.
//!
//! Generated resource modules register their bundle here at startup, and
//! application code reads it back through [`open`], [`root`] or [`resources`].
//!
//! # Development mode
//!
//! With [`Config::dev_mode`] set (see [`crate::config`]), [`resources`] serves
//! files straight from the source directory, so edits show up without
//! re-embedding.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::config::{self, Config};
use crate::error::Result;
use crate::fs::{Dir, DirFile, File, FileInfo, FileSystem, WalkControl};
use crate::manager::{Manager, ResourceFile};
use crate::options::OpenOptions;

/// Global manager shared by every registered bundle.
static MANAGER: LazyLock<Manager> = LazyLock::new(Manager::new);

/// The process-wide manager.
pub fn manager() -> &'static Manager {
    &MANAGER
}

/// Register an archive with the process-wide manager.
///
/// # Panics
///
/// Panics if the archive is corrupt or collides with resources registered
/// before. Both point at a broken build, not at a runtime condition.
pub fn add_resource(archive: &[u8]) {
    if let Err(err) = MANAGER.add(archive) {
        panic!("cannot register embedded resources: {err}");
    }
}

/// Open a registered resource for reading.
pub fn open(path: &str) -> Result<ResourceFile> {
    MANAGER.open(path)
}

/// A sub-manager of the process-wide manager rooted at `path`.
pub fn root(path: &str) -> Result<Manager> {
    MANAGER.root(path)
}

/// Resources for the current configuration: `dev_dir` on disk in development
/// mode, the embedded tree otherwise.
pub fn resources(dev_dir: impl Into<PathBuf>) -> Resources {
    resources_with(config::get(), dev_dir)
}

/// Like [`resources`], with an explicit configuration.
pub fn resources_with(config: &Config, dev_dir: impl Into<PathBuf>) -> Resources {
    if config.dev_mode {
        Resources::Dir(Dir::new(dev_dir))
    } else {
        Resources::Embedded(MANAGER.clone())
    }
}

// =============================================================================
// Resources
// =============================================================================

/// Either a real directory or the embedded tree.
#[derive(Debug, Clone)]
pub enum Resources {
    /// Files served from disk.
    Dir(Dir),
    /// Files served from the embedded tree.
    Embedded(Manager),
}

impl FileSystem for Resources {
    type File = ResourceHandle;

    fn open_file(&self, path: &str, options: &OpenOptions) -> Result<ResourceHandle> {
        match self {
            Self::Dir(dir) => dir.open_file(path, options).map(ResourceHandle::Dir),
            Self::Embedded(manager) => manager.open_file(path, options).map(ResourceHandle::Embedded),
        }
    }

    fn metadata(&self, path: &str) -> Result<FileInfo> {
        match self {
            Self::Dir(dir) => dir.metadata(path),
            Self::Embedded(manager) => manager.metadata(path),
        }
    }

    fn walk<F>(&self, path: &str, visitor: F) -> Result<()>
    where
        F: FnMut(&str, &FileInfo) -> Result<WalkControl>,
    {
        match self {
            Self::Dir(dir) => dir.walk(path, visitor),
            Self::Embedded(manager) => manager.walk(path, visitor),
        }
    }
}

/// Handle returned by [`Resources`].
#[derive(Debug)]
pub enum ResourceHandle {
    /// A file on disk.
    Dir(DirFile),
    /// An embedded resource.
    Embedded(ResourceFile),
}

impl Read for ResourceHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Dir(file) => file.read(buf),
            Self::Embedded(file) => file.read(buf),
        }
    }
}

impl Write for ResourceHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Dir(file) => file.write(buf),
            Self::Embedded(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Dir(file) => file.flush(),
            Self::Embedded(file) => file.flush(),
        }
    }
}

impl Seek for ResourceHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::Dir(file) => file.seek(pos),
            Self::Embedded(file) => file.seek(pos),
        }
    }
}

impl File for ResourceHandle {
    fn metadata(&self) -> Result<FileInfo> {
        match self {
            Self::Dir(file) => file.metadata(),
            Self::Embedded(file) => file.metadata(),
        }
    }
}
