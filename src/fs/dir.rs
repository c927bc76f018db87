//! Pass-through adapter over a real directory.

use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::{File, FileInfo, FileSystem, WalkControl};
use crate::error::{Error, Result};
use crate::options::{AccessMode, OpenOptions};
use crate::path;

/// A real directory tree exposed as a [`FileSystem`].
///
/// Paths are resolved below the root; `..` segments are rejected. Walks are
/// pre-order with children in lexical order, and symbolic links are neither
/// followed nor reported.
#[derive(Debug, Clone)]
pub struct Dir {
    root: PathBuf,
}

impl Dir {
    /// Create an adapter rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory on disk.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let mut resolved = self.root.clone();
        for segment in path::split(path) {
            if segment == ".." {
                return Err(Error::InvalidPath {
                    path: path.to_string(),
                });
            }
            resolved.push(segment);
        }
        Ok(resolved)
    }
}

impl FileSystem for Dir {
    type File = DirFile;

    fn open_file(&self, path: &str, options: &OpenOptions) -> Result<DirFile> {
        options.validate()?;
        let target = self.resolve(path)?;

        if options.is_writable() && target.is_dir() {
            return Err(Error::IsDirectory {
                path: path.to_string(),
            });
        }

        if options.creates()
            && let Some(parent) = target.parent()
        {
            fs::create_dir_all(parent)?;
        }

        // std needs write access to create or truncate; the handle still
        // enforces the requested access mode.
        let access = options.access_mode();
        let file = fs::OpenOptions::new()
            .read(access.readable())
            .write(access.writable() || options.creates() || options.truncates())
            .append(options.appends())
            .truncate(options.truncates())
            .create(options.creates() && options.truncates())
            .create_new(options.creates() && !options.truncates())
            .open(&target)
            .map_err(|e| Error::from_io(e, path))?;

        Ok(DirFile {
            file,
            name: path::base_name(path).to_string(),
            access,
        })
    }

    fn metadata(&self, path: &str) -> Result<FileInfo> {
        let target = self.resolve(path)?;
        let metadata = fs::metadata(&target).map_err(|e| Error::from_io(e, path))?;
        Ok(FileInfo::from_metadata(path::base_name(path), &metadata))
    }

    fn walk<F>(&self, path: &str, mut visitor: F) -> Result<()>
    where
        F: FnMut(&str, &FileInfo) -> Result<WalkControl>,
    {
        let target = self.resolve(path)?;
        let info = self.metadata(path)?;
        walk_disk(&target, path, &info, &mut visitor)
    }
}

fn walk_disk<F>(disk: &Path, path: &str, info: &FileInfo, visitor: &mut F) -> Result<()>
where
    F: FnMut(&str, &FileInfo) -> Result<WalkControl>,
{
    let control = visitor(path, info)?;
    if !info.is_dir() || control == WalkControl::SkipDir {
        return Ok(());
    }

    let mut entries = fs::read_dir(disk)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let metadata = entry.metadata()?;
        if metadata.file_type().is_symlink() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let child = FileInfo::from_metadata(name.as_str(), &metadata);
        walk_disk(&entry.path(), &path::join(path, &name), &child, visitor)?;
    }

    Ok(())
}

// =============================================================================
// DirFile
// =============================================================================

/// Handle to a file inside a [`Dir`].
#[derive(Debug)]
pub struct DirFile {
    file: fs::File,
    name: String,
    access: AccessMode,
}

impl Read for DirFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.access.readable() {
            return Err(Error::WriteOnly.into());
        }
        self.file.read(buf)
    }
}

impl Write for DirFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.access.writable() {
            return Err(Error::ReadOnly.into());
        }
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for DirFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl File for DirFile {
    fn metadata(&self) -> Result<FileInfo> {
        let metadata = self.file.metadata()?;
        Ok(FileInfo::from_metadata(self.name.as_str(), &metadata))
    }
}
