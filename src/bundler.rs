//! Append a resource archive to an existing binary.
//!
//! ```text
//! ┌──────────────────────────┬────────────────────────────────┐
//! │ binary (offset bytes)    │ ZIP entries │ central directory│
//! └──────────────────────────┴────────────────────────────────┘
//!                            ▲
//!                            offset recorded in the ZIP trailer
//! ```
//!
//! The binary finds its resources at run time with
//! [`Manager::add_executable`](crate::Manager::add_executable), which reads
//! the ZIP trailer at the end of the file.

use std::io::{Seek, SeekFrom, Write};

use tracing::info;

use crate::archive::{ArchiveFormat, BundleInfo, Compressor};
use crate::config::CompressorConfig;
use crate::error::{Error, Result};
use crate::fs::{File, FileSystem};
use crate::options::OpenOptions;

/// Appends a ZIP archive of a source filesystem to a binary.
#[derive(Debug, Clone)]
pub struct Bundler {
    compressor: Compressor,
}

impl Default for Bundler {
    fn default() -> Self {
        Self::new(CompressorConfig::default())
    }
}

impl Bundler {
    /// Create a bundler. The archive format is always ZIP, whatever `config`
    /// asks for, since only ZIP can be located from the end of a file.
    pub fn new(config: CompressorConfig) -> Self {
        Self {
            compressor: Compressor::new(config.format(ArchiveFormat::Zip)),
        }
    }

    /// Append the resources of `source` to the file `name` of `target`.
    ///
    /// The bytes already in the file are left untouched. Returns `None`, and
    /// leaves the file as is, when `source` has nothing to bundle.
    pub fn bundle<S, T>(&self, source: &S, target: &T, name: &str) -> Result<Option<BundleInfo>>
    where
        S: FileSystem,
        T: FileSystem,
    {
        info!(binary = name, "bundling resources");

        if target.metadata(name)?.is_dir() {
            return Err(Error::NotRegularFile {
                path: name.to_string(),
            });
        }

        let mut binary = target.open_file(name, &OpenOptions::write_only())?;
        let offset = binary.metadata()?.size();
        binary.seek(SeekFrom::Start(offset))?;

        let bundle = self.compressor.compress_to(source, &mut binary, offset)?;
        binary.flush()?;

        if let Some(bundle) = &bundle {
            info!(binary = name, offset, files = bundle.count, "bundled resources");
        }
        Ok(bundle)
    }
}
