//! Decode archive bytes into a staging resource tree.

use std::io::{self, Cursor, Read, Seek};
use std::sync::Arc;

use flate2::read::GzDecoder;
use tracing::{debug, warn};
use zip::ZipArchive;

use super::ArchiveFormat;
use crate::error::{Error, Result};
use crate::node::{self, Node};
use crate::path;

/// Decode `bytes` into a fresh tree rooted at `/`.
///
/// The tree is private to the caller until it is grafted, so entries that
/// collide within the same archive are reported here as
/// [`Error::DuplicatePath`].
pub(crate) fn extract(bytes: &[u8]) -> Result<Arc<Node>> {
    match ArchiveFormat::detect(bytes) {
        ArchiveFormat::TarGz => extract_tar_gz(bytes),
        ArchiveFormat::Zip => extract_zip(Cursor::new(bytes)),
    }
}

fn extract_tar_gz(bytes: &[u8]) -> Result<Arc<Node>> {
    let root = Node::root();
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    let mut files = 0usize;

    for entry in archive.entries().map_err(Error::invalid_archive)? {
        let mut entry = entry.map_err(Error::invalid_archive)?;
        let name = entry
            .path()
            .map_err(Error::invalid_archive)?
            .to_string_lossy()
            .into_owned();
        let name = checked_name(&name)?;

        let kind = entry.header().entry_type();
        if kind.is_dir() {
            node::insert_dir(&root, name)?;
        } else if kind.is_file() {
            let expected = entry.size();
            let mut content = Vec::with_capacity(usize::try_from(expected).unwrap_or(0));
            entry.read_to_end(&mut content).map_err(Error::invalid_archive)?;
            if content.len() as u64 != expected {
                return Err(Error::invalid_archive(format!("unexpected end of entry '{name}'")));
            }
            node::insert_file(&root, name, content)?;
            files += 1;
        } else {
            warn!(path = name, kind = ?kind, "skipping unsupported archive entry");
        }
    }

    // Drain the rest of the stream so a truncated or corrupt gzip trailer is
    // reported instead of being taken for a clean end.
    io::copy(&mut archive.into_inner(), &mut io::sink()).map_err(Error::invalid_archive)?;

    debug!(files, "decoded tar.gz archive");
    Ok(root)
}

/// Decode a ZIP archive located through its end-of-central-directory record.
pub(crate) fn extract_zip<R: Read + Seek>(reader: R) -> Result<Arc<Node>> {
    let root = Node::root();
    let mut archive = ZipArchive::new(reader).map_err(Error::invalid_archive)?;
    let mut files = 0usize;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(Error::invalid_archive)?;
        let name = entry.name().to_string();
        let name = checked_name(&name)?;

        if entry.is_dir() {
            node::insert_dir(&root, name)?;
        } else {
            let mut content = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
            entry.read_to_end(&mut content).map_err(Error::invalid_archive)?;
            node::insert_file(&root, name, content)?;
            files += 1;
        }
    }

    debug!(files, "decoded zip archive");
    Ok(root)
}

fn checked_name(name: &str) -> Result<&str> {
    if path::split(name).contains(&"..") {
        return Err(Error::InvalidPath {
            path: name.to_string(),
        });
    }
    Ok(name)
}
