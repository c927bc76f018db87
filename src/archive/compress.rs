//! Serialize a [`FileSystem`] into a TAR+gzip or ZIP archive.

use std::io::{self, Cursor, Read, Seek, Write};

use chrono::{Datelike, Timelike};
use flate2::Compression;
use flate2::write::GzEncoder;
use glob::{MatchOptions, Pattern};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::ArchiveFormat;
use super::offset::OffsetWriter;
use crate::config::CompressorConfig;
use crate::error::{Error, Result};
use crate::fs::{FileInfo, FileSystem, WalkControl};
use crate::path;

/// Pattern that is always ignored, so an emitted source module is never
/// bundled into itself.
pub const IMPLICIT_IGNORE: &str = "*.rs";

// =============================================================================
// Bundle
// =============================================================================

/// An archive produced in memory by [`Compressor::compress`].
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Bundle name from the configuration.
    pub name: String,
    /// Number of files written (directories are not counted).
    pub count: usize,
    /// Archive bytes.
    pub body: Vec<u8>,
}

/// An archive written into a caller-provided stream by
/// [`Compressor::compress_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleInfo {
    /// Bundle name from the configuration.
    pub name: String,
    /// Number of files written.
    pub count: usize,
    /// Position at which the archive starts in the destination file.
    pub offset: u64,
}

// =============================================================================
// Compressor
// =============================================================================

struct Entry {
    source: String,
    name: String,
    info: FileInfo,
}

/// Walks a source filesystem and writes the surviving entries into an archive.
///
/// ```
/// use stowage::{Compressor, CompressorConfig, Manager};
///
/// let compressor = Compressor::new(CompressorConfig::new("empty"));
/// assert!(compressor.compress(&Manager::new())?.is_none());
/// # Ok::<(), stowage::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Compressor {
    config: CompressorConfig,
}

impl Compressor {
    /// Create a compressor.
    pub fn new(config: CompressorConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &CompressorConfig {
        &self.config
    }

    /// Compress `source` into an in-memory archive.
    ///
    /// Returns `None` when no file survives filtering.
    pub fn compress<S: FileSystem>(&self, source: &S) -> Result<Option<Bundle>> {
        let Some((entries, contents)) = self.prepare(source)? else {
            return Ok(None);
        };

        let body = self
            .write(&entries, &contents, Cursor::new(Vec::new()), 0)?
            .into_inner();
        Ok(Some(Bundle {
            name: self.config.name().to_string(),
            count: file_count(&entries),
            body,
        }))
    }

    /// Compress `source` into `writer`, starting at its current position.
    ///
    /// `offset` is the absolute position in the destination file at which the
    /// archive starts. ZIP headers record offsets relative to it, so the
    /// archive stays readable when the bytes before `offset` are unrelated
    /// data. Returns `None`, without touching `writer`, when no file survives
    /// filtering.
    pub fn compress_to<S, W>(&self, source: &S, writer: W, offset: u64) -> Result<Option<BundleInfo>>
    where
        S: FileSystem,
        W: Write + Seek,
    {
        let Some((entries, contents)) = self.prepare(source)? else {
            return Ok(None);
        };

        self.write(&entries, &contents, writer, offset)?;
        Ok(Some(BundleInfo {
            name: self.config.name().to_string(),
            count: file_count(&entries),
            offset,
        }))
    }

    fn prepare<S: FileSystem>(&self, source: &S) -> Result<Option<(Vec<Entry>, Vec<Vec<u8>>)>> {
        let filter = Filter::new(&self.config)?;
        let entries = collect(source, &filter)?;
        if file_count(&entries) == 0 {
            debug!(name = self.config.name(), "nothing to bundle");
            return Ok(None);
        }

        let contents = read_contents(source, &entries)?;
        Ok(Some((entries, contents)))
    }

    fn write<W: Write + Seek>(
        &self,
        entries: &[Entry],
        contents: &[Vec<u8>],
        writer: W,
        offset: u64,
    ) -> Result<W> {
        let writer = match self.config.archive_format() {
            ArchiveFormat::TarGz => write_tar_gz(writer, entries, contents)?,
            ArchiveFormat::Zip => {
                let writer = OffsetWriter::new(writer, offset)?;
                write_zip(writer, entries, contents)?.into_inner()
            }
        };

        debug!(
            name = self.config.name(),
            files = file_count(entries),
            format = ?self.config.archive_format(),
            "compressed bundle"
        );
        Ok(writer)
    }
}

fn file_count(entries: &[Entry]) -> usize {
    entries.iter().filter(|entry| !entry.info.is_dir()).count()
}

// =============================================================================
// Filtering
// =============================================================================

/// Shell matching: `*`, `?` and `[...]` never match `/`.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

struct Filter {
    patterns: Vec<Pattern>,
    recursive: bool,
}

impl Filter {
    fn new(config: &CompressorConfig) -> Result<Self> {
        let patterns = config
            .ignore_patterns()
            .iter()
            .map(String::as_str)
            .chain([IMPLICIT_IGNORE])
            .map(|pattern| {
                Pattern::new(pattern).map_err(|source| Error::Pattern {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .collect::<Result<_>>()?;

        Ok(Self {
            patterns,
            recursive: config.is_recursive(),
        })
    }

    fn is_ignored(&self, relative: &str, name: &str) -> bool {
        self.patterns.iter().any(|pattern| {
            pattern.matches_with(relative, MATCH_OPTIONS) || pattern.matches_with(name, MATCH_OPTIONS)
        })
    }
}

fn collect<S: FileSystem>(source: &S, filter: &Filter) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    source.walk(path::SEPARATOR, |path, info| {
        let relative = path::relative(path);
        if relative.is_empty() {
            return Ok(WalkControl::Continue);
        }

        if filter.is_ignored(relative, info.name()) {
            debug!(path = relative, "ignored");
            return Ok(if info.is_dir() {
                WalkControl::SkipDir
            } else {
                WalkControl::Continue
            });
        }
        if info.is_dir() && !filter.recursive {
            return Ok(WalkControl::SkipDir);
        }

        debug!(path = relative, "adding");
        entries.push(Entry {
            source: path.to_string(),
            name: relative.to_string(),
            info: info.clone(),
        });
        Ok(WalkControl::Continue)
    })?;
    Ok(entries)
}

// =============================================================================
// Reading
// =============================================================================

fn read_entry<S: FileSystem>(source: &S, entry: &Entry) -> Result<Vec<u8>> {
    if entry.info.is_dir() {
        return Ok(Vec::new());
    }
    let mut content = Vec::new();
    source.open(&entry.source)?.read_to_end(&mut content)?;
    Ok(content)
}

#[cfg(feature = "parallel")]
fn read_contents<S: FileSystem>(source: &S, entries: &[Entry]) -> Result<Vec<Vec<u8>>> {
    use rayon::prelude::*;

    entries
        .par_iter()
        .map(|entry| read_entry(source, entry))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn read_contents<S: FileSystem>(source: &S, entries: &[Entry]) -> Result<Vec<Vec<u8>>> {
    entries.iter().map(|entry| read_entry(source, entry)).collect()
}

// =============================================================================
// Writers
// =============================================================================

fn write_tar_gz<W: Write>(writer: W, entries: &[Entry], contents: &[Vec<u8>]) -> Result<W> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (entry, content) in entries.iter().zip(contents) {
        let mut header = tar::Header::new_gnu();
        header.set_mtime(u64::try_from(entry.info.modified().timestamp()).unwrap_or(0));
        if entry.info.is_dir() {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_mode(0o755);
            header.set_size(0);
            builder.append_data(&mut header, &entry.name, io::empty())?;
        } else {
            header.set_entry_type(tar::EntryType::Regular);
            header.set_mode(0o644);
            header.set_size(content.len() as u64);
            builder.append_data(&mut header, &entry.name, content.as_slice())?;
        }
    }

    Ok(builder.into_inner()?.finish()?)
}

fn write_zip<W: Write + Seek>(writer: W, entries: &[Entry], contents: &[Vec<u8>]) -> Result<W> {
    let mut zip = ZipWriter::new(writer);

    for (entry, content) in entries.iter().zip(contents) {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip_time(entry.info.modified()));
        if entry.info.is_dir() {
            zip.add_directory(entry.name.as_str(), options)?;
        } else {
            zip.start_file(entry.name.as_str(), options)?;
            zip.write_all(content)?;
        }
    }

    Ok(zip.finish()?)
}

/// ZIP timestamps cover 1980..=2107; anything else falls back to 1980-01-01.
fn zip_time(modified: chrono::DateTime<chrono::Utc>) -> zip::DateTime {
    let time = modified.naive_utc();
    u16::try_from(time.year())
        .ok()
        .and_then(|year| {
            zip::DateTime::from_date_and_time(
                year,
                time.month() as u8,
                time.day() as u8,
                time.hour() as u8,
                time.minute() as u8,
                time.second() as u8,
            )
            .ok()
        })
        .unwrap_or_default()
}
