//! # stowage
//!
//! Embed resource files into a Rust program and read them back through a
//! filesystem-like API.
//!
//! - **Build time**: a directory is compressed into a TAR+gzip or ZIP bundle,
//!   which is either emitted as a Rust source module ([`Emitter`]) or appended
//!   to a compiled binary ([`Bundler`]).
//! - **Run time**: the bundle is handed to a [`Manager`], which rebuilds the
//!   tree in memory and serves `open`, `open_file`, `walk` and `root` calls
//!   the way a real filesystem would.
//!
//! ## Quick Start
//!
//! ```
//! use std::io::{Read, Write};
//! use stowage::{Compressor, CompressorConfig, Manager, OpenOptions};
//!
//! // A tree to bundle (usually a real directory through `stowage::Dir`)
//! let source = Manager::new();
//! source
//!     .open_file("/greeting.txt", &OpenOptions::write_only().create(true))?
//!     .write_all(b"hello")?;
//!
//! // Build time: compress
//! let bundle = Compressor::new(CompressorConfig::new("assets"))
//!     .compress(&source)?
//!     .expect("one file to embed");
//!
//! // Run time: register and read
//! let resources = Manager::new();
//! resources.add(&bundle.body)?;
//!
//! let mut content = String::new();
//! resources.open("/greeting.txt")?.read_to_string(&mut content)?;
//! assert_eq!(content, "hello");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Modules
//!
//! - [`manager`]: the in-memory filesystem
//! - [`archive`]: the archive codec
//! - [`bundler`]: appending bundles to binaries
//! - [`generate`]: emitting bundles as Rust source
//! - [`global`]: the process-wide manager used by generated modules
//! - [`config`]: runtime and codec configuration
//! - [`fs`]: the filesystem traits and the real-directory adapter
//!
//! ## Features
//!
//! - `parallel` (default): read file contents with rayon while compressing

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod archive;
pub mod bundler;
pub mod config;
pub mod error;
pub mod fs;
pub mod generate;
pub mod global;
pub mod manager;
pub mod node;
pub mod options;
pub mod path;
pub mod prelude;

#[cfg(test)]
mod fixture;

// =============================================================================
// Manager
// =============================================================================

pub use manager::{Manager, ResourceFile};
pub use options::{AccessMode, OpenOptions};

// =============================================================================
// Filesystem
// =============================================================================

pub use fs::{Dir, DirFile, File, FileInfo, FileSystem, WalkControl};

// =============================================================================
// Codec
// =============================================================================

pub use archive::{ArchiveFormat, Bundle, BundleInfo, Compressor};
pub use bundler::Bundler;
pub use generate::{Emitter, Generator, GeneratorConfig};

// =============================================================================
// Infrastructure
// =============================================================================

pub use config::{CompressorConfig, Config, ConfigBuilder};
pub use error::{Error, Result};
pub use global::{Resources, add_resource};
