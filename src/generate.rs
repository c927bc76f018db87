//! Rust source module embedding a resource bundle.
//!
//! The emitted module looks like:
//!
//! ```text
//! pub static RESOURCE: &[u8] = &[
//!     31, 139, 8, 0, ...
//! ];
//!
//! pub fn register() {
//!     stowage::add_resource(RESOURCE);
//! }
//! ```
//!
//! Include it with `mod resource;` and call `resource::register()` at startup.

use std::io::Write;

use chrono::Utc;
use tracing::info;

use crate::archive::{Bundle, Compressor};
use crate::config::CompressorConfig;
use crate::error::Result;
use crate::fs::FileSystem;
use crate::options::OpenOptions;
use crate::path;

const BYTES_PER_LINE: usize = 16;

/// Settings of the source module.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// File name of the module in the target directory.
    pub file_name: String,
    /// Emit doc comments and a generation header.
    pub include_docs: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            file_name: "resource.rs".to_string(),
            include_docs: true,
        }
    }
}

// =============================================================================
// Generator
// =============================================================================

/// Renders a [`Bundle`] as Rust source.
#[derive(Debug, Clone, Default)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    /// Create a generator.
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Write the module for `bundle` to `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W, bundle: &Bundle) -> Result<()> {
        let docs = self.config.include_docs;

        if docs {
            writeln!(writer, "// Code generated by stowage. DO NOT EDIT.")?;
            writeln!(writer, "// Generated at {}.", Utc::now().to_rfc2822())?;
            writeln!(writer)?;
            writeln!(writer, "/// Bundle `{}`: {} file(s).", bundle.name, bundle.count)?;
        }
        writeln!(writer, "pub static RESOURCE: &[u8] = &[")?;
        for line in bundle.body.chunks(BYTES_PER_LINE) {
            let bytes: Vec<String> = line.iter().map(u8::to_string).collect();
            writeln!(writer, "    {},", bytes.join(", "))?;
        }
        writeln!(writer, "];")?;
        writeln!(writer)?;

        if docs {
            writeln!(writer, "/// Register [`RESOURCE`] with the process-wide resource manager.")?;
        }
        writeln!(writer, "pub fn register() {{")?;
        writeln!(writer, "    stowage::add_resource(RESOURCE);")?;
        writeln!(writer, "}}")?;

        writer.flush()?;
        Ok(())
    }
}

// =============================================================================
// Emitter
// =============================================================================

/// Compresses a source filesystem and writes the generated module into a
/// target filesystem.
#[derive(Debug, Clone, Default)]
pub struct Emitter {
    compressor: Compressor,
    generator: Generator,
}

impl Emitter {
    /// Create an emitter.
    pub fn new(compressor: CompressorConfig, generator: GeneratorConfig) -> Self {
        Self {
            compressor: Compressor::new(compressor),
            generator: Generator::new(generator),
        }
    }

    /// Emit the module for `source` into `target`.
    ///
    /// Returns the number of embedded files, or `None` without writing
    /// anything when there is nothing to embed.
    pub fn emit<S, T>(&self, source: &S, target: &T) -> Result<Option<usize>>
    where
        S: FileSystem,
        T: FileSystem,
    {
        let Some(bundle) = self.compressor.compress(source)? else {
            return Ok(None);
        };

        let file_name = &self.generator.config().file_name;
        info!(files = bundle.count, module = %file_name, "emitting resources");

        let options = OpenOptions::write_only().create(true).truncate(true);
        let module = target.open_file(&path::join(path::SEPARATOR, file_name), &options)?;
        self.generator.write_to(module, &bundle)?;
        Ok(Some(bundle.count))
    }
}
