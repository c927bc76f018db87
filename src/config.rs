//! Configuration for stowage.
//!
//! Two kinds of settings live here:
//!
//! - [`Config`]: process-wide settings for the [`global`](crate::global)
//!   layer, read once from the environment or set through [`ConfigBuilder`]
//!   at application startup.
//! - [`CompressorConfig`]: per-call settings of the archive codec.

use std::sync::OnceLock;

use crate::archive::ArchiveFormat;

/// Environment variable that switches [`Config::dev_mode`] on.
pub const DEV_MODE_ENV: &str = "STOWAGE_DEV";

/// Global configuration, initialized via [`ConfigBuilder::init`] or lazily
/// from the environment.
static CONFIG: OnceLock<Config> = OnceLock::new();

// =============================================================================
// Config
// =============================================================================

/// Runtime configuration for the process-wide resource layer.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Serve resources from the real directory instead of the embedded tree.
    pub dev_mode: bool,
}

impl Config {
    /// Read the configuration from the environment.
    pub fn from_env() -> Self {
        Self {
            dev_mode: std::env::var(DEV_MODE_ENV).is_ok_and(|value| parse_bool(&value)),
        }
    }
}

/// Configuration builder for fluent API.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    dev_mode: Option<bool>,
}

impl ConfigBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Force development mode on or off.
    ///
    /// Default: the value of `STOWAGE_DEV`.
    ///
    /// # Example
    ///
    /// ```
    /// use stowage::config::ConfigBuilder;
    ///
    /// ConfigBuilder::new()
    ///     .dev_mode(false)
    ///     .init();
    /// ```
    pub fn dev_mode(mut self, enabled: bool) -> Self {
        self.dev_mode = Some(enabled);
        self
    }

    /// Build the configuration without installing it.
    pub fn build(self) -> Config {
        Config {
            dev_mode: self.dev_mode.unwrap_or_else(|| Config::from_env().dev_mode),
        }
    }

    /// Build and initialize the global configuration.
    ///
    /// This can only be called once. Subsequent calls are ignored.
    /// Returns `true` if configuration was set, `false` if already initialized.
    pub fn init(self) -> bool {
        CONFIG.set(self.build()).is_ok()
    }
}

/// Get the current configuration, reading the environment if not initialized.
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// =============================================================================
// CompressorConfig
// =============================================================================

/// Settings of a [`Compressor`](crate::Compressor).
///
/// ```
/// use stowage::{ArchiveFormat, CompressorConfig};
///
/// let config = CompressorConfig::new("assets")
///     .ignore("*.bak")
///     .ignore("drafts")
///     .recursive(true)
///     .format(ArchiveFormat::Zip);
/// assert_eq!(config.ignore_patterns(), ["*.bak", "drafts"]);
/// ```
#[derive(Debug, Clone)]
pub struct CompressorConfig {
    name: String,
    ignore_patterns: Vec<String>,
    recursive: bool,
    format: ArchiveFormat,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self::new("resource")
    }
}

impl CompressorConfig {
    /// Recursive TAR+gzip bundle called `name`, with no ignore patterns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ignore_patterns: Vec::new(),
            recursive: true,
            format: ArchiveFormat::default(),
        }
    }

    /// Skip entries whose relative path or base name matches `pattern`.
    ///
    /// A matching directory is skipped together with its subtree.
    pub fn ignore(mut self, pattern: impl Into<String>) -> Self {
        self.ignore_patterns.push(pattern.into());
        self
    }

    /// Add several ignore patterns at once.
    pub fn ignore_all<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Descend into nested directories. When off, only files directly below
    /// the root are bundled.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Archive wire format.
    pub fn format(mut self, format: ArchiveFormat) -> Self {
        self.format = format;
        self
    }

    /// Bundle name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured ignore patterns, without the implicit ones.
    pub fn ignore_patterns(&self) -> &[String] {
        &self.ignore_patterns
    }

    /// Whether nested directories are bundled.
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Archive wire format.
    pub fn archive_format(&self) -> ArchiveFormat {
        self.format
    }
}
