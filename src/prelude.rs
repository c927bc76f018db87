//! Prelude module for convenient imports.
//!
//! ```
//! use stowage::prelude::*;
//!
//! let manager = Manager::new();
//! assert!(matches!(manager.open("/missing"), Err(Error::NotFound { .. })));
//! ```

// Filesystem
pub use crate::{AccessMode, File, FileInfo, FileSystem, OpenOptions, WalkControl};

// Manager
pub use crate::{Manager, ResourceFile};

// Codec
pub use crate::{ArchiveFormat, Bundle, Bundler, Compressor, CompressorConfig};

// Errors
pub use crate::{Error, Result};
