//! Error type shared by the resource tree, the archive codec and the bundler.

use std::io;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by [`Manager`](crate::Manager), the archive codec and the
/// filesystem adapters.
///
/// Handle-level failures ([`Error::ReadOnly`], [`Error::WriteOnly`],
/// [`Error::NotSupported`]) surface through `std::io::Read`/`Write` wrapped in
/// an [`io::Error`]. Converting that `io::Error` back with `Error::from`
/// recovers the original variant:
///
/// ```
/// use std::io::Write;
/// use stowage::{Error, Manager, OpenOptions};
///
/// let manager = Manager::new();
/// let options = OpenOptions::new().create(true);
/// let mut file = manager.open_file("/notes.txt", &options).unwrap();
///
/// let err = file.write(b"hello").unwrap_err();
/// assert!(matches!(Error::from(err), Error::ReadOnly));
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// No entry exists at the path.
    #[error("open {path}: file does not exist")]
    NotFound {
        /// The requested path.
        path: String,
    },

    /// `create` without `truncate` was requested for an existing entry.
    #[error("open {path}: file already exists")]
    AlreadyExists {
        /// The requested path.
        path: String,
    },

    /// A write-capable open targeted a directory.
    #[error("open {path}: is a directory")]
    IsDirectory {
        /// The requested path.
        path: String,
    },

    /// Write on a handle opened read-only.
    #[error("file is read-only")]
    ReadOnly,

    /// Read on a handle opened write-only.
    #[error("file is write-only")]
    WriteOnly,

    /// Byte-level read/write on a directory, or listing a regular file.
    #[error("not supported")]
    NotSupported,

    /// An archive entry collides with an entry that is already registered.
    #[error("duplicate path: '{path}'")]
    DuplicatePath {
        /// The colliding path.
        path: String,
    },

    /// A path that cannot name a node (empty, `..`, or crossing a file).
    #[error("invalid path: '{path}'")]
    InvalidPath {
        /// The offending path.
        path: String,
    },

    /// The archive bytes are not a valid (or complete) compressed stream.
    #[error("invalid archive: {reason}")]
    InvalidArchive {
        /// Decoder message.
        reason: String,
    },

    /// An ignore pattern failed to compile.
    #[error("syntax error in pattern '{pattern}': {source}")]
    Pattern {
        /// The pattern as configured.
        pattern: String,
        /// Parser error.
        #[source]
        source: glob::PatternError,
    },

    /// [`Manager::root`](crate::Manager::root) on a missing path or a file.
    #[error("resource hierarchy '{path}' not found")]
    HierarchyNotFound {
        /// The requested path.
        path: String,
    },

    /// The bundler target is a directory.
    #[error("{path} is not a regular file")]
    NotRegularFile {
        /// The bundler target.
        path: String,
    },

    /// A rejected combination of open options.
    #[error("invalid open options: {0}")]
    InvalidOptions(&'static str),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(io::Error),

    /// ZIP writer failure.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Free-form error, typically a walk visitor aborting.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a free-form error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Map an OS error for `path` onto the path-carrying variants.
    pub fn from_io(err: io::Error, path: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path: path.to_string() },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists { path: path.to_string() },
            _ => Self::from(err),
        }
    }

    pub(crate) fn invalid_archive(err: impl std::fmt::Display) -> Self {
        Self::InvalidArchive {
            reason: err.to_string(),
        }
    }

    fn io_kind(&self) -> io::ErrorKind {
        match self {
            Self::NotFound { .. } | Self::HierarchyNotFound { .. } => io::ErrorKind::NotFound,
            Self::AlreadyExists { .. } | Self::DuplicatePath { .. } => io::ErrorKind::AlreadyExists,
            Self::ReadOnly | Self::WriteOnly => io::ErrorKind::PermissionDenied,
            Self::NotSupported => io::ErrorKind::Unsupported,
            Self::InvalidArchive { .. } => io::ErrorKind::InvalidData,
            Self::InvalidPath { .. } | Self::InvalidOptions(_) | Self::Pattern { .. } => {
                io::ErrorKind::InvalidInput
            }
            _ => io::ErrorKind::Other,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        if !err.get_ref().is_some_and(|inner| inner.is::<Error>()) {
            return Self::Io(err);
        }
        match err.into_inner().map(|inner| inner.downcast::<Error>()) {
            Some(Ok(inner)) => *inner,
            Some(Err(other)) => Self::Io(io::Error::other(other)),
            None => Self::other("empty I/O error"),
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(inner) => inner,
            other => io::Error::new(other.io_kind(), other),
        }
    }
}
