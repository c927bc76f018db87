//! Open options for [`FileSystem::open_file`](crate::FileSystem::open_file).

use crate::error::{Error, Result};

/// Access class of an opened handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccessMode {
    /// Reads allowed, writes fail with [`Error::ReadOnly`].
    #[default]
    ReadOnly,
    /// Writes allowed, reads fail with [`Error::WriteOnly`].
    WriteOnly,
    /// Reads and writes allowed.
    ReadWrite,
}

impl AccessMode {
    /// Whether reads are permitted.
    pub fn readable(self) -> bool {
        self != Self::WriteOnly
    }

    /// Whether writes are permitted.
    pub fn writable(self) -> bool {
        self != Self::ReadOnly
    }
}

/// Access mode plus creation policy for opening an entry.
///
/// The default is a plain read-only open of an existing entry.
///
/// ```
/// use stowage::{AccessMode, OpenOptions};
///
/// let options = OpenOptions::new()
///     .access(AccessMode::ReadWrite)
///     .create(true)
///     .truncate(true);
/// assert!(options.is_writable());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenOptions {
    access: AccessMode,
    create: bool,
    truncate: bool,
    append: bool,
}

impl OpenOptions {
    /// Read-only options with no creation policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `OpenOptions::new().access(AccessMode::WriteOnly)`.
    pub fn write_only() -> Self {
        Self::new().access(AccessMode::WriteOnly)
    }

    /// Shorthand for `OpenOptions::new().access(AccessMode::ReadWrite)`.
    pub fn read_write() -> Self {
        Self::new().access(AccessMode::ReadWrite)
    }

    /// Set the access mode.
    pub fn access(mut self, access: AccessMode) -> Self {
        self.access = access;
        self
    }

    /// Create the entry. Fails with [`Error::AlreadyExists`] when it exists
    /// and `truncate` is not set.
    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Reset the content of an existing entry.
    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    /// Position the handle at the end of the content on open.
    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// The configured access mode.
    pub fn access_mode(&self) -> AccessMode {
        self.access
    }

    /// Whether `create` is set.
    pub fn creates(&self) -> bool {
        self.create
    }

    /// Whether `truncate` is set.
    pub fn truncates(&self) -> bool {
        self.truncate
    }

    /// Whether `append` is set.
    pub fn appends(&self) -> bool {
        self.append
    }

    /// Whether the open carries write intent.
    pub fn is_writable(&self) -> bool {
        self.access.writable()
    }

    /// Reject contradictory combinations.
    pub fn validate(&self) -> Result<()> {
        if self.append && !self.access.writable() {
            return Err(Error::InvalidOptions("append requires write access"));
        }
        Ok(())
    }
}
