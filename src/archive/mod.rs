//! Archive codec: resource trees to TAR+gzip or ZIP bytes and back.
//!
//! ```text
//! FileSystem ──walk──► filter ──read──► TAR+gzip / ZIP writer ──► Bundle
//!                     (ignore,          (rayon with the
//!                      recursion)        `parallel` feature)
//!
//! bytes ──detect──► tar::Archive / ZipArchive ──► staging Node tree
//! ```
//!
//! Entries keep the pre-order walk order of the source end to end.

mod compress;
mod extract;
mod offset;

pub use compress::{Bundle, BundleInfo, Compressor, IMPLICIT_IGNORE};
pub use offset::OffsetWriter;

pub(crate) use extract::{extract, extract_zip};

/// Leading bytes of every gzip stream.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Archive wire format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// A TAR stream compressed with gzip.
    #[default]
    TarGz,
    /// A ZIP archive with deflate-compressed entries.
    Zip,
}

impl ArchiveFormat {
    /// Guess the format of `bytes`: gzip magic means TAR+gzip, anything else
    /// is treated as ZIP.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(&GZIP_MAGIC) {
            Self::TarGz
        } else {
            Self::Zip
        }
    }
}
