//! Writer that reports stream positions shifted to a starting offset.

use std::io::{self, Seek, SeekFrom, Write};

/// Wraps a writer so that its position reads as `offset` at creation.
///
/// The ZIP writer records local header and central directory offsets from
/// `stream_position`. Through this wrapper those offsets are relative to the
/// start of the file the archive will end up in, even when the bytes are
/// produced into a separate buffer.
#[derive(Debug)]
pub struct OffsetWriter<W> {
    inner: W,
    base: u64,
    offset: u64,
}

impl<W: Write + Seek> OffsetWriter<W> {
    /// Wrap `inner`; its current position is reported as `offset`.
    pub fn new(mut inner: W, offset: u64) -> io::Result<Self> {
        let base = inner.stream_position()?;
        Ok(Self { inner, base, offset })
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn outer(&self, inner: u64) -> io::Result<u64> {
        inner
            .checked_sub(self.base)
            .and_then(|relative| relative.checked_add(self.offset))
            .ok_or_else(|| invalid_seek("position before archive start"))
    }
}

impl<W: Write> Write for OffsetWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write + Seek> Seek for OffsetWriter<W> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let pos = match pos {
            SeekFrom::Start(position) => {
                let relative = position
                    .checked_sub(self.offset)
                    .ok_or_else(|| invalid_seek("seek before archive start"))?;
                SeekFrom::Start(self.base + relative)
            }
            other => other,
        };
        let inner = self.inner.seek(pos)?;
        self.outer(inner)
    }
}

fn invalid_seek(message: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message)
}
