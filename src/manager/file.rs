//! Handles to entries of the resource tree.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::fs::{File, FileInfo};
use crate::node::{Content, Node};
use crate::options::{AccessMode, OpenOptions};

/// An open resource: read, write, seek, stat and directory listing.
///
/// Reads and writes go through the content buffer captured at open time.
/// A later truncating open of the same path gives the node a fresh buffer,
/// so this handle keeps seeing the old bytes.
#[derive(Debug)]
pub struct ResourceFile {
    node: Arc<Node>,
    content: Option<Content>,
    access: AccessMode,
    position: u64,
    listed: usize,
}

impl ResourceFile {
    pub(crate) fn new(node: Arc<Node>, options: &OpenOptions) -> Self {
        let content = (!node.is_dir()).then(|| node.open_content(options.truncates()));
        let position = match &content {
            Some(content) if options.appends() => content.read().len() as u64,
            _ => 0,
        };

        Self {
            node,
            content,
            access: options.access_mode(),
            position,
            listed: 0,
        }
    }

    /// Base name of the opened entry.
    pub fn name(&self) -> &str {
        self.node.name()
    }

    /// Whether the handle refers to a directory.
    pub fn is_dir(&self) -> bool {
        self.node.is_dir()
    }

    /// Stat the opened entry, sized by this handle's view of the content.
    pub fn stat(&self) -> FileInfo {
        let size = self
            .content
            .as_ref()
            .map_or(0, |content| content.read().len() as u64);
        FileInfo::new(self.node.name(), size, self.node.is_dir(), self.node.modified())
    }

    /// List directory entries in insertion order.
    ///
    /// Each call continues where the previous one stopped. `limit` of `None`
    /// returns every remaining entry. Fails with [`Error::NotSupported`] on a
    /// regular file.
    pub fn read_dir(&mut self, limit: Option<usize>) -> Result<Vec<FileInfo>> {
        if !self.node.is_dir() {
            return Err(Error::NotSupported);
        }

        let children = self.node.children();
        let remaining = children.get(self.listed..).unwrap_or_default();
        let take = limit.map_or(remaining.len(), |limit| limit.min(remaining.len()));
        self.listed += take;

        Ok(remaining[..take].iter().map(|child| child.info()).collect())
    }

    fn content(&self) -> io::Result<&Content> {
        self.content.as_ref().ok_or_else(|| Error::NotSupported.into())
    }
}

impl Read for ResourceFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.access.readable() {
            return Err(Error::WriteOnly.into());
        }
        let data = self.content()?.read();

        let start = usize::try_from(self.position).unwrap_or(usize::MAX).min(data.len());
        let count = buf.len().min(data.len() - start);
        buf[..count].copy_from_slice(&data[start..start + count]);
        drop(data);

        self.position += count as u64;
        Ok(count)
    }
}

impl Write for ResourceFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.access.writable() {
            return Err(Error::ReadOnly.into());
        }
        let mut data = self.content()?.write();

        let out_of_range = || io::Error::new(io::ErrorKind::InvalidInput, "position out of range");
        let start = usize::try_from(self.position).map_err(|_| out_of_range())?;
        let end = start.checked_add(buf.len()).ok_or_else(out_of_range)?;
        if data.len() < end {
            let additional = end - data.len();
            data
                .try_reserve(additional)
                .map_err(|err| io::Error::new(io::ErrorKind::OutOfMemory, err))?;
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        drop(data);

        self.position = end as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for ResourceFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, delta) = match pos {
            SeekFrom::Start(offset) => {
                self.position = offset;
                return Ok(offset);
            }
            SeekFrom::Current(delta) => (self.position, delta),
            SeekFrom::End(delta) => {
                let len = self.content.as_ref().map_or(0, |c| c.read().len() as u64);
                (len, delta)
            }
        };

        match base.checked_add_signed(delta) {
            Some(position) => {
                self.position = position;
                Ok(position)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}

impl File for ResourceFile {
    fn metadata(&self) -> Result<FileInfo> {
        Ok(self.stat())
    }
}
