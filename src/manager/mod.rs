//! In-memory virtual filesystem over a resource tree.
//!
//! ```text
//! archive bytes ──► Manager::add ──► extract (staging tree) ──► graft
//!                                                               │
//! Manager::open / open_file / walk / root ◄── Node tree ◄───────┘
//! ```
//!
//! A [`Manager`] is cheap to clone: clones and sub-views from
//! [`Manager::root`] share the same nodes and the same tree lock.

mod file;

use std::io::{Read, Seek};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::archive;
use crate::error::{Error, Result};
use crate::fs::{FileInfo, FileSystem, WalkControl};
use crate::node::{self, Node};
use crate::options::OpenOptions;
use crate::path;

pub use file::ResourceFile;

/// Virtual in-memory filesystem.
///
/// # Example
///
/// ```
/// use std::io::{Read, Write};
/// use stowage::{Manager, OpenOptions};
///
/// let manager = Manager::new();
/// let options = OpenOptions::write_only().create(true);
/// manager.open_file("/greeting.txt", &options)?.write_all(b"hello")?;
///
/// let mut content = String::new();
/// manager.open("/greeting.txt")?.read_to_string(&mut content)?;
/// assert_eq!(content, "hello");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Manager {
    root: Arc<Node>,
    lock: Arc<RwLock<()>>,
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            lock: Arc::new(RwLock::new(())),
        }
    }

    /// The root node of this view.
    pub fn root_node(&self) -> &Arc<Node> {
        &self.root
    }

    /// Register an archive (TAR+gzip or ZIP).
    ///
    /// Bytes starting with the gzip magic are read as TAR+gzip, anything else
    /// as ZIP, which also covers a binary carrying a trailing ZIP archive.
    /// Fails with [`Error::InvalidArchive`] on a corrupt stream and with
    /// [`Error::DuplicatePath`] if an entry is already registered. The tree is
    /// left unchanged on failure.
    pub fn add(&self, archive: &[u8]) -> Result<()> {
        let _guard = self.lock.write();
        let staging = archive::extract(archive)?;
        self.graft(&staging)
    }

    /// Register a ZIP archive read from `reader`.
    ///
    /// The archive is located through its end-of-central-directory record,
    /// so it may trail arbitrary leading bytes.
    pub fn add_reader<R: Read + Seek>(&self, reader: R) -> Result<()> {
        let _guard = self.lock.write();
        let staging = archive::extract_zip(reader)?;
        self.graft(&staging)
    }

    /// Register the archive appended to the running executable.
    pub fn add_executable(&self) -> Result<()> {
        let executable = std::env::current_exe()?;
        let file = std::fs::File::open(&executable)
            .map_err(|e| Error::from_io(e, &executable.to_string_lossy()))?;
        self.add_reader(std::io::BufReader::new(file))
    }

    fn graft(&self, staging: &Arc<Node>) -> Result<()> {
        let files = node::file_count(staging);
        node::graft(staging, &self.root)?;
        debug!(files, "registered resource archive");
        Ok(())
    }

    /// A sub-manager aliasing the directory at `path`.
    ///
    /// Changes made through either view are visible through the other.
    pub fn root(&self, path: &str) -> Result<Manager> {
        let _guard = self.lock.read_recursive();
        match node::find(&path::split(path), &self.root) {
            Some(node) if node.is_dir() => Ok(Self {
                root: node,
                lock: self.lock.clone(),
            }),
            _ => Err(Error::HierarchyNotFound {
                path: path.to_string(),
            }),
        }
    }

    /// Open an entry for reading.
    pub fn open(&self, path: &str) -> Result<ResourceFile> {
        self.open_file(path, &OpenOptions::new())
    }

    /// Open an entry with explicit access mode and creation policy.
    ///
    /// 1. A write-capable open of a directory fails with [`Error::IsDirectory`].
    /// 2. `create` on an existing entry fails with [`Error::AlreadyExists`]
    ///    unless `truncate` is set; otherwise a file is created in the parent
    ///    directory, which must exist.
    /// 3. A missing entry without `create` fails with [`Error::NotFound`].
    /// 4. Write-capable opens refresh the modification time.
    /// 5. A file without content, or a `truncate` open, gets fresh empty content.
    pub fn open_file(&self, path: &str, options: &OpenOptions) -> Result<ResourceFile> {
        options.validate()?;
        if options.creates() {
            let _guard = self.lock.write();
            self.open_locked(path, options)
        } else {
            let _guard = self.lock.read_recursive();
            self.open_locked(path, options)
        }
    }

    fn open_locked(&self, path: &str, options: &OpenOptions) -> Result<ResourceFile> {
        let segments = path::split(path);
        let (parent, node) = node::find_entry(&segments, &self.root);

        let is_directory = || Error::IsDirectory {
            path: path.to_string(),
        };
        if options.is_writable() && node.as_ref().is_some_and(|n| n.is_dir()) {
            return Err(is_directory());
        }

        let node = match (node, options.creates()) {
            (Some(_), true) if !options.truncates() => {
                return Err(Error::AlreadyExists {
                    path: path.to_string(),
                });
            }
            (Some(existing), true) if existing.is_dir() => return Err(is_directory()),
            (Some(existing), _) => existing,
            (None, true) => {
                let not_found = || Error::NotFound {
                    path: path.to_string(),
                };
                let parent = parent.ok_or_else(not_found)?;
                let name = segments.last().ok_or_else(not_found)?;
                let created = Node::empty_file(*name);
                parent.insert_child(created.clone());
                created
            }
            (None, false) => {
                return Err(Error::NotFound {
                    path: path.to_string(),
                });
            }
        };

        if options.is_writable() {
            node.touch();
        }
        Ok(ResourceFile::new(node, options))
    }

    /// Stat an entry.
    pub fn metadata(&self, path: &str) -> Result<FileInfo> {
        let _guard = self.lock.read_recursive();
        node::find(&path::split(path), &self.root)
            .map(|node| node.info())
            .ok_or_else(|| Error::NotFound {
                path: path.to_string(),
            })
    }

    /// Walk the tree rooted at `path` in pre-order, children in insertion order.
    ///
    /// The tree lock is held only while looking up `path` and while taking
    /// each directory's child list, never while the visitor runs, so the
    /// visitor may open and create entries.
    pub fn walk<F>(&self, path: &str, mut visitor: F) -> Result<()>
    where
        F: FnMut(&str, &FileInfo) -> Result<WalkControl>,
    {
        let start = {
            let _guard = self.lock.read_recursive();
            node::find(&path::split(path), &self.root)
        }
        .ok_or_else(|| Error::NotFound {
            path: path.to_string(),
        })?;

        let children = |node: &Node| {
            let _guard = self.lock.read_recursive();
            node.children()
        };
        node::walk_with(path, &start, &children, &mut visitor)
    }
}

impl FileSystem for Manager {
    type File = ResourceFile;

    fn open_file(&self, path: &str, options: &OpenOptions) -> Result<ResourceFile> {
        Manager::open_file(self, path, options)
    }

    fn metadata(&self, path: &str) -> Result<FileInfo> {
        Manager::metadata(self, path)
    }

    fn walk<F>(&self, path: &str, visitor: F) -> Result<()>
    where
        F: FnMut(&str, &FileInfo) -> Result<WalkControl>,
    {
        Manager::walk(self, path, visitor)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Seek, SeekFrom, Write};
    use std::thread;

    use super::*;
    use crate::fixture;

    fn read_all(file: &mut ResourceFile) -> String {
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    fn walk_paths(manager: &Manager, path: &str) -> Vec<String> {
        let mut paths = Vec::new();
        manager
            .walk(path, |path, _| {
                paths.push(path.to_string());
                Ok(WalkControl::Continue)
            })
            .unwrap();
        paths
    }

    // -------------------------------------------------------------------------
    // add
    // -------------------------------------------------------------------------

    #[test]
    fn test_add_twice_is_duplicate_and_keeps_tree() {
        let archive = fixture::resource_archive();
        let manager = Manager::new();
        manager.add(&archive).unwrap();
        let before = walk_paths(&manager, "/");

        let err = manager.add(&archive).unwrap_err();
        assert!(matches!(err, Error::DuplicatePath { ref path } if path == "resource/reports/2018.txt"));
        assert_eq!(walk_paths(&manager, "/"), before);
        assert_eq!(read_all(&mut manager.open("/resource/reports/2018.txt").unwrap()), "Report 2018\n");
    }

    #[test]
    fn test_add_garbage_is_invalid_archive() {
        let manager = Manager::new();
        assert!(matches!(manager.add(b"lol"), Err(Error::InvalidArchive { .. })));
        assert_eq!(walk_paths(&manager, "/"), ["/"]);
    }

    #[test]
    fn test_add_truncated_archive_is_invalid() {
        let archive = fixture::resource_archive();
        let manager = Manager::new();
        let truncated = &archive[..archive.len() / 2];
        assert!(matches!(manager.add(truncated), Err(Error::InvalidArchive { .. })));
    }

    #[test]
    fn test_add_disjoint_archives() {
        let manager = fixture::resource_manager();
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("extra")).unwrap();
        std::fs::write(dir.path().join("extra/notes.txt"), "notes").unwrap();
        let bundle = crate::Compressor::new(crate::CompressorConfig::new("extra"))
            .compress(&crate::Dir::new(dir.path()))
            .unwrap()
            .unwrap();

        manager.add(&bundle.body).unwrap();
        assert_eq!(read_all(&mut manager.open("/extra/notes.txt").unwrap()), "notes");
    }

    // -------------------------------------------------------------------------
    // root
    // -------------------------------------------------------------------------

    #[test]
    fn test_root_returns_sub_manager() {
        let manager = fixture::resource_manager();
        let group = manager.root("/resource").unwrap();
        assert_eq!(read_all(&mut group.open("/reports/2018.txt").unwrap()), "Report 2018\n");
    }

    #[test]
    fn test_root_on_file_fails() {
        let manager = fixture::resource_manager();
        let err = manager.root("/resource/reports/2018.txt").unwrap_err();
        assert!(matches!(err, Error::HierarchyNotFound { .. }));
        assert!(matches!(manager.root("/missing"), Err(Error::HierarchyNotFound { .. })));
    }

    #[test]
    fn test_root_aliases_parent_tree() {
        let manager = fixture::resource_manager();
        let group = manager.root("/resource").unwrap();

        group
            .open_file("/reports/2019.txt", &OpenOptions::write_only().create(true))
            .unwrap()
            .write_all(b"Report 2019\n")
            .unwrap();
        assert_eq!(read_all(&mut manager.open("/resource/reports/2019.txt").unwrap()), "Report 2019\n");

        manager
            .open_file("/resource/reports/2018.txt", &OpenOptions::write_only().truncate(true))
            .unwrap()
            .write_all(b"rewritten")
            .unwrap();
        assert_eq!(read_all(&mut group.open("/reports/2018.txt").unwrap()), "rewritten");
    }

    // -------------------------------------------------------------------------
    // open / open_file
    // -------------------------------------------------------------------------

    #[test]
    fn test_open_root_and_directory() {
        let manager = fixture::resource_manager();
        assert!(manager.open("/").unwrap().is_dir());
        assert!(manager.open("/resource/reports").unwrap().is_dir());
    }

    #[test]
    fn test_open_missing_is_not_found() {
        let manager = fixture::resource_manager();
        let err = manager.open("/resource/migration.sql").unwrap_err();
        assert_eq!(err.to_string(), "open /resource/migration.sql: file does not exist");
        assert!(matches!(manager.open("/nowhere/migration.sql"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_open_is_read_only() {
        let manager = fixture::resource_manager();
        let mut file = manager.open("/resource/reports/2018.txt").unwrap();
        let err = file.write(b"hello").unwrap_err();
        assert!(matches!(Error::from(err), Error::ReadOnly));
    }

    #[test]
    fn test_open_for_read_keeps_mod_time() {
        let manager = fixture::resource_manager();
        let first = manager.open("/resource/reports/2018.txt").unwrap().stat();
        let second = manager.open("/resource/reports/2018.txt").unwrap().stat();
        assert_eq!(first.modified(), second.modified());
    }

    #[test]
    fn test_open_for_write_refreshes_mod_time() {
        let manager = fixture::resource_manager();
        let before = manager.metadata("/resource/reports/2018.txt").unwrap().modified();
        thread::sleep(std::time::Duration::from_millis(5));

        let file = manager
            .open_file("/resource/reports/2018.txt", &OpenOptions::write_only())
            .unwrap();
        assert!(file.stat().modified() > before);
    }

    #[test]
    fn test_create_new_file() {
        let manager = fixture::resource_manager();
        let file = manager
            .open_file("/resource/secrets.txt", &OpenOptions::new().create(true))
            .unwrap();
        assert_eq!(file.stat().size(), 0);
        assert!(manager.metadata("/resource/secrets.txt").is_ok());
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let manager = fixture::resource_manager();
        let options = OpenOptions::write_only().create(true);
        assert!(matches!(
            manager.open_file("/resource/missing/secrets.txt", &options),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_create_existing_without_truncate_fails() {
        let manager = fixture::resource_manager();
        let err = manager
            .open_file("/resource/reports/2018.txt", &OpenOptions::new().create(true))
            .unwrap_err();
        assert_eq!(err.to_string(), "open /resource/reports/2018.txt: file already exists");
    }

    #[test]
    fn test_create_truncate_empties_file() {
        let manager = fixture::resource_manager();
        let mut file = manager
            .open_file(
                "/resource/reports/2018.txt",
                &OpenOptions::new().create(true).truncate(true),
            )
            .unwrap();
        assert!(read_all(&mut file).is_empty());
        assert_eq!(manager.metadata("/resource/reports/2018.txt").unwrap().size(), 0);
    }

    #[test]
    fn test_truncate_detaches_old_handle() {
        let manager = fixture::resource_manager();
        let mut old = manager.open("/resource/reports/2018.txt").unwrap();

        manager
            .open_file("/resource/reports/2018.txt", &OpenOptions::write_only().truncate(true))
            .unwrap()
            .write_all(b"new")
            .unwrap();

        assert_eq!(read_all(&mut old), "Report 2018\n");
        assert_eq!(read_all(&mut manager.open("/resource/reports/2018.txt").unwrap()), "new");
    }

    #[test]
    fn test_write_intent_on_directory_fails() {
        let manager = fixture::resource_manager();
        for options in [
            OpenOptions::read_write(),
            OpenOptions::write_only(),
            OpenOptions::write_only().append(true),
        ] {
            let err = manager.open_file("/resource/reports", &options).unwrap_err();
            assert_eq!(err.to_string(), "open /resource/reports: is a directory");
        }

        let options = OpenOptions::new().create(true).truncate(true);
        assert!(matches!(
            manager.open_file("/resource/reports", &options),
            Err(Error::IsDirectory { .. })
        ));
    }

    #[test]
    fn test_append_writes_at_end() {
        let manager = fixture::resource_manager();
        let mut file = manager
            .open_file("/resource/reports/2018.txt", &OpenOptions::read_write().append(true))
            .unwrap();
        file.write_all(b"hello").unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        assert_eq!(read_all(&mut file), "Report 2018\nhello");
    }

    #[test]
    fn test_write_only_read_fails() {
        let manager = fixture::resource_manager();
        let mut file = manager
            .open_file("/resource/reports/2018.txt", &OpenOptions::write_only())
            .unwrap();
        let mut buf = Vec::new();
        let err = file.read_to_end(&mut buf).unwrap_err();
        assert!(matches!(Error::from(err), Error::WriteOnly));
    }

    #[test]
    fn test_append_read_only_rejected() {
        let manager = fixture::resource_manager();
        let options = OpenOptions::new().append(true);
        assert!(matches!(
            manager.open_file("/resource/reports/2018.txt", &options),
            Err(Error::InvalidOptions(_))
        ));
    }

    // -------------------------------------------------------------------------
    // walk
    // -------------------------------------------------------------------------

    #[test]
    fn test_walk_missing_directory() {
        let manager = fixture::resource_manager();
        let err = manager.walk("/documents", |_, _| Ok(WalkControl::Continue)).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_walk_whole_hierarchy() {
        let manager = fixture::resource_manager();
        assert_eq!(
            walk_paths(&manager, "/"),
            [
                "/",
                "/resource",
                "/resource/reports",
                "/resource/reports/2018.txt",
                "/resource/scripts",
                "/resource/scripts/schema.sql",
                "/resource/templates",
                "/resource/templates/html",
                "/resource/templates/html/index.html",
                "/resource/templates/yml",
                "/resource/templates/yml/schema.yml",
            ]
        );
    }

    #[test]
    fn test_walk_from_file() {
        let manager = fixture::resource_manager();
        let mut count = 0;
        manager
            .walk("/resource/reports/2018.txt", |path, info| {
                count += 1;
                assert_eq!(path, "/resource/reports/2018.txt");
                assert_eq!(info.name(), "2018.txt");
                assert!(info.size() > 0);
                Ok(WalkControl::Continue)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_walk_subtree() {
        let manager = fixture::resource_manager();
        assert_eq!(
            walk_paths(&manager, "/resource/templates"),
            [
                "/resource/templates",
                "/resource/templates/html",
                "/resource/templates/html/index.html",
                "/resource/templates/yml",
                "/resource/templates/yml/schema.yml",
            ]
        );
    }

    #[test]
    fn test_walk_visitor_error_is_returned() {
        let manager = fixture::resource_manager();
        let err = manager
            .walk("/resource", |path, _| {
                if path == "/resource/templates" {
                    return Err(Error::other("Oh no!"));
                }
                Ok(WalkControl::Continue)
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "Oh no!");
    }

    #[test]
    fn test_walk_visitor_can_read() {
        let manager = fixture::resource_manager();
        let mut total = 0;
        manager
            .walk("/", |path, info| {
                if !info.is_dir() {
                    total += read_all(&mut manager.open(path)?).len();
                }
                Ok(WalkControl::Continue)
            })
            .unwrap();
        assert!(total > 0);
    }

    #[test]
    fn test_walk_visitor_can_create() {
        let manager = fixture::resource_manager();
        let mut paths = Vec::new();
        manager
            .walk("/resource/reports", |path, info| {
                paths.push(path.to_string());
                if info.is_dir() {
                    let options = OpenOptions::write_only().create(true);
                    manager.open_file(&format!("{path}/new.txt"), &options)?;
                }
                Ok(WalkControl::Continue)
            })
            .unwrap();

        assert_eq!(
            paths,
            [
                "/resource/reports",
                "/resource/reports/2018.txt",
                "/resource/reports/new.txt",
            ]
        );
        assert!(manager.metadata("/resource/reports/new.txt").is_ok());
    }

    // -------------------------------------------------------------------------
    // concurrency
    // -------------------------------------------------------------------------

    #[test]
    fn test_concurrent_creates_and_reads() {
        let manager = fixture::resource_manager();

        thread::scope(|scope| {
            for worker in 0..8 {
                let manager = &manager;
                scope.spawn(move || {
                    let path = format!("/resource/worker-{worker}.txt");
                    let options = OpenOptions::write_only().create(true);
                    manager.open_file(&path, &options).unwrap().write_all(b"done").unwrap();
                    assert_eq!(
                        read_all(&mut manager.open("/resource/reports/2018.txt").unwrap()),
                        "Report 2018\n"
                    );
                });
            }
        });

        let resource = manager.root("/resource").unwrap();
        let mut listing = resource.open("/").unwrap();
        assert_eq!(listing.read_dir(None).unwrap().len(), 3 + 8);
    }

    #[test]
    fn test_concurrent_writers_same_file_do_not_interleave() {
        let manager = fixture::resource_manager();
        let path = "/resource/shared.bin";
        manager
            .open_file(path, &OpenOptions::write_only().create(true))
            .unwrap();

        thread::scope(|scope| {
            for byte in [b'a', b'b'] {
                let manager = &manager;
                scope.spawn(move || {
                    let mut file = manager.open_file(path, &OpenOptions::write_only()).unwrap();
                    file.write_all(&[byte; 4096]).unwrap();
                });
            }
        });

        let mut content = Vec::new();
        manager.open(path).unwrap().read_to_end(&mut content).unwrap();
        assert_eq!(content.len(), 4096);
        assert!(content.iter().all(|&b| b == content[0]));
    }
}
