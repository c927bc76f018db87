//! Resource tree nodes and the tree algorithms shared by the manager and the
//! archive decoder.
//!
//! # Ownership
//!
//! ```text
//! Node "/" (dir)
//! ├── children: RwLock<Children>      insertion order + FxHashMap name index
//! │   └── Arc<Node> "resource" (dir)
//! │       └── Arc<Node> "2018.txt" (file)
//! │           └── content: Mutex<Option<Content>>
//! │                         └── Arc<RwLock<Vec<u8>>>  shared with open handles
//! └── modified: Mutex<DateTime<Utc>>
//! ```
//!
//! Nodes are reference counted so a sub-view can alias a subtree without
//! copying it. Truncation swaps a file's `Content` for a fresh one, which
//! detaches handles opened before the truncation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::fs::{FileInfo, WalkControl};
use crate::path;

/// Shared content buffer of a file node.
pub type Content = Arc<RwLock<Vec<u8>>>;

// =============================================================================
// Node
// =============================================================================

#[derive(Default)]
struct Children {
    nodes: Vec<Arc<Node>>,
    index: FxHashMap<String, usize>,
}

/// One entry of the resource tree: a directory or a file.
pub struct Node {
    name: String,
    is_dir: bool,
    content: Mutex<Option<Content>>,
    children: RwLock<Children>,
    modified: Mutex<DateTime<Utc>>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("is_dir", &self.is_dir)
            .field("size", &self.size())
            .finish()
    }
}

impl Node {
    fn build(name: impl Into<String>, is_dir: bool, content: Option<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            is_dir,
            content: Mutex::new(content.map(|bytes| Arc::new(RwLock::new(bytes)))),
            children: RwLock::new(Children::default()),
            modified: Mutex::new(Utc::now()),
        })
    }

    /// Create a root directory node named `/`.
    pub fn root() -> Arc<Self> {
        Self::dir(path::SEPARATOR)
    }

    /// Create an empty directory node.
    pub fn dir(name: impl Into<String>) -> Arc<Self> {
        Self::build(name, true, None)
    }

    /// Create a file node holding `content`.
    pub fn file(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Arc<Self> {
        Self::build(name, false, Some(content.into()))
    }

    /// Create a file node that has no content yet.
    pub(crate) fn empty_file(name: impl Into<String>) -> Arc<Self> {
        Self::build(name, false, None)
    }

    /// Base name of the node.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the node is a directory.
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Content length in bytes.
    pub fn size(&self) -> u64 {
        self.content
            .lock()
            .as_ref()
            .map_or(0, |content| content.read().len() as u64)
    }

    /// Last modification time.
    pub fn modified(&self) -> DateTime<Utc> {
        *self.modified.lock()
    }

    /// Refresh the modification time.
    pub(crate) fn touch(&self) {
        *self.modified.lock() = Utc::now();
    }

    /// Stat information for this node.
    pub fn info(&self) -> FileInfo {
        FileInfo::new(self.name.as_str(), self.size(), self.is_dir, self.modified())
    }

    /// Current content buffer, if the node carries one.
    pub fn content(&self) -> Option<Content> {
        self.content.lock().clone()
    }

    /// Content buffer for a newly opened handle.
    ///
    /// A node without content, or a truncating open, gets a fresh empty buffer.
    pub(crate) fn open_content(&self, truncate: bool) -> Content {
        let mut slot = self.content.lock();
        match slot.as_ref() {
            Some(content) if !truncate => content.clone(),
            _ => {
                let fresh = Arc::new(RwLock::new(Vec::new()));
                *slot = Some(fresh.clone());
                fresh
            }
        }
    }

    /// Child with the given name.
    pub fn child(&self, name: &str) -> Option<Arc<Node>> {
        let children = self.children.read();
        children
            .index
            .get(name)
            .map(|&position| children.nodes[position].clone())
    }

    /// Snapshot of the children in insertion order.
    pub fn children(&self) -> Vec<Arc<Node>> {
        self.children.read().nodes.clone()
    }

    /// Append a child. Returns `false` if this node is a file or the name is taken.
    pub(crate) fn insert_child(&self, child: Arc<Node>) -> bool {
        if !self.is_dir {
            return false;
        }
        let mut children = self.children.write();
        if children.index.contains_key(child.name()) {
            return false;
        }
        let position = children.nodes.len();
        children.index.insert(child.name.clone(), position);
        children.nodes.push(child);
        true
    }
}

// =============================================================================
// Tree Algorithms
// =============================================================================

/// Walk or create directory nodes along `segments`, returning the last one.
///
/// Returns `None` if the walk meets an existing file.
pub fn add(segments: &[&str], node: &Arc<Node>) -> Option<Arc<Node>> {
    if !node.is_dir() {
        return None;
    }
    let Some((name, rest)) = segments.split_first() else {
        return Some(node.clone());
    };

    let child = match node.child(name) {
        Some(child) => child,
        None => {
            let child = Node::dir(*name);
            node.insert_child(child.clone());
            child
        }
    };
    add(rest, &child)
}

/// Follow `segments` by exact name match.
pub fn find(segments: &[&str], node: &Arc<Node>) -> Option<Arc<Node>> {
    let mut current = node.clone();
    for name in segments {
        current = current.child(name)?;
    }
    Some(current)
}

/// Like [`find`], also returning the parent directory if it exists.
pub(crate) fn find_entry(
    segments: &[&str],
    node: &Arc<Node>,
) -> (Option<Arc<Node>>, Option<Arc<Node>>) {
    match segments.split_last() {
        None => (None, Some(node.clone())),
        Some((name, parents)) => match find(parents, node) {
            Some(parent) if parent.is_dir() => {
                let child = parent.child(name);
                (Some(parent), child)
            }
            _ => (None, None),
        },
    }
}

/// Depth-first, pre-order traversal in insertion order.
///
/// [`WalkControl::SkipDir`] is consumed here; visitor errors are returned as is.
pub fn walk<F>(path: &str, node: &Arc<Node>, visitor: &mut F) -> Result<()>
where
    F: FnMut(&str, &FileInfo) -> Result<WalkControl>,
{
    walk_with(path, node, &|node: &Node| node.children(), visitor)
}

/// Like [`walk`], taking each directory's children through `children`.
///
/// The snapshot is taken after the visitor has seen the directory, so
/// entries the visitor creates inside it are visited too.
pub(crate) fn walk_with<C, F>(path: &str, node: &Arc<Node>, children: &C, visitor: &mut F) -> Result<()>
where
    C: Fn(&Node) -> Vec<Arc<Node>>,
    F: FnMut(&str, &FileInfo) -> Result<WalkControl>,
{
    let control = visitor(path, &node.info())?;
    if !node.is_dir() || control == WalkControl::SkipDir {
        return Ok(());
    }

    for child in children(node) {
        walk_with(&path::join(path, child.name()), &child, children, visitor)?;
    }
    Ok(())
}

/// Number of files below `node`, `node` included.
pub fn file_count(node: &Arc<Node>) -> usize {
    if !node.is_dir() {
        return 1;
    }
    node.children().iter().map(file_count).sum()
}

/// Insert a file at `path` below `root`, creating parent directories.
pub(crate) fn insert_file(root: &Arc<Node>, path: &str, content: Vec<u8>) -> Result<()> {
    let segments = path::split(path);
    let invalid = || Error::InvalidPath {
        path: path.to_string(),
    };

    let (name, parents) = segments.split_last().ok_or_else(invalid)?;
    let parent = add(parents, root).ok_or_else(invalid)?;
    if !parent.insert_child(Node::file(*name, content)) {
        return Err(Error::DuplicatePath {
            path: path.to_string(),
        });
    }
    Ok(())
}

/// Ensure a directory exists at `path` below `root`.
pub(crate) fn insert_dir(root: &Arc<Node>, path: &str) -> Result<()> {
    add(&path::split(path), root)
        .map(|_| ())
        .ok_or_else(|| Error::InvalidPath {
            path: path.to_string(),
        })
}

/// Move every entry of `source` into `target`.
///
/// All collisions are checked before anything is moved, so a failed graft
/// leaves `target` untouched.
pub(crate) fn graft(source: &Arc<Node>, target: &Arc<Node>) -> Result<()> {
    if let Some(path) = collision(source, target, "") {
        return Err(Error::DuplicatePath { path });
    }
    merge(source, target);
    Ok(())
}

fn collision(source: &Arc<Node>, target: &Arc<Node>, prefix: &str) -> Option<String> {
    source.children().into_iter().find_map(|child| {
        let path = path::join(prefix, child.name());
        let existing = target.child(child.name())?;
        if existing.is_dir() && child.is_dir() {
            collision(&child, &existing, &path)
        } else {
            Some(path)
        }
    })
}

fn merge(source: &Arc<Node>, target: &Arc<Node>) {
    for child in source.children() {
        match target.child(child.name()) {
            Some(existing) => merge(&child, &existing),
            None => {
                target.insert_child(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Arc<Node> {
        let root = Node::root();
        insert_file(&root, "resource/reports/2018.txt", b"Report 2018\n".to_vec()).unwrap();
        insert_file(&root, "resource/scripts/schema.sql", b"CREATE TABLE t;".to_vec()).unwrap();
        root
    }

    #[test]
    fn test_add_creates_directories() {
        let root = Node::root();
        let node = add(&["a", "b"], &root).unwrap();
        assert_eq!(node.name(), "b");
        assert!(node.is_dir());
        assert!(Arc::ptr_eq(&find(&["a", "b"], &root).unwrap(), &node));
    }

    #[test]
    fn test_add_refuses_to_cross_a_file() {
        let root = sample();
        assert!(add(&["resource", "reports", "2018.txt", "x"], &root).is_none());
    }

    #[test]
    fn test_find_exact_match_only() {
        let root = sample();
        assert!(find(&["resource", "reports", "2018.txt"], &root).is_some());
        assert!(find(&["resource", "Reports"], &root).is_none());
        assert!(find(&["resource", "..", "resource"], &root).is_none());
    }

    #[test]
    fn test_insert_file_twice_is_duplicate() {
        let root = sample();
        let err = insert_file(&root, "resource/reports/2018.txt", Vec::new()).unwrap_err();
        assert!(matches!(err, Error::DuplicatePath { path } if path == "resource/reports/2018.txt"));
    }

    #[test]
    fn test_insert_file_empty_path_is_invalid() {
        let root = Node::root();
        assert!(matches!(insert_file(&root, "/", Vec::new()), Err(Error::InvalidPath { .. })));
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let root = Node::root();
        for name in ["zeta", "alpha", "mid"] {
            root.insert_child(Node::dir(name));
        }
        let names: Vec<_> = root.children().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_walk_pre_order() {
        let root = sample();
        let mut paths = Vec::new();
        walk("/", &root, &mut |path: &str, _: &FileInfo| -> Result<WalkControl> {
            paths.push(path.to_string());
            Ok(WalkControl::Continue)
        })
        .unwrap();
        assert_eq!(
            paths,
            [
                "/",
                "/resource",
                "/resource/reports",
                "/resource/reports/2018.txt",
                "/resource/scripts",
                "/resource/scripts/schema.sql",
            ]
        );
    }

    #[test]
    fn test_walk_skip_and_abort() {
        let root = sample();
        let mut paths = Vec::new();
        walk("/", &root, &mut |path: &str, _: &FileInfo| -> Result<WalkControl> {
            paths.push(path.to_string());
            if path == "/resource/reports" {
                return Ok(WalkControl::SkipDir);
            }
            Ok(WalkControl::Continue)
        })
        .unwrap();
        assert!(!paths.iter().any(|p| p == "/resource/reports/2018.txt"));
        assert!(paths.iter().any(|p| p == "/resource/scripts/schema.sql"));

        let err = walk("/", &root, &mut |_: &str, _: &FileInfo| -> Result<WalkControl> { Err(Error::other("Oh no!")) });
        assert_eq!(err.unwrap_err().to_string(), "Oh no!");
    }

    #[test]
    fn test_file_count_is_recursive() {
        let root = sample();
        insert_dir(&root, "resource/empty").unwrap();
        assert_eq!(file_count(&root), 2);
        assert_eq!(file_count(&find(&["resource", "reports"], &root).unwrap()), 1);
        assert_eq!(file_count(&Node::root()), 0);
    }

    #[test]
    fn test_truncate_detaches_previous_content() {
        let file = Node::file("a.txt", b"old".to_vec());
        let before = file.open_content(false);
        let after = file.open_content(true);
        assert_eq!(&*before.read(), b"old");
        assert!(after.read().is_empty());
        assert_eq!(file.size(), 0);
    }

    #[test]
    fn test_graft_checks_before_moving() {
        let target = sample();
        let source = Node::root();
        insert_file(&source, "resource/new.txt", b"new".to_vec()).unwrap();
        insert_file(&source, "resource/reports/2018.txt", b"dup".to_vec()).unwrap();

        assert!(matches!(graft(&source, &target), Err(Error::DuplicatePath { .. })));
        assert!(find(&["resource", "new.txt"], &target).is_none());
    }

    #[test]
    fn test_graft_merges_directories() {
        let target = sample();
        let source = Node::root();
        insert_file(&source, "resource/reports/2019.txt", b"Report 2019\n".to_vec()).unwrap();

        graft(&source, &target).unwrap();
        let reports = find(&["resource", "reports"], &target).unwrap();
        let names: Vec<_> = reports.children().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, ["2018.txt", "2019.txt"]);
    }
}
