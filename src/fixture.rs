//! Shared on-disk and in-memory test trees.

use std::fs;

use tempfile::TempDir;

use crate::archive::Compressor;
use crate::fs::Dir;
use crate::manager::Manager;

const FILES: &[(&str, &str)] = &[
    ("resource/reports/2018.txt", "Report 2018\n"),
    (
        "resource/scripts/schema.sql",
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);\n",
    ),
    (
        "resource/templates/html/index.html",
        "<html><body>Hello, {{ name }}</body></html>\n",
    ),
    ("resource/templates/yml/schema.yml", "version: 1\nname: resource\n"),
];

/// A temporary directory holding the `resource/` tree.
pub fn resource_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, content) in FILES {
        let file = dir.path().join(path);
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(file, content).unwrap();
    }
    dir
}

/// The `resource/` tree as a TAR+gzip archive.
pub fn resource_archive() -> Vec<u8> {
    let dir = resource_dir();
    Compressor::default()
        .compress(&Dir::new(dir.path()))
        .unwrap()
        .unwrap()
        .body
}

/// A manager holding the `resource/` tree.
pub fn resource_manager() -> Manager {
    let manager = Manager::new();
    manager.add(&resource_archive()).unwrap();
    manager
}
