//! Filesystem collaborator consumed by the batch engine

use std::io;
use std::path::{Path, PathBuf};

/// What a path points at, as far as the batch cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Missing,
    Directory,
    File { len: u64 },
    /// Sockets, FIFOs, devices and the like
    Other,
}

/// Byte-level file access. The engine never touches `std::fs` directly.
pub trait FileStore {
    fn read_all(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn write_all(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    fn probe(&self, path: &Path) -> io::Result<PathKind>;

    /// Whether anything occupies `path`, including a symlink whose target
    /// is missing.
    fn exists(&self, path: &Path) -> io::Result<bool> {
        Ok(self.probe(path)? != PathKind::Missing)
    }

    /// Regular files under `dir`, descending into subdirectories when
    /// `recursive` is set.
    fn list_files(&self, dir: &Path, recursive: bool) -> io::Result<Vec<PathBuf>>;
}

/// `std::fs`-backed store
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileStore for LocalFs {
    fn read_all(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write_all(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        std::fs::write(path, bytes)
    }

    fn probe(&self, path: &Path) -> io::Result<PathKind> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Ok(PathKind::Directory),
            Ok(meta) if meta.is_file() => Ok(PathKind::File { len: meta.len() }),
            Ok(_) => Ok(PathKind::Other),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(PathKind::Missing),
            Err(e) => Err(e),
        }
    }

    fn exists(&self, path: &Path) -> io::Result<bool> {
        match std::fs::symlink_metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn list_files(&self, dir: &Path, recursive: bool) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        collect_files_inner(dir, recursive, &mut files)?;
        files.sort(); // deterministic order
        Ok(files)
    }
}

fn collect_files_inner(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        // Not followed: symlinks are neither listed nor descended into
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if recursive {
                collect_files_inner(&entry.path(), recursive, out)?;
            }
        } else if file_type.is_file() {
            out.push(entry.path());
        }
    }
    Ok(())
}
