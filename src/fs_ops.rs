//! Filesystem access used by the sorter.
//!
//! The sorter only ever lists, probes, renames, creates and removes, so that
//! is all [`FileSystem`] exposes. [`StdFs`] forwards to `std::fs`; [`MemFs`]
//! keeps a tree of names in memory and backs both the tests and dry runs.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// What a directory entry is, without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    /// Symlinks, sockets, devices. Never touched by the sorter.
    Other,
}

/// One entry returned by [`FileSystem::read_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// The filesystem operations the organizer needs.
pub trait FileSystem {
    /// Lists the immediate entries of `dir`, in no particular order.
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>>;

    /// Returns true if anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Returns true if `path` is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Creates a single directory; the parent must exist.
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Renames `from` to `to`. Fails with `AlreadyExists` instead of replacing `to`.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Removes an empty directory.
    fn remove_dir(&self, path: &Path) -> io::Result<()>;

    /// Creates `path` and any missing ancestors.
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        if self.is_dir(path) {
            return Ok(());
        }
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            self.create_dir_all(parent)?;
        }
        self.create_dir(path)
    }
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

impl FileSystem for StdFs {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let kind = if file_type.is_file() {
                EntryKind::File
            } else if file_type.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::Other
            };
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
                kind,
            });
        }
        Ok(entries)
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        // std::fs::rename silently replaces files on Unix.
        if self.exists(to) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination {} already exists", to.display()),
            ));
        }
        fs::rename(from, to)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }
}

/// An in-memory directory tree.
///
/// Only names and kinds are tracked. Paths are used verbatim, so callers
/// should stick to absolute paths without `.` or `..` components.
#[derive(Debug, Default)]
pub struct MemFs {
    nodes: RefCell<BTreeMap<PathBuf, EntryKind>>,
    denied: RefCell<BTreeSet<PathBuf>>,
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    )
}

impl MemFs {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the structure of a real directory tree (names only, no contents).
    pub fn mirror(root: &Path) -> io::Result<Self> {
        let mem = Self::new();
        mem.add_dir(root);
        mem.mirror_dir(&StdFs, root)?;
        Ok(mem)
    }

    fn mirror_dir(&self, source: &StdFs, dir: &Path) -> io::Result<()> {
        for entry in source.read_dir(dir)? {
            self.nodes.borrow_mut().insert(entry.path.clone(), entry.kind);
            if entry.kind == EntryKind::Dir {
                self.mirror_dir(source, &entry.path)?;
            }
        }
        Ok(())
    }

    /// Adds a directory and any missing ancestors.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut nodes = self.nodes.borrow_mut();
        for ancestor in path.as_ref().ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            nodes.entry(ancestor.to_path_buf()).or_insert(EntryKind::Dir);
        }
    }

    /// Adds a file, creating missing parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>) {
        self.add_entry(path.as_ref(), EntryKind::File);
    }

    /// Adds an entry the sorter must leave alone, such as a symlink.
    pub fn add_other(&self, path: impl AsRef<Path>) {
        self.add_entry(path.as_ref(), EntryKind::Other);
    }

    fn add_entry(&self, path: &Path, kind: EntryKind) {
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.nodes.borrow_mut().insert(path.to_path_buf(), kind);
    }

    /// Makes every mutation touching `path` fail with `PermissionDenied`.
    pub fn deny(&self, path: impl AsRef<Path>) {
        self.denied.borrow_mut().insert(path.as_ref().to_path_buf());
    }

    /// Returns the kind of the entry at `path`, if any.
    pub fn kind(&self, path: &Path) -> Option<EntryKind> {
        self.nodes.borrow().get(path).copied()
    }

    /// Returns true if a file exists at `path`.
    pub fn is_file(&self, path: &Path) -> bool {
        self.kind(path) == Some(EntryKind::File)
    }

    /// All file paths under `root`, sorted.
    pub fn files_under(&self, root: &Path) -> Vec<PathBuf> {
        self.nodes
            .borrow()
            .iter()
            .filter(|(path, kind)| **kind == EntryKind::File && path.starts_with(root))
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn check_allowed(&self, path: &Path) -> io::Result<()> {
        if self.denied.borrow().contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {}", path.display()),
            ));
        }
        Ok(())
    }

    fn require_parent_dir(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if self.is_dir(parent) => Ok(()),
            Some(parent) => Err(not_found(parent)),
            None => Err(not_found(path)),
        }
    }
}

impl FileSystem for MemFs {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        match self.kind(dir) {
            Some(EntryKind::Dir) => {}
            Some(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("{} is not a directory", dir.display()),
                ));
            }
            None => return Err(not_found(dir)),
        }
        self.check_allowed(dir)?;

        Ok(self
            .nodes
            .borrow()
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir))
            .map(|(path, kind)| DirEntryInfo {
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path: path.clone(),
                kind: *kind,
            })
            .collect())
    }

    fn exists(&self, path: &Path) -> bool {
        self.kind(path).is_some()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.kind(path) == Some(EntryKind::Dir)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        self.check_allowed(path)?;
        if self.exists(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            ));
        }
        self.require_parent_dir(path)?;
        self.nodes
            .borrow_mut()
            .insert(path.to_path_buf(), EntryKind::Dir);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.check_allowed(from)?;
        self.check_allowed(to)?;
        if !self.exists(from) {
            return Err(not_found(from));
        }
        if self.exists(to) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination {} already exists", to.display()),
            ));
        }
        self.require_parent_dir(to)?;

        let mut nodes = self.nodes.borrow_mut();
        let moved: Vec<(PathBuf, EntryKind)> = nodes
            .iter()
            .filter(|(path, _)| path.starts_with(from))
            .map(|(path, kind)| (path.clone(), *kind))
            .collect();
        for (path, kind) in moved {
            nodes.remove(&path);
            let suffix = path.strip_prefix(from).unwrap_or(Path::new(""));
            let target = if suffix.as_os_str().is_empty() {
                to.to_path_buf()
            } else {
                to.join(suffix)
            };
            nodes.insert(target, kind);
        }
        Ok(())
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        self.check_allowed(path)?;
        if !self.is_dir(path) {
            return Err(not_found(path));
        }
        let has_children = self
            .nodes
            .borrow()
            .keys()
            .any(|p| p.parent() == Some(path));
        if has_children {
            return Err(io::Error::new(
                io::ErrorKind::DirectoryNotEmpty,
                format!("{} is not empty", path.display()),
            ));
        }
        self.nodes.borrow_mut().remove(path);
        Ok(())
    }
}
