/// Per-file relocation and the run journal.
///
/// This module renames files to their normalized names, creates category
/// subdirectories on demand and moves files into them, never overwriting an
/// existing entry. Each relocation is recorded so a run can be undone.
use crate::collision;
use crate::file_category::ExtensionMap;
use crate::fs_ops::FileSystem;
use crate::normalize::normalized_file_name;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the journal written at the root of a sorted tree.
pub const HISTORY_FILE_NAME: &str = ".clean_folder_history.json";

/// A single file relocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Where the file was before the run.
    pub original_path: PathBuf,
    /// Where the file ended up.
    pub new_path: PathBuf,
    /// The category the file was sorted into.
    pub category: String,
}

/// Every relocation performed by one run, persisted for undo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationLog {
    /// When the run started.
    pub timestamp: DateTime<Utc>,
    /// The root directory that was sorted.
    pub base_path: PathBuf,
    /// Relocations in the order they happened.
    pub operations: Vec<Operation>,
    /// Category directories this run created.
    #[serde(default)]
    pub created_dirs: Vec<PathBuf>,
}

impl OperationLog {
    /// Creates an empty log for a given root.
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            timestamp: Utc::now(),
            base_path,
            operations: Vec::new(),
            created_dirs: Vec::new(),
        }
    }

    /// Adds an operation to this log.
    pub fn add_operation(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    /// Records a category directory created during the run.
    pub fn add_created_dir(&mut self, dir: PathBuf) {
        self.created_dirs.push(dir);
    }

    /// Returns true if nothing was relocated.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Returns the path to the history file for this root.
    pub fn history_file_path(base_path: &Path) -> PathBuf {
        base_path.join(HISTORY_FILE_NAME)
    }

    /// Saves this log as JSON next to the sorted tree.
    pub fn save(&self, base_path: &Path) -> OrganizeResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            OrganizeError::HistoryWriteFailed {
                source: io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("JSON serialization failed: {}", e),
                ),
            }
        })?;

        fs::write(Self::history_file_path(base_path), json)
            .map_err(|source| OrganizeError::HistoryWriteFailed { source })
    }

    /// Loads the most recent log, if one exists.
    pub fn load(base_path: &Path) -> OrganizeResult<Option<Self>> {
        let history_path = Self::history_file_path(base_path);

        if !history_path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&history_path)
            .map_err(|source| OrganizeError::HistoryReadFailed { source })?;

        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| OrganizeError::InvalidHistoryFormat {
                reason: format!("JSON parse error: {}", e),
            })
    }

    /// Deletes the history file for a given root.
    pub fn delete(base_path: &Path) -> OrganizeResult<()> {
        let history_path = Self::history_file_path(base_path);
        if history_path.exists() {
            fs::remove_file(&history_path)
                .map_err(|source| OrganizeError::HistoryWriteFailed { source })?;
        }
        Ok(())
    }
}

/// Errors that can occur while organizing a tree.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The root to sort is missing or is not a directory.
    #[error("Invalid root path {}: {source}", path.display())]
    InvalidBasePath { path: PathBuf, source: io::Error },

    /// A directory could not be listed.
    #[error("Failed to read directory {}: {source}", path.display())]
    ReadDirFailed { path: PathBuf, source: io::Error },

    /// Failed to create a category directory.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    /// Failed to rename or move a file.
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    /// Failed to remove an empty directory.
    #[error("Failed to remove directory {}: {source}", path.display())]
    DirectoryRemovalFailed { path: PathBuf, source: io::Error },

    /// Every duplicate suffix up to the cap is taken.
    #[error("No free name for {} after {limit} duplicate suffixes", path.display())]
    CollisionLimit { path: PathBuf, limit: u32 },

    /// A path has no usable file name component.
    #[error("Path has no file name: {}", path.display())]
    InvalidFileName { path: PathBuf },

    /// Failed to write history file.
    #[error("Failed to write history file: {source}")]
    HistoryWriteFailed { source: io::Error },

    /// Failed to read history file.
    #[error("Failed to read history file: {source}")]
    HistoryReadFailed { source: io::Error },

    /// History file has invalid format.
    #[error("Invalid history file format: {reason}")]
    InvalidHistoryFormat { reason: String },

    /// There is no journal to undo.
    #[error("No previous run found to undo in {}", path.display())]
    NoHistory { path: PathBuf },
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// A category directory returned by [`FileOrganizer::ensure_category_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDir {
    pub path: PathBuf,
    /// The directory did not exist before this call.
    pub created: bool,
}

type Resolver<F> = fn(&F, &Path, u32) -> OrganizeResult<PathBuf>;

/// Renames and moves single files through a [`FileSystem`].
pub struct FileOrganizer<'a, F: FileSystem> {
    fs: &'a F,
    max_duplicates: u32,
    reserved: Option<&'a ExtensionMap>,
}

impl<'a, F: FileSystem> FileOrganizer<'a, F> {
    pub fn new(fs: &'a F, max_duplicates: u32) -> Self {
        Self {
            fs,
            max_duplicates,
            reserved: None,
        }
    }

    /// Keeps in-place renames off the category directory names of `categories`.
    ///
    /// A file renamed to `unknown` would otherwise block the `unknown/`
    /// directory it is about to be moved into.
    pub fn with_reserved_names(mut self, categories: &'a ExtensionMap) -> Self {
        self.reserved = Some(categories);
        self
    }

    /// Renames a file in place to its normalized name.
    ///
    /// A file whose name is already normalized is left where it is. Otherwise
    /// the new name is collision-resolved within the same directory.
    ///
    /// # Examples
    ///
    /// ```
    /// use clean_folder::file_organizer::FileOrganizer;
    /// use clean_folder::fs_ops::MemFs;
    /// use std::path::Path;
    ///
    /// let fs = MemFs::new();
    /// fs.add_file("/root/Фото.JPG");
    ///
    /// let organizer = FileOrganizer::new(&fs, 100);
    /// let renamed = organizer.rename_normalized(Path::new("/root/Фото.JPG")).unwrap();
    /// assert_eq!(renamed, Path::new("/root/foto.jpg"));
    /// ```
    pub fn rename_normalized(&self, file_path: &Path) -> OrganizeResult<PathBuf> {
        let name = file_name_of(file_path)?;
        let normalized = normalized_file_name(&name);
        let reserved = self
            .reserved
            .is_some_and(|categories| categories.is_category_dir(&normalized));

        if normalized == name && !reserved {
            return Ok(file_path.to_path_buf());
        }

        let candidate = file_path.with_file_name(normalized);
        if reserved {
            self.relocate(file_path, &candidate, collision::resolve_duplicate)
        } else {
            self.relocate(file_path, &candidate, collision::resolve)
        }
    }

    /// Returns `dir/category`, creating it if it does not exist yet.
    pub fn ensure_category_dir(&self, dir: &Path, category: &str) -> OrganizeResult<CategoryDir> {
        let path = dir.join(category);
        if self.fs.is_dir(&path) {
            return Ok(CategoryDir {
                path,
                created: false,
            });
        }

        self.fs
            .create_dir(&path)
            .map_err(|source| OrganizeError::DirectoryCreationFailed {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(dir = %path.display(), "created category directory");
        Ok(CategoryDir {
            path,
            created: true,
        })
    }

    /// Moves a file into `category_dir`, keeping its name unless it is taken.
    pub fn move_into(&self, file_path: &Path, category_dir: &Path) -> OrganizeResult<PathBuf> {
        let name = file_name_of(file_path)?;
        self.relocate(file_path, &category_dir.join(name), collision::resolve)
    }

    /// Renames `from` to a free variant of `candidate`.
    ///
    /// If the resolved target is taken between the check and the rename, the
    /// target is resolved again and the rename retried once.
    fn relocate(
        &self,
        from: &Path,
        candidate: &Path,
        resolve: Resolver<F>,
    ) -> OrganizeResult<PathBuf> {
        let target = resolve(self.fs, candidate, self.max_duplicates)?;

        match self.fs.rename(from, &target) {
            Ok(()) => Ok(target),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::warn!(
                    target = %target.display(),
                    "destination appeared before rename, retrying"
                );
                let retry = resolve(self.fs, candidate, self.max_duplicates)?;
                self.fs
                    .rename(from, &retry)
                    .map_err(|source| OrganizeError::FileMoveFailure {
                        from: from.to_path_buf(),
                        to: retry.clone(),
                        source,
                    })?;
                Ok(retry)
            }
            Err(source) => Err(OrganizeError::FileMoveFailure {
                from: from.to_path_buf(),
                to: target,
                source,
            }),
        }
    }
}

fn file_name_of(path: &Path) -> OrganizeResult<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| OrganizeError::InvalidFileName {
            path: path.to_path_buf(),
        })
}
