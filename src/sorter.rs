//! Depth-first tree sorter.
//!
//! Visits every directory under the root once. Files are renamed to their
//! normalized names and moved into a category subdirectory of the directory
//! they were found in; subdirectories are descended into unless their name is
//! a category label. Empty directories are removed, except the root.

use crate::config::{CompiledConfig, CompiledFilters, OrganizeOptions};
use crate::file_category::{ExtensionMap, extension_token};
use crate::file_organizer::{
    FileOrganizer, HISTORY_FILE_NAME, Operation, OperationLog, OrganizeError, OrganizeResult,
};
use crate::fs_ops::{DirEntryInfo, EntryKind, FileSystem};
use crate::normalize::{normalized_file_name, split_name};
use crate::summary::SortSummary;
use indicatif::ProgressBar;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// What a run produced: the summary to show and the journal to persist.
#[derive(Debug, Clone)]
pub struct SortOutcome {
    pub summary: SortSummary,
    pub log: OperationLog,
}

/// Sorts one directory tree.
pub struct Sorter<'a, F: FileSystem> {
    fs: &'a F,
    root: PathBuf,
    categories: &'a ExtensionMap,
    filters: &'a CompiledFilters,
    options: OrganizeOptions,
    progress: Option<ProgressBar>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, F: FileSystem> Sorter<'a, F> {
    pub fn new(fs: &'a F, root: impl Into<PathBuf>, config: &'a CompiledConfig) -> Self {
        Self {
            fs,
            root: root.into(),
            categories: &config.categories,
            filters: &config.filters,
            options: config.options,
            progress: None,
            cancel: None,
        }
    }

    /// Reports each visited directory and sorted file on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Stops the walk before the next entry once `flag` is set.
    ///
    /// Every move is a single rename, so a cancelled run never leaves a file
    /// half-moved.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Sorts the whole tree.
    ///
    /// Per-entry problems are recorded in the summary and do not stop the walk.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::InvalidBasePath` if the root is not a directory.
    pub fn run(&self) -> OrganizeResult<SortOutcome> {
        if !self.fs.is_dir(&self.root) {
            let kind = if self.fs.exists(&self.root) {
                io::ErrorKind::NotADirectory
            } else {
                io::ErrorKind::NotFound
            };
            return Err(OrganizeError::InvalidBasePath {
                path: self.root.clone(),
                source: io::Error::new(kind, "root must be an existing directory"),
            });
        }

        tracing::info!(root = %self.root.display(), "sorting started");
        let mut outcome = SortOutcome {
            summary: SortSummary::new(),
            log: OperationLog::new(self.root.clone()),
        };

        self.sort_dir(&self.root, &mut outcome);

        tracing::info!(
            moved = outcome.summary.files_moved(),
            removed_dirs = outcome.summary.removed_dirs.len(),
            failures = outcome.summary.failures.len(),
            "sorting finished"
        );
        Ok(outcome)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn sort_dir(&self, dir: &Path, outcome: &mut SortOutcome) {
        if self.is_cancelled() {
            outcome.summary.cancelled = true;
            return;
        }
        if let Some(progress) = &self.progress {
            progress.set_message(dir.display().to_string());
        }

        let mut entries = match self.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(source) => {
                let err = OrganizeError::ReadDirFailed {
                    path: dir.to_path_buf(),
                    source,
                };
                self.fail(outcome, dir, err);
                return;
            }
        };

        if entries.is_empty() {
            if dir != self.root {
                self.remove_empty_dir(dir, outcome);
            }
            return;
        }

        // Files squatting on a category name go first so their directory can be created.
        entries.sort_by_cached_key(|entry| {
            let squats = entry.kind == EntryKind::File
                && self
                    .categories
                    .is_category_dir(&normalized_file_name(&entry.name));
            (!squats, entry.name.clone())
        });

        for entry in &entries {
            if self.is_cancelled() {
                outcome.summary.cancelled = true;
                return;
            }

            match entry.kind {
                EntryKind::File => self.sort_file(dir, entry, outcome),
                EntryKind::Dir if self.categories.is_category_dir(&entry.name) => {
                    tracing::debug!(dir = %entry.path.display(), "skipping category directory");
                }
                EntryKind::Dir => self.sort_dir(&entry.path, outcome),
                EntryKind::Other => {
                    tracing::debug!(path = %entry.path.display(), "leaving special entry alone");
                }
            }
        }

        if self.options.prune_emptied_dirs
            && dir != self.root
            && matches!(self.fs.read_dir(dir), Ok(remaining) if remaining.is_empty())
        {
            self.remove_empty_dir(dir, outcome);
        }
    }

    fn sort_file(&self, dir: &Path, entry: &DirEntryInfo, outcome: &mut SortOutcome) {
        if dir == self.root && entry.name == HISTORY_FILE_NAME {
            return;
        }

        let relative = entry.path.strip_prefix(&self.root).unwrap_or(&entry.path);
        if !self.filters.should_include(relative) {
            tracing::debug!(path = %entry.path.display(), "excluded by filters");
            outcome.summary.record_skipped();
            return;
        }

        if let Some(progress) = &self.progress {
            progress.inc(1);
        }

        let (_, ext) = split_name(&entry.name);
        let token = extension_token(ext);
        let category = self.categories.categorize(&token);
        let organizer = FileOrganizer::new(self.fs, self.options.max_duplicates)
            .with_reserved_names(self.categories);

        let renamed = match organizer.rename_normalized(&entry.path) {
            Ok(renamed) => renamed,
            Err(err) => {
                self.fail(outcome, &entry.path, err);
                return;
            }
        };

        let moved = organizer
            .ensure_category_dir(dir, category)
            .and_then(|category_dir| {
                if category_dir.created {
                    outcome.log.add_created_dir(category_dir.path.clone());
                }
                organizer.move_into(&renamed, &category_dir.path)
            });

        match moved {
            Ok(new_path) => {
                tracing::debug!(
                    from = %entry.path.display(),
                    to = %new_path.display(),
                    category,
                    "moved file"
                );
                outcome.log.add_operation(Operation {
                    original_path: entry.path.clone(),
                    new_path,
                    category: category.to_string(),
                });
                outcome.summary.record_file(&token, category);
            }
            Err(err) => {
                // Keep the in-place rename undoable even though the move failed.
                if renamed != entry.path {
                    outcome.log.add_operation(Operation {
                        original_path: entry.path.clone(),
                        new_path: renamed,
                        category: category.to_string(),
                    });
                }
                self.fail(outcome, &entry.path, err);
            }
        }
    }

    fn remove_empty_dir(&self, dir: &Path, outcome: &mut SortOutcome) {
        match self.fs.remove_dir(dir) {
            Ok(()) => {
                tracing::info!(dir = %dir.display(), "removed empty directory");
                outcome.summary.record_removed_dir(dir.to_path_buf());
            }
            Err(source) => {
                let err = OrganizeError::DirectoryRemovalFailed {
                    path: dir.to_path_buf(),
                    source,
                };
                self.fail(outcome, dir, err);
            }
        }
    }

    fn fail(&self, outcome: &mut SortOutcome, path: &Path, err: OrganizeError) {
        tracing::warn!(path = %path.display(), error = %err, "skipping entry");
        outcome.summary.record_failure(path.to_path_buf(), err.to_string());
    }
}
