/// Undo for sorting runs.
///
/// Replays the journal written by the last run in reverse, moving every file
/// back to where it was found and removing the category directories that run
/// created once they end up empty.
use crate::file_organizer::{Operation, OperationLog, OrganizeError, OrganizeResult};
use crate::fs_ops::{FileSystem, StdFs};
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

/// Represents the result of an undo operation.
#[derive(Debug, Default)]
pub struct UndoReport {
    /// Number of files successfully restored.
    pub restored_files: usize,
    /// Files that failed to restore, with the reason.
    pub failed_restores: Vec<(PathBuf, String)>,
    /// Files that were skipped because they are no longer where the run left them.
    pub skipped_files: Vec<(PathBuf, String)>,
    /// Directories removed because the undo emptied them.
    pub removed_dirs: Vec<PathBuf>,
}

impl UndoReport {
    /// Returns the total number of operations processed.
    pub fn total_processed(&self) -> usize {
        self.restored_files + self.failed_restores.len() + self.skipped_files.len()
    }

    /// Returns true if the undo was completely successful.
    pub fn is_complete_success(&self) -> bool {
        self.failed_restores.is_empty() && self.skipped_files.is_empty()
    }
}

enum RestoreError {
    Skipped(PathBuf, String),
    Failed(PathBuf, String),
}

/// Manages undo operations for sorting runs.
pub struct UndoManager;

impl UndoManager {
    /// Undoes the most recent run in `base_path`.
    ///
    /// The journal is deleted only when every operation was restored.
    ///
    /// # Edge Cases Handled
    ///
    /// * **File not found**: skipped, the file was moved or deleted since
    /// * **File name conflict**: the occupant is backed up with a timestamp suffix
    /// * **Missing parent**: directories pruned by the run are recreated
    /// * **Missing history**: returns `OrganizeError::NoHistory`
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use clean_folder::undo::UndoManager;
    /// use std::path::Path;
    ///
    /// match UndoManager::undo(Path::new("/path/to/directory")) {
    ///     Ok(report) => println!("Restored {} files", report.restored_files),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo(base_path: &Path) -> OrganizeResult<UndoReport> {
        if !base_path.is_dir() {
            return Err(OrganizeError::InvalidBasePath {
                path: base_path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "base path does not exist"),
            });
        }

        let log = OperationLog::load(base_path)?.ok_or_else(|| OrganizeError::NoHistory {
            path: base_path.to_path_buf(),
        })?;

        let report = Self::undo_log(&StdFs, &log);

        if report.is_complete_success()
            && let Err(e) = OperationLog::delete(base_path)
        {
            tracing::warn!(error = %e, "could not delete history file");
        }

        Ok(report)
    }

    /// Reverses every operation in `log`, newest first.
    pub fn undo_log<F: FileSystem>(fs: &F, log: &OperationLog) -> UndoReport {
        let mut report = UndoReport::default();

        for operation in log.operations.iter().rev() {
            match Self::restore_file(fs, operation) {
                Ok(()) => {
                    tracing::debug!(
                        from = %operation.new_path.display(),
                        to = %operation.original_path.display(),
                        "restored file"
                    );
                    report.restored_files += 1;
                }
                Err(RestoreError::Skipped(path, reason)) => {
                    report.skipped_files.push((path, reason))
                }
                Err(RestoreError::Failed(path, reason)) => {
                    tracing::warn!(path = %path.display(), %reason, "restore failed");
                    report.failed_restores.push((path, reason));
                }
            }
        }

        let created_dirs: BTreeSet<&Path> = log
            .created_dirs
            .iter()
            .map(PathBuf::as_path)
            .filter(|dir| *dir != log.base_path)
            .collect();

        for dir in created_dirs.into_iter().rev() {
            let is_empty = matches!(fs.read_dir(dir), Ok(entries) if entries.is_empty());
            if is_empty && fs.remove_dir(dir).is_ok() {
                report.removed_dirs.push(dir.to_path_buf());
            }
        }

        report
    }

    fn restore_file<F: FileSystem>(fs: &F, operation: &Operation) -> Result<(), RestoreError> {
        if !fs.exists(&operation.new_path) {
            return Err(RestoreError::Skipped(
                operation.new_path.clone(),
                "File not found at expected location".to_string(),
            ));
        }

        if let Some(parent) = operation.original_path.parent() {
            fs.create_dir_all(parent).map_err(|e| {
                RestoreError::Failed(
                    operation.original_path.clone(),
                    format!("Could not recreate directory {}: {}", parent.display(), e),
                )
            })?;
        }

        if fs.exists(&operation.original_path) {
            let backup_path = Self::generate_backup_path(&operation.original_path);
            fs.rename(&operation.original_path, &backup_path)
                .map_err(|e| {
                    RestoreError::Failed(
                        operation.original_path.clone(),
                        format!("Could not backup conflicting file: {}", e),
                    )
                })?;
        }

        fs.rename(&operation.new_path, &operation.original_path)
            .map_err(|e| {
                RestoreError::Failed(
                    operation.new_path.clone(),
                    format!("Failed to restore file: {}", e),
                )
            })
    }

    /// Generates a backup path for a file by appending a timestamp.
    ///
    /// Example: `file.txt` becomes `file.txt.bak.20251109-143052`
    fn generate_backup_path(original_path: &Path) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let filename = original_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        original_path.with_file_name(format!("{}.bak.{}", filename, timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fs_ops::MemFs;
    use crate::sorter::Sorter;
    use std::fs;
    use tempfile::TempDir;

    fn p(path: &str) -> PathBuf {
        PathBuf::from(path)
    }

    #[test]
    fn test_undo_no_history() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = UndoManager::undo(temp_dir.path());
        assert!(matches!(result, Err(OrganizeError::NoHistory { .. })));
    }

    #[test]
    fn test_undo_invalid_base_path() {
        let result = UndoManager::undo(Path::new("/non/existent/path"));
        assert!(matches!(result, Err(OrganizeError::InvalidBasePath { .. })));
    }

    #[test]
    fn test_undo_reverses_a_sorting_run() {
        let mem = MemFs::new();
        mem.add_file("/r/Фото.jpg");
        mem.add_file("/r/sub/A!.txt");
        mem.add_file("/r/sub/A?.txt");
        mem.add_dir("/r/sub/Empty");
        let before = mem.files_under(&p("/r"));
        let config = Config::default().compile().unwrap();

        let outcome = Sorter::new(&mem, "/r", &config).run().unwrap();
        let report = UndoManager::undo_log(&mem, &outcome.log);

        assert_eq!(report.restored_files, 3);
        assert!(report.is_complete_success());
        assert_eq!(mem.files_under(&p("/r")), before);
        assert!(!mem.exists(&p("/r/images")));
        assert!(!mem.exists(&p("/r/sub/documents")));
    }

    #[test]
    fn test_undo_recreates_pruned_parent() {
        let mem = MemFs::new();
        mem.add_file("/r/documents/a.txt");
        let mut log = OperationLog::new(p("/r"));
        log.add_created_dir(p("/r/documents"));
        log.add_operation(Operation {
            original_path: p("/r/gone/dir/a.txt"),
            new_path: p("/r/documents/a.txt"),
            category: "documents".to_string(),
        });

        let report = UndoManager::undo_log(&mem, &log);

        assert_eq!(report.restored_files, 1);
        assert!(mem.is_file(&p("/r/gone/dir/a.txt")));
        assert_eq!(report.removed_dirs, vec![p("/r/documents")]);
    }

    #[test]
    fn test_undo_keeps_category_dirs_that_predate_the_run() {
        let mem = MemFs::new();
        mem.add_dir("/r/images");
        mem.add_file("/r/Фото.jpg");
        mem.add_file("/r/a.txt");
        let config = Config::default().compile().unwrap();

        let outcome = Sorter::new(&mem, "/r", &config).run().unwrap();
        let report = UndoManager::undo_log(&mem, &outcome.log);

        assert!(report.is_complete_success());
        assert!(mem.is_file(&p("/r/Фото.jpg")));
        assert!(mem.is_dir(&p("/r/images")));
        assert!(!mem.exists(&p("/r/documents")));
        assert_eq!(report.removed_dirs, vec![p("/r/documents")]);
    }

    #[test]
    fn test_undo_with_missing_file() {
        let mem = MemFs::new();
        mem.add_dir("/r");
        let mut log = OperationLog::new(p("/r"));
        log.add_operation(Operation {
            original_path: p("/r/nonexistent.txt"),
            new_path: p("/r/documents/nonexistent.txt"),
            category: "documents".to_string(),
        });

        let report = UndoManager::undo_log(&mem, &log);

        assert_eq!(report.restored_files, 0);
        assert_eq!(report.skipped_files.len(), 1);
        assert_eq!(report.total_processed(), 1);
        assert!(!report.is_complete_success());
    }

    #[test]
    fn test_undo_with_file_name_conflict() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::create_dir(base_path.join("documents")).unwrap();
        fs::write(base_path.join("documents").join("test.txt"), "original content").unwrap();
        fs::write(base_path.join("Test.txt"), "new content").unwrap();

        let mut log = OperationLog::new(base_path.to_path_buf());
        log.add_operation(Operation {
            original_path: base_path.join("Test.txt"),
            new_path: base_path.join("documents").join("test.txt"),
            category: "documents".to_string(),
        });
        log.save(base_path).expect("Failed to save history");

        let report = UndoManager::undo(base_path).expect("Undo failed");

        assert_eq!(report.restored_files, 1);
        assert!(report.failed_restores.is_empty());
        let restored = fs::read_to_string(base_path.join("Test.txt")).unwrap();
        assert_eq!(restored, "original content");

        let backups = fs::read_dir(base_path)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".bak."))
            .count();
        assert_eq!(backups, 1);
        assert!(!OperationLog::history_file_path(base_path).exists());
    }
}
