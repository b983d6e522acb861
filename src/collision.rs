//! Collision-free target paths.
//!
//! A taken name `stem.ext` is retried as `stem_duplicate1.ext`,
//! `stem_duplicate2.ext`, ... in the same directory until a free one is found.

use crate::file_organizer::{OrganizeError, OrganizeResult};
use crate::fs_ops::FileSystem;
use crate::normalize::split_name;
use std::path::{Path, PathBuf};

/// Default highest suffix index tried before giving up.
pub const DEFAULT_MAX_DUPLICATES: u32 = 10_000;

/// Builds the `index`-th duplicate name for `file_name`.
pub fn duplicate_name(file_name: &str, index: u32) -> String {
    let (stem, ext) = split_name(file_name);
    format!("{}_duplicate{}{}", stem, index, ext)
}

/// Returns `candidate` if it is free, otherwise the first free duplicate name.
///
/// The check is not atomic: another process may take the returned path before
/// it is used, so callers must still handle `AlreadyExists` on rename.
///
/// # Errors
///
/// Returns `OrganizeError::CollisionLimit` when every suffix up to
/// `max_attempts` is taken.
pub fn resolve<F: FileSystem>(
    fs: &F,
    candidate: &Path,
    max_attempts: u32,
) -> OrganizeResult<PathBuf> {
    if !fs.exists(candidate) {
        return Ok(candidate.to_path_buf());
    }
    resolve_duplicate(fs, candidate, max_attempts)
}

/// Returns the first free duplicate name of `candidate`, treating
/// `candidate` itself as taken whether or not it exists.
///
/// # Errors
///
/// Returns `OrganizeError::CollisionLimit` when every suffix up to
/// `max_attempts` is taken.
pub fn resolve_duplicate<F: FileSystem>(
    fs: &F,
    candidate: &Path,
    max_attempts: u32,
) -> OrganizeResult<PathBuf> {
    let file_name = candidate
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| OrganizeError::InvalidFileName {
            path: candidate.to_path_buf(),
        })?;
    let parent = candidate.parent().unwrap_or(Path::new(""));

    for index in 1..=max_attempts {
        let attempt = parent.join(duplicate_name(&file_name, index));
        if !fs.exists(&attempt) {
            return Ok(attempt);
        }
    }

    Err(OrganizeError::CollisionLimit {
        path: candidate.to_path_buf(),
        limit: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_ops::MemFs;

    #[test]
    fn test_free_candidate_is_returned_unchanged() {
        let mem = MemFs::new();
        mem.add_dir("/r");
        let path = resolve(&mem, Path::new("/r/a.txt"), 10).unwrap();
        assert_eq!(path, PathBuf::from("/r/a.txt"));
    }

    #[test]
    fn test_first_free_slot_is_used() {
        let mem = MemFs::new();
        mem.add_file("/r/a.txt");
        assert_eq!(
            resolve(&mem, Path::new("/r/a.txt"), 10).unwrap(),
            PathBuf::from("/r/a_duplicate1.txt")
        );

        mem.add_file("/r/a_duplicate1.txt");
        assert_eq!(
            resolve(&mem, Path::new("/r/a.txt"), 10).unwrap(),
            PathBuf::from("/r/a_duplicate2.txt")
        );
    }

    #[test]
    fn test_gaps_are_filled_first() {
        let mem = MemFs::new();
        mem.add_file("/r/a.txt");
        mem.add_file("/r/a_duplicate2.txt");
        assert_eq!(
            resolve(&mem, Path::new("/r/a.txt"), 10).unwrap(),
            PathBuf::from("/r/a_duplicate1.txt")
        );
    }

    #[test]
    fn test_directories_count_as_taken() {
        let mem = MemFs::new();
        mem.add_dir("/r/notes");
        assert_eq!(
            resolve(&mem, Path::new("/r/notes"), 10).unwrap(),
            PathBuf::from("/r/notes_duplicate1")
        );
    }

    #[test]
    fn test_resolve_duplicate_skips_free_candidate() {
        let mem = MemFs::new();
        mem.add_dir("/r");
        assert_eq!(
            resolve_duplicate(&mem, Path::new("/r/unknown"), 10).unwrap(),
            PathBuf::from("/r/unknown_duplicate1")
        );
    }

    #[test]
    fn test_cap_exceeded() {
        let mem = MemFs::new();
        mem.add_file("/r/a.txt");
        mem.add_file("/r/a_duplicate1.txt");
        mem.add_file("/r/a_duplicate2.txt");

        let err = resolve(&mem, Path::new("/r/a.txt"), 2).unwrap_err();
        assert!(matches!(err, OrganizeError::CollisionLimit { limit: 2, .. }));
    }

    #[test]
    fn test_duplicate_name_keeps_extension() {
        assert_eq!(duplicate_name("a_.txt", 1), "a__duplicate1.txt");
        assert_eq!(duplicate_name("archive.tar.gz", 3), "archive.tar_duplicate3.gz");
        assert_eq!(duplicate_name(".hidden", 1), ".hidden_duplicate1");
    }
}
