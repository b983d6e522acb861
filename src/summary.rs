//! Run summary.
//!
//! Collects what a sorting run saw and did. Nothing here touches the
//! filesystem; the CLI renders the finished summary.

use crate::file_category::UNKNOWN_CATEGORY;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// An entry the sorter could not process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Aggregate results of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSummary {
    /// Extension tokens that matched a category.
    pub known_extensions: BTreeSet<String>,
    /// Extension tokens that fell back to `unknown`.
    pub unknown_extensions: BTreeSet<String>,
    /// Files moved per category label.
    pub category_counts: BTreeMap<String, usize>,
    /// Files left alone because a filter excluded them.
    pub files_skipped: usize,
    /// Directories removed because they were or became empty.
    pub removed_dirs: Vec<PathBuf>,
    pub failures: Vec<EntryFailure>,
    /// The run stopped early on request.
    pub cancelled: bool,
}

impl SortSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a file sorted into `category`.
    ///
    /// `token` is the uppercase extension without the dot; an empty token
    /// (file without extension) is counted but adds no extension to the sets.
    pub fn record_file(&mut self, token: &str, category: &str) {
        *self.category_counts.entry(category.to_string()).or_insert(0) += 1;

        if token.is_empty() {
            return;
        }
        if category == UNKNOWN_CATEGORY {
            self.unknown_extensions.insert(token.to_string());
        } else {
            self.known_extensions.insert(token.to_string());
        }
    }

    pub fn record_skipped(&mut self) {
        self.files_skipped += 1;
    }

    pub fn record_removed_dir(&mut self, path: PathBuf) {
        self.removed_dirs.push(path);
    }

    pub fn record_failure(&mut self, path: PathBuf, reason: impl Into<String>) {
        self.failures.push(EntryFailure {
            path,
            reason: reason.into(),
        });
    }

    /// Total number of files relocated.
    pub fn files_moved(&self) -> usize {
        self.category_counts.values().sum()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Known extensions, comma-joined in sorted order.
    pub fn known_list(&self) -> String {
        join(&self.known_extensions)
    }

    /// Unknown extensions, comma-joined in sorted order.
    pub fn unknown_list(&self) -> String {
        join(&self.unknown_extensions)
    }
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
