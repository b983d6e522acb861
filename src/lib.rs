//! clean-folder - Sort a folder tree into per-category subfolders
//!
//! This library provides filename normalization, extension-based
//! categorization, the recursive sorter that renames and relocates files,
//! a journal of every move so a run can be undone, and TOML configuration
//! for categories and file filtering.

pub mod cli;
pub mod collision;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod fs_ops;
pub mod normalize;
pub mod output;
pub mod sorter;
pub mod summary;
pub mod undo;

pub use config::{CompiledConfig, CompiledFilters, Config, ConfigError};
pub use file_category::{ExtensionMap, UNKNOWN_CATEGORY};
pub use file_organizer::{FileOrganizer, OperationLog, OrganizeError};
pub use fs_ops::{FileSystem, MemFs, StdFs};
pub use normalize::normalize;
pub use sorter::{SortOutcome, Sorter};
pub use summary::SortSummary;
pub use undo::{UndoManager, UndoReport};

pub use cli::{OrganizeCommand, RunSettings, RunStatus, run_cli, run_command};
