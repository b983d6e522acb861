//! Command-line interface module for clean-folder.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Configuration loading
//! - Sorting, dry-run planning and undo orchestration
//! - Journal persistence and the final report

use crate::config::{CompiledConfig, Config, ConfigError};
use crate::file_organizer::{OperationLog, OrganizeError};
use crate::fs_ops::{MemFs, StdFs};
use crate::output::OutputFormatter;
use crate::sorter::{SortOutcome, Sorter};
use crate::undo::UndoManager;
use clap::Parser;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use thiserror::Error;

/// Sort a folder into per-category subfolders.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "clean-folder",
    version,
    about = "Sort a folder tree into per-category subfolders",
    long_about = "Recursively renames files to transliterated ASCII names and moves them into \
                  images/, videos/, documents/, audio/, archives/ or unknown/ next to where \
                  they were found. Empty folders are removed."
)]
pub struct Args {
    /// Folder to sort.
    pub path: PathBuf,

    /// Path to a TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show what would happen without touching any file.
    #[arg(long, conflicts_with = "undo")]
    pub dry_run: bool,

    /// Revert the previous run in this folder.
    #[arg(long)]
    pub undo: bool,

    /// Keep directories that become empty during the run.
    #[arg(long)]
    pub keep_empty_dirs: bool,

    /// Log every rename and move.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// The command these arguments ask for.
    pub fn organize_command(&self) -> OrganizeCommand {
        if self.undo {
            OrganizeCommand::Undo
        } else {
            OrganizeCommand::Organize {
                dry_run: self.dry_run,
            }
        }
    }

    /// Run settings derived from the flags.
    pub fn settings(&self) -> RunSettings {
        RunSettings {
            config_path: self.config.clone(),
            keep_empty_dirs: self.keep_empty_dirs,
            show_progress: !self.verbose,
            cancel_flag: None,
        }
    }
}

/// Represents a CLI command to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizeCommand {
    /// Sort the tree.
    Organize {
        /// If true, plan the run without making changes.
        dry_run: bool,
    },
    /// Undo the previous run.
    Undo,
}

/// Options that shape a run beyond the configuration file.
#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    pub config_path: Option<PathBuf>,
    pub keep_empty_dirs: bool,
    pub show_progress: bool,
    /// Once set, sorting stops before the next entry.
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

/// How a run that did not hit a fatal error ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every entry was handled.
    Clean,
    /// The run was cancelled, or some entries failed or were left unrestored.
    Partial,
}

/// Fatal errors that stop a run before or during setup.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Organize(#[from] OrganizeError),

    #[error("Cannot resolve path {}: {source}", path.display())]
    InvalidPath { path: PathBuf, source: io::Error },

    #[error("Cannot scan {} for a dry run: {source}", path.display())]
    DryRunScan { path: PathBuf, source: io::Error },
}

/// Runs the command described by parsed arguments.
///
/// `cancel_flag` is handed to the sorter; the binary sets it on Ctrl-C.
pub fn run_cli(args: &Args, cancel_flag: Arc<AtomicBool>) -> Result<RunStatus, CliError> {
    let settings = RunSettings {
        cancel_flag: Some(cancel_flag),
        ..args.settings()
    };
    run_command(args.organize_command(), &args.path, &settings)
}

/// Runs `command` against `dir_path`.
///
/// # Examples
///
/// ```no_run
/// use clean_folder::cli::{run_command, OrganizeCommand, RunSettings};
/// use std::path::Path;
///
/// let status = run_command(
///     OrganizeCommand::Organize { dry_run: false },
///     Path::new("/path/to/directory"),
///     &RunSettings::default(),
/// );
/// match status {
///     Ok(status) => println!("Finished: {:?}", status),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_command(
    command: OrganizeCommand,
    dir_path: &Path,
    settings: &RunSettings,
) -> Result<RunStatus, CliError> {
    let base_path = std::path::absolute(dir_path).map_err(|source| CliError::InvalidPath {
        path: dir_path.to_path_buf(),
        source,
    })?;

    match command {
        OrganizeCommand::Organize { dry_run } => {
            let mut config = Config::load(settings.config_path.as_deref())?.compile()?;
            if settings.keep_empty_dirs {
                config.options.prune_emptied_dirs = false;
            }

            if dry_run {
                organize_dry_run(&base_path, &config, settings)
            } else {
                organize_directory(&base_path, &config, settings)
            }
        }
        OrganizeCommand::Undo => undo_organization(&base_path),
    }
}

/// Sorts `base_path` for real and saves the journal.
fn organize_directory(
    base_path: &Path,
    config: &CompiledConfig,
    settings: &RunSettings,
) -> Result<RunStatus, CliError> {
    OutputFormatter::info(&format!("Sorting contents of: {}", base_path.display()));

    let spinner = settings
        .show_progress
        .then(OutputFormatter::create_spinner);
    let mut sorter = Sorter::new(&StdFs, base_path, config);
    if let Some(spinner) = &spinner {
        sorter = sorter.with_progress(spinner.clone());
    }
    if let Some(flag) = &settings.cancel_flag {
        sorter = sorter.with_cancel_flag(Arc::clone(flag));
    }

    let outcome = sorter.run();
    if let Some(spinner) = &spinner {
        spinner.finish_and_clear();
    }
    let outcome = outcome?;

    if !outcome.log.is_empty() {
        match outcome.log.save(base_path) {
            Ok(()) => OutputFormatter::info(&format!(
                "History saved. Use 'clean-folder {} --undo' to revert changes.",
                base_path.display()
            )),
            Err(e) => OutputFormatter::warning(&format!("Could not save history: {}", e)),
        }
    }

    OutputFormatter::run_report(&outcome.summary);
    Ok(status_of(&outcome))
}

/// Plans a run against an in-memory copy of the tree and prints the plan.
fn organize_dry_run(
    base_path: &Path,
    config: &CompiledConfig,
    settings: &RunSettings,
) -> Result<RunStatus, CliError> {
    OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", base_path.display()));

    let mirror = MemFs::mirror(base_path).map_err(|source| CliError::DryRunScan {
        path: base_path.to_path_buf(),
        source,
    })?;
    let mut sorter = Sorter::new(&mirror, base_path, config);
    if let Some(flag) = &settings.cancel_flag {
        sorter = sorter.with_cancel_flag(Arc::clone(flag));
    }
    let outcome = sorter.run()?;

    if outcome.log.is_empty() && outcome.summary.removed_dirs.is_empty() {
        OutputFormatter::plain("Nothing to sort.");
    } else {
        OutputFormatter::dry_run_notice("Files would be organized as follows:");
        for operation in &outcome.log.operations {
            OutputFormatter::plain(&format!(
                " - {} → {}",
                relative_display(base_path, &operation.original_path),
                relative_display(base_path, &operation.new_path)
            ));
        }
        for dir in &outcome.summary.removed_dirs {
            OutputFormatter::plain(&format!(
                " - remove empty {}/",
                relative_display(base_path, dir)
            ));
        }
    }

    OutputFormatter::run_report(&outcome.summary);
    OutputFormatter::success("Dry run complete. No files were modified.");
    Ok(status_of(&outcome))
}

/// Undoes the previous run in `base_path`.
fn undo_organization(base_path: &Path) -> Result<RunStatus, CliError> {
    OutputFormatter::info("Undoing previous run...");

    let report = UndoManager::undo(base_path)?;
    OutputFormatter::success("Undo complete!");
    OutputFormatter::plain(&format!("  Restored: {}", report.restored_files));

    if !report.skipped_files.is_empty() {
        OutputFormatter::plain(&format!("  Skipped: {}", report.skipped_files.len()));
        for (path, reason) in &report.skipped_files {
            OutputFormatter::plain(&format!("    - {}: {}", path.display(), reason));
        }
    }

    if !report.failed_restores.is_empty() {
        OutputFormatter::plain(&format!("  Failed: {}", report.failed_restores.len()));
        for (path, reason) in &report.failed_restores {
            OutputFormatter::error(&format!("    - {}: {}", path.display(), reason));
        }
    }

    if report.is_complete_success() {
        Ok(RunStatus::Clean)
    } else {
        OutputFormatter::warning(&format!(
            "History file {} was kept. Fix the issues above and try again.",
            OperationLog::history_file_path(base_path).display()
        ));
        Ok(RunStatus::Partial)
    }
}

fn status_of(outcome: &SortOutcome) -> RunStatus {
    if outcome.summary.has_failures() || outcome.summary.cancelled {
        RunStatus::Partial
    } else {
        RunStatus::Clean
    }
}

fn relative_display(base_path: &Path, path: &Path) -> String {
    path.strip_prefix(base_path)
        .unwrap_or(path)
        .display()
        .to_string()
}
