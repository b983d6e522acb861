//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output: colored status lines,
//! the walking spinner, the per-category summary table and the extension lists.

use crate::summary::SortSummary;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::time::Duration;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use clean_folder::output::OutputFormatter;
    /// OutputFormatter::success("Sorting completed.");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a spinner that shows the directory being sorted.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use clean_folder::output::OutputFormatter;
    /// let spinner = OutputFormatter::create_spinner();
    /// spinner.set_message("/home/user/Downloads");
    /// spinner.inc(1);
    /// spinner.finish_and_clear();
    /// ```
    pub fn create_spinner() -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {pos} files sorted {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }

    /// Prints a summary table with file counts by category.
    pub fn summary_table(category_counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let max_category_len = category_counts
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(8); // At least "Category" width

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = max_category_len
        );
        println!("{}", "-".repeat(max_category_len + 10));

        for (category, count) in category_counts {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural_files(*count),
                width = max_category_len
            );
        }

        println!("{}", "-".repeat(max_category_len + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural_files(total_files),
            width = max_category_len
        );
    }

    /// Prints the end-of-run report: completion line, extension lists, table,
    /// and any per-entry failures.
    pub fn run_report(summary: &SortSummary) {
        if summary.cancelled {
            Self::warning("Sorting cancelled before the whole tree was visited.");
        } else {
            Self::success("Sorting completed.");
        }

        Self::plain("Known Extensions:");
        Self::plain(&summary.known_list());
        Self::plain("\nUnknown Extensions:");
        Self::plain(&summary.unknown_list());

        Self::summary_table(&summary.category_counts, summary.files_moved());

        if summary.files_skipped > 0 {
            Self::info(&format!(
                "{} {} excluded by filters",
                summary.files_skipped,
                plural_files(summary.files_skipped)
            ));
        }
        if !summary.removed_dirs.is_empty() {
            Self::info(&format!(
                "Removed {} empty {}",
                summary.removed_dirs.len(),
                if summary.removed_dirs.len() == 1 {
                    "directory"
                } else {
                    "directories"
                }
            ));
        }

        if summary.has_failures() {
            Self::header("FAILURES");
            for failure in &summary.failures {
                Self::error(&format!("{}: {}", failure.path.display(), failure.reason));
            }
        }
    }
}

fn plural_files(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
