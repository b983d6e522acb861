use clean_folder::cli::{OrganizeCommand, RunSettings, RunStatus, run_command};
use clean_folder::file_organizer::HISTORY_FILE_NAME;
/// Integration tests for clean-folder
///
/// These tests run the full command against real temporary directories.
///
/// Test categories:
/// 1. Basic sorting
/// 2. Nested trees and empty directories
/// 3. Dry-run mode
/// 4. Undo
/// 5. Configuration and filtering
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// A temporary tree to sort plus a private config file, so the user's own
/// configuration never leaks into a test.
struct TestFixture {
    temp_dir: TempDir,
    config_dir: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        Self::with_config("")
    }

    fn with_config(toml: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config_dir = TempDir::new().expect("Failed to create config directory");
        fs::write(config_dir.path().join("config.toml"), toml).expect("Failed to write config");
        TestFixture {
            temp_dir,
            config_dir,
        }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn settings(&self) -> RunSettings {
        RunSettings {
            config_path: Some(self.config_dir.path().join("config.toml")),
            keep_empty_dirs: false,
            show_progress: false,
            cancel_flag: None,
        }
    }

    fn organize(&self) -> RunStatus {
        run_command(
            OrganizeCommand::Organize { dry_run: false },
            self.path(),
            &self.settings(),
        )
        .expect("Sorting failed")
    }

    /// Create a file, along with any missing parent directories.
    fn create_text_file(&self, rel_path: &str, content: &str) {
        let file_path = self.path().join(rel_path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        let mut file = File::create(&file_path).expect("Failed to create file");
        file.write_all(content.as_bytes())
            .expect("Failed to write file content");
    }

    fn create_subdir(&self, rel_path: &str) {
        fs::create_dir_all(self.path().join(rel_path)).expect("Failed to create subdirectory");
    }

    fn assert_dir_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(path.is_dir(), "Directory should exist: {}", path.display());
    }

    fn assert_file_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(path.is_file(), "File should exist: {}", path.display());
    }

    fn assert_not_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(!path.exists(), "Path should not exist: {}", path.display());
    }

    fn read(&self, rel_path: &str) -> String {
        fs::read_to_string(self.path().join(rel_path)).expect("Failed to read file")
    }

    /// Every file under the root as a relative path, excluding the history file.
    fn list_files_recursive(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        Self::walk_dir(self.path(), &mut files);
        let mut relative: Vec<PathBuf> = files
            .into_iter()
            .filter(|p| p.file_name().is_none_or(|n| n != HISTORY_FILE_NAME))
            .filter_map(|p| p.strip_prefix(self.path()).ok().map(Path::to_path_buf))
            .collect();
        relative.sort();
        relative
    }

    fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) {
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() {
                    files.push(path);
                } else if path.is_dir() {
                    Self::walk_dir(&path, files);
                }
            }
        }
    }
}

fn paths(items: &[&str]) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = items.iter().map(PathBuf::from).collect();
    out.sort();
    out
}

// ============================================================================
// Test Suite 1: Basic Sorting
// ============================================================================

#[test]
fn test_organize_empty_directory() {
    let fixture = TestFixture::new();

    let status = fixture.organize();

    assert_eq!(status, RunStatus::Clean);
    fixture.assert_not_exists(HISTORY_FILE_NAME);
    assert!(fixture.path().is_dir(), "Root must survive even when empty");
}

#[test]
fn test_organize_transliterates_and_categorizes() {
    let fixture = TestFixture::new();
    fixture.create_text_file("Фото.jpg", "jpeg bytes");
    fixture.create_text_file("report.pdf", "pdf bytes");

    fixture.organize();

    fixture.assert_file_exists("images/foto.jpg");
    fixture.assert_file_exists("documents/report.pdf");
    assert_eq!(
        fixture.list_files_recursive(),
        paths(&["documents/report.pdf", "images/foto.jpg"])
    );
}

#[test]
fn test_organize_preserves_file_content() {
    let fixture = TestFixture::new();
    fixture.create_text_file("Notes 2024.txt", "remember the milk");

    fixture.organize();

    assert_eq!(fixture.read("documents/notes_2024.txt"), "remember the milk");
}

#[test]
fn test_unknown_and_extensionless_files() {
    let fixture = TestFixture::new();
    fixture.create_text_file("data.xyz", "?");
    fixture.create_text_file("README", "?");

    fixture.organize();

    fixture.assert_file_exists("unknown/data.xyz");
    fixture.assert_file_exists("unknown/readme");
}

#[test]
fn test_duplicate_normalized_names_get_suffixes() {
    let fixture = TestFixture::new();
    fixture.create_text_file("A!.txt", "first");
    fixture.create_text_file("A?.txt", "second");

    fixture.organize();

    assert_eq!(fixture.read("documents/a_.txt"), "first");
    assert_eq!(fixture.read("documents/a__duplicate1.txt"), "second");
}

#[test]
fn test_existing_category_directory_is_not_descended() {
    let fixture = TestFixture::new();
    fixture.create_text_file("images/old.png", "already sorted");
    fixture.create_text_file("New Photo.png", "new");

    fixture.organize();

    fixture.assert_file_exists("images/old.png");
    fixture.assert_file_exists("images/new_photo.png");
    fixture.assert_not_exists("images/images");
}

// ============================================================================
// Test Suite 2: Nested Trees and Empty Directories
// ============================================================================

#[test]
fn test_nested_files_are_sorted_in_place() {
    let fixture = TestFixture::new();
    fixture.create_text_file("Work/Звіт.docx", "report");
    fixture.create_text_file("Work/Music/song.mp3", "la la");
    fixture.create_text_file("top.zip", "zip");

    fixture.organize();

    assert_eq!(
        fixture.list_files_recursive(),
        paths(&[
            "Work/Music/audio/song.mp3",
            "Work/documents/zvit.docx",
            "archives/top.zip",
        ])
    );
}

#[test]
fn test_empty_directories_are_removed() {
    let fixture = TestFixture::new();
    fixture.create_subdir("Empty");
    fixture.create_subdir("Outer/Inner");
    fixture.create_text_file("keep.txt", "x");

    fixture.organize();

    fixture.assert_not_exists("Empty");
    fixture.assert_not_exists("Outer");
    fixture.assert_file_exists("documents/keep.txt");
}

#[test]
fn test_keep_empty_dirs_keeps_emptied_directories() {
    let fixture = TestFixture::new();
    fixture.create_subdir("Outer/Inner");
    fixture.create_text_file("photo.gif", "gif");
    let settings = RunSettings {
        keep_empty_dirs: true,
        ..fixture.settings()
    };

    run_command(
        OrganizeCommand::Organize { dry_run: false },
        fixture.path(),
        &settings,
    )
    .expect("Sorting failed");

    fixture.assert_file_exists("images/photo.gif");
    fixture.assert_not_exists("Outer/Inner");
    fixture.assert_dir_exists("Outer");
}

#[test]
fn test_organize_idempotent() {
    let fixture = TestFixture::new();
    fixture.create_text_file("Фото.jpg", "1");
    fixture.create_text_file("sub/A!.txt", "2");
    fixture.create_text_file("sub/A?.txt", "3");

    fixture.organize();
    let after_first = fixture.list_files_recursive();
    let history_after_first = fixture.read(HISTORY_FILE_NAME);

    let status = fixture.organize();

    assert_eq!(status, RunStatus::Clean);
    assert_eq!(fixture.list_files_recursive(), after_first);
    assert_eq!(
        fixture.read(HISTORY_FILE_NAME),
        history_after_first,
        "A run that moves nothing must not overwrite the journal"
    );
}

#[test]
fn test_history_file_is_written_and_left_at_root() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.mp4", "video");

    fixture.organize();
    fixture.assert_file_exists(HISTORY_FILE_NAME);

    fixture.create_text_file("b.mp4", "video");
    fixture.organize();

    fixture.assert_file_exists(HISTORY_FILE_NAME);
    fixture.assert_not_exists(&format!("unknown/{}", HISTORY_FILE_NAME));
    fixture.assert_file_exists("videos/b.mp4");
}

#[test]
fn test_cancelled_run_leaves_tree_alone() {
    let fixture = TestFixture::new();
    fixture.create_text_file("Фото.jpg", "1");
    fixture.create_subdir("Empty");
    let settings = RunSettings {
        cancel_flag: Some(Arc::new(AtomicBool::new(true))),
        ..fixture.settings()
    };

    let status = run_command(
        OrganizeCommand::Organize { dry_run: false },
        fixture.path(),
        &settings,
    )
    .expect("Sorting failed");

    assert_eq!(status, RunStatus::Partial);
    fixture.assert_file_exists("Фото.jpg");
    fixture.assert_dir_exists("Empty");
    fixture.assert_not_exists(HISTORY_FILE_NAME);
}

#[test]
fn test_file_named_unknown_is_sorted_with_its_siblings() {
    let fixture = TestFixture::new();
    fixture.create_text_file("Unknown", "squatter");
    fixture.create_text_file("data.xyz", "data");

    let status = fixture.organize();

    assert_eq!(status, RunStatus::Clean);
    assert_eq!(fixture.read("unknown/unknown_duplicate1"), "squatter");
    assert_eq!(fixture.read("unknown/data.xyz"), "data");
}

#[test]
fn test_invalid_root_is_fatal() {
    let fixture = TestFixture::new();
    fixture.create_text_file("file.txt", "not a dir");

    let result = run_command(
        OrganizeCommand::Organize { dry_run: false },
        &fixture.path().join("file.txt"),
        &fixture.settings(),
    );

    assert!(result.is_err());
}

// ============================================================================
// Test Suite 3: Dry Run
// ============================================================================

#[test]
fn test_dry_run_doesnt_touch_anything() {
    let fixture = TestFixture::new();
    fixture.create_text_file("Фото.jpg", "1");
    fixture.create_text_file("nested/Doc.pdf", "2");
    fixture.create_subdir("Empty");
    let before = fixture.list_files_recursive();

    let status = run_command(
        OrganizeCommand::Organize { dry_run: true },
        fixture.path(),
        &fixture.settings(),
    )
    .expect("Dry run failed");

    assert_eq!(status, RunStatus::Clean);
    assert_eq!(fixture.list_files_recursive(), before);
    fixture.assert_dir_exists("Empty");
    fixture.assert_not_exists("images");
    fixture.assert_not_exists(HISTORY_FILE_NAME);
}

// ============================================================================
// Test Suite 4: Undo
// ============================================================================

#[test]
fn test_undo_restores_original_layout() {
    let fixture = TestFixture::new();
    fixture.create_text_file("Фото.jpg", "photo");
    fixture.create_text_file("Work/Звіт.docx", "report");
    let before = fixture.list_files_recursive();

    fixture.organize();
    assert_ne!(fixture.list_files_recursive(), before);

    let status = run_command(OrganizeCommand::Undo, fixture.path(), &fixture.settings())
        .expect("Undo failed");

    assert_eq!(status, RunStatus::Clean);
    assert_eq!(fixture.list_files_recursive(), before);
    assert_eq!(fixture.read("Фото.jpg"), "photo");
    fixture.assert_not_exists("images");
    fixture.assert_not_exists("Work/documents");
    fixture.assert_not_exists(HISTORY_FILE_NAME);
}

#[test]
fn test_undo_keeps_category_folder_the_user_already_had() {
    let fixture = TestFixture::new();
    fixture.create_subdir("documents");
    fixture.create_text_file("Notes.txt", "n");

    fixture.organize();
    fixture.assert_file_exists("documents/notes.txt");

    run_command(OrganizeCommand::Undo, fixture.path(), &fixture.settings()).expect("Undo failed");

    fixture.assert_file_exists("Notes.txt");
    fixture.assert_dir_exists("documents");
}

#[test]
fn test_undo_without_history() {
    let fixture = TestFixture::new();

    let result = run_command(OrganizeCommand::Undo, fixture.path(), &fixture.settings());

    assert!(result.is_err(), "Undo without a journal should fail");
}

#[test]
fn test_undo_with_missing_file_keeps_history() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "a");
    fixture.create_text_file("b.txt", "b");

    fixture.organize();
    fs::remove_file(fixture.path().join("documents/a.txt")).unwrap();

    let status = run_command(OrganizeCommand::Undo, fixture.path(), &fixture.settings())
        .expect("Undo failed");

    assert_eq!(status, RunStatus::Partial);
    fixture.assert_file_exists("b.txt");
    fixture.assert_file_exists(HISTORY_FILE_NAME);
}

// ============================================================================
// Test Suite 5: Configuration and Filtering
// ============================================================================

#[test]
fn test_organize_with_exclude_extension() {
    let fixture = TestFixture::with_config(
        r#"
[filters.exclude]
extensions = ["log"]
"#,
    );
    fixture.create_text_file("debug.log", "noise");
    fixture.create_text_file("notes.txt", "signal");

    fixture.organize();

    fixture.assert_file_exists("debug.log");
    fixture.assert_file_exists("documents/notes.txt");
}

#[test]
fn test_organize_with_exclude_pattern_and_include_override() {
    let fixture = TestFixture::with_config(
        r#"
[filters.exclude]
patterns = ["keep/**"]

[filters.include]
patterns = ["keep/important.pdf"]
"#,
    );
    fixture.create_text_file("keep/draft.pdf", "1");
    fixture.create_text_file("keep/important.pdf", "2");

    fixture.organize();

    fixture.assert_file_exists("keep/draft.pdf");
    fixture.assert_file_exists("keep/documents/important.pdf");
}

#[test]
fn test_custom_category_table() {
    let fixture = TestFixture::with_config(
        r#"
[[categories]]
name = "code"
extensions = ["rs", "py"]
"#,
    );
    fixture.create_text_file("main.rs", "fn main() {}");
    fixture.create_text_file("photo.jpg", "jpg");

    fixture.organize();

    fixture.assert_file_exists("code/main.rs");
    fixture.assert_file_exists("unknown/photo.jpg");
}

#[test]
fn test_invalid_config_is_fatal() {
    let fixture = TestFixture::with_config("[organize]\nmax_duplicates = 0\n");
    fixture.create_text_file("a.txt", "a");

    let result = run_command(
        OrganizeCommand::Organize { dry_run: false },
        fixture.path(),
        &fixture.settings(),
    );

    assert!(result.is_err());
    fixture.assert_file_exists("a.txt");
}
