//! Save-name resolution, sanitization, and collision handling
//!
//! Resolution runs before the job's Preparing state: the save name must end
//! with the entry's known extension, or — when the extractor could not type
//! the entry — fall back to the legacy textual heuristics (an auto-update
//! marker or `.exe` token implies `.exe`, everything else defaults to
//! `.zip`). The result is sanitized for the filesystem before any path is
//! built from it.

use crate::config::FileCollisionAction;
use crate::error::FilesystemError;
use crate::types::VersionEntry;
use std::path::{Path, PathBuf};

/// Characters replaced with `_` in save names
const INVALID_FILENAME_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Archive extensions the legacy heuristic accepts without appending `.zip`
const ARCHIVE_EXTENSIONS: [&str; 3] = [".zip", ".rar", ".7z"];

/// Fallback save name when an entry carries no usable filename
const DEFAULT_SAVE_NAME: &str = "trainer";

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Replace filesystem-hostile characters with underscores
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if INVALID_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Resolve the save name for a version entry
///
/// An explicit override (e.g. from a save dialog) takes priority over the
/// entry's own filename; both go through extension correction and
/// sanitization, so the invariant "known type ⇒ matching extension" holds
/// regardless of where the name came from.
pub fn resolve_save_name(entry: &VersionEntry, override_name: Option<&str>) -> String {
    let base = override_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            let own = entry.filename.trim();
            if own.is_empty() {
                DEFAULT_SAVE_NAME.to_string()
            } else {
                own.to_string()
            }
        });

    sanitize_filename(apply_extension(base, entry).trim())
}

/// Ensure the save name carries the right extension
fn apply_extension(name: String, entry: &VersionEntry) -> String {
    if let Some(ext) = entry.file_type.extension() {
        return ensure_suffix(name, ext);
    }

    // Legacy heuristics for untyped entries.
    let name_lower = name.to_ascii_lowercase();
    let url_lower = entry.download_url.to_ascii_lowercase();
    let looks_like_exe = name_lower.contains("auto-update")
        || name_lower.contains("autoupdate")
        || name_lower.contains(".exe")
        || url_lower.ends_with(".exe");

    if looks_like_exe {
        ensure_suffix(name, "exe")
    } else if ARCHIVE_EXTENSIONS
        .iter()
        .any(|ext| name_lower.ends_with(ext))
    {
        name
    } else {
        ensure_suffix(name, "zip")
    }
}

fn ensure_suffix(mut name: String, ext: &str) -> String {
    let suffix = format!(".{ext}");
    if !name.to_ascii_lowercase().ends_with(&suffix) {
        name.push_str(&suffix);
    }
    name
}

/// Get a unique path for a file, handling collisions according to the
/// specified action
///
/// For `Rename`, a numeric `_1`, `_2`, … suffix is appended before the
/// extension, incrementing until a free path is found. For `Skip`, an error
/// is returned if the file already exists. `Overwrite` returns the original
/// path unchanged.
pub fn unique_path(
    path: &Path,
    action: FileCollisionAction,
) -> Result<PathBuf, FilesystemError> {
    match action {
        FileCollisionAction::Overwrite => Ok(path.to_path_buf()),
        FileCollisionAction::Skip => {
            if path.exists() {
                return Err(FilesystemError::Collision {
                    path: path.to_path_buf(),
                    reason: "file already exists and collision action is Skip".to_string(),
                });
            }
            Ok(path.to_path_buf())
        }
        FileCollisionAction::Rename => {
            if !path.exists() {
                return Ok(path.to_path_buf());
            }

            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| FilesystemError::InvalidPath {
                    path: path.to_path_buf(),
                    reason: "cannot extract file stem".to_string(),
                })?;
            let extension = path.extension().and_then(|e| e.to_str());
            let parent = path
                .parent()
                .ok_or_else(|| FilesystemError::InvalidPath {
                    path: path.to_path_buf(),
                    reason: "cannot extract parent directory".to_string(),
                })?;

            for i in 1..=MAX_RENAME_ATTEMPTS {
                let candidate = match extension {
                    Some(ext) => format!("{stem}_{i}.{ext}"),
                    None => format!("{stem}_{i}"),
                };
                let candidate = parent.join(candidate);
                if !candidate.exists() {
                    return Ok(candidate);
                }
            }

            Err(FilesystemError::Collision {
                path: path.to_path_buf(),
                reason: format!("no free filename after {MAX_RENAME_ATTEMPTS} attempts"),
            })
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileType;
    use std::fs;
    use tempfile::TempDir;

    fn entry(filename: &str, url: &str, file_type: FileType) -> VersionEntry {
        VersionEntry {
            filename: filename.to_string(),
            date: String::new(),
            size: String::new(),
            downloads: String::new(),
            download_url: url.to_string(),
            file_type,
        }
    }

    #[test]
    fn sanitize_replaces_every_invalid_character() {
        assert_eq!(
            sanitize_filename(r#"a\b/c:d*e?f"g<h>i|j"#),
            "a_b_c_d_e_f_g_h_i_j"
        );
        assert_eq!(sanitize_filename("plain-name.zip"), "plain-name.zip");
    }

    #[test]
    fn known_type_appends_missing_extension() {
        let e = entry("Elden Ring Trainer", "https://a/dl?id=1", FileType::Zip);
        assert_eq!(resolve_save_name(&e, None), "Elden Ring Trainer.zip");
    }

    #[test]
    fn known_type_keeps_existing_extension_case_insensitive() {
        let e = entry("Trainer.ZIP", "https://a/dl?id=1", FileType::Zip);
        assert_eq!(resolve_save_name(&e, None), "Trainer.ZIP");
    }

    #[test]
    fn untyped_auto_update_entry_resolves_to_exe() {
        let e = entry(
            "Trainer Auto-Update",
            "https://a/dl?id=1",
            FileType::Unknown,
        );
        assert_eq!(resolve_save_name(&e, None), "Trainer Auto-Update.exe");
    }

    #[test]
    fn untyped_exe_url_resolves_to_exe() {
        let e = entry("Setup", "https://a/files/setup.exe", FileType::Unknown);
        assert_eq!(resolve_save_name(&e, None), "Setup.exe");
    }

    #[test]
    fn untyped_entry_defaults_to_zip() {
        let e = entry("Some Trainer v1.2", "https://a/dl?id=1", FileType::Unknown);
        assert_eq!(resolve_save_name(&e, None), "Some Trainer v1.2.zip");
    }

    #[test]
    fn untyped_entry_with_archive_extension_is_left_alone() {
        let e = entry("pack.rar", "https://a/dl?id=1", FileType::Unknown);
        assert_eq!(resolve_save_name(&e, None), "pack.rar");
    }

    #[test]
    fn empty_filename_falls_back_to_default() {
        let e = entry("", "https://a/dl?id=1", FileType::Zip);
        assert_eq!(resolve_save_name(&e, None), "trainer.zip");
    }

    #[test]
    fn override_name_wins_but_is_still_corrected() {
        let e = entry("original", "https://a/dl?id=1", FileType::Rar);
        assert_eq!(
            resolve_save_name(&e, Some("my:name")),
            "my_name.rar"
        );
    }

    #[test]
    fn unique_path_returns_original_when_free() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trainer.zip");

        for action in [
            FileCollisionAction::Rename,
            FileCollisionAction::Overwrite,
            FileCollisionAction::Skip,
        ] {
            assert_eq!(unique_path(&path, action).unwrap(), path);
        }
    }

    #[test]
    fn unique_path_rename_appends_numeric_suffix_before_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trainer.zip");
        fs::write(&path, "first").unwrap();

        let renamed = unique_path(&path, FileCollisionAction::Rename).unwrap();
        assert_eq!(renamed, dir.path().join("trainer_1.zip"));

        fs::write(&renamed, "second").unwrap();
        let renamed_again = unique_path(&path, FileCollisionAction::Rename).unwrap();
        assert_eq!(renamed_again, dir.path().join("trainer_2.zip"));
    }

    #[test]
    fn unique_path_rename_without_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trainer");
        fs::write(&path, "data").unwrap();

        let renamed = unique_path(&path, FileCollisionAction::Rename).unwrap();
        assert_eq!(renamed, dir.path().join("trainer_1"));
    }

    #[test]
    fn unique_path_overwrite_keeps_existing_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trainer.zip");
        fs::write(&path, "data").unwrap();

        assert_eq!(
            unique_path(&path, FileCollisionAction::Overwrite).unwrap(),
            path
        );
    }

    #[test]
    fn unique_path_skip_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trainer.zip");
        fs::write(&path, "data").unwrap();

        let error = unique_path(&path, FileCollisionAction::Skip).unwrap_err();
        assert!(matches!(error, FilesystemError::Collision { .. }));
    }
}
