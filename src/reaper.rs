//! Removal of folders emptied by a sort pass.
//!
//! Only immediate subdirectories of the root are considered. Category
//! folders are never touched. Any other folder is deleted only if nothing
//! but ignorable system artifacts is left inside it; folders still holding
//! files are kept and reported.

use crate::config::CleanupRules;
use crate::file_category::CategoryMap;
use crate::file_organizer::{OrganizeError, OrganizeResult};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// A non-category folder that was not deleted because it still holds files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeptFolder {
    pub path: PathBuf,
    /// Number of files other than ignorable artifacts found inside.
    pub remaining_files: usize,
}

/// Outcome of a cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReapReport {
    /// Folders deleted together with their contents.
    pub removed: Vec<PathBuf>,
    /// Folders left in place.
    pub kept: Vec<KeptFolder>,
}

/// Deletes the empty, non-category subdirectories of `root`.
///
/// This is destructive and cannot be undone: a removed folder is deleted
/// together with any ignorable artifacts and empty subfolders it contains.
///
/// # Errors
///
/// Returns `ReadDirFailed` if `root` or a candidate folder cannot be listed
/// and `DirectoryRemovalFailed` if a deletion fails.
pub fn reap_empty_folders(
    root: &Path,
    categories: &CategoryMap,
    cleanup: &CleanupRules,
) -> OrganizeResult<ReapReport> {
    let entries = fs::read_dir(root).map_err(|e| OrganizeError::ReadDirFailed {
        path: root.to_path_buf(),
        source: e,
    })?;

    let read_failed = |source: io::Error| OrganizeError::ReadDirFailed {
        path: root.to_path_buf(),
        source,
    };

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(read_failed)?;
        if !entry.file_type().map_err(read_failed)?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if name
            .to_str()
            .is_some_and(|n| categories.is_category_dir_name(n))
        {
            continue;
        }
        candidates.push(entry.path());
    }
    candidates.sort();

    let mut report = ReapReport::default();
    for dir in candidates {
        let remaining_files = count_remaining_files(&dir, cleanup)?;
        if remaining_files > 0 {
            warn!(
                path = %dir.display(),
                remaining_files,
                "folder still holds files, not removing"
            );
            report.kept.push(KeptFolder {
                path: dir,
                remaining_files,
            });
            continue;
        }

        fs::remove_dir_all(&dir).map_err(|e| OrganizeError::DirectoryRemovalFailed {
            path: dir.clone(),
            source: e,
        })?;
        info!(path = %dir.display(), "removed empty folder");
        report.removed.push(dir);
    }

    Ok(report)
}

/// Counts the files under `dir` that are not ignorable artifacts.
///
/// Symlinks count as files, so a folder holding one is never deleted.
fn count_remaining_files(dir: &Path, cleanup: &CleanupRules) -> OrganizeResult<usize> {
    let mut count = 0;
    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            OrganizeError::ReadDirFailed {
                path,
                source: io::Error::from(e),
            }
        })?;

        if entry.file_type().is_dir() {
            continue;
        }
        let ignorable = entry
            .file_name()
            .to_str()
            .is_some_and(|n| cleanup.is_ignorable(n));
        if !ignorable {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, CategoryMap, CleanupRules) {
        (
            TempDir::new().expect("Failed to create temp directory"),
            CategoryMap::standard().unwrap(),
            CleanupRules::default(),
        )
    }

    #[test]
    fn test_removes_empty_non_category_folders() {
        let (temp_dir, map, cleanup) = setup();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("old/deeper/deepest")).unwrap();
        fs::create_dir(root.join("empty")).unwrap();

        let report = reap_empty_folders(root, &map, &cleanup).unwrap();

        assert_eq!(report.removed, vec![root.join("empty"), root.join("old")]);
        assert!(report.kept.is_empty());
        assert!(!root.join("old").exists());
        assert!(!root.join("empty").exists());
    }

    #[test]
    fn test_never_removes_category_folders() {
        let (temp_dir, map, cleanup) = setup();
        let root = temp_dir.path();
        for category in map.categories() {
            fs::create_dir(root.join(category.dir_name())).unwrap();
        }

        let report = reap_empty_folders(root, &map, &cleanup).unwrap();

        assert!(report.removed.is_empty());
        for category in map.categories() {
            assert!(root.join(category.dir_name()).is_dir());
        }
    }

    #[test]
    fn test_keeps_folder_with_files() {
        let (temp_dir, map, cleanup) = setup();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("project/src")).unwrap();
        fs::write(root.join("project/src/Makefile"), "all:").unwrap();
        fs::write(root.join("project/README"), "hi").unwrap();

        let report = reap_empty_folders(root, &map, &cleanup).unwrap();

        assert!(report.removed.is_empty());
        assert_eq!(
            report.kept,
            vec![KeptFolder {
                path: root.join("project"),
                remaining_files: 2,
            }]
        );
        assert!(root.join("project/src/Makefile").exists());
    }

    #[test]
    fn test_ignorable_artifacts_do_not_keep_folder() {
        let (temp_dir, map, cleanup) = setup();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("photos/2019")).unwrap();
        fs::write(root.join("photos/.DS_Store"), "").unwrap();
        fs::write(root.join("photos/2019/Thumbs.db"), "").unwrap();

        let report = reap_empty_folders(root, &map, &cleanup).unwrap();

        assert_eq!(report.removed, vec![root.join("photos")]);
        assert!(!root.join("photos").exists());
    }

    #[test]
    fn test_name_containing_category_is_not_protected() {
        let (temp_dir, map, cleanup) = setup();
        let root = temp_dir.path();
        fs::create_dir(root.join("old_images")).unwrap();

        let report = reap_empty_folders(root, &map, &cleanup).unwrap();

        assert_eq!(report.removed, vec![root.join("old_images")]);
    }

    #[test]
    fn test_unlistable_root_is_an_error() {
        let (temp_dir, map, cleanup) = setup();
        let not_a_dir = temp_dir.path().join("plain.txt");
        fs::write(&not_a_dir, "x").unwrap();

        let result = reap_empty_folders(&not_a_dir, &map, &cleanup);

        assert!(matches!(result, Err(OrganizeError::ReadDirFailed { .. })));
        assert!(not_a_dir.is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_folder_is_not_followed_or_removed() {
        let (temp_dir, map, cleanup) = setup();
        let outside = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::os::unix::fs::symlink(outside.path(), root.join("linked")).unwrap();

        let report = reap_empty_folders(root, &map, &cleanup).unwrap();

        assert_eq!(report, ReapReport::default());
        assert!(root.join("linked").exists());
        assert!(outside.path().is_dir());
    }

    #[test]
    fn test_files_in_root_are_ignored() {
        let (temp_dir, map, cleanup) = setup();
        let root = temp_dir.path();
        fs::write(root.join("loose.txt"), "x").unwrap();

        let report = reap_empty_folders(root, &map, &cleanup).unwrap();

        assert_eq!(report, ReapReport::default());
        assert!(root.join("loose.txt").exists());
    }
}
