/// Collision-safe moving of files into category directories.
///
/// This module moves a single file into `<root>/<category>/`, normalizing
/// its stem and renaming it until the destination is free. A move never
/// replaces an existing file.
use crate::file_category::Category;
use crate::normalize::normalize;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Represents a single completed move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// The path of the file before the move.
    pub original_path: PathBuf,
    /// The path of the file after the move.
    pub new_path: PathBuf,
    /// The category the file was moved to.
    pub category: Category,
}

impl Operation {
    /// Final file name of the moved file.
    pub fn file_name(&self) -> String {
        self.new_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Extension of the moved file, with its leading dot.
    pub fn extension(&self) -> String {
        self.new_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default()
    }
}

/// Filesystem errors that halt a sort, cleanup or move.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// Failed to create a category directory.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Failed to move a file to its destination.
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A category path exists but is a symlink or a file, not a directory
    /// inside the root.
    #[error("{} is not a real directory", path.display())]
    NotARealDirectory { path: PathBuf },
    /// The root directory is missing or not a directory.
    #[error("Invalid base path {}", path.display())]
    InvalidBasePath { path: PathBuf },
    /// The file has no usable stem.
    #[error("File has no name component: {}", path.display())]
    InvalidFileName { path: PathBuf },
    /// Listing a directory failed.
    #[error("Failed to read directory {}: {source}", path.display())]
    ReadDirFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Deleting a leftover directory failed.
    #[error("Failed to remove directory {}: {source}", path.display())]
    DirectoryRemovalFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Moves files into category subdirectories of a root directory.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Moves a file into its category directory under `base_path`.
    ///
    /// The category directory is created when missing. The file's stem is
    /// normalized and its extension kept as is. If the destination name is
    /// taken, the stem is changed with [`next_candidate_stem`] until a free
    /// name is found, so nothing is ever overwritten.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dirsort::file_category::Category;
    /// use dirsort::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// let op = FileOrganizer::move_to_category(
    ///     Path::new("/path/to/base"),
    ///     Path::new("/path/to/base/holiday photo.png"),
    ///     Category::Images,
    /// )
    /// .unwrap();
    /// assert!(op.new_path.ends_with("images/holiday_photo.png"));
    /// ```
    pub fn move_to_category(
        base_path: &Path,
        file_path: &Path,
        category: Category,
    ) -> OrganizeResult<Operation> {
        if !base_path.is_dir() {
            return Err(OrganizeError::InvalidBasePath {
                path: base_path.to_path_buf(),
            });
        }

        let category_path = base_path.join(category.dir_name());
        Self::ensure_dir(&category_path)?;

        let raw_stem = file_path
            .file_stem()
            .ok_or_else(|| OrganizeError::InvalidFileName {
                path: file_path.to_path_buf(),
            })?;
        let extension = file_path.extension();

        let mut stem = normalize(&raw_stem.to_string_lossy());
        let mut destination_path = category_path.join(file_name(&stem, extension));
        while path_taken(&destination_path) {
            stem = next_candidate_stem(&stem);
            destination_path = category_path.join(file_name(&stem, extension));
        }

        fs::rename(file_path, &destination_path).map_err(|e| OrganizeError::FileMoveFailure {
            from: file_path.to_path_buf(),
            to: destination_path.clone(),
            source: e,
        })?;

        debug!(
            from = %file_path.display(),
            to = %destination_path.display(),
            %category,
            "moved file"
        );

        Ok(Operation {
            original_path: file_path.to_path_buf(),
            new_path: destination_path,
            category,
        })
    }

    fn ensure_dir(path: &Path) -> OrganizeResult<()> {
        if real_dir_exists(path)? {
            return Ok(());
        }
        fs::create_dir(path).map_err(|e| OrganizeError::DirectoryCreationFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Checks a category folder without following symlinks.
///
/// Returns `Ok(false)` when nothing exists at `path` and `NotARealDirectory`
/// when a symlink, file or anything else but a plain directory does.
pub fn real_dir_exists(path: &Path) -> OrganizeResult<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_dir() => Ok(true),
        Ok(_) => Err(OrganizeError::NotARealDirectory {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(OrganizeError::ReadDirFailed {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Returns the next stem to try after `stem` collided.
///
/// A trailing run of digits is incremented as a decimal number with carry;
/// a stem without trailing digits gets a `1` appended.
///
/// # Examples
///
/// ```
/// use dirsort::file_organizer::next_candidate_stem;
///
/// assert_eq!(next_candidate_stem("b"), "b1");
/// assert_eq!(next_candidate_stem("b1"), "b2");
/// assert_eq!(next_candidate_stem("b9"), "b10");
/// assert_eq!(next_candidate_stem("scan_099"), "scan_100");
/// ```
pub fn next_candidate_stem(stem: &str) -> String {
    let prefix = stem.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &stem[prefix.len()..];
    if digits.is_empty() {
        return format!("{stem}1");
    }
    format!("{prefix}{}", increment_decimal(digits))
}

/// Adds one to a string of ASCII digits.
fn increment_decimal(digits: &str) -> String {
    let mut out: Vec<char> = digits.chars().collect();
    for slot in out.iter_mut().rev() {
        if *slot == '9' {
            *slot = '0';
        } else {
            *slot = char::from(*slot as u8 + 1);
            return out.into_iter().collect();
        }
    }
    // every digit was a nine
    std::iter::once('1').chain(out).collect()
}

fn file_name(stem: &str, extension: Option<&std::ffi::OsStr>) -> OsString {
    let mut name = OsString::from(stem);
    if let Some(ext) = extension {
        name.push(".");
        name.push(ext);
    }
    name
}

/// True if anything, including a dangling symlink, occupies `path`.
fn path_taken(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}
