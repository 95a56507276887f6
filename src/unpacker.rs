//! Extraction of sorted archives.
//!
//! Every archive sitting directly in the archives folder is extracted into
//! a sibling folder named after its stem. Problems with a single archive
//! are recorded as an [`UnpackIssue`] and never stop the pass.

use crate::file_category::{Category, CategoryMap};
use crate::file_organizer::{OrganizeError, OrganizeResult, real_dir_exists};
use flate2::read::GzDecoder;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Bytes needed to recognise the zip and gzip signatures.
const SNIFF_LEN: u64 = 512;

/// Decompressed bytes read to look for a leading tar header, with room for
/// a long-name extension record before it.
const TAR_SNIFF_LEN: u64 = 16 * 1024;

/// A recoverable problem with one archive.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnpackIssue {
    /// The folder the archive would be extracted into is already there.
    #[error("Folder {} for {} already exists", target.display(), archive.display())]
    AlreadyExists { archive: PathBuf, target: PathBuf },
    /// The archive is corrupt or its content does not match its extension.
    #[error("Could not unpack {}: {reason}", archive.display())]
    UnpackFailed { archive: PathBuf, reason: String },
}

impl UnpackIssue {
    /// The archive this issue is about.
    pub fn archive(&self) -> &Path {
        match self {
            UnpackIssue::AlreadyExists { archive, .. } => archive,
            UnpackIssue::UnpackFailed { archive, .. } => archive,
        }
    }
}

/// Outcome of an unpack pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnpackReport {
    /// Folders that archives were extracted into.
    pub unpacked: Vec<PathBuf>,
    /// Archives that were skipped, left in place.
    pub issues: Vec<UnpackIssue>,
}

#[derive(Debug, Error)]
enum ExtractError {
    #[error("content is not a valid {0} archive")]
    FormatMismatch(&'static str),
    #[error("unsupported archive extension '{0}'")]
    Unsupported(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

/// Location of the archives folder under a sorted root.
pub fn archive_folder(root: &Path) -> PathBuf {
    root.join(Category::Archives.dir_name())
}

/// Extracts every archive found directly in `archive_folder`.
///
/// A missing folder yields an empty report; a symlink or file in its
/// place is a `NotARealDirectory` error. Archives are left where they
/// are whether or not extraction succeeds.
///
/// # Errors
///
/// Only failing to list the folder itself is an error; per-archive
/// problems end up in [`UnpackReport::issues`].
pub fn unpack_archives(
    archive_folder: &Path,
    categories: &CategoryMap,
) -> OrganizeResult<UnpackReport> {
    if !real_dir_exists(archive_folder)? {
        return Ok(UnpackReport::default());
    }
    let entries = fs::read_dir(archive_folder).map_err(|e| OrganizeError::ReadDirFailed {
        path: archive_folder.to_path_buf(),
        source: e,
    })?;

    let read_failed = |source: io::Error| OrganizeError::ReadDirFailed {
        path: archive_folder.to_path_buf(),
        source,
    };

    let mut archives = Vec::new();
    for entry in entries {
        let entry = entry.map_err(read_failed)?;
        if !entry.file_type().map_err(read_failed)?.is_file() {
            continue;
        }
        let path = entry.path();
        let is_archive = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| categories.is_archive_extension(e));
        if is_archive {
            archives.push(path);
        }
    }
    archives.sort();

    let mut report = UnpackReport::default();
    for archive in archives {
        match unpack_one(&archive) {
            Ok(target) => {
                info!(
                    archive = %archive.display(),
                    target = %target.display(),
                    "unpacked archive"
                );
                report.unpacked.push(target);
            }
            Err(issue) => {
                warn!("{issue}");
                report.issues.push(issue);
            }
        }
    }

    Ok(report)
}

fn unpack_one(archive: &Path) -> Result<PathBuf, UnpackIssue> {
    let failed = |reason: String| UnpackIssue::UnpackFailed {
        archive: archive.to_path_buf(),
        reason,
    };

    let stem = archive
        .file_stem()
        .ok_or_else(|| failed("archive has no name".to_string()))?;
    let extension = archive
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let target = archive.with_file_name(stem);

    match fs::create_dir(&target) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(UnpackIssue::AlreadyExists {
                archive: archive.to_path_buf(),
                target,
            });
        }
        Err(e) => return Err(failed(e.to_string())),
    }

    if let Err(e) = extract(archive, &target, &extension) {
        // the folder was created above, so it holds nothing but partial output
        if let Err(cleanup) = fs::remove_dir_all(&target) {
            warn!(
                target = %target.display(),
                error = %cleanup,
                "could not remove partially unpacked folder"
            );
        }
        return Err(failed(e.to_string()));
    }

    Ok(target)
}

fn extract(archive: &Path, target: &Path, extension: &str) -> Result<(), ExtractError> {
    let head = read_prefix(File::open(archive)?, SNIFF_LEN)?;

    match extension {
        "zip" => {
            if !infer::archive::is_zip(&head) {
                return Err(ExtractError::FormatMismatch("zip"));
            }
            let mut zip = zip::ZipArchive::new(BufReader::new(File::open(archive)?))?;
            zip.extract(target)?;
        }
        // old-style tarballs carry no magic, header checksums are checked while unpacking
        "tar" => {
            tar::Archive::new(BufReader::new(File::open(archive)?)).unpack(target)?;
        }
        "gz" => {
            if !infer::archive::is_gz(&head) {
                return Err(ExtractError::FormatMismatch("gzip"));
            }
            extract_gzip(archive, target)?;
        }
        other => return Err(ExtractError::Unsupported(other.to_string())),
    }

    Ok(())
}

/// Unpacks a gzipped tarball, or writes out the single file a plain gzip
/// stream holds as `<target>/<stem>`.
fn extract_gzip(archive: &Path, target: &Path) -> Result<(), ExtractError> {
    let inner_head = read_prefix(
        GzDecoder::new(BufReader::new(File::open(archive)?)),
        TAR_SNIFF_LEN,
    )?;
    let decoder = GzDecoder::new(BufReader::new(File::open(archive)?));

    if starts_with_tar_header(&inner_head) {
        tar::Archive::new(decoder).unpack(target)?;
        return Ok(());
    }

    let name = archive
        .file_stem()
        .ok_or(ExtractError::FormatMismatch("gzip"))?;
    let mut out = File::create(target.join(name))?;
    let mut decoder = decoder;
    io::copy(&mut decoder, &mut out)?;
    Ok(())
}

/// True if `head` opens with a tar header whose checksum is valid.
fn starts_with_tar_header(head: &[u8]) -> bool {
    let mut archive = tar::Archive::new(head);
    let mut entries = match archive.entries() {
        Ok(entries) => entries,
        Err(_) => return false,
    };
    matches!(entries.next(), Some(Ok(_)))
}

fn read_prefix<R: Read>(reader: R, len: u64) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(len).read_to_end(&mut buf)?;
    Ok(buf)
}
