//! Command-line interface module for dirsort.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Validation of the directories to sort
//! - Running the sort, cleanup and unpack passes in order
//! - Reporting the outcome as text or JSON

use crate::config::{ConfigError, SortConfig};
use crate::file_category::{CategoryError, CategoryMap};
use crate::file_organizer::OrganizeError;
use crate::output::OutputFormatter;
use crate::reaper::{ReapReport, reap_empty_folders};
use crate::sorter::{SortResult, Sorter};
use crate::unpacker::{UnpackReport, archive_folder, unpack_archives};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

/// Sort a folder into images, video, documents, music, archives and other.
///
/// Files are renamed to safe names and moved into category folders under
/// the given directory. Folders left empty are deleted and archives are
/// unpacked. None of this can be undone.
#[derive(Debug, Parser)]
#[command(name = "dirsort", version)]
pub struct Args {
    /// Directories to sort, processed one after another
    #[arg(required = true, value_hint = clap::ValueHint::DirPath)]
    pub paths: Vec<PathBuf>,

    /// Configuration file to use instead of the default lookup
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Do not unpack archives after sorting
    #[arg(long)]
    pub no_unpack: bool,

    /// Print the results as JSON
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// How much a run prints to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Progress bar and summary tables.
    Human,
    /// Nothing; the caller reports.
    Quiet,
}

/// Errors that stop the processing of one directory.
#[derive(Debug, Error)]
pub enum CliError {
    /// The supplied path is empty or blank.
    #[error("You didn't enter a path")]
    InvalidInput,
    /// The supplied path does not exist.
    #[error("Sorry, directory {} doesn't exist", .0.display())]
    DirectoryNotFound(PathBuf),
    /// The supplied path exists but is not a directory.
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    /// The supplied path could not be inspected.
    #[error("Cannot access {}: {source}", path.display())]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Category(#[from] CategoryError),
    #[error(transparent)]
    Filesystem(#[from] OrganizeError),
    #[error("Failed to encode report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Everything one run did to one directory.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub root: PathBuf,
    pub finished_at: DateTime<Utc>,
    pub sorted: SortResult,
    pub cleanup: ReapReport,
    /// `None` when unpacking was disabled.
    pub unpack: Option<UnpackReport>,
}

/// Checks that `path` names an existing directory.
///
/// # Errors
///
/// `InvalidInput` for an empty or blank path, `DirectoryNotFound` if
/// nothing exists there and `NotADirectory` for anything but a directory.
pub fn validate_directory(path: &Path) -> Result<PathBuf, CliError> {
    if path.to_string_lossy().trim().is_empty() {
        return Err(CliError::InvalidInput);
    }

    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(path.to_path_buf()),
        Ok(_) => Err(CliError::NotADirectory(path.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(CliError::DirectoryNotFound(path.to_path_buf()))
        }
        Err(e) => Err(CliError::Inaccessible {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Sorts one directory with an optional configuration file.
///
/// The path is validated before the configuration is read, and both happen
/// before anything on disk changes. With no `config_path` the default
/// lookup applies.
///
/// # Examples
///
/// ```no_run
/// use dirsort::cli::{OutputMode, run_cli_with_config};
/// use std::path::Path;
///
/// match run_cli_with_config(Path::new("/path/to/directory"), None, OutputMode::Human) {
///     Ok(report) => println!("Moved {} files", report.sorted.total_files()),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli_with_config(
    dir_path: &Path,
    config_path: Option<&Path>,
    mode: OutputMode,
) -> Result<RunReport, CliError> {
    let root = validate_directory(dir_path)?;
    let config = SortConfig::load(config_path)?;
    let categories = CategoryMap::standard()?;
    organize_directory(&root, &categories, &config, mode)
}

/// Runs the sort, cleanup and unpack passes on a validated root, in that
/// order.
///
/// A filesystem error in any pass stops the run; whatever was already
/// moved or removed stays that way.
pub fn organize_directory(
    root: &Path,
    categories: &CategoryMap,
    config: &SortConfig,
    mode: OutputMode,
) -> Result<RunReport, CliError> {
    let human = mode == OutputMode::Human;
    let filters = config.compile()?;

    info!(root = %root.display(), "sorting directory");
    if human {
        OutputFormatter::info(&format!("Sorting contents of: {}", root.display()));
    }

    let sorter = Sorter::new(root, categories, &filters);
    let files = sorter.discover()?;

    let progress = (human && !files.is_empty())
        .then(|| OutputFormatter::create_progress_bar(files.len() as u64));
    let sorted = sorter.sort_files(&files, |op| {
        if let Some(pb) = &progress {
            pb.set_message(op.file_name());
            pb.inc(1);
        }
    });
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }
    let sorted = sorted?;

    let cleanup = reap_empty_folders(root, categories, &config.cleanup)?;

    let unpack = if config.unpack.enabled {
        Some(unpack_archives(&archive_folder(root), categories)?)
    } else {
        info!("archive unpacking disabled");
        None
    };

    let report = RunReport {
        root: root.to_path_buf(),
        finished_at: Utc::now(),
        sorted,
        cleanup,
        unpack,
    };

    if human {
        print_report(&report);
    }
    Ok(report)
}

fn print_report(report: &RunReport) {
    let total = report.sorted.total_files();
    if total == 0 {
        OutputFormatter::info("No files found to sort.");
    } else {
        OutputFormatter::summary_table(&report.sorted.counts(), total);
        OutputFormatter::sort_details(&report.sorted);
    }

    if !report.cleanup.removed.is_empty() || !report.cleanup.kept.is_empty() {
        OutputFormatter::header("CLEANUP");
        OutputFormatter::reap_report(&report.cleanup, &report.root);
    }

    if let Some(unpack) = &report.unpack
        && (!unpack.unpacked.is_empty() || !unpack.issues.is_empty())
    {
        OutputFormatter::header("ARCHIVES");
        OutputFormatter::unpack_report(unpack, &report.root);
    }

    println!();
    OutputFormatter::success(&format!(
        "The folder {} has been sorted.",
        report.root.display()
    ));
}

/// Runs every path given on the command line.
///
/// A failing path is reported and the remaining paths are still processed.
/// Returns true if every path was sorted.
pub fn run(args: &Args) -> bool {
    let mut config = match SortConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            OutputFormatter::error(&format!("Error loading configuration: {}", e));
            return false;
        }
    };
    if args.no_unpack {
        config.unpack.enabled = false;
    }

    let categories = match CategoryMap::standard() {
        Ok(categories) => categories,
        Err(e) => {
            OutputFormatter::error(&format!("Invalid category table: {}", e));
            return false;
        }
    };

    let mode = if args.json {
        OutputMode::Quiet
    } else {
        OutputMode::Human
    };

    let mut all_ok = true;
    let mut reports = Vec::new();
    for path in &args.paths {
        let outcome = validate_directory(path)
            .and_then(|root| organize_directory(&root, &categories, &config, mode));
        match outcome {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!(path = %path.display(), error = %e, "sorting failed");
                OutputFormatter::error(&e.to_string());
                all_ok = false;
            }
        }
    }

    if args.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                OutputFormatter::error(&CliError::from(e).to_string());
                all_ok = false;
            }
        }
    }

    all_ok
}
