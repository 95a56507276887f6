//! dirsort - sort a cluttered folder by file type
//!
//! This library classifies files by extension, moves them into category
//! folders under safe normalized names, removes the folders left empty
//! afterwards and unpacks the archives it collected. Filtering rules are
//! read from optional TOML configuration files.

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod normalize;
pub mod output;
pub mod reaper;
pub mod sorter;
pub mod unpacker;

pub use config::{CompiledFilters, ConfigError, SortConfig};
pub use file_category::{Category, CategoryError, CategoryMap};
pub use file_organizer::{FileOrganizer, Operation, OrganizeError};
pub use normalize::normalize;
pub use reaper::{ReapReport, reap_empty_folders};
pub use sorter::{SortResult, Sorter, sort_tree};
pub use unpacker::{UnpackIssue, UnpackReport, unpack_archives};

pub use cli::{CliError, OutputMode, RunReport, run_cli_with_config};
