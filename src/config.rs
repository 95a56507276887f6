//! Run configuration: file filtering, cleanup and unpack settings.
//!
//! Rules are loaded from an optional TOML file. The category table itself
//! is fixed and cannot be configured here. Supported filtering strategies:
//! - Exact filename matching
//! - Glob pattern matching on the path relative to the sorted root
//! - File extension matching
//! - Regex pattern matching on the file name
//! - Include (whitelist) rules that override exclude rules
//!
//! # Configuration File Format
//!
//! ```toml
//! [filters]
//! enable_hidden_files = true
//!
//! [filters.exclude]
//! filenames = ["Thumbs.db"]
//! patterns = ["*.tmp", "node_modules/**"]
//! extensions = ["bak", "tmp"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//!
//! [cleanup]
//! ignorable_files = [".DS_Store", "Thumbs.db", "desktop.ini"]
//!
//! [unpack]
//! enabled = true
//! ```

use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".dirsortrc.toml";

/// Errors that can occur during configuration loading and filtering.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    #[error("Invalid glob pattern '{0}': expected *.ext or dir/**")]
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern {
        /// The regex pattern that failed to compile.
        pattern: String,
        /// The reason why the pattern is invalid.
        reason: String,
    },
    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

/// Complete run configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SortConfig {
    #[serde(default)]
    pub filters: FilterRules,
    #[serde(default)]
    pub cleanup: CleanupRules,
    #[serde(default)]
    pub unpack: UnpackRules,
}

/// Rules deciding which files a sort pass may move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether to sort hidden files and files inside hidden folders.
    /// Defaults to true.
    #[serde(default = "default_enable_hidden_files")]
    pub enable_hidden_files: bool,

    /// Rules for excluding files.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including files (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            enable_hidden_files: default_enable_hidden_files(),
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

fn default_enable_hidden_files() -> bool {
    true
}

/// Rules for excluding files from sorting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns to exclude (e.g., "*.tmp", "node_modules/**").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude, without the dot (e.g., "bak", "tmp").
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns to exclude, matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Rules for including files, overriding exclude rules (whitelist).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    /// Glob patterns that override exclude rules.
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Settings for removing leftover folders after a sort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupRules {
    /// File names that do not keep a leftover folder alive.
    #[serde(default = "default_ignorable_files")]
    pub ignorable_files: Vec<String>,
}

impl Default for CleanupRules {
    fn default() -> Self {
        Self {
            ignorable_files: default_ignorable_files(),
        }
    }
}

fn default_ignorable_files() -> Vec<String> {
    vec![
        ".DS_Store".to_string(),
        "Thumbs.db".to_string(),
        "desktop.ini".to_string(),
    ]
}

impl CleanupRules {
    /// True if a file with this name is a system artifact that may be
    /// deleted along with its folder.
    pub fn is_ignorable(&self, file_name: &str) -> bool {
        self.ignorable_files.iter().any(|f| f == file_name)
    }
}

/// Settings for the archive unpacking step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnpackRules {
    #[serde(default = "default_unpack_enabled")]
    pub enabled: bool,
}

impl Default for UnpackRules {
    fn default() -> Self {
        Self {
            enabled: default_unpack_enabled(),
        }
    }
}

fn default_unpack_enabled() -> bool {
    true
}

impl SortConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.dirsortrc.toml` in the current directory
    /// 3. Look for `~/.config/dirsort/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but
    /// cannot be read, or if any file found is not valid TOML.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("dirsort")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if file does not exist.
    /// Returns `ConfigError::ConfigInvalid` if TOML parsing fails.
    /// Returns `ConfigError::IoError` if file cannot be read.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        debug!(path = %path.display(), "loading configuration");
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Compile the filter rules into structures ready for matching.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob patterns are invalid.
    pub fn compile(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }
}

/// Compiled filter rules.
///
/// Patterns are parsed once per run instead of once per file.
#[derive(Debug)]
pub struct CompiledFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // The local config file is never moved away from the folder it configures.
        let mut exclude_filenames: HashSet<String> =
            rules.exclude.filenames.iter().cloned().collect();
        exclude_filenames.insert(LOCAL_CONFIG_FILE.to_string());

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames,
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Check if a file should be sorted (not excluded).
    ///
    /// `file_path` is relative to the root being sorted. Checks are
    /// performed in this order, with early termination:
    /// 1. Include patterns (whitelist) - if matched, always include
    /// 2. Hidden filter - if any component is hidden and hidden files are
    ///    disabled, exclude
    /// 3. Exact filename match - if matched, exclude
    /// 4. File extension match - if matched, exclude
    /// 5. Glob pattern match - if matched, exclude
    /// 6. Regex pattern match - if matched, exclude
    /// 7. Default: include
    pub fn should_include(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.matches_include_patterns(file_path) {
            return true;
        }

        if !self.enable_hidden_files && is_hidden(file_path) {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = file_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self.matches_exclude_patterns(file_path) {
            return false;
        }

        if self.matches_exclude_regex(&file_name) {
            return false;
        }

        true
    }

    fn matches_include_patterns(&self, file_path: &Path) -> bool {
        self.include_patterns
            .iter()
            .any(|pattern| pattern.matches_path(file_path))
    }

    fn matches_exclude_patterns(&self, file_path: &Path) -> bool {
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.matches_path(file_path))
    }

    fn matches_exclude_regex(&self, file_name: &str) -> bool {
        self.exclude_regexes
            .iter()
            .any(|regex| regex.is_match(file_name))
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
        })
        .collect()
}

/// True if any component of the path starts with a dot.
fn is_hidden(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_filters(filters: FilterRules) -> SortConfig {
        SortConfig {
            filters,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = SortConfig::default();
        assert!(config.filters.enable_hidden_files);
        assert!(config.unpack.enabled);
        assert!(config.cleanup.is_ignorable(".DS_Store"));
        assert!(!config.cleanup.is_ignorable("notes.txt"));
    }

    #[test]
    fn test_default_includes_hidden_files() {
        let compiled = SortConfig::default().compile().unwrap();
        assert!(compiled.should_include(Path::new(".hidden.txt")));
        assert!(compiled.should_include(Path::new("photo.png")));
    }

    #[test]
    fn test_local_config_file_is_never_sorted() {
        let compiled = SortConfig::default().compile().unwrap();
        assert!(!compiled.should_include(Path::new(LOCAL_CONFIG_FILE)));
    }

    #[test]
    fn test_hidden_files_and_folders_excluded_when_disabled() {
        let config = with_filters(FilterRules {
            enable_hidden_files: false,
            ..Default::default()
        });
        let compiled = config.compile().unwrap();

        assert!(!compiled.should_include(Path::new(".hidden.txt")));
        assert!(!compiled.should_include(Path::new(".git/objects/pack.idx")));
        assert!(compiled.should_include(Path::new("visible/file.txt")));
    }

    #[test]
    fn test_exclude_exact_filename() {
        let config = with_filters(FilterRules {
            exclude: ExcludeRules {
                filenames: vec!["keep.me.txt".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });
        let compiled = config.compile().unwrap();

        assert!(!compiled.should_include(Path::new("keep.me.txt")));
        assert!(!compiled.should_include(Path::new("sub/keep.me.txt")));
        assert!(compiled.should_include(Path::new("image.jpg")));
    }

    #[test]
    fn test_exclude_extensions() {
        let config = with_filters(FilterRules {
            exclude: ExcludeRules {
                extensions: vec!["bak".to_string(), ".tmp".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });
        let compiled = config.compile().unwrap();

        assert!(!compiled.should_include(Path::new("file.bak")));
        assert!(!compiled.should_include(Path::new("file.tmp")));
        assert!(!compiled.should_include(Path::new("file.BAK")));
        assert!(compiled.should_include(Path::new("file.txt")));
    }

    #[test]
    fn test_exclude_glob_patterns() {
        let config = with_filters(FilterRules {
            exclude: ExcludeRules {
                patterns: vec!["*.cache".to_string(), "node_modules/**".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });
        let compiled = config.compile().unwrap();

        assert!(!compiled.should_include(Path::new("file.cache")));
        assert!(!compiled.should_include(Path::new("node_modules/package.json")));
        assert!(compiled.should_include(Path::new("file.txt")));
    }

    #[test]
    fn test_glob_pattern_directory_boundary_semantics() {
        let config = with_filters(FilterRules {
            exclude: ExcludeRules {
                patterns: vec!["**/logs/**".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });
        let compiled = config.compile().unwrap();

        assert!(!compiled.should_include(Path::new("logs/file.txt")));
        assert!(!compiled.should_include(Path::new("app/logs/file.txt")));
        assert!(compiled.should_include(Path::new("my_logs/file.txt")));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let config = with_filters(FilterRules {
            exclude: ExcludeRules {
                extensions: vec!["pdf".to_string()],
                ..Default::default()
            },
            include: IncludeRules {
                patterns: vec!["invoices/*.pdf".to_string()],
            },
            ..Default::default()
        });
        let compiled = config.compile().unwrap();

        assert!(compiled.should_include(Path::new("invoices/march.pdf")));
        assert!(!compiled.should_include(Path::new("drafts/march.pdf")));
    }

    #[test]
    fn test_exclude_regex() {
        let config = with_filters(FilterRules {
            exclude: ExcludeRules {
                regex: vec![r"^test_.*\.txt$".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });
        let compiled = config.compile().unwrap();

        assert!(!compiled.should_include(Path::new("test_file.txt")));
        assert!(!compiled.should_include(Path::new("nested/test_other.txt")));
        assert!(compiled.should_include(Path::new("file.txt")));
    }

    #[test]
    fn test_invalid_regex_returns_error() {
        let config = with_filters(FilterRules {
            exclude: ExcludeRules {
                regex: vec!["[invalid(".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });

        assert!(matches!(
            config.compile(),
            Err(ConfigError::InvalidRegexPattern { .. })
        ));
    }

    #[test]
    fn test_invalid_glob_pattern_returns_error() {
        let config = with_filters(FilterRules {
            exclude: ExcludeRules {
                patterns: vec!["[invalid".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });

        assert!(matches!(
            config.compile(),
            Err(ConfigError::InvalidGlobPattern(_))
        ));
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: SortConfig = toml::from_str(
            r#"
[unpack]
enabled = false

[filters.exclude]
extensions = ["log"]
"#,
        )
        .unwrap();

        assert!(!config.unpack.enabled);
        assert!(config.filters.enable_hidden_files);
        assert_eq!(config.filters.exclude.extensions, vec!["log"]);
        assert_eq!(config.cleanup.ignorable_files.len(), 3);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = SortConfig::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        fs::write(&path, "[filters\nbroken").unwrap();

        assert!(matches!(
            SortConfig::load_from_file(&path),
            Err(ConfigError::ConfigInvalid(_))
        ));
    }
}
