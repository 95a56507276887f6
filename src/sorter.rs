//! Classification and bulk sorting of a directory tree.
//!
//! The sorter walks every file below a root directory, skips the category
//! folders directly under the root, classifies each file by its extension
//! and hands it to [`FileOrganizer::move_to_category`]. The outcome is a
//! [`SortResult`] listing the moved file names and extensions per category.

use crate::config::CompiledFilters;
use crate::file_category::{Category, CategoryMap};
use crate::file_organizer::{FileOrganizer, Operation, OrganizeError, OrganizeResult};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

/// Files and extensions recorded for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    /// Final names of the moved files, in the order they were moved.
    pub files: Vec<String>,
    /// Distinct extensions seen, with their leading dot.
    pub extensions: BTreeSet<String>,
}

/// Per-category outcome of one sort pass.
///
/// Every category of the map has an entry, even when nothing was moved
/// into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SortResult {
    categories: BTreeMap<Category, CategoryStats>,
}

impl SortResult {
    /// Creates an empty result with one entry per category.
    pub fn new(categories: &CategoryMap) -> Self {
        Self {
            categories: categories
                .categories()
                .map(|c| (c, CategoryStats::default()))
                .collect(),
        }
    }

    /// Records a completed move.
    pub fn record(&mut self, operation: &Operation) {
        let stats = self.categories.entry(operation.category).or_default();
        stats.files.push(operation.file_name());
        stats.extensions.insert(operation.extension());
    }

    /// Statistics for one category.
    pub fn get(&self, category: Category) -> Option<&CategoryStats> {
        self.categories.get(&category)
    }

    /// Iterates over categories in reporting order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &CategoryStats)> {
        self.categories.iter().map(|(c, s)| (*c, s))
    }

    /// Total number of files moved.
    pub fn total_files(&self) -> usize {
        self.categories.values().map(|s| s.files.len()).sum()
    }

    /// Number of moved files keyed by category folder name.
    pub fn counts(&self) -> HashMap<String, usize> {
        self.categories
            .iter()
            .filter(|(_, s)| !s.files.is_empty())
            .map(|(c, s)| (c.dir_name().to_string(), s.files.len()))
            .collect()
    }
}

/// Sorts the files of one root directory.
pub struct Sorter<'a> {
    root: &'a Path,
    categories: &'a CategoryMap,
    filters: &'a CompiledFilters,
}

impl<'a> Sorter<'a> {
    pub fn new(root: &'a Path, categories: &'a CategoryMap, filters: &'a CompiledFilters) -> Self {
        Self {
            root,
            categories,
            filters,
        }
    }

    /// Lists every file that the next sort pass will move.
    ///
    /// The whole list is built before anything is moved, so files landing
    /// in a category folder during the pass are never visited again.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBasePath` if the root is not a directory and
    /// `ReadDirFailed` if part of the tree cannot be listed.
    pub fn discover(&self) -> OrganizeResult<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(OrganizeError::InvalidBasePath {
                path: self.root.to_path_buf(),
            });
        }

        let walker = WalkDir::new(self.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_category_dir(entry));

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(self.root).to_path_buf();
                OrganizeError::ReadDirFailed {
                    path,
                    source: io::Error::from(e),
                }
            })?;

            if !entry.file_type().is_file() || !has_stem_and_extension(entry.path()) {
                continue;
            }

            let relative = entry.path().strip_prefix(self.root).unwrap_or(entry.path());
            if !self.filters.should_include(relative) {
                debug!(path = %entry.path().display(), "excluded by filter rules");
                continue;
            }

            files.push(entry.into_path());
        }

        Ok(files)
    }

    /// Moves the given files into their category folders.
    ///
    /// `on_move` is called after every successful move. The first failing
    /// move aborts the pass; files moved before it stay where they are.
    pub fn sort_files<F>(&self, files: &[PathBuf], mut on_move: F) -> OrganizeResult<SortResult>
    where
        F: FnMut(&Operation),
    {
        let mut result = SortResult::new(self.categories);

        for file in files {
            let extension = file.extension().map(|e| e.to_string_lossy());
            let category = self.categories.categorize(extension.as_deref());
            let operation = FileOrganizer::move_to_category(self.root, file, category)?;
            result.record(&operation);
            on_move(&operation);
        }

        info!(
            root = %self.root.display(),
            moved = result.total_files(),
            "sort pass complete"
        );
        Ok(result)
    }

    /// Discovers and sorts every eligible file under the root.
    pub fn sort_tree(&self) -> OrganizeResult<SortResult> {
        let files = self.discover()?;
        self.sort_files(&files, |_| {})
    }

    /// True for a category folder sitting directly under the root.
    fn is_category_dir(&self, entry: &DirEntry) -> bool {
        entry.depth() == 1
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.categories.is_category_dir_name(name))
    }
}

/// Sorts `root` into category folders and reports what was moved.
pub fn sort_tree(
    root: &Path,
    categories: &CategoryMap,
    filters: &CompiledFilters,
) -> OrganizeResult<SortResult> {
    Sorter::new(root, categories, filters).sort_tree()
}

/// True when the name has at least one character before a non-empty
/// extension. `.bashrc`, `README` and `name.` do not qualify.
fn has_stem_and_extension(path: &Path) -> bool {
    let has_stem = path.file_stem().is_some_and(|s| !s.is_empty());
    let has_ext = path.extension().is_some_and(|e| !e.is_empty());
    has_stem && has_ext
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SortConfig;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, CategoryMap, CompiledFilters) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let map = CategoryMap::standard().unwrap();
        let filters = SortConfig::default().compile().unwrap();
        (temp_dir, map, filters)
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, rel).unwrap();
    }

    #[test]
    fn test_has_stem_and_extension() {
        assert!(has_stem_and_extension(Path::new("a.png")));
        assert!(has_stem_and_extension(Path::new(".hidden.txt")));
        assert!(has_stem_and_extension(Path::new("backup.tar.gz")));
        assert!(!has_stem_and_extension(Path::new(".bashrc")));
        assert!(!has_stem_and_extension(Path::new("README")));
        assert!(!has_stem_and_extension(Path::new("trailing.")));
    }

    #[test]
    fn test_discover_skips_category_folders() {
        let (temp_dir, map, filters) = setup();
        let root = temp_dir.path();
        touch(root, "images/old.png");
        touch(root, "archives/pack/inner.txt");
        touch(root, "new.png");
        touch(root, "nested/images/deep.png");

        let files = Sorter::new(root, &map, &filters).discover().unwrap();

        assert_eq!(
            files,
            vec![root.join("nested/images/deep.png"), root.join("new.png")]
        );
    }

    #[test]
    fn test_discover_is_exact_not_substring() {
        let (temp_dir, map, filters) = setup();
        let root = temp_dir.path();
        touch(root, "my_images/a.png");
        touch(root, "documentsX/b.txt");

        let files = Sorter::new(root, &map, &filters).discover().unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_sort_tree_records_names_and_extensions() {
        let (temp_dir, map, filters) = setup();
        let root = temp_dir.path();
        touch(root, "a.png");
        touch(root, "notes.txt");
        touch(root, "notes.pdf");
        touch(root, "tool.exe");

        let result = sort_tree(root, &map, &filters).unwrap();

        let docs = result.get(Category::Documents).unwrap();
        assert_eq!(docs.files, vec!["notes.pdf", "notes.txt"]);
        assert_eq!(
            docs.extensions.iter().cloned().collect::<Vec<_>>(),
            vec![".pdf", ".txt"]
        );
        assert_eq!(result.get(Category::Images).unwrap().files, vec!["a.png"]);
        assert_eq!(result.get(Category::Other).unwrap().files, vec!["tool.exe"]);
        assert!(result.get(Category::Music).unwrap().files.is_empty());
        assert_eq!(result.total_files(), 4);
    }

    #[test]
    fn test_sort_tree_same_name_in_different_folders() {
        let (temp_dir, map, filters) = setup();
        let root = temp_dir.path();
        touch(root, "b.jpg");
        touch(root, "sub/b.jpg");

        let result = sort_tree(root, &map, &filters).unwrap();

        assert!(root.join("images/b.jpg").is_file());
        assert!(root.join("images/b1.jpg").is_file());
        assert_eq!(result.get(Category::Images).unwrap().files, vec!["b.jpg", "b1.jpg"]);
    }

    #[test]
    fn test_counts_skip_empty_categories() {
        let (temp_dir, map, filters) = setup();
        let root = temp_dir.path();
        touch(root, "x.mp3");
        touch(root, "y.ogg");

        let result = sort_tree(root, &map, &filters).unwrap();
        let counts = result.counts();

        assert_eq!(counts.len(), 1);
        assert_eq!(counts["music"], 2);
    }

    #[test]
    fn test_sort_result_serializes_by_category_name() {
        let map = CategoryMap::standard().unwrap();
        let mut result = SortResult::new(&map);
        result.record(&Operation {
            original_path: PathBuf::from("/r/a.PNG"),
            new_path: PathBuf::from("/r/images/a.PNG"),
            category: Category::Images,
        });

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["images"]["files"][0], "a.PNG");
        assert_eq!(json["images"]["extensions"][0], ".PNG");
        assert!(json["other"]["files"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_sort_tree_rejects_missing_root() {
        let (temp_dir, map, filters) = setup();
        let missing = temp_dir.path().join("nope");
        assert!(matches!(
            sort_tree(&missing, &map, &filters),
            Err(OrganizeError::InvalidBasePath { .. })
        ));
    }
}
