/// File categorization by extension.
///
/// This module holds the static category table used for sorting and the
/// `CategoryMap` value that every sorting operation receives explicitly.
/// Each extension belongs to at most one category; anything unclaimed falls
/// into `Category::Other`. Extension lookups deliberately ignore case, so
/// `photo.JPG` is an image and not `other`.
///
/// # Examples
///
/// ```
/// use dirsort::file_category::{Category, CategoryMap};
///
/// let map = CategoryMap::standard().unwrap();
/// assert_eq!(map.categorize(Some("png")), Category::Images);
/// assert_eq!(map.categorize(Some(".MP3")), Category::Music);
/// assert_eq!(map.categorize(Some("xyz")), Category::Other);
/// ```
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Represents a sorting category.
///
/// The variant order is the order categories are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Image files (PNG, JPG, SVG)
    Images,
    /// Video files (AVI, MP4, MOV, MKV)
    Video,
    /// Document files (DOC, PDF, TXT, office formats)
    Documents,
    /// Audio files (MP3, OGG, WAV, AMR)
    Music,
    /// Packed or compressed files eligible for unpacking
    Archives,
    /// Everything no other category claims
    Other,
}

impl Category {
    /// All categories, in reporting order.
    pub const ALL: [Category; 6] = [
        Category::Images,
        Category::Video,
        Category::Documents,
        Category::Music,
        Category::Archives,
        Category::Other,
    ];

    /// Returns the folder name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use dirsort::file_category::Category;
    ///
    /// assert_eq!(Category::Images.dir_name(), "images");
    /// assert_eq!(Category::Music.dir_name(), "music");
    /// assert_eq!(Category::Other.dir_name(), "other");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Images => "images",
            Category::Video => "video",
            Category::Documents => "documents",
            Category::Music => "music",
            Category::Archives => "archives",
            Category::Other => "other",
        }
    }

    /// Returns a human-readable description of this category.
    pub fn description(&self) -> &'static str {
        match self {
            Category::Images => "Image files",
            Category::Video => "Video files",
            Category::Documents => "Document files",
            Category::Music => "Music files",
            Category::Archives => "Archive files",
            Category::Other => "Other files",
        }
    }

    /// Looks up the category whose folder is named exactly `name`.
    pub fn from_dir_name(name: &str) -> Option<Category> {
        Self::ALL.into_iter().find(|c| c.dir_name() == name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// The built-in extension table.
const STANDARD_CATEGORIES: &[(Category, &[&str])] = &[
    (Category::Images, &[".jpeg", ".png", ".jpg", ".svg"]),
    (Category::Video, &[".avi", ".mp4", ".mov", ".mkv"]),
    (
        Category::Documents,
        &[".doc", ".docx", ".txt", ".pdf", ".xlsx", ".pptx"],
    ),
    (Category::Music, &[".mp3", ".ogg", ".wav", ".amr"]),
    (Category::Archives, &[".zip", ".gz", ".tar"]),
    (Category::Other, &[]),
];

/// Errors raised while building a category map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    /// Two categories claim the same extension.
    #[error("extension '{extension}' is claimed by both {first} and {second}")]
    OverlappingExtension {
        extension: String,
        first: Category,
        second: Category,
    },
    /// An extension was empty or just a dot.
    #[error("empty extension given for category {0}")]
    InvalidExtension(Category),
    /// The catch-all category was given an extension.
    #[error("the catch-all category cannot claim extension '{0}'")]
    CatchAllExtension(String),
}

/// Maps file extensions to categories.
///
/// A `CategoryMap` is built once, validated, and then only read. Extensions
/// are stored lowercase with their leading dot, so lookups are
/// case-insensitive and accept either `"png"` or `".png"`.
#[derive(Debug, Clone)]
pub struct CategoryMap {
    ordered: Vec<(Category, Vec<String>)>,
    extension_map: HashMap<String, Category>,
}

impl CategoryMap {
    /// Creates a map with every category present and no extensions claimed.
    pub fn empty() -> Self {
        Self {
            ordered: Category::ALL.iter().map(|c| (*c, Vec::new())).collect(),
            extension_map: HashMap::new(),
        }
    }

    /// Creates the map holding the built-in extension table.
    pub fn standard() -> Result<Self, CategoryError> {
        Self::from_table(STANDARD_CATEGORIES)
    }

    /// Builds a map from a table of categories and extensions.
    ///
    /// # Errors
    ///
    /// Fails if any extension is claimed twice, is empty, or is assigned to
    /// `Category::Other`.
    pub fn from_table(table: &[(Category, &[&str])]) -> Result<Self, CategoryError> {
        let mut map = Self::empty();
        for (category, extensions) in table {
            for ext in *extensions {
                map.add_extension_mapping(ext, *category)?;
            }
        }
        Ok(map)
    }

    /// Adds an extension to a category.
    ///
    /// Re-adding an extension to the category that already owns it is a
    /// no-op.
    pub fn add_extension_mapping(
        &mut self,
        ext: &str,
        category: Category,
    ) -> Result<(), CategoryError> {
        let key = canonical_extension(ext).ok_or(CategoryError::InvalidExtension(category))?;

        if category == Category::Other {
            return Err(CategoryError::CatchAllExtension(key));
        }

        if let Some(&owner) = self.extension_map.get(&key) {
            if owner == category {
                return Ok(());
            }
            return Err(CategoryError::OverlappingExtension {
                extension: key,
                first: owner,
                second: category,
            });
        }

        self.extension_map.insert(key.clone(), category);
        if let Some((_, list)) = self.ordered.iter_mut().find(|(c, _)| *c == category) {
            list.push(key);
        }
        Ok(())
    }

    /// Maps a file extension to the category claiming it.
    ///
    /// # Examples
    ///
    /// ```
    /// use dirsort::file_category::{Category, CategoryMap};
    ///
    /// let map = CategoryMap::standard().unwrap();
    /// assert_eq!(map.extension_to_category("pdf"), Some(Category::Documents));
    /// assert_eq!(map.extension_to_category(".PNG"), Some(Category::Images));
    /// assert_eq!(map.extension_to_category("rs"), None);
    /// ```
    pub fn extension_to_category(&self, ext: &str) -> Option<Category> {
        canonical_extension(ext).and_then(|key| self.extension_map.get(&key).copied())
    }

    /// Determines the category for a file extension, defaulting to `Other`.
    pub fn categorize(&self, ext: Option<&str>) -> Category {
        ext.and_then(|e| self.extension_to_category(e))
            .unwrap_or(Category::Other)
    }

    /// Returns the extensions claimed by a category, in insertion order.
    pub fn extensions(&self, category: Category) -> &[String] {
        self.ordered
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, list)| list.as_slice())
            .unwrap_or(&[])
    }

    /// Iterates over all categories in reporting order.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.ordered.iter().map(|(c, _)| *c)
    }

    /// Returns true if `name` is exactly the folder name of a category.
    pub fn is_category_dir_name(&self, name: &str) -> bool {
        Category::from_dir_name(name).is_some_and(|named| self.categories().any(|c| c == named))
    }

    /// Returns true if the extension belongs to the archive category.
    pub fn is_archive_extension(&self, ext: &str) -> bool {
        self.extension_to_category(ext) == Some(Category::Archives)
    }
}

/// Lowercases an extension and gives it exactly one leading dot.
fn canonical_extension(ext: &str) -> Option<String> {
    let bare = ext.trim_start_matches('.');
    if bare.is_empty() {
        return None;
    }
    Some(format!(".{}", bare.to_lowercase()))
}
