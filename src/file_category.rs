/// File categorization by extension.
///
/// This module maps extension tokens (uppercase, no leading dot) to category
/// labels through an ordered table. The first category in table order that
/// lists a token wins; anything unmatched falls back to [`UNKNOWN_CATEGORY`].
///
/// # Examples
///
/// ```
/// use clean_folder::file_category::ExtensionMap;
///
/// let map = ExtensionMap::default();
/// assert_eq!(map.categorize("JPG"), "images");
/// assert_eq!(map.categorize("pdf"), "documents");
/// assert_eq!(map.categorize("XYZ"), "unknown");
/// ```
use crate::config::{CategoryRule, ConfigError};
use std::collections::BTreeSet;

/// Label for files whose extension matches no category.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// The built-in category table, in lookup order.
pub const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    ("images", &["JPEG", "PNG", "JPG", "SVG"]),
    ("videos", &["AVI", "MP4", "MOV", "MKV"]),
    ("documents", &["DOC", "DOCX", "TXT", "PDF", "XLSX", "PPTX"]),
    ("audio", &["MP3", "OGG", "WAV", "AMR"]),
    ("archives", &["ZIP", "GZ", "TAR"]),
];

/// Normalizes an extension token for lookup: strips leading dots, uppercases.
pub fn extension_token(ext: &str) -> String {
    ext.trim_start_matches('.').to_uppercase()
}

/// Ordered mapping from category label to extension tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionMap {
    categories: Vec<(String, BTreeSet<String>)>,
}

impl ExtensionMap {
    /// Builds a map from configured category rules, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidCategory` when a name is empty, contains a
    /// path separator, shadows the `unknown` label, or is listed twice.
    pub fn from_rules(rules: &[CategoryRule]) -> Result<Self, ConfigError> {
        let mut categories: Vec<(String, BTreeSet<String>)> = Vec::with_capacity(rules.len());

        for rule in rules {
            let name = rule.name.trim();
            let invalid = |reason: &str| ConfigError::InvalidCategory {
                name: rule.name.clone(),
                reason: reason.to_string(),
            };

            if name.is_empty() {
                return Err(invalid("category name is empty"));
            }
            if name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(invalid("category name must be a single path component"));
            }
            if name == UNKNOWN_CATEGORY {
                return Err(invalid("'unknown' is reserved for unmatched extensions"));
            }
            if categories.iter().any(|(existing, _)| existing == name) {
                return Err(invalid("category is defined more than once"));
            }

            let tokens = rule
                .extensions
                .iter()
                .map(|ext| extension_token(ext))
                .filter(|token| !token.is_empty())
                .collect();
            categories.push((name.to_string(), tokens));
        }

        Ok(Self { categories })
    }

    /// Returns the category label for an extension token.
    ///
    /// The token is compared case-insensitively and may carry a leading dot.
    pub fn categorize(&self, ext: &str) -> &str {
        let token = extension_token(ext);
        self.categories
            .iter()
            .find(|(_, tokens)| tokens.contains(&token))
            .map(|(name, _)| name.as_str())
            .unwrap_or(UNKNOWN_CATEGORY)
    }

    /// Returns true if `name` is a category directory name, `unknown` included.
    ///
    /// A user directory that happens to carry one of these names is treated as
    /// already sorted and is never descended into.
    pub fn is_category_dir(&self, name: &str) -> bool {
        name == UNKNOWN_CATEGORY || self.categories.iter().any(|(label, _)| label == name)
    }

    /// Iterates category labels in lookup order (without `unknown`).
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|(name, _)| name.as_str())
    }
}

impl Default for ExtensionMap {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES
                .iter()
                .map(|(name, tokens)| {
                    (
                        name.to_string(),
                        tokens.iter().map(|t| t.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}
