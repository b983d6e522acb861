//! Filename normalization.
//!
//! Turns arbitrary file stems into a filesystem-safe form: the stem is
//! lower-cased, Cyrillic letters are transliterated through a fixed table,
//! other alphanumeric characters pass through, and everything else becomes `_`.
//!
//! # Examples
//!
//! ```
//! use clean_folder::normalize::{normalize, normalized_file_name};
//!
//! assert_eq!(normalize("Привіт Світ!"), "pryvit_svit_");
//! assert_eq!(normalized_file_name("Фото.JPG"), "foto.jpg");
//! ```

/// Cyrillic letter to Latin transliteration table.
///
/// Lookups happen after lower-casing, so only lowercase letters are listed.
pub const TRANSLITERATION: &[(char, &str)] = &[
    ('а', "a"),
    ('б', "b"),
    ('в', "v"),
    ('г', "h"),
    ('д', "d"),
    ('е', "e"),
    ('є', "ie"),
    ('ж', "zh"),
    ('з', "z"),
    ('и', "y"),
    ('і', "i"),
    ('ї', "i"),
    ('й', "i"),
    ('к', "k"),
    ('л', "l"),
    ('м', "m"),
    ('н', "n"),
    ('о', "o"),
    ('п', "p"),
    ('р', "r"),
    ('с', "s"),
    ('т', "t"),
    ('у', "u"),
    ('ф', "f"),
    ('х', "kh"),
    ('ц', "ts"),
    ('ч', "ch"),
    ('ш', "sh"),
    ('щ', "shch"),
    ('ь', ""),
    ('ы', "y"),
    ('ъ', ""),
    ('э', "e"),
    ('ю', "iu"),
    ('я', "ia"),
];

/// Replacement for characters that are neither transliterated nor alphanumeric.
const SEPARATOR: char = '_';

/// Returns the transliteration of `c`, if the table has one.
pub fn transliterate(c: char) -> Option<&'static str> {
    TRANSLITERATION
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
}

/// Normalizes a filename stem.
///
/// Total and pure: every input has an output, `""` maps to `""`, and repeated
/// separators are not collapsed.
pub fn normalize(stem: &str) -> String {
    let mut result = String::with_capacity(stem.len());

    for c in stem.to_lowercase().chars() {
        if let Some(mapped) = transliterate(c) {
            result.push_str(mapped);
        } else if c.is_alphanumeric() {
            result.push(c);
        } else {
            result.push(SEPARATOR);
        }
    }

    result
}

/// Splits a file name into stem and extension (including the leading dot).
///
/// Leading dots never start an extension, so `.bashrc` has no extension while
/// `archive.tar.gz` splits into `archive.tar` and `.gz`.
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if name[..idx].chars().any(|c| c != '.') => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Builds the normalized file name: normalized stem plus lower-cased extension.
///
/// A stem that would normalize to nothing (e.g. a lone soft sign) becomes `_`,
/// so `ь.txt` turns into `_.txt` rather than a dotfile.
pub fn normalized_file_name(name: &str) -> String {
    let (stem, ext) = split_name(name);
    let mut normalized = normalize(stem);
    if normalized.is_empty() {
        normalized.push(SEPARATOR);
    }
    normalized.push_str(&ext.to_lowercase());
    normalized
}
