//! File-name normalization.
//!
//! Stems are transliterated from Cyrillic to Latin and every remaining
//! character outside `[A-Za-z0-9_]` is replaced by an underscore, so the
//! result is legal on every common filesystem.

use regex::Regex;
use std::sync::LazyLock;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("static pattern is valid"));

/// Normalizes a file stem.
///
/// The function is pure and deterministic. An empty stem becomes `_`.
///
/// # Examples
///
/// ```
/// use dirsort::normalize::normalize;
///
/// assert_eq!(normalize("Звіт 2023"), "Zvit_2023");
/// assert_eq!(normalize("photo (1)"), "photo__1_");
/// assert_eq!(normalize("plain_name"), "plain_name");
/// ```
pub fn normalize(stem: &str) -> String {
    let mut latin = String::with_capacity(stem.len());
    for ch in stem.chars() {
        match transliterate(ch) {
            Some(replacement) => latin.push_str(&replacement),
            None => latin.push(ch),
        }
    }

    let safe = UNSAFE_CHARS.replace_all(&latin, "_");
    if safe.is_empty() {
        "_".to_string()
    } else {
        safe.into_owned()
    }
}

/// Latin spelling of a Cyrillic letter, keeping the case of its first letter.
fn transliterate(ch: char) -> Option<String> {
    let lower = ch.to_lowercase().next()?;
    let latin = cyrillic_to_latin(lower)?;
    if ch == lower {
        return Some(latin.to_string());
    }

    let mut chars = latin.chars();
    Some(match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    })
}

fn cyrillic_to_latin(ch: char) -> Option<&'static str> {
    let latin = match ch {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "h",
        'ґ' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'є' => "ie",
        'ж' => "zh",
        'з' => "z",
        'и' => "y",
        'і' => "i",
        'ї' => "i",
        'й' => "i",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "kh",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "iu",
        'я' => "ia",
        _ => return None,
    };
    Some(latin)
}
