//! String utility functions
//!
//! Small text helpers used while assembling card and set data.

use crate::error::{Result, UtilError};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt::Display;

/// Prefix of generated redirection links
pub const LINK_PREFIX: &str = "https://mtgjson.com/links/";

/// Number of hex characters kept from the seed hash
const LINK_KEY_LENGTH: usize = 16;

/// Generate the redirection key for a link seed
///
/// The key is the first 16 hex characters of the SHA-256 of the seed's
/// string form, optionally prefixed with [`LINK_PREFIX`].
///
/// # Example
///
/// ```rust
/// use mtgjson_util::utils::strings::url_keygen;
///
/// let key = url_keygen("abc", false);
/// assert_eq!(key, "ba7816bf8f01cfea");
/// assert_eq!(url_keygen("abc", true), format!("https://mtgjson.com/links/{key}"));
/// ```
pub fn url_keygen<S: Display>(unique_seed: S, with_leading: bool) -> String {
    let digest = hex::encode(Sha256::digest(unique_seed.to_string().as_bytes()));
    let key = &digest[..LINK_KEY_LENGTH];

    if with_leading {
        format!("{LINK_PREFIX}{key}")
    } else {
        key.to_string()
    }
}

/// Convert `snake_case` to `camelCase`
///
/// The first component is kept as is; every following component is
/// title-cased (letters after a non-letter are upper-cased, the rest
/// lower-cased).
///
/// # Example
///
/// ```rust
/// use mtgjson_util::utils::strings::to_camel_case;
///
/// assert_eq!(to_camel_case("converted_mana_cost"), "convertedManaCost");
/// assert_eq!(to_camel_case("mcm_id"), "mcmId");
/// ```
pub fn to_camel_case(snake_str: &str) -> String {
    let mut components = snake_str.split('_');
    let mut result = components.next().unwrap_or_default().to_string();

    for component in components {
        result.push_str(&title_case(component));
    }

    result
}

fn title_case(word: &str) -> String {
    let mut result = String::with_capacity(word.len());
    let mut previous_is_letter = false;

    for ch in word.chars() {
        if previous_is_letter {
            result.extend(ch.to_lowercase());
        } else {
            result.extend(ch.to_uppercase());
        }
        previous_is_letter = ch.is_alphabetic();
    }

    result
}

/// Cut the comprehensive rules down to one section
///
/// When both headers are given, the section starts after the *second*
/// occurrence of `start_header` (the first one sits in the table of
/// contents) and ends at the next `end_header`. Line endings are then
/// normalized to `\n`.
///
/// # Errors
///
/// Returns [`UtilError::RulesSection`] when `start_header` occurs fewer
/// than two times.
pub fn parse_magic_rules_subset(magic_rules: &str, start_header: &str, end_header: &str) -> Result<String> {
    let mut section = magic_rules;

    if !start_header.is_empty() && !end_header.is_empty() {
        section = magic_rules.split(start_header).nth(2).ok_or_else(|| {
            UtilError::RulesSection(format!("'{start_header}' does not appear twice in the rules text"))
        })?;
        section = section.split(end_header).next().unwrap_or_default();
    }

    Ok(normalize_line_endings(section))
}

/// Characters other than `\n` and `\r` that end a line
const LINE_BREAKS: [char; 8] = [
    '\u{0b}', '\u{0c}', '\u{1c}', '\u{1d}', '\u{1e}', '\u{85}', '\u{2028}', '\u{2029}',
];

/// Rewrite every line break as `\n`, dropping one trailing line break
///
/// Besides `\r\n` and lone `\r`, the vertical tab, form feed, the
/// `\x1c`-`\x1e` separators, NEL and the Unicode line and paragraph
/// separators count as line breaks.
pub fn normalize_line_endings(text: &str) -> String {
    let mut unified = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                chars.next_if_eq(&'\n');
                unified.push('\n');
            }
            c if LINE_BREAKS.contains(&c) => unified.push('\n'),
            c => unified.push(c),
        }
    }

    if unified.ends_with('\n') {
        unified.pop();
    }
    unified
}

/// String form of a value, or `None` for falsy values
///
/// `null`, `false`, `0`, `""`, `[]` and `{}` are falsy. Strings are
/// returned without quotes and `true` becomes `"True"`. Numbers, arrays and
/// objects use their compact JSON text, so `{"a": 1}` becomes `{"a":1}`.
pub fn get_str_or_none(value: &Value) -> Option<String> {
    let falsy = match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    };

    if falsy {
        return None;
    }

    Some(match value {
        Value::String(s) => s.clone(),
        Value::Bool(_) => "True".to_string(),
        other => other.to_string(),
    })
}
