//! Utility modules for the MTGJSON pipeline
//!
//! This module provides small text and naming helpers.

pub mod files;
pub mod strings;

// Re-export commonly used utilities
pub use files::{fix_windows_set_name, DEFAULT_BAD_FILE_NAMES};
pub use strings::{
    get_str_or_none,
    normalize_line_endings,
    parse_magic_rules_subset,
    to_camel_case,
    url_keygen,
    LINK_PREFIX,
};
