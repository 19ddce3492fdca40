//! File naming helpers

/// File names Windows refuses to create, regardless of extension
pub const DEFAULT_BAD_FILE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Append `_` to a set name that Windows cannot use as a file name
///
/// # Example
///
/// ```rust
/// use mtgjson_util::utils::files::{fix_windows_set_name, DEFAULT_BAD_FILE_NAMES};
///
/// assert_eq!(fix_windows_set_name("CON", DEFAULT_BAD_FILE_NAMES), "CON_");
/// assert_eq!(fix_windows_set_name("M21", DEFAULT_BAD_FILE_NAMES), "M21");
/// ```
pub fn fix_windows_set_name<S: AsRef<str>>(set_name: &str, bad_file_names: &[S]) -> String {
    if bad_file_names.iter().any(|bad| bad.as_ref() == set_name) {
        return format!("{set_name}_");
    }

    set_name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_names_get_suffix() {
        assert_eq!(fix_windows_set_name("CON", DEFAULT_BAD_FILE_NAMES), "CON_");
        assert_eq!(fix_windows_set_name("LPT9", DEFAULT_BAD_FILE_NAMES), "LPT9_");
    }

    #[test]
    fn test_regular_names_untouched() {
        assert_eq!(fix_windows_set_name("KHM", DEFAULT_BAD_FILE_NAMES), "KHM");
        // Membership is exact
        assert_eq!(fix_windows_set_name("con", DEFAULT_BAD_FILE_NAMES), "con");
        assert_eq!(fix_windows_set_name("COM10", DEFAULT_BAD_FILE_NAMES), "COM10");
    }

    #[test]
    fn test_custom_list() {
        let names = vec!["PRE".to_string()];
        assert_eq!(fix_windows_set_name("PRE", names.as_slice()), "PRE_");
        assert_eq!(fix_windows_set_name("CON", names.as_slice()), "CON");
    }
}
