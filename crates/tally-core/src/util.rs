//! Shared utility functions used across multiple modules.

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Truncate text to at most `max_len` characters, appending `...` when cut.
pub fn truncate_label(value: &str, max_len: usize) -> String {
    let value = value.trim();
    if value.chars().count() <= max_len {
        return value.to_string();
    }
    let kept = max_len.saturating_sub(3);
    format!("{}...", value.chars().take(kept).collect::<String>())
}
