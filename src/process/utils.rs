/// Trim whitespace, strip any surrounding `"` characters, then trim again.
pub fn clean_str(raw: &str) -> String {
    raw.trim().trim_matches('"').trim().to_string()
}

/// Trimmed copy of `raw`, or `None` when nothing is left.
pub fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
