//! Character-boundary helpers. Budgets in this workspace are counted in
//! characters, never bytes, and cuts never split a multi-byte code point.

/// The longest prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Lowercase and collapse runs of whitespace into single spaces.
pub fn normalize_whitespace_lower(s: &str) -> String {
    s.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}
