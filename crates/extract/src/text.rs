//! Byte-offset helpers that never split a UTF-8 character.

/// Largest char boundary `<= idx`.
pub fn floor_boundary(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Smallest char boundary `>= idx`.
pub fn ceil_boundary(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// Slice `[start - before, end + after)` clamped to the text and to char boundaries.
pub fn window(text: &str, start: usize, end: usize, before: usize, after: usize) -> &str {
    let from = floor_boundary(text, start.saturating_sub(before));
    let to = ceil_boundary(text, end.saturating_add(after));
    &text[from..to.max(from)]
}

/// Lowercased window, used for keyword classification.
pub fn window_lower(text: &str, start: usize, end: usize, radius: usize) -> String {
    window(text, start, end, radius, radius).to_lowercase()
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Return the first label whose keyword occurs in `haystack`.
pub fn classify_by_keyword<T: Copy>(haystack: &str, table: &[(&str, T)], default: T) -> T {
    table
        .iter()
        .find(|(keyword, _)| haystack.contains(keyword))
        .map(|(_, label)| *label)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_respects_umlauts() {
        let text = "Müller beantragt Förderung";
        // byte 2 is inside "ü"
        assert_eq!(window(text, 2, 3, 0, 0), "ü");
        assert_eq!(window(text, 2, 3, 2, 0), "Mü");
    }

    #[test]
    fn test_window_clamps() {
        let text = "kurz";
        assert_eq!(window(text, 1, 2, 100, 100), "kurz");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  SGB \n  IX "), "SGB IX");
    }
}
