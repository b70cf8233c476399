/// Returns at most `max_chars` characters of `text`, cut on a char boundary.
///
/// # Example
///
/// ```
/// use vidfetch::core::utils::truncate_chars;
///
/// assert_eq!(truncate_chars("héllo", 2), "hé");
/// assert_eq!(truncate_chars("abc", 10), "abc");
/// ```
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Truncates for log output, appending `...` when something was cut
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    let cut = truncate_chars(text, max_chars);
    if cut.len() < text.len() {
        format!("{}...", cut)
    } else {
        cut.to_string()
    }
}

/// Joins the last `max_lines` lines into a single diagnostic string
pub fn tail_lines(lines: &[String], max_lines: usize) -> String {
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("привет", 3), "при");
        assert_eq!(truncate_chars("", 3), "");
        assert_eq!(truncate_chars("ab", 0), "");
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("abcdef", 3), "abc...");
        assert_eq!(truncate_for_log("abc", 3), "abc");
    }

    #[test]
    fn test_tail_lines() {
        let lines: Vec<String> = (1..=5).map(|i| format!("line {}", i)).collect();
        assert_eq!(tail_lines(&lines, 2), "line 4\nline 5");
        assert_eq!(tail_lines(&lines, 10).lines().count(), 5);
        assert_eq!(tail_lines(&[], 3), "");
    }
}
