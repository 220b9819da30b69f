// kubeintent-core/src/utils.rs
//! General utility functions.

/// Truncates a string to a maximum character count, adding an ellipsis if truncated.
/// Handles multi-byte characters correctly.
pub fn truncate_string(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    // Too short for any characters plus "...".
    if max_chars < 3 {
        return input.chars().take(max_chars).collect();
    }
    format!("{}...", input.chars().take(max_chars - 3).collect::<String>())
}

/// First non-blank line of `text`, truncated. Used for list previews.
pub fn preview_line(text: &str, max_chars: usize) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    truncate_string(line, max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate_string("kubectl get pods", 20), "kubectl get pods");
        assert_eq!(truncate_string("kubectl get pods -A", 10), "kubectl...");
        assert_eq!(truncate_string("kubectl", 2), "ku");
        assert_eq!(truncate_string("", 0), "");
    }

    #[test]
    fn test_truncate_unicode() {
        assert_eq!(truncate_string("ポッドを一覧表示", 8), "ポッドを一覧表示");
        assert_eq!(truncate_string("ポッドを一覧表示", 5), "ポッ...");
    }

    #[test]
    fn test_preview_line() {
        assert_eq!(preview_line("\n  \n  list pods in billing\nmore", 40), "list pods in billing");
        assert_eq!(preview_line("create namespace testing", 10), "create ...");
        assert_eq!(preview_line("", 10), "");
    }
}
