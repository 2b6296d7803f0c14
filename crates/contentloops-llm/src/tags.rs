//! Helpers for the `<tag>...</tag>` blocks models are asked to emit.

/// Content of the first `<tag>...</tag>` block, trimmed.
pub fn extract_tag<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    let start = text.find(&open)? + open.len();
    let end = text[start..].find(&close)? + start;
    Some(text[start..end].trim())
}

/// Free-form rationale from `<thinking>` (or `<think>`), empty when absent.
pub fn extract_thinking(text: &str) -> String {
    extract_tag(text, "thinking")
        .or_else(|| extract_tag(text, "think"))
        .unwrap_or_default()
        .to_string()
}

/// Remove every complete `<tag>...</tag>` block, markers included.
pub fn strip_tag(text: &str, tag: &str) -> String {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(&open) {
        match rest[start..].find(&close) {
            Some(rel_end) => {
                out.push_str(&rest[..start]);
                rest = &rest[start + rel_end + close.len()..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_thinking() {
        let raw = "intro\n<thinking>\n step one \n</thinking>\nbody";
        assert_eq!(extract_thinking(raw), "step one");
    }

    #[test]
    fn test_extract_think_variant() {
        assert_eq!(extract_thinking("<think>short</think> rest"), "short");
    }

    #[test]
    fn test_missing_thinking_is_empty() {
        assert_eq!(extract_thinking("no rationale here"), "");
        assert_eq!(extract_thinking("<thinking>unterminated"), "");
    }

    #[test]
    fn test_strip_tag_removes_all_blocks() {
        let raw = "a<think>x</think>b<think>y</think>c";
        assert_eq!(strip_tag(raw, "think"), "abc");
    }

    #[test]
    fn test_strip_tag_keeps_unterminated() {
        let raw = "a<think>never closed";
        assert_eq!(strip_tag(raw, "think"), raw);
    }
}
