//! Cleaning raw code fragments before execution.

use std::sync::OnceLock;

use regex::Regex;

use super::error::DispatchError;

/// Shortest fragment worth executing. Anything shorter is treated as
/// "no code returned".
pub const DEFAULT_MIN_FRAGMENT_LEN: usize = 5;

fn opening_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^```[A-Za-z0-9_+\-]*[ \t]*(?:\r?\n|$)").expect("opening fence pattern compiles")
    })
}

fn closing_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*```$").expect("closing fence pattern compiles"))
}

/// Tags recognised on a fence that opens and closes on the same line.
const INLINE_FENCE_TAGS: &[&str] = &[
    "deck",
    "deckscript",
    "javascript",
    "js",
    "typescript",
    "ts",
    "text",
    "txt",
    "plaintext",
];

// A leading word is only a tag when it is a known one, so "```sync```"
// and "```delete shape 7```" keep their first word.
fn strip_inline_tag(inner: &str) -> &str {
    match inner.split_once(char::is_whitespace) {
        Some((tag, rest)) if INLINE_FENCE_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag)) => {
            rest.trim_start()
        }
        _ => inner,
    }
}

/// Remove a surrounding code fence or a single pair of backticks.
///
/// Text that is neither fenced nor backtick-wrapped is returned unchanged.
pub fn strip_fences(text: &str) -> &str {
    if let Some(open) = opening_fence().find(text) {
        let body = &text[open.end()..];
        return match closing_fence().find(body) {
            Some(close) => &body[..close.start()],
            None => body,
        };
    }
    if let Some(inner) = text
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    {
        return strip_inline_tag(inner.trim());
    }
    if text.len() >= 2 && text.starts_with('`') && text.ends_with('`') {
        return &text[1..text.len() - 1];
    }
    text
}

/// Trim, strip fences, re-trim, then reject empty or implausibly short text.
pub fn normalize(raw: &str, min_len: usize) -> Result<String, DispatchError> {
    let body = strip_fences(raw.trim()).trim();
    let len = body.chars().count();
    if len == 0 || len < min_len {
        return Err(DispatchError::EmptyFragment { len, min: min_len });
    }
    Ok(body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_fence_with_language_tag() {
        let raw = "\n```deck\nshape 1 left = 10\n```\n";
        assert_eq!(normalize(raw, 5).unwrap(), "shape 1 left = 10");
    }

    #[test]
    fn test_strips_fence_without_language_tag() {
        assert_eq!(
            normalize("```\nshape 1 left = 10\n```", 5).unwrap(),
            "shape 1 left = 10"
        );
    }

    #[test]
    fn test_unterminated_fence_keeps_body() {
        assert_eq!(
            normalize("```javascript\nshape 1 top = 2", 5).unwrap(),
            "shape 1 top = 2"
        );
    }

    #[test]
    fn test_strips_single_line_fence() {
        assert_eq!(
            normalize("```deck shape 1 left = 10```", 5).unwrap(),
            "shape 1 left = 10"
        );
        assert_eq!(
            normalize("```JS  shape 1 left = 10 ```", 5).unwrap(),
            "shape 1 left = 10"
        );
        assert_eq!(
            normalize("```shape 1 left = 10```", 5).unwrap(),
            "shape 1 left = 10"
        );
    }

    #[test]
    fn test_single_line_fence_keeps_leading_keyword() {
        assert_eq!(normalize("```sync```", 1).unwrap(), "sync");
        assert_eq!(
            normalize("```delete shape 7```", 5).unwrap(),
            "delete shape 7"
        );
    }

    #[test]
    fn test_strips_single_backticks() {
        assert_eq!(normalize("`shape 1 top = 2`", 5).unwrap(), "shape 1 top = 2");
    }

    #[test]
    fn test_inner_backticks_are_kept() {
        let text = "shape 1 name = \"a`b\"";
        assert_eq!(normalize(text, 5).unwrap(), text);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in [
            "```deck\nshape 1 left = 10\n```",
            "  sync  ",
            "`delete shape 7`",
            "```deck shape 1 top = 3```",
            "shape 1 text = \"hello\"",
        ] {
            let once = normalize(raw, 1).unwrap();
            let twice = normalize(&once, 1).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_empty_and_short_fragments_rejected() {
        assert_eq!(
            normalize("   ", 5),
            Err(DispatchError::EmptyFragment { len: 0, min: 5 })
        );
        assert_eq!(
            normalize("```\n```", 5),
            Err(DispatchError::EmptyFragment { len: 0, min: 5 })
        );
        assert_eq!(
            normalize("`ok`", 5),
            Err(DispatchError::EmptyFragment { len: 2, min: 5 })
        );
    }
}
