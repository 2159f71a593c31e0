//! Display sanitization for metadata text.
//!
//! Stream servers are untrusted; whatever they report as a song title goes
//! straight onto a display surface, so tag-like substrings and control
//! characters are stripped and the result is length-bounded.

use regex::Regex;
use std::sync::OnceLock;

/// Display-safety bound on the cleaned title, in characters.
pub const MAX_TITLE_LEN: usize = 100;

static TAG_RE: OnceLock<Regex> = OnceLock::new();

fn tag_re() -> &'static Regex {
    TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is a valid regex"))
}

/// Clean a raw metadata string for display.
///
/// Strips `<...>` tag-like substrings and control characters (C0, DEL and
/// the C1 range), trims surrounding whitespace and truncates to
/// [`MAX_TITLE_LEN`] characters. Pure and infallible; idempotent, so a
/// cleaned string passes through unchanged.
pub fn clean(raw: &str) -> String {
    let untagged = tag_re().replace_all(raw, "");
    let trimmed: String = untagged.chars().filter(|c| !c.is_control()).collect();
    let trimmed = trimmed.trim();
    let truncated: String = trimmed.chars().take(MAX_TITLE_LEN).collect();
    // Truncation can expose trailing whitespace; trim again so the function
    // stays idempotent.
    truncated.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_tags() {
        assert_eq!(clean("<b>Song</b> Name"), "Song Name");
        assert_eq!(clean("<script>alert(1)</script>Title"), "alert(1)Title");
    }

    #[test]
    fn test_strips_control_characters() {
        assert_eq!(clean("Artist\u{0000} - \u{0007}Title"), "Artist - Title");
        // C1 range
        assert_eq!(clean("Art\u{0085}ist\u{009f}"), "Artist");
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(clean("  Artist - Title \n"), "Artist - Title");
    }

    #[test]
    fn test_truncates_to_bound() {
        let long = "a".repeat(250);
        assert_eq!(clean(&long).chars().count(), MAX_TITLE_LEN);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(clean(""), "");
        assert_eq!(clean("   "), "");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "<b>Song</b> Name",
            "  padded  ",
            &"x y".repeat(80),
            "plain title",
            "unmatched < bracket",
        ];
        for input in inputs {
            let once = clean(input);
            assert_eq!(clean(&once), once, "not idempotent for {:?}", input);
        }
    }
}
