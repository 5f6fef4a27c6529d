//! Denylist scan for SVG uploads.
//!
//! This is a heuristic, not a sanitizer. It over-blocks (any occurrence of
//! `eval`, e.g. in "evaluate", is rejected) and under-blocks (entity-encoded
//! or otherwise obfuscated payloads pass). Replacing it with an allowlist
//! sanitizer would change which files are accepted.

use std::sync::LazyLock;

use regex::Regex;

/// Elements rejected when they appear as an opening tag.
pub const BLOCKED_ELEMENTS: [&str; 5] = ["script", "foreignObject", "iframe", "use", "embed"];

/// Substrings rejected anywhere in the document.
pub const BLOCKED_SUBSTRINGS: [&str; 6] = ["onload", "onerror", "onclick", "onmouseover", "eval", "javascript"];

static ELEMENT_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    let names = BLOCKED_ELEMENTS.join("|");
    Regex::new(&format!(r"(?i)<\s*(?:[a-z0-9_-]+:)?({names})\b")).expect("static regex")
});

static JAVASCRIPT_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript\s*:").expect("static regex"));

static BASE64_DATA_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)data:[^,;\s]*(?:;[^,;\s]*)*;base64").expect("static regex"));

/// Return the first denylisted construct found in `svg`, if any.
pub fn find_unsafe_content(svg: &str) -> Option<String> {
    if let Some(caps) = ELEMENT_OPEN.captures(svg) {
        return Some(format!("<{}> element", &caps[1]));
    }
    if JAVASCRIPT_URI.is_match(svg) {
        return Some("javascript: URI".to_string());
    }
    if BASE64_DATA_URI.is_match(svg) {
        return Some("base64 data: URI".to_string());
    }
    let lower = svg.to_ascii_lowercase();
    BLOCKED_SUBSTRINGS
        .iter()
        .find(|needle| lower.contains(*needle))
        .map(|needle| format!("'{needle}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
        <rect x="1" y="1" width="4" height="4" fill="#336"/>
        <circle cx="7" cy="7" r="2"/>
    </svg>"##;

    #[test]
    fn clean_shapes_pass() {
        assert_eq!(find_unsafe_content(CLEAN), None);
    }

    #[test]
    fn script_element_is_blocked() {
        let svg = "<svg><script>alert(1)</script></svg>";
        assert_eq!(find_unsafe_content(svg).as_deref(), Some("<script> element"));
        assert!(find_unsafe_content("<svg>< SCRIPT >x</SCRIPT></svg>").is_some());
        assert!(find_unsafe_content("<svg><svg:script/></svg>").is_some());
    }

    #[test]
    fn other_blocked_elements() {
        for svg in [
            "<svg><foreignObject/></svg>",
            "<svg><iframe src='x'/></svg>",
            "<svg><use href='#a'/></svg>",
            "<svg><embed/></svg>",
        ] {
            assert!(find_unsafe_content(svg).is_some(), "{svg} should be blocked");
        }
        // `<user>` is not `<use>`.
        assert_eq!(find_unsafe_content("<svg><user/></svg>"), None);
    }

    #[test]
    fn event_handlers_and_uris_are_blocked() {
        assert!(find_unsafe_content(r#"<svg onload="x()"></svg>"#).is_some());
        assert!(find_unsafe_content(r#"<svg><a href="javascript:x()">a</a></svg>"#).is_some());
        assert!(find_unsafe_content(r#"<svg><image href="data:image/png;base64,AAAA"/></svg>"#).is_some());
    }

    #[test]
    fn known_over_blocking_is_kept() {
        let svg = "<svg><text>evaluate</text></svg>";
        assert_eq!(find_unsafe_content(svg).as_deref(), Some("'eval'"));
    }

    #[test]
    fn known_under_blocking_is_kept() {
        // Entity-encoded scheme slips through the denylist.
        let svg = r#"<svg><a href="&#106;avascript:x()">a</a></svg>"#;
        assert_eq!(find_unsafe_content(svg), None);
    }
}
