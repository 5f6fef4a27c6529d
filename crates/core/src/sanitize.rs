//! Input sanitizer for free-text fields.
//!
//! Plain text loses all markup, rich text is passed through `ammonia`'s
//! allowlist. Both are trimmed. Sanitizing never fails.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::document::model::FieldValue;
use crate::template::FieldKind;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("static regex"));

/// Trim and strip every HTML tag.
pub fn clean_text(input: &str) -> String {
    TAG.replace_all(input, "")
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Keep safe formatting markup, drop scripts, event handlers and unsafe URLs.
pub fn clean_rich_text(input: &str) -> String {
    ammonia::clean(input).trim().to_string()
}

/// Sanitize a template field value according to its declared kind.
pub fn clean_field(kind: FieldKind, value: FieldValue) -> FieldValue {
    match value {
        FieldValue::Text(s) => FieldValue::Text(match kind {
            FieldKind::RichText => clean_rich_text(&s),
            FieldKind::Text | FieldKind::Image | FieldKind::List => clean_text(&s),
        }),
        FieldValue::List(items) => FieldValue::List(items.into_iter().map(clean_json).collect()),
    }
}

/// Strip markup from every string nested inside a JSON value.
pub fn clean_json(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(clean_text(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(clean_json).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, clean_json(v))).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_is_trimmed_and_untagged() {
        assert_eq!(clean_text("  <b>Hello</b> world \n"), "Hello world");
        assert_eq!(clean_text("<script>alert(1)</script>"), "alert(1)");
        assert_eq!(clean_text("a\u{0000}b"), "ab");
    }

    #[test]
    fn rich_text_keeps_formatting_but_not_scripts() {
        let cleaned = clean_rich_text("<p onclick=\"x()\">Hi <strong>there</strong><script>bad()</script></p>");
        assert!(cleaned.contains("<strong>there</strong>"));
        assert!(!cleaned.contains("onclick"));
        assert!(!cleaned.contains("script"));
    }

    #[test]
    fn list_items_are_cleaned_recursively() {
        let value = FieldValue::List(vec![json!({"url": " /uploads/a.png ", "caption": "<i>Sea</i>"}), json!(3)]);
        let cleaned = clean_field(FieldKind::List, value);
        assert_eq!(
            cleaned,
            FieldValue::List(vec![json!({"url": "/uploads/a.png", "caption": "Sea"}), json!(3)])
        );
    }
}
