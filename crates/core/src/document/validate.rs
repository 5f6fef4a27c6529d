/// Write-boundary validation for pages and site singletons.
///
/// Every failure is reported per field so the admin UI can show it next to
/// the input; nothing here touches the store.
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use super::id::PageId;
use super::model::{
    FieldValue, GlobalSettings, PageData, StyleSettings, WordCloudEntry, WordCloudEntryInput,
    WORD_WEIGHT_MAX, WORD_WEIGHT_MIN,
};
use crate::sanitize;
use crate::template::{FieldKind, Template};

const MAX_TITLE_LEN: usize = 200;
const MAX_FONT_LEN: usize = 64;
const MAX_WORD_LEN: usize = 60;

const STYLE_KEYS: [&str; 6] = [
    "primaryColor",
    "secondaryColor",
    "backgroundColor",
    "textColor",
    "headingFont",
    "bodyFont",
];
const GLOBAL_KEYS: [&str; 2] = ["siteTitle", "footerText"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("validation failed: {}", join(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(field, message)],
        }
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

pub fn validate_page_id(raw: &str) -> Result<PageId, ValidationErrors> {
    PageId::parse(raw).map_err(|msg| ValidationErrors::single("id", msg))
}

/// Sanitize a page title and check it is present.
pub fn clean_title(raw: &str) -> Result<String, ValidationErrors> {
    let title = sanitize::clean_text(raw);
    if title.is_empty() {
        return Err(ValidationErrors::single("title", "is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationErrors::single(
            "title",
            format!("cannot exceed {MAX_TITLE_LEN} characters"),
        ));
    }
    Ok(title)
}

/// Convert submitted page data into typed, sanitized field values.
///
/// Unknown field names and values whose shape does not match the declared
/// field kind are rejected.
pub fn parse_page_data(template: &Template, raw: Map<String, Value>) -> Result<PageData, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let mut data = PageData::new();

    for (name, value) in raw {
        let Some(schema) = template.field(&name) else {
            errors.push(
                format!("data.{name}"),
                format!("is not a field of template '{}'", template.id),
            );
            continue;
        };
        let typed = match (schema.kind, value) {
            (FieldKind::List, Value::Array(items)) => FieldValue::List(items),
            (FieldKind::List, _) => {
                errors.push(format!("data.{name}"), "must be a list");
                continue;
            }
            (_, Value::String(s)) => FieldValue::Text(s),
            (_, _) => {
                errors.push(format!("data.{name}"), "must be a string");
                continue;
            }
        };
        data.insert(name, sanitize::clean_field(schema.kind, typed));
    }

    errors.into_result().map(|()| data)
}

/// Every field the template marks required must be present and non-blank.
pub fn check_required(template: &Template, data: &PageData) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    for field in template.fields.iter().filter(|f| f.required) {
        match data.get(field.name) {
            Some(value) if !value.is_blank() => {}
            _ => errors.push(format!("data.{}", field.name), "is required"),
        }
    }
    errors.into_result()
}

fn check_keys(map: &Map<String, Value>, prefix: &str, allowed: &[&str], errors: &mut ValidationErrors) {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            errors.push(format!("{prefix}{key}"), "is not a recognised setting");
        }
    }
}

fn is_hex_color(value: &str) -> bool {
    let Some(hex) = value.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

fn check_style(style: &mut StyleSettings, prefix: &str, errors: &mut ValidationErrors) {
    let colors = [
        ("primaryColor", &mut style.primary_color),
        ("secondaryColor", &mut style.secondary_color),
        ("backgroundColor", &mut style.background_color),
        ("textColor", &mut style.text_color),
    ];
    for (key, slot) in colors {
        if let Some(color) = slot.as_mut() {
            *color = color.trim().to_ascii_lowercase();
            if !is_hex_color(color) {
                errors.push(format!("{prefix}{key}"), "must be a #rgb or #rrggbb color");
            }
        }
    }

    let fonts = [
        ("headingFont", &mut style.heading_font),
        ("bodyFont", &mut style.body_font),
    ];
    for (key, slot) in fonts {
        if let Some(font) = slot.as_mut() {
            *font = sanitize::clean_text(font);
            let valid = !font.is_empty()
                && font.len() <= MAX_FONT_LEN
                && font
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | ','));
            if !valid {
                errors.push(format!("{prefix}{key}"), "is not a valid font name");
            }
        }
    }
}

fn expect_object(value: Value, field: &str) -> Result<Map<String, Value>, ValidationErrors> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ValidationErrors::single(field, "must be an object")),
    }
}

/// Parse per-page style overrides.
pub fn parse_style_settings(value: Value) -> Result<StyleSettings, ValidationErrors> {
    let map = expect_object(value, "settings")?;
    let mut errors = ValidationErrors::default();
    check_keys(&map, "settings.", &STYLE_KEYS, &mut errors);
    errors.clone().into_result()?;

    let mut style: StyleSettings = serde_json::from_value(Value::Object(map))
        .map_err(|e| ValidationErrors::single("settings", e.to_string()))?;
    check_style(&mut style, "settings.", &mut errors);
    errors.into_result().map(|()| style)
}

/// Parse a patch for the `global` singleton.
pub fn parse_global_settings(map: Map<String, Value>) -> Result<GlobalSettings, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let allowed: Vec<&str> = STYLE_KEYS.iter().chain(GLOBAL_KEYS.iter()).copied().collect();
    check_keys(&map, "", &allowed, &mut errors);
    errors.clone().into_result()?;

    let mut settings: GlobalSettings = serde_json::from_value(Value::Object(map))
        .map_err(|e| ValidationErrors::single("global", e.to_string()))?;
    settings.site_title = settings.site_title.map(|s| sanitize::clean_text(&s));
    settings.footer_text = settings.footer_text.map(|s| sanitize::clean_text(&s));
    check_style(&mut settings.style, "", &mut errors);
    errors.into_result().map(|()| settings)
}

/// Parse and normalise word-cloud entries.
///
/// Weights outside `1..=9` are clamped here, at write time, so nothing
/// downstream ever sees an out-of-range size. Empty words are rejected.
pub fn parse_word_cloud(value: Value) -> Result<Vec<WordCloudEntry>, ValidationErrors> {
    let inputs: Vec<WordCloudEntryInput> = serde_json::from_value(value)
        .map_err(|e| ValidationErrors::single("entries", e.to_string()))?;

    let mut errors = ValidationErrors::default();
    let mut entries = Vec::with_capacity(inputs.len());
    for (i, input) in inputs.into_iter().enumerate() {
        let text = sanitize::clean_text(&input.text);
        if text.is_empty() {
            errors.push(format!("entries[{i}].text"), "is required");
            continue;
        }
        if text.chars().count() > MAX_WORD_LEN {
            errors.push(
                format!("entries[{i}].text"),
                format!("cannot exceed {MAX_WORD_LEN} characters"),
            );
            continue;
        }

        let clamped = input
            .weight
            .clamp(i64::from(WORD_WEIGHT_MIN), i64::from(WORD_WEIGHT_MAX));
        if clamped != input.weight {
            warn!(word = %text, weight = input.weight, clamped, "word-cloud weight clamped");
        }
        let weight = u8::try_from(clamped).unwrap_or(WORD_WEIGHT_MIN);

        let link = input
            .link
            .map(|l| sanitize::clean_text(&l))
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| "#".to_string());
        if link.to_ascii_lowercase().starts_with("javascript:") {
            errors.push(format!("entries[{i}].link"), "must be a http(s) or relative link");
            continue;
        }

        entries.push(WordCloudEntry { text, weight, link });
    }

    errors.into_result().map(|()| entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateRegistry;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn page_data_is_typed_and_sanitized() {
        let registry = TemplateRegistry::builtin();
        let gallery = registry.get("gallery").unwrap();
        let data = parse_page_data(
            gallery,
            object(json!({
                "title": "  <em>Work</em> ",
                "images": [{"url": "/uploads/1.png"}],
            })),
        )
        .unwrap();
        assert_eq!(data["title"], FieldValue::Text("Work".to_string()));
        assert!(matches!(data["images"], FieldValue::List(ref items) if items.len() == 1));
    }

    #[test]
    fn unknown_and_misshapen_fields_are_rejected() {
        let registry = TemplateRegistry::builtin();
        let basic = registry.get("basic").unwrap();
        let err = parse_page_data(basic, object(json!({"title": 5, "sidebar": "x"}))).unwrap_err();
        assert!(err.has_field("data.title"));
        assert!(err.has_field("data.sidebar"));

        let gallery = registry.get("gallery").unwrap();
        let err = parse_page_data(gallery, object(json!({"images": "a.png"}))).unwrap_err();
        assert!(err.has_field("data.images"));
    }

    #[test]
    fn required_fields_must_be_non_blank() {
        let registry = TemplateRegistry::builtin();
        let basic = registry.get("basic").unwrap();
        let data = parse_page_data(basic, object(json!({"title": "About", "content": "   "}))).unwrap();
        let err = check_required(basic, &data).unwrap_err();
        assert_eq!(err.errors, vec![FieldError::new("data.content", "is required")]);
    }

    #[test]
    fn word_cloud_weights_are_clamped() {
        let entries = parse_word_cloud(json!([
            {"text": "rust", "weight": 14},
            {"text": "tea", "weight": 0, "link": "/tea"},
            {"text": "cake", "weight": 5}
        ]))
        .unwrap();
        let weights: Vec<u8> = entries.iter().map(|e| e.weight).collect();
        assert_eq!(weights, [9, 1, 5]);
        assert_eq!(entries[0].link, "#");
        assert_eq!(entries[1].link, "/tea");
    }

    #[test]
    fn word_cloud_rejects_empty_words() {
        let err = parse_word_cloud(json!([{"text": " ", "weight": 3}])).unwrap_err();
        assert!(err.has_field("entries[0].text"));
    }

    #[test]
    fn style_settings_validate_colors_and_keys() {
        let style = parse_style_settings(json!({"primaryColor": " #ABC ", "bodyFont": "Open Sans"})).unwrap();
        assert_eq!(style.primary_color.as_deref(), Some("#abc"));

        let err = parse_style_settings(json!({"primaryColor": "red"})).unwrap_err();
        assert!(err.has_field("settings.primaryColor"));

        let err = parse_style_settings(json!({"margin": "0"})).unwrap_err();
        assert!(err.has_field("settings.margin"));
    }

    #[test]
    fn global_settings_accept_site_fields() {
        let settings = parse_global_settings(object(json!({
            "siteTitle": "<b>Atelier</b>",
            "textColor": "#000000"
        })))
        .unwrap();
        assert_eq!(settings.site_title.as_deref(), Some("Atelier"));
        assert_eq!(settings.style.text_color.as_deref(), Some("#000000"));
    }
}
