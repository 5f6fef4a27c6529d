use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::{ContentKind, PageId};
use crate::store::StoreError;

/// Raw document as held by a content store.
/// `created_at`/`updated_at` are owned by the store and set on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub body: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Value of one template field. Text, rich text and image references are all
/// strings; list fields hold arbitrary JSON items (gallery images, sections, tags).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<Value>),
}

impl FieldValue {
    /// Whether the value counts as absent for a required field.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
        }
    }
}

pub type PageData = BTreeMap<String, FieldValue>;

/// Optional per-page (and site-wide) style overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_font: Option<String>,
}

impl StyleSettings {
    pub fn is_empty(&self) -> bool {
        *self == StyleSettings::default()
    }

    /// Shallow merge: every field set in `patch` replaces ours.
    pub fn merge(&mut self, patch: StyleSettings) {
        let StyleSettings {
            primary_color,
            secondary_color,
            background_color,
            text_color,
            heading_font,
            body_font,
        } = patch;
        merge_field(&mut self.primary_color, primary_color);
        merge_field(&mut self.secondary_color, secondary_color);
        merge_field(&mut self.background_color, background_color);
        merge_field(&mut self.text_color, text_color);
        merge_field(&mut self.heading_font, heading_font);
        merge_field(&mut self.body_font, body_font);
    }
}

fn merge_field(slot: &mut Option<String>, patch: Option<String>) {
    if patch.is_some() {
        *slot = patch;
    }
}

/// Site-wide settings held in the `global` singleton.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer_text: Option<String>,
    #[serde(flatten)]
    pub style: StyleSettings,
}

impl GlobalSettings {
    pub fn merge(&mut self, patch: GlobalSettings) {
        merge_field(&mut self.site_title, patch.site_title);
        merge_field(&mut self.footer_text, patch.footer_text);
        self.style.merge(patch.style);
    }
}

pub const WORD_WEIGHT_MIN: u8 = 1;
pub const WORD_WEIGHT_MAX: u8 = 9;

fn default_link() -> String {
    "#".to_string()
}

/// One word of the word-cloud widget. `weight` is always within
/// `WORD_WEIGHT_MIN..=WORD_WEIGHT_MAX` once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCloudEntry {
    pub text: String,
    pub weight: u8,
    #[serde(default = "default_link")]
    pub link: String,
}

/// A word-cloud entry as submitted, before clamping.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WordCloudEntryInput {
    #[serde(default)]
    pub text: String,
    pub weight: i64,
    #[serde(default)]
    pub link: Option<String>,
}

/// Persisted shape of a page inside the `pages` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageBody {
    pub title: String,
    pub template: String,
    #[serde(default)]
    pub data: PageData,
    #[serde(default, skip_serializing_if = "StyleSettings::is_empty")]
    pub settings: StyleSettings,
}

impl PageBody {
    pub fn into_map(self) -> Result<Map<String, Value>, StoreError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StoreError::Corrupt("page body is not an object".to_string())),
            Err(e) => Err(StoreError::Corrupt(e.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDocument {
    pub id: PageId,
    pub title: String,
    pub template: String,
    pub data: PageData,
    #[serde(default, skip_serializing_if = "StyleSettings::is_empty")]
    pub settings: StyleSettings,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl TryFrom<StoredDocument> for PageDocument {
    type Error = StoreError;

    fn try_from(doc: StoredDocument) -> Result<Self, Self::Error> {
        let id = PageId::parse(&doc.id).map_err(StoreError::Corrupt)?;
        let body: PageBody = serde_json::from_value(Value::Object(doc.body))
            .map_err(|e| StoreError::Corrupt(format!("page '{id}': {e}")))?;
        Ok(PageDocument {
            id,
            title: body.title,
            template: body.template,
            data: body.data,
            settings: body.settings,
            created: doc.created_at,
            updated: doc.updated_at,
        })
    }
}

/// One of the site singletons (`main`, `wordCloud`, `global`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDocument {
    pub id: ContentKind,
    pub data: Map<String, Value>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl ContentDocument {
    pub fn from_stored(kind: ContentKind, doc: StoredDocument) -> Self {
        ContentDocument {
            id: kind,
            data: doc.body,
            created: doc.created_at,
            updated: doc.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_value_shapes() {
        let text: FieldValue = serde_json::from_value(json!("Hello")).unwrap();
        assert_eq!(text, FieldValue::Text("Hello".to_string()));
        let list: FieldValue = serde_json::from_value(json!([{"url": "/a.png"}])).unwrap();
        assert!(matches!(list, FieldValue::List(ref items) if items.len() == 1));
        assert!(serde_json::from_value::<FieldValue>(json!(42)).is_err());
        assert!(FieldValue::Text("  ".to_string()).is_blank());
        assert!(FieldValue::List(vec![]).is_blank());
    }

    #[test]
    fn global_settings_merge_is_shallow() {
        let mut settings: GlobalSettings = serde_json::from_value(json!({
            "siteTitle": "Atelier",
            "primaryColor": "#112233",
            "bodyFont": "Lato"
        }))
        .unwrap();
        let patch: GlobalSettings =
            serde_json::from_value(json!({ "primaryColor": "#abcdef" })).unwrap();
        settings.merge(patch);
        assert_eq!(settings.site_title.as_deref(), Some("Atelier"));
        assert_eq!(settings.style.primary_color.as_deref(), Some("#abcdef"));
        assert_eq!(settings.style.body_font.as_deref(), Some("Lato"));
    }

    #[test]
    fn stored_page_converts_to_document() {
        let now = Utc::now();
        let body = PageBody {
            title: "About".to_string(),
            template: "basic".to_string(),
            data: PageData::from([("title".to_string(), FieldValue::Text("About".to_string()))]),
            settings: StyleSettings::default(),
        };
        let stored = StoredDocument {
            id: "about".to_string(),
            body: body.into_map().unwrap(),
            created_at: now,
            updated_at: now,
        };
        let page = PageDocument::try_from(stored).unwrap();
        assert_eq!(page.id.as_str(), "about");
        assert_eq!(page.template, "basic");
        assert_eq!(page.created, page.updated);
    }

    #[test]
    fn stored_page_with_bad_slug_is_corrupt() {
        let now = Utc::now();
        let stored = StoredDocument {
            id: "Not A Slug".to_string(),
            body: Map::new(),
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(
            PageDocument::try_from(stored),
            Err(StoreError::Corrupt(_))
        ));
    }
}
