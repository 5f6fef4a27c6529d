//! Site singletons (`main`, `wordCloud`, `global`) and the draft → live
//! publish workflow.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use similar::TextDiff;
use tracing::info;

use crate::document::id::{Collection, ContentKind, Partition};
use crate::document::model::{ContentDocument, GlobalSettings, StoredDocument};
use crate::document::validate::{self, ValidationErrors};
use crate::error::{CmsError, CmsResult};
use crate::sanitize;
use crate::store::{ContentStore, StoreError};

const MAX_KEY_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// A document whose draft differs from its live copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingChange {
    pub collection: Collection,
    pub id: String,
    pub change: ChangeKind,
    pub diff: String,
}

#[derive(Clone)]
pub struct ContentService {
    store: Arc<dyn ContentStore>,
}

impl ContentService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, kind: ContentKind, partition: Partition) -> CmsResult<ContentDocument> {
        let stored = self
            .store
            .read(partition, Collection::Content, kind.doc_id())
            .await?
            .ok_or_else(|| CmsError::NotFound(format!("content '{}'", kind.doc_id())))?;
        Ok(ContentDocument::from_stored(kind, stored))
    }

    async fn draft_body(&self, kind: ContentKind) -> CmsResult<Map<String, Value>> {
        Ok(self
            .store
            .read(Partition::Draft, Collection::Content, kind.doc_id())
            .await?
            .map(|doc| doc.body)
            .unwrap_or_default())
    }

    /// Apply a patch to the draft copy of a singleton.
    ///
    /// `main` merges key by key, `wordCloud` replaces its entry list and
    /// `global` merges individual settings.
    pub async fn update(&self, kind: ContentKind, patch: Map<String, Value>) -> CmsResult<ContentDocument> {
        let body = match kind {
            ContentKind::Main => {
                let mut body = self.draft_body(kind).await?;
                body.extend(parse_main_patch(patch)?);
                body
            }
            ContentKind::WordCloud => {
                let mut patch = patch;
                let entries = patch
                    .remove("entries")
                    .ok_or_else(|| ValidationErrors::single("entries", "is required"))?;
                if let Some(extra) = patch.keys().next() {
                    return Err(ValidationErrors::single(extra.clone(), "is not a word-cloud field").into());
                }
                let entries = validate::parse_word_cloud(entries)?;
                let mut body = Map::new();
                body.insert("entries".to_string(), to_value(entries)?);
                body
            }
            ContentKind::Global => {
                let current = self.draft_body(kind).await?;
                let mut settings: GlobalSettings = serde_json::from_value(Value::Object(current))
                    .map_err(|e| StoreError::Corrupt(format!("global settings: {e}")))?;
                settings.merge(validate::parse_global_settings(patch)?);
                match to_value(settings)? {
                    Value::Object(map) => map,
                    _ => Map::new(),
                }
            }
        };

        let stored = self
            .store
            .write(Partition::Draft, Collection::Content, kind.doc_id(), body)
            .await?;
        info!(content = kind.doc_id(), "draft content updated");
        Ok(ContentDocument::from_stored(kind, stored))
    }

    /// Promote the whole draft partition (singletons and pages) to live.
    pub async fn publish(&self) -> CmsResult<DateTime<Utc>> {
        let published_at = self.store.publish(&Collection::PUBLISHED).await?;
        info!(%published_at, "draft content published");
        Ok(published_at)
    }

    /// Documents that a publish would add, change or remove on the live site.
    pub async fn pending_changes(&self) -> CmsResult<Vec<PendingChange>> {
        let mut changes = Vec::new();
        for collection in Collection::PUBLISHED {
            let draft = by_id(self.store.list(Partition::Draft, collection).await?);
            let live = by_id(self.store.list(Partition::Live, collection).await?);

            for (id, draft_doc) in &draft {
                match live.get(id) {
                    None => changes.push(change(collection, id, ChangeKind::Added, None, Some(draft_doc))),
                    Some(live_doc) if live_doc.body != draft_doc.body => changes.push(change(
                        collection,
                        id,
                        ChangeKind::Modified,
                        Some(live_doc),
                        Some(draft_doc),
                    )),
                    Some(_) => {}
                }
            }
            for (id, live_doc) in &live {
                if !draft.contains_key(id) {
                    changes.push(change(collection, id, ChangeKind::Removed, Some(live_doc), None));
                }
            }
        }
        Ok(changes)
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn by_id(docs: Vec<StoredDocument>) -> BTreeMap<String, StoredDocument> {
    docs.into_iter().map(|d| (d.id.clone(), d)).collect()
}

fn pretty(doc: Option<&StoredDocument>) -> String {
    doc.and_then(|d| serde_json::to_string_pretty(&d.body).ok())
        .map(|s| s + "\n")
        .unwrap_or_default()
}

fn change(
    collection: Collection,
    id: &str,
    kind: ChangeKind,
    live: Option<&StoredDocument>,
    draft: Option<&StoredDocument>,
) -> PendingChange {
    let old = pretty(live);
    let new = pretty(draft);
    let diff = TextDiff::from_lines(&old, &new)
        .unified_diff()
        .header("live", "draft")
        .to_string();
    PendingChange {
        collection,
        id: id.to_string(),
        change: kind,
        diff,
    }
}

/// `main` holds free-form content blocks: rich text strings or lists.
fn parse_main_patch(patch: Map<String, Value>) -> Result<Map<String, Value>, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let mut cleaned = Map::new();
    for (key, value) in patch {
        let valid_key = !key.is_empty()
            && key.len() <= MAX_KEY_LEN
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_key {
            errors.push(key, "is not a valid content key");
            continue;
        }
        match value {
            Value::String(s) => {
                cleaned.insert(key, Value::String(sanitize::clean_rich_text(&s)));
            }
            Value::Array(items) => {
                cleaned.insert(key, sanitize::clean_json(Value::Array(items)));
            }
            _ => errors.push(key, "must be a string or a list"),
        }
    }
    errors.into_result().map(|()| cleaned)
}
