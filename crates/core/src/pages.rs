//! Page lifecycle: create, read, list, update and delete page documents.
//!
//! All writes go to the draft partition and are validated against the page's
//! template. Pages reach the live partition only through a publish.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::document::id::{Collection, PageId, Partition};
use crate::document::model::{PageBody, PageDocument, StyleSettings};
use crate::document::validate::{self, ValidationErrors};
use crate::error::{CmsError, CmsResult};
use crate::store::ContentStore;
use crate::template::{Template, TemplateRegistry};

/// Request to create a page.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPage {
    pub id: String,
    pub title: String,
    pub template: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub settings: Option<Value>,
}

/// Partial update of a page. `data` is merged key by key into the stored data.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PagePatch {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub settings: Option<Value>,
}

#[derive(Clone)]
pub struct PageService {
    store: Arc<dyn ContentStore>,
    templates: Arc<TemplateRegistry>,
}

impl PageService {
    pub fn new(store: Arc<dyn ContentStore>, templates: Arc<TemplateRegistry>) -> Self {
        Self { store, templates }
    }

    fn template(&self, id: &str) -> Result<&Template, ValidationErrors> {
        self.templates
            .get(id)
            .ok_or_else(|| ValidationErrors::single("template", format!("unknown template '{id}'")))
    }

    pub async fn create(&self, new: NewPage) -> CmsResult<PageDocument> {
        let mut errors = ValidationErrors::default();
        let id = validate::validate_page_id(new.id.trim())
            .map_err(|e| errors.errors.extend(e.errors))
            .ok();
        let title = validate::clean_title(&new.title)
            .map_err(|e| errors.errors.extend(e.errors))
            .ok();
        let template = self
            .template(new.template.trim())
            .map_err(|e| errors.errors.extend(e.errors))
            .ok();

        let (Some(id), Some(title), Some(template)) = (id, title, template) else {
            return Err(errors.into());
        };

        let data = validate::parse_page_data(template, new.data)?;
        validate::check_required(template, &data)?;
        let settings = match new.settings {
            Some(value) => validate::parse_style_settings(value)?,
            None => StyleSettings::default(),
        };

        let body = PageBody {
            title,
            template: template.id.to_string(),
            data,
            settings,
        };
        let stored = self
            .store
            .insert(Partition::Draft, Collection::Pages, id.as_str(), body.into_map()?)
            .await?
            .ok_or_else(|| ValidationErrors::single("id", format!("page '{id}' already exists")))?;

        info!(page = %id, template = template.id, "page created");
        Ok(PageDocument::try_from(stored)?)
    }

    pub async fn get(&self, id: &str, partition: Partition) -> CmsResult<PageDocument> {
        let not_found = || CmsError::NotFound(format!("page '{id}'"));
        let id = PageId::parse(id).map_err(|_| not_found())?;
        let stored = self
            .store
            .read(partition, Collection::Pages, id.as_str())
            .await?
            .ok_or_else(not_found)?;
        Ok(PageDocument::try_from(stored)?)
    }

    /// All pages of a partition, most recently edited first.
    pub async fn list(&self, partition: Partition) -> CmsResult<Vec<PageDocument>> {
        let mut pages = self
            .store
            .list(partition, Collection::Pages)
            .await?
            .into_iter()
            .map(PageDocument::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        pages.sort_by(|a, b| b.updated.cmp(&a.updated).then_with(|| a.id.as_str().cmp(b.id.as_str())));
        Ok(pages)
    }

    pub async fn update(&self, id: &str, patch: PagePatch) -> CmsResult<PageDocument> {
        let current = self.get(id, Partition::Draft).await?;
        let template = self.template(&current.template)?;

        let mut errors = ValidationErrors::default();
        if patch.id.as_deref().is_some_and(|new_id| new_id != current.id.as_str()) {
            errors.push("id", "cannot be changed");
        }
        if patch.template.as_deref().is_some_and(|t| t != current.template) {
            errors.push("template", "cannot be changed");
        }
        errors.into_result()?;

        let title = match patch.title {
            Some(raw) => validate::clean_title(&raw)?,
            None => current.title,
        };

        let mut data = current.data;
        if let Some(raw) = patch.data {
            data.extend(validate::parse_page_data(template, raw)?);
        }
        validate::check_required(template, &data)?;

        let mut settings = current.settings;
        if let Some(value) = patch.settings {
            settings.merge(validate::parse_style_settings(value)?);
        }

        let body = PageBody {
            title,
            template: current.template,
            data,
            settings,
        };
        let stored = self
            .store
            .write(Partition::Draft, Collection::Pages, current.id.as_str(), body.into_map()?)
            .await?;

        info!(page = %current.id, "page updated");
        Ok(PageDocument::try_from(stored)?)
    }

    /// Remove a draft page. Succeeds whether or not the page existed, so a
    /// client may safely retry; the live copy disappears on the next publish.
    pub async fn delete(&self, id: &str) -> CmsResult<()> {
        let existed = self.store.delete(Partition::Draft, Collection::Pages, id).await?;
        if existed {
            info!(page = %id, "page deleted");
        } else {
            debug!(page = %id, "delete of missing page ignored");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::FieldValue;
    use crate::store::MemoryContentStore;
    use serde_json::json;

    fn service() -> PageService {
        PageService::new(
            Arc::new(MemoryContentStore::new()),
            Arc::new(TemplateRegistry::builtin()),
        )
    }

    fn new_page(id: &str, template: &str, data: Value) -> NewPage {
        serde_json::from_value(json!({
            "id": id,
            "title": "Title",
            "template": template,
            "data": data,
        }))
        .unwrap()
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[tokio::test]
    async fn create_then_get_has_equal_timestamps() {
        let pages = service();
        let created = pages
            .create(new_page("about", "basic", json!({"title": "About", "content": "<p>Hi</p>"})))
            .await
            .unwrap();
        let fetched = pages.get("about", Partition::Draft).await.unwrap();
        assert_eq!(created, fetched);
        assert_eq!(fetched.created, fetched.updated);
    }

    #[tokio::test]
    async fn create_missing_required_field_persists_nothing() {
        let pages = service();
        let err = pages
            .create(new_page("about", "basic", json!({"title": "About"})))
            .await
            .unwrap_err();
        match err {
            CmsError::Validation(errors) => assert!(errors.has_field("data.content")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(matches!(
            pages.get("about", Partition::Draft).await,
            Err(CmsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn create_rejects_bad_id_unknown_template_and_duplicates() {
        let pages = service();
        let err = pages
            .create(new_page("Bad Id", "wiki", json!({})))
            .await
            .unwrap_err();
        match err {
            CmsError::Validation(errors) => {
                assert!(errors.has_field("id"));
                assert!(errors.has_field("template"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        let page = new_page("kontakt", "contact", json!({"title": "Kontakt"}));
        pages.create(page.clone()).await.unwrap();
        let err = pages.create(page).await.unwrap_err();
        assert!(matches!(err, CmsError::Validation(ref e) if e.has_field("id")));
    }

    #[tokio::test]
    async fn update_merges_data_shallowly() {
        let pages = service();
        pages
            .create(new_page(
                "news",
                "blog",
                json!({"title": "A", "content": "x", "author": "y"}),
            ))
            .await
            .unwrap();

        let patch = PagePatch {
            data: Some(serde_json::from_value(json!({"content": "z"})).unwrap()),
            ..PagePatch::default()
        };
        let updated = pages.update("news", patch).await.unwrap();
        assert_eq!(updated.data["content"], text("z"));
        assert_eq!(updated.data["author"], text("y"));
        assert_eq!(updated.data["title"], text("A"));
        assert!(updated.updated >= updated.created);
    }

    #[tokio::test]
    async fn update_revalidates_required_fields() {
        let pages = service();
        pages
            .create(new_page("about", "basic", json!({"title": "About", "content": "x"})))
            .await
            .unwrap();
        let patch = PagePatch {
            data: Some(serde_json::from_value(json!({"content": " "})).unwrap()),
            ..PagePatch::default()
        };
        let err = pages.update("about", patch).await.unwrap_err();
        assert!(matches!(err, CmsError::Validation(ref e) if e.has_field("data.content")));

        let unchanged = pages.get("about", Partition::Draft).await.unwrap();
        assert_eq!(unchanged.data["content"], text("x"));
    }

    #[tokio::test]
    async fn update_cannot_switch_template() {
        let pages = service();
        pages
            .create(new_page("about", "basic", json!({"title": "About", "content": "x"})))
            .await
            .unwrap();
        let patch = PagePatch {
            template: Some("gallery".to_string()),
            ..PagePatch::default()
        };
        let err = pages.update("about", patch).await.unwrap_err();
        assert!(matches!(err, CmsError::Validation(ref e) if e.has_field("template")));
    }

    #[tokio::test]
    async fn update_missing_page_is_not_found() {
        let pages = service();
        let err = pages.update("ghost", PagePatch::default()).await.unwrap_err();
        assert!(matches!(err, CmsError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_orders_by_most_recent_edit() {
        let pages = service();
        for id in ["one", "two", "three"] {
            pages
                .create(new_page(id, "contact", json!({"title": id})))
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        let patch = PagePatch {
            title: Some("First again".to_string()),
            ..PagePatch::default()
        };
        pages.update("one", patch).await.unwrap();

        let ids: Vec<String> = pages
            .list(Partition::Draft)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id.to_string())
            .collect();
        assert_eq!(ids, ["one", "three", "two"]);
    }

    #[tokio::test]
    async fn publish_keeps_edit_order_in_live_list() {
        let store = Arc::new(MemoryContentStore::new());
        let pages = PageService::new(store.clone(), Arc::new(TemplateRegistry::builtin()));
        for id in ["alpha", "zeta"] {
            pages
                .create(new_page(id, "contact", json!({"title": id})))
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        store.publish(&Collection::PUBLISHED).await.unwrap();

        let ids = |list: Vec<PageDocument>| list.into_iter().map(|p| p.id.to_string()).collect::<Vec<_>>();
        let draft = pages.list(Partition::Draft).await.unwrap();
        let live = pages.list(Partition::Live).await.unwrap();
        assert_eq!(ids(draft.clone()), ["zeta", "alpha"]);
        assert_eq!(ids(live.clone()), ["zeta", "alpha"]);
        assert_eq!(
            draft.iter().map(|p| p.updated).collect::<Vec<_>>(),
            live.iter().map(|p| p.updated).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let pages = service();
        pages
            .create(new_page("kontakt", "contact", json!({"title": "Kontakt", "introduction": "Hi"})))
            .await
            .unwrap();
        pages.delete("kontakt").await.unwrap();
        pages.delete("kontakt").await.unwrap();
        assert!(matches!(
            pages.get("kontakt", Partition::Draft).await,
            Err(CmsError::NotFound(_))
        ));
    }
}
