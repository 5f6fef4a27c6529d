use std::sync::Arc;

use brochure_core::auth::{AccountDirectory, TokenService};
use brochure_core::contact::ContactService;
use brochure_core::content::ContentService;
use brochure_core::csrf::CsrfGuard;
use brochure_core::pages::PageService;
use brochure_core::rate_limit::RateLimiter;
use brochure_core::store::ContentStore;
use brochure_core::template::TemplateRegistry;
use brochure_core::upload::{storage::AssetStorage, UploadService};

use crate::config::AppConfig;

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    config: AppConfig,
    store: Arc<dyn ContentStore>,
    templates: Arc<TemplateRegistry>,
    pages: PageService,
    content: ContentService,
    contact: ContactService,
    uploads: UploadService,
    tokens: TokenService,
    accounts: Arc<AccountDirectory>,
    csrf: CsrfGuard,
    limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn ContentStore>,
        assets: Arc<dyn AssetStorage>,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        let templates = Arc::new(TemplateRegistry::builtin());
        Self {
            inner: Arc::new(InnerState {
                pages: PageService::new(store.clone(), templates.clone()),
                content: ContentService::new(store.clone()),
                contact: ContactService::new(store.clone()),
                uploads: UploadService::new(config.upload_policy(), assets),
                tokens: TokenService::new(config.token_settings()),
                accounts: Arc::new(config.accounts()),
                csrf: CsrfGuard::new(config.csrf_token_ttl_secs),
                templates,
                store,
                limiter,
                config,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &dyn ContentStore {
        self.inner.store.as_ref()
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.inner.templates
    }

    pub fn pages(&self) -> &PageService {
        &self.inner.pages
    }

    pub fn content(&self) -> &ContentService {
        &self.inner.content
    }

    pub fn contact(&self) -> &ContactService {
        &self.inner.contact
    }

    pub fn uploads(&self) -> &UploadService {
        &self.inner.uploads
    }

    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    pub fn accounts(&self) -> Arc<AccountDirectory> {
        self.inner.accounts.clone()
    }

    pub fn csrf(&self) -> &CsrfGuard {
        &self.inner.csrf
    }

    pub fn limiter(&self) -> &dyn RateLimiter {
        self.inner.limiter.as_ref()
    }
}
