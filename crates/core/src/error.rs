use thiserror::Error;

use crate::document::validate::ValidationErrors;
use crate::store::StoreError;

/// Errors from the page and content lifecycle services.
#[derive(Debug, Error)]
pub enum CmsError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub type CmsResult<T> = Result<T, CmsError>;
