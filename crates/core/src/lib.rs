//! Domain core of the brochure site CMS: document model, page templates,
//! draft/live content store, upload validation and the admin security
//! primitives.

pub mod auth;
pub mod contact;
pub mod content;
pub mod csrf;
pub mod document;
pub mod error;
pub mod pages;
pub mod rate_limit;
pub mod sanitize;
pub mod store;
pub mod template;
pub mod upload;

pub use error::{CmsError, CmsResult};
