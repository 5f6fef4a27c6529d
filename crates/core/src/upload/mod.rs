//! Upload validation pipeline: sniff the real type, check the size, scan
//! SVGs, then store under a generated name.

pub mod sniff;
pub mod storage;
pub mod svg;

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use storage::{AssetStorage, LocalAssetStorage};

/// 5 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

const IMAGE_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", sniff::SVG_MIME];
const PDF_MIME: &str = "application/pdf";
const MAX_STEM_LEN: usize = 100;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("empty upload")]
    Empty,

    #[error("file type not allowed: {0}")]
    UnsupportedType(String),

    #[error("file too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("declared size {declared} does not match received {actual} bytes")]
    SizeMismatch { declared: u64, actual: usize },

    #[error("unsafe SVG content: {0}")]
    UnsafeSvgContent(String),

    #[error("storage failed: {0}")]
    Storage(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    pub allow_pdf: bool,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allow_pdf: false,
        }
    }
}

impl UploadPolicy {
    pub fn allows(&self, mime: &str) -> bool {
        IMAGE_MIME_TYPES.contains(&mime) || (self.allow_pdf && mime == PDF_MIME)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedAsset {
    pub filename: String,
    pub mime_type: String,
    #[serde(rename = "size")]
    pub size_bytes: usize,
    pub url: String,
}

#[derive(Clone)]
pub struct UploadService {
    policy: UploadPolicy,
    storage: Arc<dyn AssetStorage>,
}

impl UploadService {
    pub fn new(policy: UploadPolicy, storage: Arc<dyn AssetStorage>) -> Self {
        Self { policy, storage }
    }

    /// Decide whether `data` may be stored. Returns the detected MIME type.
    pub fn validate(
        &self,
        data: &[u8],
        declared_mime: Option<&str>,
        declared_size: Option<u64>,
    ) -> Result<&'static str, UploadError> {
        if data.is_empty() {
            return Err(UploadError::Empty);
        }

        let mime = sniff::sniff_mime(data)
            .filter(|mime| self.policy.allows(mime))
            .ok_or_else(|| {
                let detected = sniff::sniff_mime(data).unwrap_or("application/octet-stream");
                UploadError::UnsupportedType(detected.to_string())
            })?;
        if let Some(declared) = declared_mime.filter(|d| !d.eq_ignore_ascii_case(mime)) {
            debug!(declared, detected = mime, "declared content type ignored");
        }

        if let Some(declared) = declared_size {
            if usize::try_from(declared).ok() != Some(data.len()) {
                return Err(UploadError::SizeMismatch {
                    declared,
                    actual: data.len(),
                });
            }
        }
        if data.len() > self.policy.max_bytes {
            return Err(UploadError::TooLarge {
                size: data.len(),
                max: self.policy.max_bytes,
            });
        }

        if mime == sniff::SVG_MIME {
            let text = String::from_utf8_lossy(data);
            if let Some(reason) = svg::find_unsafe_content(&text) {
                return Err(UploadError::UnsafeSvgContent(reason));
            }
        }

        Ok(mime)
    }

    /// Validate and store an upload.
    pub async fn upload(
        &self,
        original_name: &str,
        declared_mime: Option<&str>,
        declared_size: Option<u64>,
        data: &[u8],
    ) -> Result<UploadedAsset, UploadError> {
        let mime = match self.validate(data, declared_mime, declared_size) {
            Ok(mime) => mime,
            Err(err) => {
                warn!(filename = %original_name, error = %err, "upload rejected");
                return Err(err);
            }
        };

        let filename = generate_filename(original_name, mime);
        let url = self.storage.put(&filename, data).await?;

        info!(
            filename = %filename,
            mime_type = mime,
            size = data.len(),
            scheme = self.storage.scheme(),
            "upload stored"
        );
        Ok(UploadedAsset {
            filename,
            mime_type: mime.to_string(),
            size_bytes: data.len(),
            url,
        })
    }
}

/// `{unix-timestamp}_{4 random digits}_{sanitized stem}.{ext}`
pub fn generate_filename(original_name: &str, mime: &str) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(1000..=9999);
    format_filename(Utc::now().timestamp(), suffix, original_name, mime)
}

fn format_filename(timestamp: i64, suffix: u16, original_name: &str, mime: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);
    let (stem, ext) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext.to_ascii_lowercase())),
        _ => (base, None),
    };

    let mut safe: String = stem
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' | '_' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '_',
        })
        .take(MAX_STEM_LEN)
        .collect();
    safe = safe.trim_matches('_').to_string();
    if safe.is_empty() {
        safe = "file".to_string();
    }

    let allowed = sniff::extensions_for(mime).unwrap_or(&["bin"]);
    let ext = ext
        .filter(|e| allowed.contains(&e.as_str()))
        .unwrap_or_else(|| allowed[0].to_string());

    format!("{timestamp}_{suffix}_{safe}.{ext}")
}
