//! CSRF token issue and verification.
//!
//! One token per session, valid until it expires. Storage of the token in
//! the session is the caller's job; this module only decides.

use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// 1 hour.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Session key the token is stored under.
pub const SESSION_KEY: &str = "csrf_token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfToken {
    pub token: String,
    /// Unix seconds after which the token is void.
    pub expires_at: i64,
}

impl CsrfToken {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrfCheck {
    Valid,
    Missing,
    Mismatch,
    /// The stored token expired; the caller must drop it from the session.
    Expired,
}

#[derive(Debug, Clone, Copy)]
pub struct CsrfGuard {
    ttl_secs: i64,
}

impl Default for CsrfGuard {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_TTL_SECS)
    }
}

impl CsrfGuard {
    pub fn new(ttl_secs: i64) -> Self {
        Self { ttl_secs }
    }

    /// Reuse the session's token while it is valid, otherwise mint a new one.
    pub fn issue(&self, existing: Option<CsrfToken>) -> CsrfToken {
        self.issue_at(existing, Utc::now().timestamp())
    }

    pub fn issue_at(&self, existing: Option<CsrfToken>, now: i64) -> CsrfToken {
        match existing {
            Some(token) if !token.is_expired(now) => token,
            _ => {
                let mut bytes = [0u8; 32];
                rand::rngs::OsRng.fill_bytes(&mut bytes);
                CsrfToken {
                    token: hex::encode(bytes),
                    expires_at: now + self.ttl_secs,
                }
            }
        }
    }

    pub fn verify(&self, stored: Option<&CsrfToken>, supplied: Option<&str>) -> CsrfCheck {
        self.verify_at(stored, supplied, Utc::now().timestamp())
    }

    /// Compare in constant time; expiry wins over a matching value.
    pub fn verify_at(&self, stored: Option<&CsrfToken>, supplied: Option<&str>, now: i64) -> CsrfCheck {
        let (Some(stored), Some(supplied)) = (stored, supplied.filter(|s| !s.is_empty())) else {
            return CsrfCheck::Missing;
        };
        if stored.is_expired(now) {
            return CsrfCheck::Expired;
        }
        if bool::from(stored.token.as_bytes().ct_eq(supplied.as_bytes())) {
            CsrfCheck::Valid
        } else {
            CsrfCheck::Mismatch
        }
    }
}

/// Pick the submitted token: header first, then body field, then query string.
pub fn select_supplied<'a>(
    header: Option<&'a str>,
    body: Option<&'a str>,
    query: Option<&'a str>,
) -> Option<&'a str> {
    [header, body, query]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|t| !t.is_empty())
}
