//! Administrator authentication: password login, bearer tokens and the
//! admin gate.

pub mod password;
pub mod token;

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub use token::{Claims, TokenKind, TokenPair, TokenService, TokenSettings};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    Expired,

    #[error("wrong token type")]
    WrongTokenKind,

    #[error("administrator role required")]
    Forbidden,

    #[error("crypto failure: {0}")]
    Crypto(String),
}

/// Hash checked when the e-mail is unknown, so both login failures cost one
/// argon2 verification.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| password::hash_password("unknown-account").unwrap_or_default());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    /// Signs in and holds valid tokens, but is refused by the admin gate, so
    /// every mutating endpoint answers 403.
    Editor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
        }
    }
}

/// The caller of an admin-only operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    pub email: String,
}

impl AdminIdentity {
    pub fn from_claims(claims: &Claims) -> Result<Self, AuthError> {
        if claims.role != Role::Admin {
            return Err(AuthError::Forbidden);
        }
        Ok(Self {
            email: claims.sub.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    pub email: String,
    /// argon2 PHC string.
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    pub email: String,
    pub role: Role,
}

/// The accounts allowed to sign in.
#[derive(Debug, Clone, Default)]
pub struct AccountDirectory {
    accounts: Vec<Account>,
}

impl AccountDirectory {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Verify an e-mail/password pair. E-mail matching ignores case.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<AccountInfo, AuthError> {
        let email = email.trim();
        let Some(account) = self
            .accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
        else {
            let _ = password::verify_password(password, &DUMMY_HASH);
            warn!(email, "login for unknown account");
            return Err(AuthError::InvalidCredentials);
        };

        if !password::verify_password(password, &account.password_hash)? {
            warn!(email, "login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        info!(email = %account.email, role = account.role.as_str(), "login succeeded");
        Ok(AccountInfo {
            email: account.email.clone(),
            role: account.role.clone(),
        })
    }

    /// Look up an account still present in the directory (for token refresh).
    pub fn find(&self, email: &str) -> Option<AccountInfo> {
        self.accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .map(|a| AccountInfo {
                email: a.email.clone(),
                role: a.role.clone(),
            })
    }
}
