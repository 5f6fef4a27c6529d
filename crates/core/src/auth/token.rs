//! Signed bearer tokens (HS256 JWT).

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuthError, Role};

const ISSUER: &str = "brochure-cms";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
    /// Short-lived direct-upload permission.
    Upload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    /// Account e-mail.
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub kind: TokenKind,
}

#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub upload_ttl_secs: i64,
}

impl TokenSettings {
    fn ttl(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
            TokenKind::Upload => self.upload_ttl_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    settings: TokenSettings,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl_secs", &self.settings.access_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(settings: TokenSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            settings,
        }
    }

    pub fn upload_ttl_secs(&self) -> i64 {
        self.settings.upload_ttl_secs
    }

    /// Sign a token of `kind` issued at `issued_at` (unix seconds).
    pub fn issue_at(&self, subject: &str, role: &Role, kind: TokenKind, issued_at: i64) -> Result<String, AuthError> {
        let claims = Claims {
            iss: ISSUER.to_string(),
            sub: subject.to_string(),
            role: role.clone(),
            iat: issued_at,
            exp: issued_at + self.settings.ttl(kind),
            jti: Uuid::now_v7().to_string(),
            kind,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Crypto(format!("failed to sign token: {e}")))
    }

    pub fn issue(&self, subject: &str, role: &Role, kind: TokenKind) -> Result<String, AuthError> {
        self.issue_at(subject, role, kind, Utc::now().timestamp())
    }

    /// Access + refresh token for a freshly authenticated account.
    pub fn issue_pair(&self, subject: &str, role: &Role) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            token: self.issue(subject, role, TokenKind::Access)?,
            refresh_token: self.issue(subject, role, TokenKind::Refresh)?,
            expires_in: self.settings.access_ttl_secs,
        })
    }

    /// Check signature, issuer, expiry (no leeway) and token kind.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.validate_aud = false;
        validation.leeway = 0;

        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            })?
            .claims;

        if claims.kind != expected {
            return Err(AuthError::WrongTokenKind);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(TokenSettings {
            secret: "test-secret".to_string(),
            access_ttl_secs: 3600,
            refresh_ttl_secs: 86_400,
            upload_ttl_secs: 300,
        })
    }

    #[test]
    fn issued_token_verifies() {
        let tokens = service();
        let pair = tokens.issue_pair("admin@example.com", &Role::Admin).unwrap();
        assert_eq!(pair.expires_in, 3600);

        let claims = tokens.verify(&pair.token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, "admin@example.com");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service();
        let issued_at = Utc::now().timestamp() - 3601;
        let token = tokens
            .issue_at("admin@example.com", &Role::Admin, TokenKind::Access, issued_at)
            .unwrap();
        assert!(matches!(tokens.verify(&token, TokenKind::Access), Err(AuthError::Expired)));
    }

    #[test]
    fn token_kinds_are_not_interchangeable() {
        let tokens = service();
        let pair = tokens.issue_pair("admin@example.com", &Role::Admin).unwrap();
        assert!(matches!(
            tokens.verify(&pair.refresh_token, TokenKind::Access),
            Err(AuthError::WrongTokenKind)
        ));
        assert!(tokens.verify(&pair.refresh_token, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let other = TokenService::new(TokenSettings {
            secret: "another-secret".to_string(),
            ..service().settings
        });
        let token = other.issue("admin@example.com", &Role::Admin, TokenKind::Access).unwrap();
        assert!(matches!(service().verify(&token, TokenKind::Access), Err(AuthError::InvalidToken)));
        assert!(matches!(service().verify("garbage", TokenKind::Access), Err(AuthError::InvalidToken)));
    }
}
