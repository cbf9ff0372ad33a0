//! Token minting and `Authorization` header verification.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Default token lifetime (24 hours).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Registered JWT claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The identity the token asserts (e.g. a role name).
    pub sub: String,
    /// The configured issuer.
    pub iss: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// Signing configuration, fixed for the lifetime of a [`TokenManager`].
#[derive(Clone)]
pub struct TokenSettings {
    /// HMAC secret shared by issuance and verification.
    pub secret: String,
    /// Value written to the `iss` claim.
    pub issuer: String,
    /// Lifetime of issued tokens.
    pub ttl: Duration,
}

impl TokenSettings {
    pub fn new(secret: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            ttl: DEFAULT_TOKEN_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Mints and verifies HS256 bearer tokens.
///
/// Holds only immutable key material, so a single instance can be shared
/// across request handlers behind an `Arc`.
#[derive(Clone)]
pub struct TokenManager {
    issuer: String,
    ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    pub fn new(settings: TokenSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            issuer: settings.issuer,
            ttl: settings.ttl,
            validation,
        }
    }

    /// The issuer written into every token.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Issues a token for `subject`, valid from now for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if the signing operation fails.
    pub fn issue(&self, subject: &str) -> Result<String, AuthError> {
        self.issue_at(subject, Utc::now())
    }

    /// Issues a token for `subject` as if the current time were `now`.
    pub fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        let iat = now.timestamp();
        let ttl_secs = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            iat,
            exp: iat.saturating_add(ttl_secs),
        };

        let token =
            jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
                .map_err(AuthError::Signing)?;

        tracing::debug!(
            subject,
            issuer = %self.issuer,
            exp = claims.exp,
            "issued token"
        );

        Ok(token)
    }

    /// Verifies an `Authorization` header value of the form `Bearer <token>`.
    ///
    /// The scheme is matched case-insensitively and the value is split on the
    /// first space only, so anything after it is treated as the token.
    ///
    /// # Errors
    ///
    /// - `AuthError::MissingCredential` if the header is absent or empty.
    /// - `AuthError::MalformedCredential` if the scheme is missing or is not
    ///   `bearer`.
    /// - `AuthError::InvalidToken` if the token does not verify.
    pub fn verify(&self, header_value: Option<&str>) -> Result<Claims, AuthError> {
        let header_value = match header_value {
            Some(v) if !v.is_empty() => v,
            _ => return Err(AuthError::MissingCredential),
        };

        let (scheme, token) = header_value
            .split_once(' ')
            .ok_or(AuthError::MalformedCredential)?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(AuthError::MalformedCredential);
        }

        self.verify_token(token)
    }

    /// Verifies a bare token string and returns its claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(AuthError::InvalidToken)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    const SECRET: &str = "test-secret";
    const ISSUER: &str = "humanitarian-cps";

    fn manager() -> TokenManager {
        TokenManager::new(TokenSettings::new(SECRET, ISSUER))
    }

    #[test]
    fn issued_token_verifies_immediately() {
        let manager = manager();
        let token = manager.issue("operator").expect("issue should succeed");

        let claims = manager
            .verify(Some(&format!("Bearer {token}")))
            .expect("fresh token should verify");
        assert_eq!(claims.sub, "operator");
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.exp - claims.iat, DEFAULT_TOKEN_TTL.as_secs() as i64);
    }

    #[test]
    fn issue_at_sets_validity_window() {
        let manager = manager();
        assert_eq!(manager.issuer(), ISSUER);
        let now = Utc::now();
        let token = manager.issue_at("operator", now).unwrap();

        let claims = manager.verify_token(&token).unwrap();
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp, now.timestamp() + 24 * 60 * 60);
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let manager = manager();
        let token = manager.issue("operator").unwrap();

        for scheme in ["bearer", "BEARER", "BeArEr"] {
            let claims = manager
                .verify(Some(&format!("{scheme} {token}")))
                .expect("scheme should match case-insensitively");
            assert_eq!(claims.sub, "operator");
        }
    }

    #[test]
    fn missing_header_is_rejected() {
        let manager = manager();
        assert!(matches!(
            manager.verify(None),
            Err(AuthError::MissingCredential)
        ));
        assert!(matches!(
            manager.verify(Some("")),
            Err(AuthError::MissingCredential)
        ));
    }

    #[test]
    fn malformed_header_is_rejected() {
        let manager = manager();
        let token = manager.issue("operator").unwrap();

        assert!(matches!(
            manager.verify(Some(&token)),
            Err(AuthError::MalformedCredential)
        ));
        assert!(matches!(
            manager.verify(Some(&format!("Basic {token}"))),
            Err(AuthError::MalformedCredential)
        ));
        assert!(matches!(
            manager.verify(Some("Bearer")),
            Err(AuthError::MalformedCredential)
        ));
    }

    #[test]
    fn extra_parts_end_up_in_the_token_and_fail_verification() {
        let manager = manager();
        let token = manager.issue("operator").unwrap();

        assert!(matches!(
            manager.verify(Some(&format!("Bearer {token} extra"))),
            Err(AuthError::InvalidToken(_))
        ));
        assert!(matches!(
            manager.verify(Some("Bearer ")),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let manager = manager();
        let issued = Utc::now() - ChronoDuration::hours(25);
        let token = manager.issue_at("operator", issued).unwrap();

        let err = manager
            .verify(Some(&format!("Bearer {token}")))
            .expect_err("expired token should fail");
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let other = TokenManager::new(TokenSettings::new("other-secret", ISSUER));
        let token = other.issue("operator").unwrap();

        assert!(matches!(
            manager().verify(Some(&format!("Bearer {token}"))),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(matches!(
            manager().verify(Some("Bearer not.a.jwt")),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn custom_ttl_is_applied() {
        let manager = TokenManager::new(
            TokenSettings::new(SECRET, ISSUER).with_ttl(Duration::from_secs(60)),
        );
        let claims = manager
            .verify_token(&manager.issue("operator").unwrap())
            .unwrap();
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn settings_debug_redacts_secret() {
        let rendered = format!("{:?}", TokenSettings::new("super-secret", ISSUER));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
