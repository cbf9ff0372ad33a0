//! Error types for token issuance and verification.

/// Errors produced by the [`TokenManager`](crate::TokenManager).
///
/// The `Display` output of the credential variants is meant for logs only;
/// callers answering HTTP requests should not echo it back.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header was supplied, or it was empty.
    #[error("missing Authorization header")]
    MissingCredential,

    /// The header is not of the form `Bearer <token>`.
    #[error("invalid Authorization header")]
    MalformedCredential,

    /// The token failed signature, expiry, or claim validation.
    #[error("invalid token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    /// Signing a new token failed.
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}
