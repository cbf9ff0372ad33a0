//! Bearer token issuance and verification for the c2 ingestion service.
//!
//! Tokens are HS256-signed JWTs carrying the registered `sub`, `iss`, `iat`
//! and `exp` claims. Verification is stateless: a token is accepted when its
//! signature verifies under the configured secret, it has not expired, and
//! its claims decode. There is no revocation list and no session store.
//!
//! # Usage
//!
//! ```rust,ignore
//! use c2_auth::{TokenManager, TokenSettings};
//!
//! let manager = TokenManager::new(TokenSettings::new("secret", "humanitarian-cps"));
//! let token = manager.issue("operator")?;
//! let claims = manager.verify(Some(&format!("Bearer {token}")))?;
//! assert_eq!(claims.sub, "operator");
//! ```

mod error;
mod token;

pub use error::AuthError;
pub use token::{Claims, TokenManager, TokenSettings, DEFAULT_TOKEN_TTL};
