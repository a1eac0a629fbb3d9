// JWT token generation and validation service

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::models::Role;

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // account id
    pub email: String,
    pub role: Role,
    pub iat: i64, // issued at timestamp
    pub exp: i64, // expiration timestamp
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Bad signature, malformed structure, or expired
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Token service for signing and verifying bearer tokens
///
/// There is no revocation: a token stays valid until its expiry regardless of
/// later changes to the account it names.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    ttl: Duration,
}

impl TokenService {
    /// Create a new TokenService with a signing secret and token lifetime
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    /// Token lifetime in whole seconds
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Issue a signed token for the given identity, expiring at now + ttl
    pub fn issue(&self, account_id: &str, email: &str, role: Role) -> Result<String, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::Signing("signing secret is empty".to_string()));
        }

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: account_id.to_string(),
            email: email.to_string(),
            role,
            iat: now,
            exp: now + self.ttl.num_seconds(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a token and return its claims
    ///
    /// A token is rejected once the current time reaches its expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            debug!("Token rejected: {}", e);
            TokenError::InvalidToken
        })?;

        if Utc::now().timestamp() >= claims.exp {
            debug!("Token rejected: expired at {}", claims.exp);
            return Err(TokenError::InvalidToken);
        }

        Ok(claims)
    }
}
