//! services/api/src/token.rs
//!
//! HS256 access tokens. A token names the user, their role and the session it
//! was issued for; the session row decides whether it is still usable.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shop_core::domain::UserRole;
use uuid::Uuid;

use crate::config::JwtConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub user_role: String,
    pub session_id: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// `None` when the claim does not name a known role.
    pub fn role(&self) -> Option<UserRole> {
        self.user_role.parse().ok()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("token error: {0}")]
pub struct TokenError(#[from] jsonwebtoken::errors::Error);

#[derive(Clone)]
pub struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtCodec {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            ttl: Duration::hours(config.ttl_hours),
        }
    }

    /// Lifetime shared by tokens and the sessions they point at.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.ttl
    }

    pub fn issue(
        &self,
        user_id: Uuid,
        role: UserRole,
        session_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id,
            user_role: role.as_str().to_string(),
            session_id,
            iat: now.timestamp(),
            exp: self.expiry_from(now).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Checks signature and expiry. Accepts the token with or without a
    /// `Bearer ` prefix.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
        Ok(decode::<Claims>(token, &self.decoding, &self.validation)?.claims)
    }
}
