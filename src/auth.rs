use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::db::User;

/// Bearer token claims. `sub` carries the user id; possession of a
/// token with a valid signature and unexpired `exp` is the sole
/// authorization proof (no server-side revocation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub username: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn new(user: &User, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user.id,
            username: user.username.clone(),
            role: user.role.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

/// Signs and verifies HS256 bearer tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &[u8], ttl_hours: i64) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Issue a token for a freshly authenticated user.
    pub fn issue(&self, user: &User) -> Result<String> {
        self.sign(&Claims::new(user, self.ttl))
    }

    pub fn sign(&self, claims: &Claims) -> Result<String> {
        let token = encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to sign token: {e}"))?;
        Ok(token)
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| anyhow::anyhow!("Invalid or expired token: {e}"))?;
        Ok(data.claims)
    }
}
