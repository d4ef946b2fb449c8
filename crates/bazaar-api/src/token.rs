use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use bazaar_types::api::Claims;

use crate::config::AuthConfig;
use crate::error::{ApiError, ApiResult};

/// Signs and verifies session tokens with the configured secret and algorithm.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    header: Header,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(config.algorithm);
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            header: Header::new(config.algorithm),
            validation,
            ttl: config.token_ttl,
        }
    }

    /// Mint a token for this identity, valid for the configured TTL.
    pub fn issue(&self, username: &str, email: &str) -> ApiResult<String> {
        let now = Utc::now();
        let claims = Claims {
            username: username.to_string(),
            email: email.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + self.ttl).timestamp() as usize,
        };
        self.encode(&claims)
    }

    pub fn encode(&self, claims: &Claims) -> ApiResult<String> {
        encode(&self.header, claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token encoding failed: {e}")))
    }

    /// Verify signature, algorithm and expiry. Any failure is `InvalidToken`.
    pub fn decode(&self, token: &str) -> ApiResult<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Rejected token: {}", e);
                ApiError::InvalidToken
            })
    }
}
