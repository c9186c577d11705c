//! HS256 JSON Web Tokens implementing `TokenIssuer`.

use chrono::{Duration, Utc};
use domains::{DomainError, DomainResult, TokenIssuer, UserId};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const INVALID_TOKEN: &str = "Invalid token.";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id, as a string per RFC 7519.
    sub: String,
    username: String,
    iat: i64,
    exp: i64,
}

pub struct JwtTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtTokens {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::default(),
            ttl,
        }
    }
}

impl TokenIssuer for JwtTokens {
    fn issue(&self, user_id: UserId, username: &str) -> DomainResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(DomainError::internal)
    }

    fn verify(&self, token: &str) -> DomainResult<UserId> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|err| {
            debug!(%err, "token rejected");
            DomainError::Unauthorized(INVALID_TOKEN.into())
        })?;
        data.claims
            .sub
            .parse()
            .map_err(|_| DomainError::Unauthorized(INVALID_TOKEN.into()))
    }
}
