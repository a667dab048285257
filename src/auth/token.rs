use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::Principal;

/// Access-token claims, shaped like the hosted auth service's JWTs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

impl AccessClaims {
    pub fn new(principal: &Principal, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: principal.id.clone(),
            email: principal.email.clone(),
            role: principal.role.clone(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("JWT generation error: {0}")]
    Generation(String),
    #[error("Invalid JWT token: {0}")]
    Invalid(String),
    #[error("Invalid JWT secret")]
    InvalidSecret,
}

pub fn mint(secret: &str, claims: &AccessClaims) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| TokenError::Generation(e.to_string()))
}

/// Checks signature and expiry
pub fn verify(secret: &str, token: &str) -> Result<AccessClaims, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    decode::<AccessClaims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| TokenError::Invalid(e.to_string()))
}

/// Reads claims without verifying the signature. Only for tokens the auth
/// service just handed us, to learn their expiry.
pub fn peek(token: &str) -> Result<AccessClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| TokenError::Invalid(e.to_string()))
}
