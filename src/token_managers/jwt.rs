use crate::core::{
    error::{Error, Result},
    token_manager::TokenManager,
};
use chrono::{Duration, Utc};
use jwt::{
    algorithm::{SigningAlgorithm, VerifyingAlgorithm},
    SignWithKey, VerifyWithKey,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct JWTTokenManager<K>
where
    K: SigningAlgorithm + VerifyingAlgorithm + Clone,
{
    key: K,
    ttl: Duration,
}

impl<K> JWTTokenManager<K>
where
    K: SigningAlgorithm + VerifyingAlgorithm + Clone,
{
    pub(crate) fn new(key: K) -> Self {
        Self {
            key,
            ttl: Duration::days(7),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl<K> TokenManager for JWTTokenManager<K>
where
    K: SigningAlgorithm + VerifyingAlgorithm + Clone,
{
    async fn generate_token(&self, id: &str) -> Result<String> {
        let now = Utc::now();
        Claims {
            sub: id.to_owned(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        }
        .sign_with_key(&self.key)
        .map_err(|e| {
            Error::wrap("failed to sign token".into(), 500, e.to_string())
        })
    }

    async fn verify_token(&self, token: &str) -> Result<String> {
        let claims: Claims = token.verify_with_key(&self.key).map_err(|e| {
            Error::wrap("invalid auth token".into(), 401, e.to_string())
        })?;
        if claims.exp < Utc::now().timestamp() {
            return Err(Error::unauthorized("auth token expired"));
        }
        Ok(claims.sub)
    }
}
