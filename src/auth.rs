//! Bearer API-key authentication
//!
//! Tokens are never held in memory or config; only their SHA-256 digests are.

use crate::config::ApiKeyConfig;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Unknown API key")]
    UnknownToken,

    /// Authenticated principal acting for a different user
    #[error("User {principal} may not act for {requested}")]
    Forbidden { principal: String, requested: String },
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
}

impl Principal {
    /// Require the body's `userId` to be the caller
    pub fn authorize(&self, user_id: &str) -> Result<(), AuthError> {
        if self.user_id == user_id {
            Ok(())
        } else {
            Err(AuthError::Forbidden {
                principal: self.user_id.clone(),
                requested: user_id.to_string(),
            })
        }
    }
}

/// Hex SHA-256 of a bearer token, as stored in config
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[derive(Debug, Clone, Default)]
pub struct ApiKeyAuthenticator {
    by_digest: HashMap<String, String>,
}

impl ApiKeyAuthenticator {
    pub fn new(keys: &[ApiKeyConfig]) -> Self {
        Self {
            by_digest: keys
                .iter()
                .map(|k| (k.token_sha256.to_ascii_lowercase(), k.user_id.clone()))
                .collect(),
        }
    }

    /// Resolve an `Authorization` header value to its principal
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<Principal, AuthError> {
        let token = authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        self.by_digest
            .get(&token_digest(token))
            .map(|user_id| Principal {
                user_id: user_id.clone(),
            })
            .ok_or(AuthError::UnknownToken)
    }
}
