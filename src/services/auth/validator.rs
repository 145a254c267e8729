use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("credential backend unavailable: {0}")]
    Unavailable(String),
}

/// Pluggable credential backend (a directory service, a user store, ...).
///
/// The decision engine only ever sees the boolean verdict; an `Err` from an
/// unreachable backend is treated as a failed validation upstream, never as
/// a pass. Implementations may block on the network; this is the single
/// async boundary per request.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    async fn validate(&self, username: &str, password: &str) -> Result<bool, ValidatorError>;
}

/// In-memory backend over the user table from configuration.
#[derive(Debug, Clone, Default)]
pub struct FixedUserValidator {
    users: HashMap<String, String>,
}

impl FixedUserValidator {
    pub fn new(users: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            users: users.into_iter().collect(),
        }
    }
}

#[async_trait]
impl CredentialValidator for FixedUserValidator {
    async fn validate(&self, username: &str, password: &str) -> Result<bool, ValidatorError> {
        Ok(self
            .users
            .get(username)
            .is_some_and(|expected| constant_time_eq(expected, password)))
    }
}

// Constant-time comparison to prevent timing attacks
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
