use std::collections::HashMap;

use async_trait::async_trait;

use crate::auth::AuthError;

/// Directory-style authentication backend.
///
/// Implementations may suspend (network lookups); the broker never holds its
/// state lock while awaiting one.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn authenticate(&self, login: &str, passcode: &str) -> Result<(), AuthError>;
}

/// Fixed login → passcode table, loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    users: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CredentialStore for StaticCredentials {
    async fn authenticate(&self, login: &str, passcode: &str) -> Result<(), AuthError> {
        match self.users.get(login) {
            Some(expected) if expected == passcode => Ok(()),
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}
