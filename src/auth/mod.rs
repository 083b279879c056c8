//! The `auth` module provides the authentication capability consulted on
//! `CONNECT`.
//!
//! Two kinds of backend are supported:
//! - `ephemeral`: stateless HMAC-SHA1 tokens with an embedded expiry.
//! - `static` (or any other [`CredentialStore`]): an asynchronous
//!   login/passcode lookup, the seam for directory services.
//!
//! When no authenticator is configured every `CONNECT` succeeds.

pub mod credentials;
pub mod ephemeral;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{AuthMode, AuthSettings};

pub use credentials::{CredentialStore, StaticCredentials};
pub use ephemeral::EphemeralTokenVerifier;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("incorrect login or passcode")]
    InvalidCredentials,

    #[error("login token has expired")]
    Expired,

    #[error("login must have the form <expiry>:<id>")]
    MalformedLogin,

    #[error("login is required")]
    MissingLogin,

    #[error("passcode is required")]
    MissingPasscode,

    #[error("ephemeral authentication requires auth.secret")]
    MissingSecret,
}

#[derive(Clone)]
pub enum Authenticator {
    Ephemeral(EphemeralTokenVerifier),
    Directory(Arc<dyn CredentialStore>),
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authenticator::Ephemeral(v) => f.debug_tuple("Ephemeral").field(v).finish(),
            Authenticator::Directory(_) => f.write_str("Directory"),
        }
    }
}

impl Authenticator {
    /// Build the authenticator selected by configuration, `None` for `mode = "none"`.
    pub fn from_settings(settings: &AuthSettings) -> Result<Option<Self>, AuthError> {
        let authenticator = match settings.mode {
            AuthMode::None => None,
            AuthMode::Ephemeral => {
                let secret = settings
                    .secret
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .ok_or(AuthError::MissingSecret)?;
                Some(Authenticator::Ephemeral(EphemeralTokenVerifier::new(secret)))
            }
            AuthMode::Static => Some(Authenticator::Directory(Arc::new(StaticCredentials::new(
                settings.users.clone(),
            )))),
        };
        Ok(authenticator)
    }

    pub async fn authenticate(&self, login: &str, passcode: &str) -> Result<(), AuthError> {
        match self {
            Authenticator::Ephemeral(verifier) => verifier.verify(login, passcode),
            Authenticator::Directory(store) => store.authenticate(login, passcode).await,
        }
    }
}
