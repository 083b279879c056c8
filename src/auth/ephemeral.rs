//! Ephemeral token verification
//!
//! A token is a `(login, passcode)` pair where `login` is
//! `"<unix-epoch-seconds>:<opaque-id>"` and `passcode` is the base64 encoded
//! HMAC-SHA1 of `login` under a secret shared with whoever issues tokens.
//! Verification is a pure function of the secret, the pair and the clock, so
//! no state is kept: a token stays valid (and replayable) until its embedded
//! expiry passes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::auth::AuthError;

type HmacSha1 = Hmac<Sha1>;

#[derive(Clone)]
pub struct EphemeralTokenVerifier {
    secret: String,
}

impl std::fmt::Debug for EphemeralTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralTokenVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl EphemeralTokenVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self, login: &str) -> HmacSha1 {
        let mut mac = HmacSha1::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(login.as_bytes());
        mac
    }

    /// Mint a token for `id` that expires at `expires_at`.
    pub fn issue(&self, id: &str, expires_at: DateTime<Utc>) -> (String, String) {
        let login = format!("{}:{}", expires_at.timestamp(), id);
        let passcode = STANDARD.encode(self.mac(&login).finalize().into_bytes());
        (login, passcode)
    }

    pub fn verify(&self, login: &str, passcode: &str) -> Result<(), AuthError> {
        self.verify_at(login, passcode, Utc::now())
    }

    pub fn verify_at(&self, login: &str, passcode: &str, now: DateTime<Utc>) -> Result<(), AuthError> {
        let expires = login
            .split(':')
            .next()
            .and_then(|epoch| epoch.parse::<i64>().ok())
            .ok_or(AuthError::MalformedLogin)?;

        let signature = STANDARD
            .decode(passcode)
            .map_err(|_| AuthError::InvalidCredentials)?;
        self.mac(login)
            .verify_slice(&signature)
            .map_err(|_| AuthError::InvalidCredentials)?;

        if expires.saturating_mul(1000) < now.timestamp_millis() {
            return Err(AuthError::Expired);
        }
        Ok(())
    }
}
