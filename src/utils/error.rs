//! The `error` module defines the protocol error type shared by every
//! command handler.
//!
//! STOMP treats `ERROR` as fatal to the session, so each variant maps onto a
//! single `ERROR` frame (short message plus detail) after which the transport
//! closes the connection.

use thiserror::Error;

use crate::auth::AuthError;
use crate::protocol::{ParseError, ServerFrame, UnsupportedCommand};

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("you need to CONNECT first")]
    NotConnected,

    #[error("session is not correct")]
    SessionMismatch,

    #[error("connection is not registered with the broker")]
    UnknownClient,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("there is no {0} header")]
    MissingHeader(&'static str),

    #[error("exactly one of the {0} and {1} headers is required")]
    ConflictingHeaders(&'static str, &'static str),

    #[error("subscription {0} already exists")]
    DuplicateSubscription(String),

    #[error("transaction {0} has not begun")]
    UnknownTransaction(String),

    #[error(transparent)]
    UnsupportedCommand(#[from] UnsupportedCommand),

    #[error("{source}: {raw:?}")]
    Parse { source: ParseError, raw: String },

    #[error("{0}")]
    Internal(String),
}

impl BrokerError {
    /// Short code carried in the `message` header of the `ERROR` frame.
    pub fn short_message(&self) -> &'static str {
        match self {
            BrokerError::NotConnected
            | BrokerError::SessionMismatch
            | BrokerError::UnknownClient
            | BrokerError::Auth(_) => "connect error",
            BrokerError::MissingHeader(_)
            | BrokerError::ConflictingHeaders(..)
            | BrokerError::DuplicateSubscription(_)
            | BrokerError::UnknownTransaction(_)
            | BrokerError::UnsupportedCommand(_) => "invalid parameters",
            BrokerError::Parse { .. } => "invalid frame",
            BrokerError::Internal(_) => "internal error",
        }
    }

    pub fn to_frame(&self) -> ServerFrame {
        ServerFrame::error(self.short_message(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_header_frame() {
        let frame = BrokerError::MissingHeader("id").to_frame();
        assert_eq!(
            frame,
            ServerFrame::error("invalid parameters", "there is no id header")
        );
    }

    #[test]
    fn test_parse_error_keeps_raw_text() {
        let err = BrokerError::Parse {
            source: ParseError::MissingCommand,
            raw: "\n".to_string(),
        };
        assert_eq!(err.short_message(), "invalid frame");
        assert_eq!(err.to_string(), "frame has no command line: \"\\n\"");
    }

    #[test]
    fn test_auth_errors_are_connect_errors() {
        let err = BrokerError::from(AuthError::InvalidCredentials);
        assert_eq!(err.short_message(), "connect error");
        assert_eq!(err.to_string(), "incorrect login or passcode");

        let frame = BrokerError::from(AuthError::MissingLogin).to_frame();
        assert_eq!(frame, ServerFrame::error("connect error", "login is required"));
    }
}
