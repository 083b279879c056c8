//! The `client` module defines the transport-side view of a connection.
//!
//! A `Client` is created for every accepted WebSocket and holds the sending
//! half of its outbound channel. It refers to its broker session only by id;
//! the session itself lives in the broker's session registry.

pub mod pubsub_client;
pub use pubsub_client::{Client, ClientId};

#[cfg(test)]
mod tests;
