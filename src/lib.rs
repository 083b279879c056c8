//! # StompSub
//!
//! `stompsub` is an in-memory publish/subscribe broker speaking a STOMP 1.0
//! dialect over WebSockets (subprotocol `v10.stomp`).
//!
//! ## Core Modules
//!
//! The library is structured into several modules, each with a distinct responsibility:
//!
//! - `protocol`: Frame parsing, serialization and NUL-delimited reassembly.
//! - `broker`: Sessions, subscription routing, pending acknowledgements, redelivery and transactions.
//! - `auth`: Ephemeral HMAC tokens and pluggable credential stores consulted on `CONNECT`.
//! - `client`: Represents a connected WebSocket client.
//! - `config`: Handles loading and managing server configuration.
//! - `transport`: Manages the WebSocket listeners and communication with clients.
//! - `server`: Starts and stops a complete broker.
//! - `utils`: Contains shared utilities, such as error handling and logging.

pub mod auth;
pub mod broker;
pub mod client;
pub mod config;
pub mod protocol;
pub mod server;
pub mod transport;
pub mod utils;
