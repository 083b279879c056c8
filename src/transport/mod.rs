//! The `transport` module is responsible for handling network communication
//! with clients via WebSockets.
//!
//! It negotiates the STOMP subprotocol during the handshake, reassembles
//! frames from WebSocket messages, hands each frame to the broker and writes
//! the responses back. A connection is closed right after an `ERROR` frame.
//! Listeners optionally terminate TLS themselves (`tls`).

pub mod stream;
pub mod tls;
pub mod websocket;

pub use tls::{TlsError, load_acceptor};
pub use websocket::{bind, serve};
