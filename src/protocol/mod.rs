//! The `protocol` module implements the STOMP wire format.
//!
//! - `codec`: reassembles NUL-delimited frames from arbitrarily chunked text.
//! - `frame`: parsed client frames and the closed set of client commands.
//! - `server_frame`: frames built by the broker and their serialization.

pub mod codec;
pub mod frame;
pub mod server_frame;

pub use codec::{DELIMITER, FrameBuffer, split_frames};
pub use frame::{Command, Frame, Headers, ParseError, UnsupportedCommand};
pub use server_frame::ServerFrame;

/// The only WebSocket subprotocol the broker negotiates.
pub const SUBPROTOCOL: &str = "v10.stomp";
