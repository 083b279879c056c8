use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::error::SendError;
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::broker::session::SessionId;
use crate::protocol::ServerFrame;

pub type ClientId = String;

/// Represents a connected WebSocket client.
///
/// Each client is uniquely identified by an `id` and has a channel (`sender`)
/// drained by the connection's writer task.
#[derive(Debug)]
pub struct Client {
    pub id: ClientId,

    pub sender: UnboundedSender<WsMessage>,

    /// Set once `CONNECT` succeeds; cleared on `DISCONNECT`.
    pub session_id: Option<SessionId>,
}

impl Client {
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id: format!("client-{}", Uuid::new_v4()),
            sender,
            session_id: None,
        }
    }

    /// Queue a frame for the writer task.
    pub fn send_frame(&self, frame: &ServerFrame) -> Result<(), SendError<WsMessage>> {
        self.sender.send(WsMessage::text(frame.serialize()))
    }
}
