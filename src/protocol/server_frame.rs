use std::fmt;

use crate::protocol::frame::{Frame, Headers};

/// Frames the broker sends to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    Connected {
        session: String,
        server: String,
    },
    /// Terminal: the connection is closed after this frame is sent.
    Error {
        message: String,
        detail: String,
    },
    Message {
        destination: String,
        headers: Headers,
        body: String,
    },
    Receipt {
        receipt_id: String,
    },
}

impl ServerFrame {
    pub fn error(message: impl Into<String>, detail: impl Into<String>) -> Self {
        ServerFrame::Error {
            message: message.into(),
            detail: detail.into(),
        }
    }

    pub fn receipt(receipt_id: impl Into<String>) -> Self {
        ServerFrame::Receipt {
            receipt_id: receipt_id.into(),
        }
    }

    pub fn command(&self) -> &'static str {
        match self {
            ServerFrame::Connected { .. } => "CONNECTED",
            ServerFrame::Error { .. } => "ERROR",
            ServerFrame::Message { .. } => "MESSAGE",
            ServerFrame::Receipt { .. } => "RECEIPT",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ServerFrame::Error { .. })
    }

    /// Lower into a plain frame, fixing the header layout of each shape.
    pub fn to_frame(&self) -> Frame {
        let mut headers = Headers::new();
        let body = match self {
            ServerFrame::Connected { session, server } => {
                headers.insert("session", session.as_str());
                headers.insert("server", server.as_str());
                String::new()
            }
            ServerFrame::Error { message, detail } => {
                headers.insert("message", message.as_str());
                detail.clone()
            }
            ServerFrame::Message {
                destination,
                headers: extra,
                body,
            } => {
                headers.insert("destination", destination.as_str());
                for (k, v) in extra.iter() {
                    headers.insert(k, v);
                }
                body.clone()
            }
            ServerFrame::Receipt { receipt_id } => {
                headers.insert("receipt-id", receipt_id.as_str());
                String::new()
            }
        };
        Frame::new(self.command(), headers, body)
    }

    /// Wire text, including the trailing delimiter.
    pub fn serialize(&self) -> String {
        self.to_frame().serialize()
    }
}

impl fmt::Display for ServerFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}
