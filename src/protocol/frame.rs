//! Parsed client frames
//!
//! A `Frame` is one protocol unit as it arrived on the wire: a command line,
//! a block of `key:value` headers terminated by a blank line, and a body.
//! Frames are immutable after parsing; the broker clones them into the
//! pending-ack store and transaction buffers as needed.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::protocol::codec::DELIMITER;

/// Ordered header block with unique keys.
///
/// Inserting a key that already exists overwrites its value in place, so the
/// last occurrence in a frame wins while the first occurrence keeps its
/// position for serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("frame has no command line")]
    MissingCommand,

    #[error("malformed header line {line:?}")]
    MalformedHeader { line: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub headers: Headers,
    pub body: String,
}

impl Frame {
    pub fn new(command: impl Into<String>, headers: Headers, body: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers,
            body: body.into(),
        }
    }

    /// Parse one frame, without its trailing NUL delimiter.
    ///
    /// Leading blank lines are skipped (clients may send EOLs between frames).
    /// The header block ends at the first empty line; everything after it is
    /// the body, byte for byte.
    pub fn parse(raw: &str) -> Result<Frame, ParseError> {
        let raw = raw.trim_start_matches(['\r', '\n']);

        let (command_line, mut rest) = match raw.split_once('\n') {
            Some((line, rest)) => (line, rest),
            None => (raw, ""),
        };
        let command = command_line.trim_end_matches('\r').trim();
        if command.is_empty() {
            return Err(ParseError::MissingCommand);
        }

        let mut headers = Headers::new();
        let body = loop {
            let (line, next) = match rest.split_once('\n') {
                Some((line, next)) => (line, Some(next)),
                None => (rest, None),
            };
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                break next.unwrap_or("");
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| ParseError::MalformedHeader {
                    line: line.to_string(),
                })?;
            headers.insert(key, value);
            match next {
                Some(next) => rest = next,
                None => break "",
            }
        };

        Ok(Frame {
            command: command.to_string(),
            headers,
            body: body.to_string(),
        })
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).filter(|v| !v.is_empty())
    }

    /// Wire text: command line, headers, blank line, body and the delimiter.
    pub fn serialize(&self) -> String {
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(&self.command);
        out.push('\n');
        for (k, v) in self.headers.iter() {
            out.push_str(k);
            out.push(':');
            out.push_str(v);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push(DELIMITER);
        out
    }
}

/// Client commands the broker understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Connect,
    Stomp,
    Subscribe,
    Unsubscribe,
    Send,
    Ack,
    Disconnect,
    Begin,
    Commit,
    Abort,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Stomp => "STOMP",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Send => "SEND",
            Command::Ack => "ACK",
            Command::Disconnect => "DISCONNECT",
            Command::Begin => "BEGIN",
            Command::Commit => "COMMIT",
            Command::Abort => "ABORT",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("command {0} is not supported")]
pub struct UnsupportedCommand(pub String);

impl FromStr for Command {
    type Err = UnsupportedCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let command = match s.to_ascii_uppercase().as_str() {
            "CONNECT" => Command::Connect,
            "STOMP" => Command::Stomp,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "SEND" => Command::Send,
            "ACK" => Command::Ack,
            "DISCONNECT" => Command::Disconnect,
            "BEGIN" => Command::Begin,
            "COMMIT" => Command::Commit,
            "ABORT" => Command::Abort,
            _ => return Err(UnsupportedCommand(s.to_string())),
        };
        Ok(command)
    }
}
