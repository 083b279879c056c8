//! Stream splitting
//!
//! WebSocket messages do not line up with frame boundaries: one message may
//! carry several frames, and a frame may be spread over several messages.
//! Frames are delimited by a single NUL octet.

pub const DELIMITER: char = '\0';

/// Append `chunk` to `remainder` and cut out every complete frame.
///
/// Returns the complete frames (without delimiters) and the trailing partial
/// segment that has to be carried into the next call. Segments consisting only
/// of line breaks are heart-beat noise and are dropped.
pub fn split_frames(remainder: &str, chunk: &str) -> (Vec<String>, String) {
    let mut data = String::with_capacity(remainder.len() + chunk.len());
    data.push_str(remainder);
    data.push_str(chunk);

    let mut segments: Vec<&str> = data.split(DELIMITER).collect();
    let rest = segments.pop().unwrap_or_default().to_string();

    let frames = segments
        .into_iter()
        .filter(|s| !s.trim_matches(['\r', '\n']).is_empty())
        .map(str::to_string)
        .collect();

    (frames, rest)
}

/// Per-connection reassembly buffer around [`split_frames`].
#[derive(Debug, Default)]
pub struct FrameBuffer {
    remainder: String,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        let (frames, rest) = split_frames(&self.remainder, chunk);
        self.remainder = rest;
        frames
    }

    /// Bytes received that do not yet form a complete frame.
    pub fn pending(&self) -> &str {
        &self.remainder
    }
}
