//! Pending acknowledgements
//!
//! Messages delivered to a `client`-ack subscription are held here until the
//! client acknowledges them or the redelivery timer picks them up. The queue
//! keeps message ids oldest first; the map holds the original frames.

use std::collections::{HashMap, VecDeque};

use crate::protocol::Frame;

pub type MessageId = String;

#[derive(Debug, Default)]
pub struct PendingAcks {
    frames: HashMap<MessageId, Frame>,
    queue: VecDeque<MessageId>,
}

impl PendingAcks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, message_id: MessageId, frame: Frame) {
        if self.frames.insert(message_id.clone(), frame).is_none() {
            self.queue.push_back(message_id);
        }
    }

    /// Forget `message_id`. Returns whether it was pending; unknown ids are
    /// not an error.
    pub fn ack(&mut self, message_id: &str) -> bool {
        if self.frames.remove(message_id).is_none() {
            return false;
        }
        if let Some(pos) = self.queue.iter().position(|id| id == message_id) {
            self.queue.remove(pos);
        }
        true
    }

    /// Remove and return the oldest pending entry.
    pub fn pop_oldest(&mut self) -> Option<(MessageId, Frame)> {
        while let Some(id) = self.queue.pop_front() {
            if let Some(frame) = self.frames.remove(&id) {
                return Some((id, frame));
            }
        }
        None
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.frames.contains_key(message_id)
    }

    /// Pending ids, oldest first.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.queue.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.queue.clear();
    }
}
