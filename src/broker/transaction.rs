//! Transaction buffers
//!
//! Frames sent under a `transaction` header are delivered immediately and
//! also recorded here. `COMMIT` throws the record away; `ABORT` hands it back
//! so the broker can publish every frame a second time.

use std::collections::HashMap;

use crate::protocol::Frame;
use crate::utils::BrokerError;

pub type TransactionId = String;

#[derive(Debug, Default)]
pub struct Transactions {
    buffers: HashMap<TransactionId, Vec<Frame>>,
}

impl Transactions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a transaction with an empty buffer.
    pub fn begin(&mut self, id: &str) {
        self.buffers.insert(id.to_string(), Vec::new());
    }

    pub fn record(&mut self, id: &str, frame: Frame) -> Result<(), BrokerError> {
        self.buffers
            .get_mut(id)
            .ok_or_else(|| BrokerError::UnknownTransaction(id.to_string()))?
            .push(frame);
        Ok(())
    }

    /// Remove the transaction and return its frames in recorded order.
    pub fn take(&mut self, id: &str) -> Option<Vec<Frame>> {
        self.buffers.remove(id)
    }

    pub fn buffered(&self, id: &str) -> Option<&[Frame]> {
        self.buffers.get(id).map(Vec::as_slice)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.buffers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }
}
