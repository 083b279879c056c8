//! Redelivery timer
//!
//! Every tick takes the single oldest unacknowledged message out of the
//! pending store and publishes it again. The new delivery gets a fresh message
//! id (and, if it lands on a client-ack subscription, a fresh pending entry);
//! the old entry counts as resolved. At most one message is retried per tick
//! however large the backlog is.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use crate::broker::dispatch::{SharedBroker, lock};
use crate::broker::engine::Broker;
use crate::broker::pending::MessageId;

impl Broker {
    /// One timer tick. Returns the id of the entry that was retried.
    pub fn redeliver_next(&mut self) -> Option<MessageId> {
        let (message_id, frame) = self.pending.pop_oldest()?;
        let delivered = self.publish(&frame);
        debug!("Redelivered {message_id}, {delivered} deliveries");
        Some(message_id)
    }

    /// Run the redelivery loop until the task is aborted.
    pub async fn run_redelivery_loop(broker: SharedBroker, period: Duration) {
        let period = period.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            lock(&broker).redeliver_next();
        }
    }
}

/// Handle to the background redelivery task.
#[derive(Debug)]
pub struct RedeliveryTimer {
    handle: JoinHandle<()>,
}

impl RedeliveryTimer {
    pub fn start(broker: SharedBroker, period: Duration) -> Self {
        info!("Redelivery timer started, interval {period:?}");
        Self {
            handle: tokio::spawn(Broker::run_redelivery_loop(broker, period)),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(self) {
        self.handle.abort();
        info!("Redelivery timer stopped");
    }
}
