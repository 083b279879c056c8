//! Delivery routing
//!
//! `publish` is the one routing algorithm shared by client `SEND`, transaction
//! abort replay and the redelivery timer. It performs no sender validation;
//! callers that act on behalf of a client authorize first.
//!
//! Per subscribed session, each publish rotates the destination's subscription
//! list by one step and takes the new front as the primary target:
//! - primary uses client ack: the frame is parked in the pending-ack store and
//!   exactly one `MESSAGE` goes to the primary subscription;
//! - otherwise one `MESSAGE` goes to every subscription the session holds on
//!   the destination, all sharing one message id.

use tracing::{trace, warn};
use uuid::Uuid;

use crate::broker::engine::Broker;
use crate::client::Client;
use crate::protocol::{Frame, Headers, ServerFrame};

impl Broker {
    /// Route `frame` to every session subscribed to its destination.
    /// Returns the number of `MESSAGE` frames handed to client channels.
    pub fn publish(&mut self, frame: &Frame) -> usize {
        let Some(destination) = frame.header("destination") else {
            warn!("Dropping {} frame without destination", frame.command);
            return 0;
        };

        let mut delivered = 0;
        for session in self.sessions.iter_mut() {
            let Some(primary) = session.rotate(destination) else {
                continue;
            };
            let Some(client) = self.clients.get(&session.client_id) else {
                warn!(
                    "No client registered for session {} on {destination}",
                    session.id
                );
                continue;
            };

            let message_id = Uuid::new_v4().to_string();

            if session.requires_ack(&primary) {
                self.pending.insert(message_id.clone(), frame.clone());
                delivered += deliver(client, destination, &message_id, &primary, &frame.body);
            } else {
                for subscription in session.subscriptions(destination) {
                    delivered +=
                        deliver(client, destination, &message_id, subscription, &frame.body);
                }
            }
        }
        delivered
    }
}

fn deliver(
    client: &Client,
    destination: &str,
    message_id: &str,
    subscription: &str,
    body: &str,
) -> usize {
    let mut headers = Headers::new();
    headers.insert("message-id", message_id);
    headers.insert("subscription", subscription);
    let message = ServerFrame::Message {
        destination: destination.to_string(),
        headers,
        body: body.to_string(),
    };

    match client.send_frame(&message) {
        Ok(()) => {
            trace!("Delivered {message_id} to {} ({subscription})", client.id);
            1
        }
        Err(e) => {
            warn!("Failed to send to {}: {e}", client.id);
            0
        }
    }
}
