//! Broker engine
//!
//! This module contains the in-memory broker state and one handler per
//! client command:
//! - the session registry (who is connected, what they subscribed to)
//! - the pending-ack store consulted by the redelivery timer
//! - transaction buffers
//!
//! Concurrency and usage notes:
//! - Handlers are synchronous and designed to run behind the broker lock
//!   (`SharedBroker`, see `dispatch`). Each call is one short step; nothing
//!   here awaits.
//! - Handlers return at most one response frame. An `Err` is turned into an
//!   `ERROR` frame by the caller and ends the connection.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::auth::{AuthError, Authenticator};
use crate::broker::pending::PendingAcks;
use crate::broker::session::{Session, SessionRegistry};
use crate::broker::transaction::Transactions;
use crate::client::{Client, ClientId};
use crate::config::Settings;
use crate::protocol::{Frame, ServerFrame};
use crate::utils::BrokerError;

pub const DEFAULT_IDENTIFIER: &str = "stompsub";

#[derive(Debug)]
pub struct Broker {
    pub(super) identifier: String,
    pub(super) clients: HashMap<ClientId, Client>,
    pub(super) sessions: SessionRegistry,
    pub(super) pending: PendingAcks,
    pub(super) transactions: Transactions,
    pub(super) authenticator: Option<Authenticator>,
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

impl Broker {
    pub fn new() -> Self {
        Self {
            identifier: DEFAULT_IDENTIFIER.to_string(),
            clients: HashMap::new(),
            sessions: SessionRegistry::new(),
            pending: PendingAcks::new(),
            transactions: Transactions::new(),
            authenticator: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, AuthError> {
        let authenticator = Authenticator::from_settings(&settings.auth)?;
        Ok(Self::new()
            .with_identifier(settings.server.identifier.clone())
            .with_authenticator(authenticator))
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn with_authenticator(mut self, authenticator: Option<Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    pub fn authenticator(&self) -> Option<Authenticator> {
        self.authenticator.clone()
    }

    pub fn register_client(&mut self, client: Client) {
        self.clients.insert(client.id.clone(), client);
    }

    pub fn remove_client(&mut self, client_id: &str) -> Option<Client> {
        self.clients.remove(client_id)
    }

    /// Forget a client whose transport went away, together with its session.
    /// Pending acknowledgements for messages it received are kept for
    /// redelivery.
    pub fn cleanup_client(&mut self, client_id: &str) {
        if let Some(client) = self.remove_client(client_id) {
            if let Some(session_id) = client.session_id {
                self.sessions.remove(&session_id);
            }
            debug!("Cleaned up client {client_id}");
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn session_of(&self, client_id: &str) -> Option<&Session> {
        let session_id = self.clients.get(client_id)?.session_id.as_deref()?;
        self.sessions.get(session_id)
    }

    /// Drop all broker state. Used when the server stops.
    pub fn clear(&mut self) {
        self.clients.clear();
        self.sessions.clear();
        self.pending.clear();
        self.transactions.clear();
    }

    /// The session the client may act on: it must have connected, and the
    /// registry entry must belong to this very client.
    fn authorize(&mut self, client_id: &str) -> Result<&mut Session, BrokerError> {
        let client = self
            .clients
            .get(client_id)
            .ok_or(BrokerError::UnknownClient)?;
        self.sessions
            .authorize(client_id, client.session_id.as_deref())
    }

    /// Open a session for an already authenticated client.
    pub fn connect(&mut self, client_id: &str) -> Result<Option<ServerFrame>, BrokerError> {
        let client = self
            .clients
            .get_mut(client_id)
            .ok_or(BrokerError::UnknownClient)?;

        if let Some(previous) = client.session_id.take() {
            self.sessions.remove(&previous);
        }
        let session_id = self.sessions.register(client_id.to_string());
        client.session_id = Some(session_id.clone());

        info!("{client_id} connected with session {session_id}");
        Ok(Some(ServerFrame::Connected {
            session: session_id,
            server: self.identifier.clone(),
        }))
    }

    pub fn subscribe(
        &mut self,
        client_id: &str,
        frame: &Frame,
    ) -> Result<Option<ServerFrame>, BrokerError> {
        let session = self.authorize(client_id)?;
        let destination = frame
            .header("destination")
            .ok_or(BrokerError::MissingHeader("destination"))?;
        let id = frame.header("id").ok_or(BrokerError::MissingHeader("id"))?;
        let client_ack = frame.header("ack") == Some("client");

        session.subscribe(destination, id, client_ack)?;
        debug!("{client_id} subscribed {id} to {destination} (client ack: {client_ack})");
        Ok(None)
    }

    pub fn unsubscribe(
        &mut self,
        client_id: &str,
        frame: &Frame,
    ) -> Result<Option<ServerFrame>, BrokerError> {
        let session = self.authorize(client_id)?;
        let removed = match (frame.header("destination"), frame.header("id")) {
            (Some(destination), None) => session.unsubscribe_destination(destination),
            (None, Some(id)) => session.unsubscribe_id(id),
            _ => return Err(BrokerError::ConflictingHeaders("destination", "id")),
        };
        debug!("{client_id} unsubscribe matched: {removed}");
        Ok(None)
    }

    /// Client `SEND`: record under the transaction if one is named, then
    /// publish right away.
    pub fn send(
        &mut self,
        client_id: &str,
        frame: &Frame,
    ) -> Result<Option<ServerFrame>, BrokerError> {
        self.authorize(client_id)?;
        let destination = frame
            .header("destination")
            .ok_or(BrokerError::MissingHeader("destination"))?;

        if let Some(transaction) = frame.header("transaction") {
            self.transactions.record(transaction, frame.clone())?;
        }

        let delivered = self.publish(frame);
        debug!("{client_id} published to {destination}, {delivered} deliveries");
        Ok(None)
    }

    pub fn ack(
        &mut self,
        client_id: &str,
        frame: &Frame,
    ) -> Result<Option<ServerFrame>, BrokerError> {
        self.authorize(client_id)?;
        let message_id = frame
            .header("message-id")
            .ok_or(BrokerError::MissingHeader("message-id"))?;

        if self.pending.ack(message_id) {
            debug!("ACK received for message_id: {message_id}");
        } else {
            debug!("Received ACK for unknown message_id: {message_id}");
        }
        Ok(Some(ServerFrame::receipt(message_id)))
    }

    pub fn disconnect(&mut self, client_id: &str) -> Result<Option<ServerFrame>, BrokerError> {
        let session_id = self.authorize(client_id)?.id.clone();
        self.sessions.remove(&session_id);
        if let Some(client) = self.clients.get_mut(client_id) {
            client.session_id = None;
        }
        info!("{client_id} disconnected session {session_id}");
        Ok(None)
    }

    pub fn begin(
        &mut self,
        client_id: &str,
        frame: &Frame,
    ) -> Result<Option<ServerFrame>, BrokerError> {
        self.authorize(client_id)?;
        let transaction = transaction_header(frame)?;
        self.transactions.begin(transaction);
        debug!("{client_id} began transaction {transaction}");
        Ok(None)
    }

    /// Frames were delivered when they were sent; committing only forgets them.
    pub fn commit(
        &mut self,
        client_id: &str,
        frame: &Frame,
    ) -> Result<Option<ServerFrame>, BrokerError> {
        self.authorize(client_id)?;
        let transaction = transaction_header(frame)?;
        let discarded = self.transactions.take(transaction).map_or(0, |f| f.len());
        debug!("{client_id} committed transaction {transaction}, {discarded} frames discarded");
        Ok(None)
    }

    /// Publish every frame recorded under the transaction again, in order.
    pub fn abort(
        &mut self,
        client_id: &str,
        frame: &Frame,
    ) -> Result<Option<ServerFrame>, BrokerError> {
        self.authorize(client_id)?;
        let transaction = transaction_header(frame)?;
        let frames = self
            .transactions
            .take(transaction)
            .ok_or_else(|| BrokerError::UnknownTransaction(transaction.to_string()))?;

        for buffered in &frames {
            self.publish(buffered);
        }
        debug!(
            "{client_id} aborted transaction {transaction}, {} frames replayed",
            frames.len()
        );
        Ok(None)
    }
}

fn transaction_header(frame: &Frame) -> Result<&str, BrokerError> {
    frame
        .header("transaction")
        .ok_or(BrokerError::MissingHeader("transaction"))
}
