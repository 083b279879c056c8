//! Session registry
//!
//! A `Session` exists for every client that completed `CONNECT`. It records
//! the client's subscriptions per destination, in subscription order, and
//! which subscription ids use client acknowledgement.
//!
//! The subscription list of a destination doubles as the delivery rotation:
//! the router moves the last id to the front on every publish, so no separate
//! cursor has to be kept in sync when the list grows or shrinks.

use std::collections::{HashMap, HashSet, VecDeque};

use uuid::Uuid;

use crate::client::ClientId;
use crate::utils::BrokerError;

pub type SessionId = String;
pub type SubscriptionId = String;

#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    /// The transport connection that owns this session.
    pub client_id: ClientId,
    subscriptions: HashMap<String, VecDeque<SubscriptionId>>,
    ack_required: HashSet<SubscriptionId>,
}

impl Session {
    pub fn new(client_id: ClientId) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            client_id,
            subscriptions: HashMap::new(),
            ack_required: HashSet::new(),
        }
    }

    /// Append `id` to the destination's rotation. Ids are unique per session.
    pub fn subscribe(
        &mut self,
        destination: &str,
        id: &str,
        client_ack: bool,
    ) -> Result<(), BrokerError> {
        if self.has_subscription(id) {
            return Err(BrokerError::DuplicateSubscription(id.to_string()));
        }
        self.subscriptions
            .entry(destination.to_string())
            .or_default()
            .push_back(id.to_string());
        if client_ack {
            self.ack_required.insert(id.to_string());
        }
        Ok(())
    }

    /// Remove the first subscription with this id, whatever its destination.
    pub fn unsubscribe_id(&mut self, id: &str) -> bool {
        let found = self.subscriptions.iter_mut().find_map(|(destination, ids)| {
            let pos = ids.iter().position(|s| s == id)?;
            ids.remove(pos);
            Some((destination.clone(), ids.is_empty()))
        });

        match found {
            Some((destination, now_empty)) => {
                if now_empty {
                    self.subscriptions.remove(&destination);
                }
                self.ack_required.remove(id);
                true
            }
            None => false,
        }
    }

    /// Drop every subscription this session holds on `destination`.
    pub fn unsubscribe_destination(&mut self, destination: &str) -> bool {
        match self.subscriptions.remove(destination) {
            Some(ids) => {
                for id in &ids {
                    self.ack_required.remove(id);
                }
                true
            }
            None => false,
        }
    }

    /// Advance the destination's rotation by one step and return the new
    /// primary target, or `None` if the session is not subscribed.
    pub fn rotate(&mut self, destination: &str) -> Option<SubscriptionId> {
        let ids = self.subscriptions.get_mut(destination)?;
        let last = ids.pop_back()?;
        ids.push_front(last);
        ids.front().cloned()
    }

    pub fn subscriptions(&self, destination: &str) -> impl Iterator<Item = &SubscriptionId> {
        self.subscriptions
            .get(destination)
            .into_iter()
            .flat_map(|ids| ids.iter())
    }

    pub fn destinations(&self) -> impl Iterator<Item = &str> {
        self.subscriptions.keys().map(String::as_str)
    }

    pub fn has_subscription(&self, id: &str) -> bool {
        self.subscriptions
            .values()
            .any(|ids| ids.iter().any(|s| s == id))
    }

    pub fn requires_ack(&self, id: &str) -> bool {
        self.ack_required.contains(id)
    }
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for `client_id` under a freshly generated id.
    pub fn register(&mut self, client_id: ClientId) -> SessionId {
        let session = Session::new(client_id);
        let id = session.id.clone();
        self.sessions.insert(id.clone(), session);
        id
    }

    pub fn remove(&mut self, session_id: &str) -> Option<Session> {
        self.sessions.remove(session_id)
    }

    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    /// Look up the session a client claims, checking that the client owns it.
    pub fn authorize(
        &mut self,
        client_id: &str,
        session_id: Option<&str>,
    ) -> Result<&mut Session, BrokerError> {
        let session_id = session_id.ok_or(BrokerError::NotConnected)?;
        match self.sessions.get_mut(session_id) {
            Some(session) if session.client_id == client_id => Ok(session),
            _ => Err(BrokerError::SessionMismatch),
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.sessions.values_mut()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }
}
