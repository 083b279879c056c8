//! Frame dispatch
//!
//! Entry point for raw frames coming off a connection. A frame is parsed,
//! its command looked up, and the matching handler run against the shared
//! broker. Whatever goes wrong (parse failure, unknown command, protocol
//! violation, a panicking handler) comes back as an `ERROR` frame for that
//! connection only.
//!
//! `CONNECT`/`STOMP` may have to wait on an authentication backend; the broker
//! lock is not held while waiting, and a panicking backend is reported like a
//! panicking handler. All other commands run under the lock as a single
//! synchronous step.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tracing::{debug, warn};

use crate::auth::AuthError;
use crate::broker::engine::Broker;
use crate::protocol::{Command, Frame, ServerFrame};
use crate::utils::BrokerError;

pub type SharedBroker = Arc<Mutex<Broker>>;

type Reply = Result<Option<ServerFrame>, BrokerError>;

pub fn shared(broker: Broker) -> SharedBroker {
    Arc::new(Mutex::new(broker))
}

/// Lock the broker. A handler panic is caught before the guard is released,
/// so poisoning only means an earlier step was cut short; the state is still
/// usable.
pub fn lock(broker: &SharedBroker) -> MutexGuard<'_, Broker> {
    broker.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle one raw frame from `client_id` and produce the response, if any.
pub async fn dispatch(broker: &SharedBroker, client_id: &str, raw: &str) -> Option<ServerFrame> {
    let frame = match Frame::parse(raw) {
        Ok(frame) => frame,
        Err(source) => {
            let err = BrokerError::Parse {
                source,
                raw: raw.to_string(),
            };
            warn!("Invalid frame from {client_id}: {err}");
            return Some(err.to_frame());
        }
    };
    debug!("{client_id} -> {}", frame.command);

    let result = match frame.command.parse::<Command>() {
        Ok(command) => execute(broker, client_id, command, &frame).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(Some(response)) => Some(response),
        Ok(None) => frame.header("receipt").map(ServerFrame::receipt),
        Err(err) => {
            warn!("{client_id} {}: {err}", frame.command);
            Some(err.to_frame())
        }
    }
}

async fn execute(broker: &SharedBroker, client_id: &str, command: Command, frame: &Frame) -> Reply {
    match command {
        Command::Connect | Command::Stomp => connect(broker, client_id, frame).await,
        Command::Subscribe => run(broker, |b| b.subscribe(client_id, frame)),
        Command::Unsubscribe => run(broker, |b| b.unsubscribe(client_id, frame)),
        Command::Send => run(broker, |b| b.send(client_id, frame)),
        Command::Ack => run(broker, |b| b.ack(client_id, frame)),
        Command::Disconnect => run(broker, |b| b.disconnect(client_id)),
        Command::Begin => run(broker, |b| b.begin(client_id, frame)),
        Command::Commit => run(broker, |b| b.commit(client_id, frame)),
        Command::Abort => run(broker, |b| b.abort(client_id, frame)),
    }
}

async fn connect(broker: &SharedBroker, client_id: &str, frame: &Frame) -> Reply {
    let authenticator = lock(broker).authenticator();

    if let Some(authenticator) = authenticator {
        let login = frame.header("login").ok_or(AuthError::MissingLogin)?;
        let passcode = frame.header("passcode").ok_or(AuthError::MissingPasscode)?;
        AssertUnwindSafe(authenticator.authenticate(login, passcode))
            .catch_unwind()
            .await
            .map_err(|payload| BrokerError::Internal(panic_message(payload)))??;
    }

    run(broker, |b| b.connect(client_id))
}

pub(super) fn run<F>(broker: &SharedBroker, handler: F) -> Reply
where
    F: FnOnce(&mut Broker) -> Reply,
{
    let mut guard = lock(broker);
    panic::catch_unwind(AssertUnwindSafe(|| handler(&mut *guard)))
        .unwrap_or_else(|payload| Err(BrokerError::Internal(panic_message(payload))))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
