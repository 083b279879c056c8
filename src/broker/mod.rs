//! The `broker` module is the session, subscription, delivery and
//! transaction engine.
//!
//! - `engine`: the `Broker` state object and one handler per client command.
//! - `dispatch`: frame parsing, command lookup and the shared-broker lock.
//! - `router`: the publish/rotation algorithm.
//! - `session`, `pending`, `transaction`: the state the handlers mutate.
//! - `timer`: periodic redelivery of unacknowledged messages.

pub mod dispatch;
pub mod engine;
pub mod pending;
pub mod router;
pub mod session;
pub mod timer;
pub mod transaction;

pub use dispatch::{SharedBroker, dispatch, lock, shared};
pub use engine::Broker;
pub use timer::RedeliveryTimer;
