//! The `broker` module talks to the upstream AMQP broker.
//!
//! - `session`: the per-request session traits handlers program against.
//! - `amqp`: the `lapin`-backed implementation of those traits.
//! - `ops`: multi-key binds and batch publishes over one session.
//! - `bridge`: turns consumer push streams into a streaming HTTP body.
//! - `batch`: splits a publish body into individual message fragments.
//! - `message`: JSON request entities.

pub mod amqp;
pub mod batch;
pub mod bridge;
pub mod message;
pub mod ops;
pub mod session;

pub use amqp::AmqpConnector;
pub use session::{BrokerConnector, BrokerSession, DeliveryStream};

#[cfg(test)]
pub(crate) mod testing;
