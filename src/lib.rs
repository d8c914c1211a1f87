//! # rabbit_http
//!
//! `rabbit_http` is an HTTP gateway in front of an AMQP 0-9-1 broker such as
//! RabbitMQ. It lets HTTP-only clients declare exchanges and queues, manage
//! bindings, publish batches of messages and tail queues as a chunked stream.
//!
//! ## Core Modules
//!
//! - `broker`: per-request broker sessions, batch decoding and the delivery
//!   bridge that turns consumers into streaming HTTP bodies.
//! - `config`: loads and merges server and broker configuration.
//! - `transport`: the HTTP routes and handlers.
//! - `utils`: the shared error type and logging setup.

pub mod broker;
pub mod config;
pub mod transport;
pub mod utils;
