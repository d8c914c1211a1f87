//! The `transport` module exposes the broker over HTTP.
//!
//! It defines the route table and the handlers that decode JSON requests,
//! drive a per-request broker session and stream consumed messages back.

pub mod handlers;
pub mod http;

pub use http::{AppState, router, serve};
