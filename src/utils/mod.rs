//! The `utils` module holds the pieces shared across the gateway: the common
//! error type and logging setup.

pub mod error;
pub mod logging;

pub use error::{GatewayError, Result};
