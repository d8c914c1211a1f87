//! The `error` module defines the error type shared by every layer of the gateway.
//!
//! Errors fall into two groups: problems with what the HTTP caller sent, and
//! failures reported by the broker. Both are rendered as a plain-text body
//! carrying the error's display text; only the status code differs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::broker::batch::BatchError;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("failed to decode request body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error("message body contains no fragments")]
    EmptyBatch,

    #[error("missing `name` query parameter")]
    MissingQueueName,

    #[error("amqp connect error: {0}")]
    Connection(String),

    #[error("amqp channel error: {0}")]
    Channel(String),

    #[error("declare exchange error: {0}")]
    DeclareExchange(String),

    #[error("delete exchange error: {0}")]
    DeleteExchange(String),

    #[error("declare queue error: {0}")]
    DeclareQueue(String),

    #[error("delete queue error: {0}")]
    DeleteQueue(String),

    #[error("bind queue error on key `{key}` ({applied} key(s) already bound): {reason}")]
    Bind {
        key: String,
        applied: usize,
        reason: String,
    },

    #[error("unbind queue error on key `{key}` ({applied} key(s) already unbound): {reason}")]
    Unbind {
        key: String,
        applied: usize,
        reason: String,
    },

    #[error("consume queue `{queue}` error: {reason}")]
    Consume { queue: String, reason: String },

    #[error("publish message error on fragment {index} of {total} ({index} already published): {reason}")]
    Publish {
        index: usize,
        total: usize,
        reason: String,
    },

    #[error("amqp close error: {0}")]
    Close(String),
}

impl GatewayError {
    /// Whether the error was caused by the caller's input rather than the broker.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::BodyRead(_)
                | Self::Decode(_)
                | Self::Batch(_)
                | Self::EmptyBatch
                | Self::MissingQueueName
        )
    }

    pub fn status(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
