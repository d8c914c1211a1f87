//! HTTP handlers, one per resource and method.
//!
//! Non-streaming handlers follow the same shape: read and decode the JSON body,
//! open a broker session, run the operation, close the session whatever the
//! outcome, then answer with a short success string or the error.

use axum::body::{Body, to_bytes};
use axum::extract::{RawQuery, Request, State};
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::broker::batch::decode_batch;
use crate::broker::bridge::Handoff;
use crate::broker::message::{ExchangeEntity, MessageEntity, QueueBindEntity, QueueEntity};
use crate::broker::ops;
use crate::broker::session::BrokerSession;
use crate::transport::http::AppState;
use crate::utils::{GatewayError, Result};

/// Reads the whole request body and decodes it as `T`.
async fn read_entity<T: DeserializeOwned>(state: &AppState, request: Request) -> Result<T> {
    let bytes = to_bytes(request.into_body(), state.settings.server.max_body_bytes)
        .await
        .map_err(|e| GatewayError::BodyRead(e.to_string()))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Closes a session once its operation has run; a failed close is only logged.
async fn release(session: Box<dyn BrokerSession>) {
    if let Err(e) = session.close().await {
        warn!("closing broker session failed: {e}");
    }
}

pub async fn declare_exchange(
    State(state): State<AppState>,
    request: Request,
) -> Result<&'static str> {
    let entity: ExchangeEntity = read_entity(&state, request).await?;
    let session = state.connector.connect().await?;
    let outcome = session.declare_exchange(&entity).await;
    release(session).await;
    outcome.map(|()| "declare exchange ok")
}

pub async fn delete_exchange(
    State(state): State<AppState>,
    request: Request,
) -> Result<&'static str> {
    let entity: ExchangeEntity = read_entity(&state, request).await?;
    let session = state.connector.connect().await?;
    let outcome = session.delete_exchange(&entity.name).await;
    release(session).await;
    outcome.map(|()| "delete exchange ok")
}

pub async fn declare_queue(
    State(state): State<AppState>,
    request: Request,
) -> Result<&'static str> {
    let entity: QueueEntity = read_entity(&state, request).await?;
    let session = state.connector.connect().await?;
    let outcome = session.declare_queue(&entity).await;
    release(session).await;
    outcome.map(|()| "declare queue ok")
}

pub async fn delete_queue(
    State(state): State<AppState>,
    request: Request,
) -> Result<&'static str> {
    let entity: QueueEntity = read_entity(&state, request).await?;
    let session = state.connector.connect().await?;
    let outcome = session.delete_queue(&entity.name).await;
    release(session).await;
    outcome.map(|()| "delete queue ok")
}

pub async fn bind_queue(
    State(state): State<AppState>,
    request: Request,
) -> Result<&'static str> {
    let entity: QueueBindEntity = read_entity(&state, request).await?;
    let session = state.connector.connect().await?;
    let outcome = ops::bind_keys(&*session, &entity).await;
    release(session).await;
    outcome.map(|()| "bind queue ok")
}

pub async fn unbind_queue(
    State(state): State<AppState>,
    request: Request,
) -> Result<&'static str> {
    let entity: QueueBindEntity = read_entity(&state, request).await?;
    let session = state.connector.connect().await?;
    let outcome = ops::unbind_keys(&*session, &entity).await;
    release(session).await;
    outcome.map(|()| "unbind queue ok")
}

/// Publishes every fragment of the batch in `body` as its own message.
pub async fn publish(
    State(state): State<AppState>,
    request: Request,
) -> Result<&'static str> {
    let entity: MessageEntity = read_entity(&state, request).await?;
    let fragments = decode_batch(&entity.body)?;
    if fragments.is_empty() {
        return Err(GatewayError::EmptyBatch);
    }

    let session = state.connector.connect().await?;
    let outcome = ops::publish_fragments(&*session, &entity, &fragments).await;
    release(session).await;

    let published = outcome?;
    debug!("published {published} message(s) to exchange {:?}", entity.exchange);
    Ok("publish message ok")
}

/// Collects every non-empty `name` parameter, in order.
pub fn queue_names(query: Option<&str>) -> Vec<String> {
    let Some(query) = query else {
        return Vec::new();
    };
    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, value)| key == "name" && !value.is_empty())
        .map(|(_, value)| value.into_owned())
        .collect()
}

/// `GET /queue?name=a&name=b`: streams every delivery from the named queues,
/// one body per line, until the broker closes the consumers or the client
/// disconnects.
///
/// The router hands `HEAD` to this handler too; it gets an empty 405 before
/// any consumer is registered, since auto-ack deliveries would be lost.
pub async fn consume_queue(
    method: Method,
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response> {
    if method == Method::HEAD {
        return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response());
    }

    let body = open_stream(&state, query.as_deref()).await?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response())
}

async fn open_stream(state: &AppState, query: Option<&str>) -> Result<Body> {
    let names = queue_names(query);
    if names.is_empty() {
        return Err(GatewayError::MissingQueueName);
    }

    let session = state.connector.connect().await?;
    let handoff = Handoff::new(state.settings.broker.handoff_capacity);

    for name in &names {
        match session.consume(name).await {
            Ok(deliveries) => {
                handoff.attach(name, deliveries);
            }
            Err(e) => {
                // Stops drains already attached for earlier names.
                handoff.cancellation().cancel();
                release(session).await;
                return Err(e);
            }
        }
    }

    info!("streaming queue(s) {names:?}");
    Ok(Body::from_stream(handoff.into_body(Some(session))))
}
