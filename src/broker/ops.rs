//! Multi-step operations layered over a single session.
//!
//! Each operation applies its items one at a time, in input order, and stops at
//! the first failure. Items applied before the failure stay applied; the
//! returned error says which item failed and how many went through.

use tracing::debug;

use crate::broker::message::{MessageEntity, QueueBindEntity};
use crate::broker::session::BrokerSession;
use crate::utils::{GatewayError, Result};

/// Binds `entity.queue` to `entity.exchange` once per routing key.
pub async fn bind_keys(session: &dyn BrokerSession, entity: &QueueBindEntity) -> Result<()> {
    for (applied, key) in entity.keys.iter().enumerate() {
        session
            .bind_queue(&entity.queue, &entity.exchange, key, entity.no_wait)
            .await
            .map_err(|err| match err {
                GatewayError::Bind { key, reason, .. } => GatewayError::Bind {
                    key,
                    applied,
                    reason,
                },
                other => other,
            })?;
    }
    Ok(())
}

/// Removes the binding for every routing key in `entity.keys`.
pub async fn unbind_keys(session: &dyn BrokerSession, entity: &QueueBindEntity) -> Result<()> {
    for (applied, key) in entity.keys.iter().enumerate() {
        session
            .unbind_queue(&entity.queue, &entity.exchange, key)
            .await
            .map_err(|err| match err {
                GatewayError::Unbind { key, reason, .. } => GatewayError::Unbind {
                    key,
                    applied,
                    reason,
                },
                other => other,
            })?;
    }
    Ok(())
}

/// Publishes each fragment as its own message, sharing the entity's routing
/// metadata. Returns the number of messages published.
pub async fn publish_fragments(
    session: &dyn BrokerSession,
    entity: &MessageEntity,
    fragments: &[String],
) -> Result<usize> {
    let total = fragments.len();
    for (index, fragment) in fragments.iter().enumerate() {
        debug!("publishing fragment {index}/{total}: {fragment}");
        session
            .publish(
                &entity.exchange,
                &entity.routing_key,
                entity.delivery_mode,
                entity.priority,
                fragment.as_bytes(),
            )
            .await
            .map_err(|err| match err {
                GatewayError::Publish { reason, .. } => GatewayError::Publish {
                    index,
                    total,
                    reason,
                },
                other => other,
            })?;
    }
    Ok(total)
}
