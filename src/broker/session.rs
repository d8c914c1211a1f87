//! Broker session abstraction.
//!
//! A session is one connection plus one channel, opened for a single HTTP
//! request and closed when that request is done. Handlers only see these
//! traits; [`crate::broker::amqp`] provides the RabbitMQ implementation.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::broker::message::{ExchangeEntity, QueueEntity};
use crate::utils::Result;

/// Push stream of raw message bodies for one consumer.
///
/// The stream ends when the broker closes the channel or connection; an `Err`
/// item reports a broken delivery stream and is followed by no more items.
pub type DeliveryStream = BoxStream<'static, Result<Vec<u8>>>;

/// Opens new broker sessions.
#[async_trait]
pub trait BrokerConnector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Box<dyn BrokerSession>>;
}

#[async_trait]
pub trait BrokerSession: Send + Sync {
    async fn declare_exchange(&self, exchange: &ExchangeEntity) -> Result<()>;

    async fn delete_exchange(&self, name: &str) -> Result<()>;

    /// Declares a queue; whatever the broker reports about it is discarded.
    async fn declare_queue(&self, queue: &QueueEntity) -> Result<()>;

    /// Deletes a queue even if it still has consumers or messages.
    async fn delete_queue(&self, name: &str) -> Result<()>;

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        key: &str,
        no_wait: bool,
    ) -> Result<()>;

    async fn unbind_queue(&self, queue: &str, exchange: &str, key: &str) -> Result<()>;

    /// Publishes one message without waiting for a broker confirmation.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        delivery_mode: u8,
        priority: u8,
        body: &[u8],
    ) -> Result<()>;

    /// Registers an auto-acknowledging consumer on `queue`.
    async fn consume(&self, queue: &str) -> Result<DeliveryStream>;

    /// Closes the connection, and with it the channel.
    async fn close(self: Box<Self>) -> Result<()>;
}
