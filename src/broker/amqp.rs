//! RabbitMQ implementation of the session traits, built on `lapin`.

use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions, ExchangeDeleteOptions,
    QueueBindOptions, QueueDeclareOptions, QueueDeleteOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::broker::message::{ExchangeEntity, QueueEntity};
use crate::broker::session::{BrokerConnector, BrokerSession, DeliveryStream};
use crate::utils::{GatewayError, Result};

const CONTENT_TYPE: &str = "text/plain";

/// Opens one AMQP connection per session against a fixed broker URI.
#[derive(Debug, Clone)]
pub struct AmqpConnector {
    uri: String,
}

impl AmqpConnector {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

#[async_trait]
impl BrokerConnector for AmqpConnector {
    async fn connect(&self) -> Result<Box<dyn BrokerSession>> {
        let connection = Connection::connect(&self.uri, ConnectionProperties::default())
            .await
            .map_err(|e| {
                error!("[amqp] connect error: {e}");
                GatewayError::Connection(e.to_string())
            })?;

        let channel = match connection.create_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                error!("[amqp] get channel error: {e}");
                if let Err(e) = connection.close(200, "OK").await {
                    warn!("[amqp] close after channel error failed: {e}");
                }
                return Err(GatewayError::Channel(e.to_string()));
            }
        };

        debug!("[amqp] session opened on channel {}", channel.id());
        Ok(Box::new(AmqpSession {
            connection,
            channel,
        }))
    }
}

/// One connection and the single channel derived from it.
pub struct AmqpSession {
    connection: Connection,
    channel: Channel,
}

/// Maps an exchange type name onto the kinds lapin knows, keeping anything
/// else (plugin exchange types) as a custom kind.
pub fn exchange_kind(kind: &str) -> ExchangeKind {
    match kind {
        "direct" => ExchangeKind::Direct,
        "fanout" => ExchangeKind::Fanout,
        "headers" => ExchangeKind::Headers,
        "topic" => ExchangeKind::Topic,
        other => ExchangeKind::Custom(other.to_string()),
    }
}

/// Logs a broker rejection and wraps it into the matching gateway error.
fn rejected(
    op: &'static str,
    wrap: fn(String) -> GatewayError,
) -> impl FnOnce(lapin::Error) -> GatewayError {
    move |e| {
        error!("[amqp] {op} error: {e}");
        wrap(e.to_string())
    }
}

#[async_trait]
impl BrokerSession for AmqpSession {
    async fn declare_exchange(&self, exchange: &ExchangeEntity) -> Result<()> {
        let options = ExchangeDeclareOptions {
            passive: false,
            durable: exchange.durable,
            auto_delete: exchange.auto_delete,
            internal: false,
            nowait: exchange.no_wait,
        };
        self.channel
            .exchange_declare(
                &exchange.name,
                exchange_kind(&exchange.kind),
                options,
                FieldTable::default(),
            )
            .await
            .map_err(rejected("declare exchange", GatewayError::DeclareExchange))
    }

    async fn delete_exchange(&self, name: &str) -> Result<()> {
        self.channel
            .exchange_delete(name, ExchangeDeleteOptions::default())
            .await
            .map_err(rejected("delete exchange", GatewayError::DeleteExchange))
    }

    async fn declare_queue(&self, queue: &QueueEntity) -> Result<()> {
        let options = QueueDeclareOptions {
            passive: false,
            durable: queue.durable,
            exclusive: queue.exclusive,
            auto_delete: queue.auto_delete,
            nowait: queue.no_wait,
        };
        self.channel
            .queue_declare(&queue.name, options, FieldTable::default())
            .await
            .map(|_| ())
            .map_err(rejected("declare queue", GatewayError::DeclareQueue))
    }

    async fn delete_queue(&self, name: &str) -> Result<()> {
        let options = QueueDeleteOptions {
            if_unused: false,
            if_empty: false,
            nowait: false,
        };
        self.channel
            .queue_delete(name, options)
            .await
            .map(|_| ())
            .map_err(rejected("delete queue", GatewayError::DeleteQueue))
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        key: &str,
        no_wait: bool,
    ) -> Result<()> {
        self.channel
            .queue_bind(
                queue,
                exchange,
                key,
                QueueBindOptions { nowait: no_wait },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                error!("[amqp] bind queue error: {e}");
                GatewayError::Bind {
                    key: key.to_string(),
                    applied: 0,
                    reason: e.to_string(),
                }
            })
    }

    async fn unbind_queue(&self, queue: &str, exchange: &str, key: &str) -> Result<()> {
        self.channel
            .queue_unbind(queue, exchange, key, FieldTable::default())
            .await
            .map_err(|e| {
                error!("[amqp] unbind queue error: {e}");
                GatewayError::Unbind {
                    key: key.to_string(),
                    applied: 0,
                    reason: e.to_string(),
                }
            })
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        delivery_mode: u8,
        priority: u8,
        body: &[u8],
    ) -> Result<()> {
        let properties = BasicProperties::default()
            .with_headers(FieldTable::default())
            .with_content_type(CONTENT_TYPE.into())
            .with_delivery_mode(delivery_mode)
            .with_priority(priority);

        // The returned confirmation is dropped: publishing is fire-and-forget.
        self.channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                body,
                properties,
            )
            .await
            .map(|_confirm| ())
            .map_err(|e| {
                error!("[amqp] publish message error: {e}");
                GatewayError::Publish {
                    index: 0,
                    total: 1,
                    reason: e.to_string(),
                }
            })
    }

    async fn consume(&self, queue: &str) -> Result<DeliveryStream> {
        let consumer_tag = format!("rabbit-http-{}", Uuid::new_v4());
        let options = BasicConsumeOptions {
            no_local: false,
            no_ack: true,
            exclusive: false,
            nowait: false,
        };

        let consumer = self
            .channel
            .basic_consume(queue, &consumer_tag, options, FieldTable::default())
            .await
            .map_err(|e| {
                error!("[amqp] consume queue error: {e}");
                GatewayError::Consume {
                    queue: queue.to_string(),
                    reason: e.to_string(),
                }
            })?;

        debug!("[amqp] consumer {consumer_tag} registered on {queue}");
        let queue = queue.to_string();
        let deliveries = consumer.map(move |delivery| {
            delivery
                .map(|delivery| delivery.data)
                .map_err(|e| GatewayError::Consume {
                    queue: queue.clone(),
                    reason: e.to_string(),
                })
        });

        Ok(deliveries.boxed())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.connection
            .close(200, "OK")
            .await
            .map_err(rejected("close", GatewayError::Close))
    }
}
