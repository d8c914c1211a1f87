//! In-memory stand-in for RabbitMQ used by unit tests.
//!
//! Every connector and session call is appended to a shared journal so tests
//! can assert on exactly which broker operations ran, and in which order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::broker::message::{ExchangeEntity, QueueEntity};
use crate::broker::session::{BrokerConnector, BrokerSession, DeliveryStream};
use crate::utils::{GatewayError, Result};

const REJECTION: &str = "rejected by test broker";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    DeclareExchange(ExchangeEntity),
    DeleteExchange(String),
    DeclareQueue(QueueEntity),
    DeleteQueue(String),
    Bind {
        queue: String,
        exchange: String,
        key: String,
        no_wait: bool,
    },
    Unbind {
        queue: String,
        exchange: String,
        key: String,
    },
    Publish {
        exchange: String,
        routing_key: String,
        delivery_mode: u8,
        priority: u8,
        body: String,
    },
    Consume(String),
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Connect,
    DeclareExchange,
    DeleteExchange,
    DeclareQueue,
    DeleteQueue,
    Bind,
    Unbind,
    Publish,
    Consume,
    Close,
}

impl Call {
    pub fn kind(&self) -> CallKind {
        match self {
            Call::Connect => CallKind::Connect,
            Call::DeclareExchange(_) => CallKind::DeclareExchange,
            Call::DeleteExchange(_) => CallKind::DeleteExchange,
            Call::DeclareQueue(_) => CallKind::DeclareQueue,
            Call::DeleteQueue(_) => CallKind::DeleteQueue,
            Call::Bind { .. } => CallKind::Bind,
            Call::Unbind { .. } => CallKind::Unbind,
            Call::Publish { .. } => CallKind::Publish,
            Call::Consume(_) => CallKind::Consume,
            Call::Close => CallKind::Close,
        }
    }
}

#[derive(Default)]
struct Shared {
    journal: Vec<Call>,
    /// Fail the n-th (zero-based) call of the given kind.
    failure: Option<(CallKind, usize)>,
    feeds: HashMap<String, mpsc::UnboundedReceiver<Vec<u8>>>,
}

#[derive(Clone, Default)]
pub struct RecordingBroker {
    shared: Arc<Mutex<Shared>>,
}

impl RecordingBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `nth` (zero-based) call of `kind` fail.
    pub fn failing(self, kind: CallKind, nth: usize) -> Self {
        self.shared.lock().unwrap().failure = Some((kind, nth));
        self
    }

    /// Registers a delivery feed for `queue`; the next consumer on that queue
    /// receives whatever is sent, and its stream ends when the sender drops.
    pub fn feed(&self, queue: &str) -> mpsc::UnboundedSender<Vec<u8>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared
            .lock()
            .unwrap()
            .feeds
            .insert(queue.to_string(), rx);
        tx
    }

    pub fn calls(&self) -> Vec<Call> {
        self.shared.lock().unwrap().journal.clone()
    }

    pub fn count(&self, kind: CallKind) -> usize {
        self.calls().iter().filter(|c| c.kind() == kind).count()
    }

    /// Records `call` and reports whether it was selected to fail.
    fn record(&self, call: Call) -> bool {
        let mut shared = self.shared.lock().unwrap();
        let kind = call.kind();
        let seen = shared.journal.iter().filter(|c| c.kind() == kind).count();
        shared.journal.push(call);
        shared.failure == Some((kind, seen))
    }

    fn take_feed(&self, queue: &str) -> Option<mpsc::UnboundedReceiver<Vec<u8>>> {
        self.shared.lock().unwrap().feeds.remove(queue)
    }
}

#[async_trait]
impl BrokerConnector for RecordingBroker {
    async fn connect(&self) -> Result<Box<dyn BrokerSession>> {
        if self.record(Call::Connect) {
            return Err(GatewayError::Connection(REJECTION.to_string()));
        }
        Ok(Box::new(RecordingSession {
            broker: self.clone(),
        }))
    }
}

pub struct RecordingSession {
    broker: RecordingBroker,
}

impl RecordingSession {
    fn check(&self, call: Call, err: impl FnOnce() -> GatewayError) -> Result<()> {
        if self.broker.record(call) {
            Err(err())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BrokerSession for RecordingSession {
    async fn declare_exchange(&self, exchange: &ExchangeEntity) -> Result<()> {
        self.check(Call::DeclareExchange(exchange.clone()), || {
            GatewayError::DeclareExchange(REJECTION.to_string())
        })
    }

    async fn delete_exchange(&self, name: &str) -> Result<()> {
        self.check(Call::DeleteExchange(name.to_string()), || {
            GatewayError::DeleteExchange(REJECTION.to_string())
        })
    }

    async fn declare_queue(&self, queue: &QueueEntity) -> Result<()> {
        self.check(Call::DeclareQueue(queue.clone()), || {
            GatewayError::DeclareQueue(REJECTION.to_string())
        })
    }

    async fn delete_queue(&self, name: &str) -> Result<()> {
        self.check(Call::DeleteQueue(name.to_string()), || {
            GatewayError::DeleteQueue(REJECTION.to_string())
        })
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        key: &str,
        no_wait: bool,
    ) -> Result<()> {
        let call = Call::Bind {
            queue: queue.to_string(),
            exchange: exchange.to_string(),
            key: key.to_string(),
            no_wait,
        };
        self.check(call, || GatewayError::Bind {
            key: key.to_string(),
            applied: 0,
            reason: REJECTION.to_string(),
        })
    }

    async fn unbind_queue(&self, queue: &str, exchange: &str, key: &str) -> Result<()> {
        let call = Call::Unbind {
            queue: queue.to_string(),
            exchange: exchange.to_string(),
            key: key.to_string(),
        };
        self.check(call, || GatewayError::Unbind {
            key: key.to_string(),
            applied: 0,
            reason: REJECTION.to_string(),
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
        let call = Call::Publish {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            delivery_mode,
            priority,
            body: String::from_utf8_lossy(body).into_owned(),
        };
        self.check(call, || GatewayError::Publish {
            index: 0,
            total: 1,
            reason: REJECTION.to_string(),
        })
    }

    async fn consume(&self, queue: &str) -> Result<DeliveryStream> {
        self.check(Call::Consume(queue.to_string()), || GatewayError::Consume {
            queue: queue.to_string(),
            reason: REJECTION.to_string(),
        })?;

        let Some(rx) = self.broker.take_feed(queue) else {
            return Ok(futures::stream::pending::<Result<Vec<u8>>>().boxed());
        };
        let deliveries = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|body| (Ok(body), rx))
        });
        Ok(deliveries.boxed())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.check(Call::Close, || GatewayError::Close(REJECTION.to_string()))
    }
}
