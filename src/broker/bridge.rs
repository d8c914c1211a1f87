//! Delivery bridge for streaming consumes.
//!
//! Every consumed queue gets a drain task that copies delivery bodies from the
//! broker's push stream into a bounded handoff channel. The HTTP response body
//! reads the other end, one line per delivery. All drain tasks of a request
//! share a cancellation token:
//!
//! - the response body finishes once every drain task has stopped, i.e. when
//!   the broker closed all delivery streams;
//! - dropping the response body (client went away) cancels the token, which
//!   stops the drain tasks, and closes the broker session.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::broker::session::{BrokerSession, DeliveryStream};

/// Per-request conduit between drain tasks and the response writer.
pub struct Handoff {
    tx: mpsc::Sender<Vec<u8>>,
    rx: mpsc::Receiver<Vec<u8>>,
    cancel: CancellationToken,
}

impl Handoff {
    /// `capacity` must be non-zero.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx,
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawns the drain task for one queue's delivery stream.
    pub fn attach(&self, queue: &str, deliveries: DeliveryStream) -> JoinHandle<()> {
        tokio::spawn(drain(
            queue.to_string(),
            deliveries,
            self.tx.clone(),
            self.cancel.clone(),
        ))
    }

    /// Turns the handoff into a response body stream that owns `session`.
    ///
    /// No further queues can be attached afterwards.
    pub fn into_body(self, session: Option<Box<dyn BrokerSession>>) -> DeliveryBody {
        let Handoff { tx, rx, cancel } = self;
        drop(tx);

        DeliveryBody {
            rx,
            _guard: SessionGuard { cancel, session },
        }
    }
}

async fn drain(
    queue: String,
    mut deliveries: DeliveryStream,
    tx: mpsc::Sender<Vec<u8>>,
    cancel: CancellationToken,
) {
    debug!("drain started for queue {queue}");
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = deliveries.next() => next,
        };

        let body = match next {
            Some(Ok(body)) => body,
            Some(Err(e)) => {
                warn!("delivery stream for queue {queue} failed: {e}");
                break;
            }
            None => break,
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            sent = tx.send(body) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
    debug!("drain stopped for queue {queue}");
}

/// Streaming response body: each delivery body followed by a newline.
pub struct DeliveryBody {
    rx: mpsc::Receiver<Vec<u8>>,
    _guard: SessionGuard,
}

impl Stream for DeliveryBody {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx
            .poll_recv(cx)
            .map(|delivery| delivery.map(|body| Ok(line(body))))
    }
}

fn line(mut body: Vec<u8>) -> Bytes {
    body.push(b'\n');
    Bytes::from(body)
}

/// Cancels the drain tasks and closes the session when the body goes away.
struct SessionGuard {
    cancel: CancellationToken,
    session: Option<Box<dyn BrokerSession>>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.cancel.cancel();

        let Some(session) = self.session.take() else {
            return;
        };
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        warn!("closing streaming session failed: {e}");
                    }
                    debug!("streaming session closed");
                });
            }
            Err(_) => warn!("no runtime left to close streaming session"),
        }
    }
}
