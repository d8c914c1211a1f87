//! HTTP server: route table, shared state and the listener loop.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tracing::info;

use crate::broker::session::BrokerConnector;
use crate::config::Settings;
use crate::transport::handlers;

/// State shared by every handler.
///
/// Only the connector is shared; each request still opens its own session.
#[derive(Clone)]
pub struct AppState {
    pub connector: Arc<dyn BrokerConnector>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(connector: Arc<dyn BrokerConnector>, settings: Settings) -> Self {
        Self {
            connector,
            settings: Arc::new(settings),
        }
    }
}

/// Builds the route table. Methods not listed for a path get an empty
/// `405 Method Not Allowed`; `HEAD /queue` is refused by the consume handler.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/exchange",
            post(handlers::declare_exchange).delete(handlers::delete_exchange),
        )
        .route(
            "/queue",
            get(handlers::consume_queue)
                .post(handlers::declare_queue)
                .delete(handlers::delete_queue),
        )
        .route(
            "/queue/bind",
            post(handlers::bind_queue).delete(handlers::unbind_queue),
        )
        .route("/publish", post(handlers::publish))
        .with_state(state)
}

/// Serves the gateway on `listener`. Runs until the listener fails.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!(
        "server run {addr} (broker {})",
        state.settings.redacted_broker_uri()
    );

    axum::serve(listener, router(state)).await
}
