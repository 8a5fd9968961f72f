//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a catch-all handler
//! - Wire up middleware (tracing, timeout, body limit)
//! - Bind server to listener and drain on shutdown
//! - Swap in new gateway snapshots on config reload
//! - Record request metrics
//!
//! # Design Decisions
//! - The handler is the router's fallback so every path and method reaches it
//! - Each request loads the current snapshot once and keeps it to completion
//! - Listener, timeout and body-limit settings are fixed at startup; reloads
//!   replace namespaces, transport and header policy

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::schema::GatewayConfig;
use crate::observability::metrics::{self, NO_NAMESPACE};
use crate::observability::tracing::make_request_span;
use crate::proxy::{Gateway, SnapshotError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ArcSwap<Gateway>>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    gateway: Arc<ArcSwap<Gateway>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, SnapshotError> {
        let gateway = Arc::new(ArcSwap::from_pointee(Gateway::from_config(&config)?));
        let state = AppState {
            gateway: gateway.clone(),
        };
        let router = Self::build_router(&config, state);

        Ok(Self {
            router,
            config,
            gateway,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<Body>))
    }

    /// Run the server until `shutdown` fires, applying `config_updates` as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            namespaces = self.gateway.load().router().namespaces().len(),
            "HTTP server starting"
        );

        let reloader = tokio::spawn(apply_updates(self.gateway.clone(), config_updates));

        let grace = Duration::from_secs(self.config.shutdown.grace_period_secs);
        let mut deadline = shutdown.resubscribe();

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .into_future();

        tokio::select! {
            result = server => result?,
            _ = async {
                let _ = deadline.recv().await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(grace_period_secs = grace.as_secs(), "Grace period elapsed, dropping in-flight requests");
            }
        }

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config the server was started with.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Handle to the live snapshot.
    pub fn gateway(&self) -> Arc<ArcSwap<Gateway>> {
        self.gateway.clone()
    }
}

/// Compile each received config and swap it in. Failures keep the current snapshot.
async fn apply_updates(
    gateway: Arc<ArcSwap<Gateway>>,
    mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
) {
    while let Some(config) = updates.recv().await {
        match Gateway::from_config(&config) {
            Ok(next) => {
                gateway.store(Arc::new(next));
                tracing::info!(
                    namespaces = config.namespaces.len(),
                    "Configuration reloaded"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Rejected reloaded configuration, keeping current snapshot");
            }
        }
    }
}

/// Catch-all handler: route, rewrite, forward.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let gateway = state.gateway.load_full();
    let outcome = gateway.handle(request, client).await;

    let response = match outcome.result {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };

    metrics::record_request(
        &method,
        response.status().as_u16(),
        outcome.namespace.as_deref().unwrap_or(NO_NAMESPACE),
        start,
    );
    response
}
