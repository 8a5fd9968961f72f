//! Upstream forwarding.
//!
//! # Responsibilities
//! - Own one pooled HTTP client per namespace
//! - Send the prepared request, bounded by the response deadline
//! - Map transport failures to 502/504
//!
//! # Design Decisions
//! - Redirects are never followed; the client does not implement them
//! - Bodies stream in both directions, nothing is buffered
//! - Dropping the returned future aborts the upstream call

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::{TokioExecutor, TokioTimer};

use crate::config::schema::TransportConfig;
use crate::error::GatewayError;

/// Pooled client used to reach backends.
pub type HttpClient = Client<HttpConnector, Body>;

/// Sends requests for one namespace.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: HttpClient,
    response_timeout: Duration,
}

impl Forwarder {
    pub fn new(transport: &TransportConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(transport.connect_timeout()));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(transport.pool_idle_timeout())
            .pool_max_idle_per_host(transport.pool_max_idle_per_host)
            .build(connector);

        Self {
            client,
            response_timeout: transport.response_timeout(),
        }
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// Send `request` and wait for the response head.
    ///
    /// `upstream` only labels errors and logs.
    pub async fn forward(
        &self,
        request: Request<Body>,
        upstream: &str,
    ) -> Result<Response<Incoming>, GatewayError> {
        match tokio::time::timeout(self.response_timeout, self.client.request(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                let reason = match std::error::Error::source(&e) {
                    Some(source) => format!("{e}: {source}"),
                    None => e.to_string(),
                };
                tracing::warn!(upstream = %upstream, error = %reason, "Upstream request failed");
                Err(GatewayError::UpstreamUnavailable {
                    upstream: upstream.to_string(),
                    reason,
                })
            }
            Err(_) => {
                tracing::warn!(
                    upstream = %upstream,
                    timeout_ms = self.response_timeout.as_millis() as u64,
                    "Upstream request timed out"
                );
                Err(GatewayError::UpstreamTimeout {
                    upstream: upstream.to_string(),
                    timeout: self.response_timeout,
                })
            }
        }
    }
}
