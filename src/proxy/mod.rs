//! Request pipeline from routing decision to relayed response.
//!
//! # Data Flow
//! ```text
//! Request (host, method, raw path, query, headers, body)
//!     → routing::Router (namespace, route, method filter)
//!     → rewrite.rs (outbound path)
//!     → headers.rs (outbound header policy)
//!     → forwarder.rs (pooled client, response deadline)
//!     → hop-by-hop headers stripped, response relayed as-is
//! ```
//!
//! # Design Decisions
//! - A `Gateway` is one immutable snapshot; reloads build a new one
//! - The query string is copied byte for byte, never parsed
//! - The inbound body is streamed to the backend without buffering

pub mod forwarder;
pub mod headers;
pub mod rewrite;

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Uri};
use axum::response::Response;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::error::GatewayError;
use crate::routing::{BuildError, Router};

pub use forwarder::Forwarder;
pub use headers::{HeaderPolicy, OutboundContext};

/// Errors building a gateway snapshot from validated configuration.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("routing: {0}")]
    Routing(#[from] BuildError),

    #[error("headers.default_accept_encoding: {0}")]
    Header(#[from] header::InvalidHeaderValue),
}

/// Routing table, upstream clients and header policy for one configuration.
#[derive(Debug)]
pub struct Gateway {
    router: Router,
    /// Indexed like `router.namespaces()`.
    forwarders: Vec<Forwarder>,
    headers: HeaderPolicy,
}

/// Result of running a request through the gateway.
pub struct Outcome {
    /// Namespace that handled the request, when one was resolved.
    pub namespace: Option<String>,
    pub result: Result<Response, GatewayError>,
}

impl Gateway {
    pub fn from_config(config: &GatewayConfig) -> Result<Self, SnapshotError> {
        let router = Router::from_config(&config.namespaces, &config.transport)?;
        let forwarders = router
            .namespaces()
            .iter()
            .map(|ns| Forwarder::new(&ns.transport))
            .collect();
        let headers = HeaderPolicy::from_config(&config.headers)?;

        Ok(Self {
            router,
            forwarders,
            headers,
        })
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Route, rewrite and forward one request.
    pub async fn handle(&self, request: Request<Body>, client: Option<SocketAddr>) -> Outcome {
        let (parts, body) = request.into_parts();

        let inbound_host = parts.headers.get(header::HOST).cloned().or_else(|| {
            parts
                .uri
                .authority()
                .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
        });
        let host = inbound_host.as_ref().and_then(|h| h.to_str().ok());
        // authority-form targets (CONNECT) carry no path
        let path = match parts.uri.path() {
            "" => "/",
            path => path,
        };

        let matched = match self.router.route(host, &parts.method, path) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::debug!(host = ?host, method = %parts.method, path = %path, error = %e, "Routing miss");
                let namespace = match &e {
                    GatewayError::RouteNotFound { namespace, .. }
                    | GatewayError::MethodNotAllowed { namespace, .. } => Some(namespace.clone()),
                    _ => None,
                };
                return Outcome {
                    namespace,
                    result: Err(e),
                };
            }
        };

        let namespace = matched.namespace.name.clone();
        let upstream = matched.upstream();
        let outbound_path = rewrite::outbound_path(&matched, path);
        let url = upstream.url_for(&outbound_path, parts.uri.query());

        tracing::debug!(
            namespace = %namespace,
            route = %matched.route.pattern,
            method = %parts.method,
            path = %path,
            upstream = %url,
            "Routing decision"
        );

        let uri: Uri = match url.parse() {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(uri = %url, error = %e, "Rewritten URI is invalid");
                return Outcome {
                    namespace: Some(namespace),
                    result: Err(GatewayError::InvalidUpstreamUri {
                        uri: url,
                        reason: e.to_string(),
                    }),
                };
            }
        };

        let mut headers = parts.headers;
        let ctx = OutboundContext {
            inbound_host: inbound_host.as_ref(),
            upstream_host: upstream.host_header(),
            retain_host: matched.namespace.retain_host,
            client_ip: client.map(|addr| addr.ip()),
        };
        self.headers.apply_outbound(&mut headers, &ctx);

        let mut outbound = Request::new(body);
        *outbound.method_mut() = parts.method.clone();
        *outbound.uri_mut() = uri;
        *outbound.headers_mut() = headers;

        let upstream_label = upstream.to_string();
        let result = self.forwarders[matched.index]
            .forward(outbound, &upstream_label)
            .await
            .map(|response| {
                let (mut head, body) = response.into_parts();
                headers::strip_hop_by_hop(&mut head.headers);
                Response::from_parts(head, Body::new(body))
            });

        Outcome {
            namespace: Some(namespace),
            result,
        }
    }
}
