//! Per-request spans.
//!
//! # Responsibilities
//! - Open one span per inbound request with a generated correlation id
//! - Keep the id local: it is logged, never forwarded to the backend

use axum::http::Request;
use tracing::Span;
use uuid::Uuid;

/// Span factory for `TraceLayer::make_span_with`.
pub fn make_request_span<B>(request: &Request<B>) -> Span {
    tracing::info_span!(
        "request",
        id = %Uuid::new_v4(),
        method = %request.method(),
        uri = %request.uri(),
    )
}
