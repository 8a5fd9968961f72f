//! Per-request gateway errors and their client-facing responses.
//!
//! # Design Decisions
//! - Routing failures (404/405) are configuration mismatches and never retried
//! - Upstream failures surface as 502/504, never as a silent success
//! - Bodies are short plain-text messages

use std::time::Duration;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no namespace for host {host:?} and path {path}")]
    NamespaceNotFound { host: Option<String>, path: String },

    #[error("no route in namespace {namespace} for path {path}")]
    RouteNotFound { namespace: String, path: String },

    #[error("method {method} not allowed in namespace {namespace}")]
    MethodNotAllowed {
        namespace: String,
        method: Method,
        allowed: Vec<Method>,
    },

    #[error("upstream {upstream} unavailable: {reason}")]
    UpstreamUnavailable { upstream: String, reason: String },

    #[error("upstream {upstream} did not respond within {timeout:?}")]
    UpstreamTimeout { upstream: String, timeout: Duration },

    #[error("invalid upstream uri {uri}: {reason}")]
    InvalidUpstreamUri { uri: String, reason: String },
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NamespaceNotFound { .. } | GatewayError::RouteNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::InvalidUpstreamUri { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> &'static str {
        match self {
            GatewayError::NamespaceNotFound { .. } => "No matching namespace found",
            GatewayError::RouteNotFound { .. } => "No matching route found",
            GatewayError::MethodNotAllowed { .. } => "Method not allowed",
            GatewayError::UpstreamUnavailable { .. } => "Upstream request failed",
            GatewayError::UpstreamTimeout { .. } => "Upstream request timed out",
            GatewayError::InvalidUpstreamUri { .. } => "Internal gateway error",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.body()).into_response();
        if let GatewayError::MethodNotAllowed { allowed, .. } = &self {
            let allow = allowed
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(header::ALLOW, value);
            }
        }
        response
    }
}
