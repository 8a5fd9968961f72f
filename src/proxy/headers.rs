//! Outbound and relayed header policy.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Suppress or populate X-Forwarded-* per configuration
//! - Default Accept-Encoding when the client sent none
//! - Choose the Host header (client's or backend's)
//!
//! # Design Decisions
//! - Response bodies are relayed verbatim; Accept-Encoding only negotiates
//! - X-Forwarded-* from the client is never trusted unless injection is enabled

use std::net::IpAddr;

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};

use crate::config::schema::HeaderPolicyConfig;

static KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");
static PROXY_CONNECTION: HeaderName = HeaderName::from_static("proxy-connection");
static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
static X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
static X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in named {
        headers.remove(name);
    }

    for name in [
        &header::CONNECTION,
        &KEEP_ALIVE,
        &PROXY_CONNECTION,
        &header::PROXY_AUTHENTICATE,
        &header::PROXY_AUTHORIZATION,
        &header::TE,
        &header::TRAILER,
        &header::TRANSFER_ENCODING,
        &header::UPGRADE,
    ] {
        headers.remove(name);
    }
}

/// Request facts the policy needs besides the headers themselves.
#[derive(Debug, Clone)]
pub struct OutboundContext<'a> {
    /// Host the client addressed (Host header or URI authority).
    pub inbound_host: Option<&'a HeaderValue>,
    /// The backend's own authority.
    pub upstream_host: &'a HeaderValue,
    pub retain_host: bool,
    pub client_ip: Option<IpAddr>,
}

/// Compiled header policy, shared by every request of a snapshot.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    forwarded_for: bool,
    default_accept_encoding: Option<HeaderValue>,
}

impl HeaderPolicy {
    pub fn from_config(config: &HeaderPolicyConfig) -> Result<Self, InvalidHeaderValue> {
        let default_accept_encoding = if config.default_accept_encoding.is_empty() {
            None
        } else {
            Some(HeaderValue::from_str(&config.default_accept_encoding)?)
        };
        Ok(Self {
            forwarded_for: config.forwarded_for,
            default_accept_encoding,
        })
    }

    /// Rewrite inbound headers in place into the headers sent to the backend.
    pub fn apply_outbound(&self, headers: &mut HeaderMap, ctx: &OutboundContext<'_>) {
        strip_hop_by_hop(headers);

        if self.forwarded_for {
            self.inject_forwarded(headers, ctx);
        } else {
            headers.remove(&X_FORWARDED_FOR);
            headers.remove(&X_FORWARDED_HOST);
            headers.remove(&X_FORWARDED_PROTO);
        }

        if let Some(default) = &self.default_accept_encoding {
            if !headers.contains_key(header::ACCEPT_ENCODING) {
                headers.insert(header::ACCEPT_ENCODING, default.clone());
            }
        }

        let host = match (ctx.retain_host, ctx.inbound_host) {
            (true, Some(inbound)) => inbound.clone(),
            _ => ctx.upstream_host.clone(),
        };
        headers.insert(header::HOST, host);
    }

    fn inject_forwarded(&self, headers: &mut HeaderMap, ctx: &OutboundContext<'_>) {
        if let Some(ip) = ctx.client_ip {
            let prior: Vec<&str> = headers
                .get_all(&X_FORWARDED_FOR)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect();
            let chain = if prior.is_empty() {
                ip.to_string()
            } else {
                format!("{}, {}", prior.join(", "), ip)
            };
            if let Ok(value) = HeaderValue::from_str(&chain) {
                headers.insert(&X_FORWARDED_FOR, value);
            }
        }

        if let Some(host) = ctx.inbound_host {
            headers.insert(&X_FORWARDED_HOST, host.clone());
        }
        headers.insert(&X_FORWARDED_PROTO, HeaderValue::from_static("http"));
    }
}
