//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Inbound request timeouts.
    pub timeouts: TimeoutConfig,

    /// Upstream client defaults shared by every namespace.
    pub transport: TransportConfig,

    /// Outbound header behaviour.
    pub headers: HeaderPolicyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Namespace definitions, in declaration order.
    pub namespaces: Vec<NamespaceConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8888").
    pub bind_address: String,

    /// Maximum inbound request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8888".to_string(),
            max_body_size: 10 * 1024 * 1024,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for one inbound request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Upstream client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Deadline for the backend to produce response headers, in milliseconds.
    pub response_timeout_ms: u64,

    /// How long idle pooled connections are kept, in seconds.
    pub pool_idle_timeout_secs: u64,

    /// Maximum idle pooled connections per backend host.
    pub pool_max_idle_per_host: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            response_timeout_ms: 30_000,
            pool_idle_timeout_secs: 90,
            pool_max_idle_per_host: 32,
        }
    }
}

impl TransportConfig {
    /// Apply a namespace override on top of these defaults.
    pub fn merge(&self, overrides: Option<&TransportOverride>) -> TransportConfig {
        let Some(o) = overrides else {
            return self.clone();
        };
        TransportConfig {
            connect_timeout_ms: o.connect_timeout_ms.unwrap_or(self.connect_timeout_ms),
            response_timeout_ms: o.response_timeout_ms.unwrap_or(self.response_timeout_ms),
            pool_idle_timeout_secs: o.pool_idle_timeout_secs.unwrap_or(self.pool_idle_timeout_secs),
            pool_max_idle_per_host: o.pool_max_idle_per_host.unwrap_or(self.pool_max_idle_per_host),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}

/// Per-namespace transport override. Unset fields inherit `[transport]`.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TransportOverride {
    pub connect_timeout_ms: Option<u64>,
    pub response_timeout_ms: Option<u64>,
    pub pool_idle_timeout_secs: Option<u64>,
    pub pool_max_idle_per_host: Option<usize>,
}

/// Outbound header behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderPolicyConfig {
    /// Inject X-Forwarded-For/-Host/-Proto towards the backend.
    pub forwarded_for: bool,

    /// Accept-Encoding sent when the client did not send one.
    pub default_accept_encoding: String,
}

impl Default for HeaderPolicyConfig {
    fn default() -> Self {
        Self {
            forwarded_for: false,
            default_accept_encoding: "gzip".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Time allowed for in-flight requests to drain, in seconds.
    pub grace_period_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { grace_period_secs: 30 }
    }
}

/// A logical group of routes selected by host and/or path prefix.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NamespaceConfig {
    /// Namespace identifier for logging/metrics.
    pub name: String,

    /// Where the namespace is reachable: `"host"`, `"/prefix"` or `"host/prefix"`.
    /// A namespace without mounts is the passthrough namespace.
    pub mounts: Vec<String>,

    /// Default backend base URL (e.g., "http://127.0.0.1:3000").
    pub backend: String,

    /// Forward the client's Host header instead of the backend's.
    pub retain_host: bool,

    /// Forward the original request path, namespace prefix included.
    pub no_rewrite_path: bool,

    /// Upstream client overrides for this namespace.
    pub transport: Option<TransportOverride>,

    /// Routes, in declaration order.
    pub routes: Vec<RouteConfig>,
}

/// Route configuration within a namespace.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RouteConfig {
    /// Path pattern, e.g. `/users`, `/users/{$}`, `/users/{id}` or `/files/*`.
    pub pattern: String,

    /// Explicit pattern kind; inferred from the pattern when omitted.
    #[serde(default)]
    pub kind: Option<RouteKindConfig>,

    /// Rewrite target template. `*` marks where the capture goes and
    /// `{name}` where a named segment goes.
    #[serde(default)]
    pub rewrite: Option<String>,

    /// Allowed methods. Empty allows every method.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Backend override for this route.
    #[serde(default)]
    pub backend: Option<String>,
}

/// Route kind as written in configuration.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RouteKindConfig {
    Terminated,
    Prefix,
    Wildcard,
}
