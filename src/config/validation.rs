//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check namespace identity (unique names, one passthrough, no shared mounts)
//! - Validate backends, route patterns, rewrite targets and methods
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Reuses the routing parsers, so a valid config always compiles

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;

use crate::config::schema::{GatewayConfig, NamespaceConfig, TransportConfig};
use crate::routing::method::{InvalidMethod, MethodFilter};
use crate::routing::namespace::{Mount, MountError};
use crate::routing::pattern::{PatternError, RewriteError, RoutePattern};
use crate::routing::upstream::{Upstream, UpstreamError};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("namespace #{0} has no name")]
    EmptyNamespaceName(usize),

    #[error("namespace {0} is defined more than once")]
    DuplicateNamespace(String),

    #[error("namespaces {first} and {second} are both passthrough (no mounts)")]
    MultiplePassthrough { first: String, second: String },

    #[error("namespace {namespace}: {source}")]
    Mount {
        namespace: String,
        source: MountError,
    },

    #[error("mount {mount:?} is shared by namespaces {first} and {second}")]
    DuplicateMount {
        mount: String,
        first: String,
        second: String,
    },

    #[error("namespace {namespace}: {source}")]
    Backend {
        namespace: String,
        source: UpstreamError,
    },

    #[error("namespace {namespace}: {source}")]
    Pattern {
        namespace: String,
        source: PatternError,
    },

    #[error("namespace {namespace}, route {pattern}: {source}")]
    Rewrite {
        namespace: String,
        pattern: String,
        source: RewriteError,
    },

    #[error("namespace {namespace}, route {pattern}: {source}")]
    Method {
        namespace: String,
        pattern: String,
        source: InvalidMethod,
    },

    #[error("{field} must be greater than zero")]
    Zero { field: String },

    #[error("{field} is not a valid socket address: {value:?}")]
    Address { field: &'static str, value: String },

    #[error("headers.default_accept_encoding {0:?} is not a valid header value")]
    AcceptEncoding(String),
}

/// Validate the whole configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_address(
        "listener.bind_address",
        &config.listener.bind_address,
        &mut errors,
    );
    if config.observability.metrics_enabled {
        validate_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    if config.listener.max_body_size == 0 {
        errors.push(zero("listener.max_body_size"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(zero("timeouts.request_secs"));
    }
    if config.shutdown.grace_period_secs == 0 {
        errors.push(zero("shutdown.grace_period_secs"));
    }
    validate_transport("transport", &config.transport, &mut errors);

    if HeaderValue::from_str(&config.headers.default_accept_encoding).is_err() {
        errors.push(ValidationError::AcceptEncoding(
            config.headers.default_accept_encoding.clone(),
        ));
    }

    validate_namespaces(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn zero(field: &str) -> ValidationError {
    ValidationError::Zero {
        field: field.to_string(),
    }
}

fn validate_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field,
            value: value.to_string(),
        });
    }
}

fn validate_transport(scope: &str, transport: &TransportConfig, errors: &mut Vec<ValidationError>) {
    if transport.connect_timeout_ms == 0 {
        errors.push(zero(&format!("{scope}.connect_timeout_ms")));
    }
    if transport.response_timeout_ms == 0 {
        errors.push(zero(&format!("{scope}.response_timeout_ms")));
    }
}

fn validate_namespaces(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    let mut names: HashMap<&str, usize> = HashMap::new();
    let mut mounts: HashMap<Mount, &str> = HashMap::new();
    let mut passthrough: Option<&str> = None;

    for (index, ns) in config.namespaces.iter().enumerate() {
        if ns.name.trim().is_empty() {
            errors.push(ValidationError::EmptyNamespaceName(index));
        } else if names.insert(&ns.name, index).is_some() {
            errors.push(ValidationError::DuplicateNamespace(ns.name.clone()));
        }

        if ns.mounts.is_empty() {
            match passthrough {
                Some(first) => errors.push(ValidationError::MultiplePassthrough {
                    first: first.to_string(),
                    second: ns.name.clone(),
                }),
                None => passthrough = Some(&ns.name),
            }
        }

        for raw in &ns.mounts {
            match Mount::parse(raw) {
                Ok(mount) => {
                    if let Some(first) = mounts.insert(mount, &ns.name) {
                        errors.push(ValidationError::DuplicateMount {
                            mount: raw.clone(),
                            first: first.to_string(),
                            second: ns.name.clone(),
                        });
                    }
                }
                Err(source) => errors.push(ValidationError::Mount {
                    namespace: ns.name.clone(),
                    source,
                }),
            }
        }

        if let Err(source) = Upstream::parse(&ns.backend) {
            errors.push(ValidationError::Backend {
                namespace: ns.name.clone(),
                source,
            });
        }

        if let Some(overrides) = &ns.transport {
            let merged = config.transport.merge(Some(overrides));
            validate_transport(&format!("namespaces.{}.transport", ns.name), &merged, errors);
        }

        validate_routes(ns, errors);
    }
}

fn validate_routes(ns: &NamespaceConfig, errors: &mut Vec<ValidationError>) {
    for route in &ns.routes {
        match RoutePattern::parse(&route.pattern, route.kind.map(Into::into)) {
            Ok(pattern) => {
                if let Some(Err(source)) = route
                    .rewrite
                    .as_deref()
                    .map(|target| pattern.check_rewrite(target))
                {
                    errors.push(ValidationError::Rewrite {
                        namespace: ns.name.clone(),
                        pattern: route.pattern.clone(),
                        source,
                    });
                }
            }
            Err(source) => errors.push(ValidationError::Pattern {
                namespace: ns.name.clone(),
                source,
            }),
        }

        if let Err(source) = MethodFilter::parse(route.methods.as_slice()) {
            errors.push(ValidationError::Method {
                namespace: ns.name.clone(),
                pattern: route.pattern.clone(),
                source,
            });
        }

        if let Some(backend) = &route.backend {
            if let Err(source) = Upstream::parse(backend) {
                errors.push(ValidationError::Backend {
                    namespace: ns.name.clone(),
                    source,
                });
            }
        }
    }
}
