//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Compile namespace configuration into an immutable snapshot
//! - Resolve a request to its namespace, then to a route
//! - Return the matched route or an explicit routing error
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) host lookup via HashMap, O(n) prefix scan for path mounts
//! - Explicit errors rather than a silent default

use axum::http::Method;
use thiserror::Error;

use crate::config::schema::{NamespaceConfig, TransportConfig};
use crate::error::GatewayError;
use crate::routing::matcher::{Captures, MatchFailure, Route, RouteTable};
use crate::routing::method::{InvalidMethod, MethodFilter};
use crate::routing::namespace::{Mount, MountError, Namespace, NamespaceResolver};
use crate::routing::pattern::{PatternError, RewriteError, RoutePattern};
use crate::routing::upstream::{Upstream, UpstreamError};

/// Errors compiling configuration into a [`Router`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("namespace {namespace}: {source}")]
    Mount {
        namespace: String,
        source: MountError,
    },

    #[error("namespace {namespace}: {source}")]
    Upstream {
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

    #[error("namespaces {first} and {second} are both passthrough (no mounts)")]
    DuplicatePassthrough { first: String, second: String },
}

/// The outcome of routing one request.
#[derive(Debug, Clone)]
pub struct RouteMatch<'r, 'p> {
    /// Index of the namespace in the router, stable for one snapshot.
    pub index: usize,
    pub namespace: &'r Namespace,
    pub route: &'r Route,
    /// Path after mount prefix removal.
    pub stripped: &'p str,
    /// Raw named segments and remainder, still percent-encoded.
    pub captures: Captures<'p>,
}

impl RouteMatch<'_, '_> {
    /// The route's backend override, else the namespace default.
    pub fn upstream(&self) -> &Upstream {
        self.route
            .upstream
            .as_ref()
            .unwrap_or(&self.namespace.upstream)
    }
}

/// Compiled routing table for every namespace.
#[derive(Debug, Default)]
pub struct Router {
    namespaces: Vec<Namespace>,
    resolver: NamespaceResolver,
}

impl Router {
    /// Compile namespaces in declaration order.
    pub fn from_config(
        namespaces: &[NamespaceConfig],
        transport: &TransportConfig,
    ) -> Result<Self, BuildError> {
        let mut resolver = NamespaceResolver::new();
        let mut compiled = Vec::with_capacity(namespaces.len());
        let mut passthrough: Option<&str> = None;

        for (index, ns) in namespaces.iter().enumerate() {
            if ns.mounts.is_empty() {
                if let Some(first) = passthrough {
                    return Err(BuildError::DuplicatePassthrough {
                        first: first.to_string(),
                        second: ns.name.clone(),
                    });
                }
                passthrough = Some(&ns.name);
                resolver.set_passthrough(index);
            }
            for raw in &ns.mounts {
                let mount = Mount::parse(raw).map_err(|source| BuildError::Mount {
                    namespace: ns.name.clone(),
                    source,
                })?;
                resolver.add_mount(mount, index);
            }
            compiled.push(compile_namespace(ns, transport)?);
        }
        resolver.finish();

        Ok(Self {
            namespaces: compiled,
            resolver,
        })
    }

    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    /// Route a request by host, method and raw (still encoded) path.
    pub fn route<'r, 'p>(
        &'r self,
        host: Option<&str>,
        method: &Method,
        path: &'p str,
    ) -> Result<RouteMatch<'r, 'p>, GatewayError> {
        let resolved = self.resolver.resolve(host, path).ok_or_else(|| {
            GatewayError::NamespaceNotFound {
                host: host.map(str::to_string),
                path: path.to_string(),
            }
        })?;
        let namespace = &self.namespaces[resolved.namespace];

        match namespace.routes.find(resolved.stripped, method) {
            Ok(found) => Ok(RouteMatch {
                index: resolved.namespace,
                namespace,
                route: found.route,
                stripped: resolved.stripped,
                captures: found.captures,
            }),
            Err(MatchFailure::NoMatch) => Err(GatewayError::RouteNotFound {
                namespace: namespace.name.clone(),
                path: resolved.stripped.to_string(),
            }),
            Err(MatchFailure::MethodNotAllowed(allowed)) => Err(GatewayError::MethodNotAllowed {
                namespace: namespace.name.clone(),
                method: method.clone(),
                allowed,
            }),
        }
    }
}

fn compile_namespace(
    ns: &NamespaceConfig,
    transport: &TransportConfig,
) -> Result<Namespace, BuildError> {
    let upstream = Upstream::parse(&ns.backend).map_err(|source| BuildError::Upstream {
        namespace: ns.name.clone(),
        source,
    })?;

    let mut routes = Vec::with_capacity(ns.routes.len());
    for (index, route) in ns.routes.iter().enumerate() {
        let pattern = RoutePattern::parse(&route.pattern, route.kind.map(Into::into)).map_err(
            |source| BuildError::Pattern {
                namespace: ns.name.clone(),
                source,
            },
        )?;
        if let Some(target) = &route.rewrite {
            pattern
                .check_rewrite(target)
                .map_err(|source| BuildError::Rewrite {
                    namespace: ns.name.clone(),
                    pattern: route.pattern.clone(),
                    source,
                })?;
        }
        let methods =
            MethodFilter::parse(route.methods.as_slice()).map_err(|source| BuildError::Method {
                namespace: ns.name.clone(),
                pattern: route.pattern.clone(),
                source,
            })?;
        let upstream = route
            .backend
            .as_deref()
            .map(Upstream::parse)
            .transpose()
            .map_err(|source| BuildError::Upstream {
                namespace: ns.name.clone(),
                source,
            })?;

        routes.push(Route {
            pattern,
            rewrite: route.rewrite.clone(),
            methods,
            upstream,
            index,
        });
    }

    Ok(Namespace {
        name: ns.name.clone(),
        upstream,
        retain_host: ns.retain_host,
        no_rewrite_path: ns.no_rewrite_path,
        transport: transport.merge(ns.transport.as_ref()),
        routes: RouteTable::new(routes),
    })
}
