//! Namespace resolution by host and path prefix.
//!
//! # Resolution order
//! 1. Mounts registered for the request host, longest prefix first
//!    (a host-only mount has an empty prefix and matches every path)
//! 2. Path-only mounts, longest prefix first
//! 3. The passthrough namespace, if one is configured
//!
//! Prefixes only match on a segment boundary: `/foo` matches `/foo` and
//! `/foo/bar`, never `/foobar`. Prefix segments compare like static route
//! segments, against the percent-decoded request segment.

use std::collections::HashMap;

use thiserror::Error;

use crate::config::schema::TransportConfig;
use crate::routing::matcher::{next_segment, segment_eq, RouteTable};
use crate::routing::upstream::Upstream;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MountError {
    #[error("mount is empty")]
    Empty,

    #[error("mount {0:?} prefix must not contain '*' or braces")]
    Wildcard(String),

    #[error("mount {0:?} contains an empty segment")]
    EmptySegment(String),
}

/// Where a namespace is reachable: a host, a path prefix, or both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mount {
    /// Lowercased host without port.
    pub host: Option<String>,
    /// Prefix without trailing slash; empty when the mount is host-only.
    pub prefix: String,
}

impl Mount {
    /// Parse `"host"`, `"/prefix"` or `"host/prefix"`.
    pub fn parse(raw: &str) -> Result<Self, MountError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(MountError::Empty);
        }

        let (host, prefix) = match raw.find('/') {
            Some(0) => (None, raw),
            Some(idx) => (Some(&raw[..idx]), &raw[idx..]),
            None => (Some(raw), ""),
        };

        if prefix.contains(|c| c == '*' || c == '{' || c == '}') {
            return Err(MountError::Wildcard(raw.to_string()));
        }
        let prefix = prefix.trim_end_matches('/');
        if prefix.split('/').skip(1).any(str::is_empty) {
            return Err(MountError::EmptySegment(raw.to_string()));
        }

        let host = host.map(normalize_host).filter(|h| !h.is_empty());
        if host.is_none() && prefix.is_empty() {
            // "/" alone
            return Err(MountError::Empty);
        }

        Ok(Self {
            host,
            prefix: prefix.to_string(),
        })
    }
}

/// Lowercase a host and drop its port. Bracketed IPv6 literals keep their brackets.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let without_port = if host.starts_with('[') {
        match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        }
    } else {
        match host.rfind(':') {
            Some(idx) => &host[..idx],
            None => host,
        }
    };
    without_port.to_ascii_lowercase()
}

/// Strip `prefix` from `path` if it ends on a segment boundary.
///
/// The result always starts with `/`.
fn strip_mount_prefix<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    let mut rest = path;
    for expected in prefix.split('/').skip(1) {
        let (segment, tail) = next_segment(rest)?;
        if !segment_eq(segment, expected) {
            return None;
        }
        rest = tail;
    }
    Some(if rest.is_empty() { "/" } else { rest })
}

/// A compiled namespace: immutable, shared by every request.
#[derive(Debug)]
pub struct Namespace {
    pub name: String,
    pub upstream: Upstream,
    pub retain_host: bool,
    pub no_rewrite_path: bool,
    pub transport: TransportConfig,
    pub routes: RouteTable,
}

/// Result of resolving a request to a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'p> {
    /// Index into the router's namespace list.
    pub namespace: usize,
    /// Path with the mount prefix removed; starts with `/`.
    pub stripped: &'p str,
}

/// Index of mounts, built once per snapshot.
#[derive(Debug, Default)]
pub struct NamespaceResolver {
    by_host: HashMap<String, Vec<(String, usize)>>,
    by_path: Vec<(String, usize)>,
    passthrough: Option<usize>,
}

impl NamespaceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mount(&mut self, mount: Mount, namespace: usize) {
        match mount.host {
            Some(host) => self
                .by_host
                .entry(host)
                .or_default()
                .push((mount.prefix, namespace)),
            None => self.by_path.push((mount.prefix, namespace)),
        }
    }

    pub fn set_passthrough(&mut self, namespace: usize) {
        self.passthrough = Some(namespace);
    }

    /// Sort prefixes longest first. Call once after all mounts are added.
    pub fn finish(&mut self) {
        for mounts in self.by_host.values_mut() {
            mounts.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        }
        self.by_path.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }

    /// Select the namespace owning `(host, path)`.
    ///
    /// `host` may carry a port and any case; `path` must start with `/`.
    pub fn resolve<'p>(&self, host: Option<&str>, path: &'p str) -> Option<Resolved<'p>> {
        if let Some(mounts) = host.and_then(|h| self.by_host.get(&normalize_host(h))) {
            if let Some(found) = Self::first_match(mounts, path) {
                return Some(found);
            }
        }

        if let Some(found) = Self::first_match(&self.by_path, path) {
            return Some(found);
        }

        self.passthrough.map(|namespace| Resolved {
            namespace,
            stripped: path,
        })
    }

    fn first_match<'p>(mounts: &[(String, usize)], path: &'p str) -> Option<Resolved<'p>> {
        mounts.iter().find_map(|(prefix, namespace)| {
            strip_mount_prefix(path, prefix).map(|stripped| Resolved {
                namespace: *namespace,
                stripped,
            })
        })
    }
}
