//! Per-route method restrictions.

use axum::http::Method;
use thiserror::Error;

/// Methods accepted in configuration.
const KNOWN_METHODS: [Method; 9] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::CONNECT,
    Method::OPTIONS,
    Method::TRACE,
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid method: {0}")]
pub struct InvalidMethod(pub String);

/// The set of methods a route accepts. Empty accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodFilter {
    methods: Vec<Method>,
}

impl MethodFilter {
    /// Accept every method.
    pub fn any() -> Self {
        Self::default()
    }

    /// Build a filter from configured method names (case-sensitive, as in HTTP).
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, InvalidMethod> {
        let mut methods = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let method = KNOWN_METHODS
                .iter()
                .find(|m| m.as_str() == name)
                .cloned()
                .ok_or_else(|| InvalidMethod(name.to_string()))?;
            if !methods.contains(&method) {
                methods.push(method);
            }
        }
        Ok(Self { methods })
    }

    /// Whether `method` may be forwarded. GET also admits HEAD.
    pub fn allows(&self, method: &Method) -> bool {
        if self.methods.is_empty() {
            return true;
        }
        self.methods.contains(method)
            || (*method == Method::HEAD && self.methods.contains(&Method::GET))
    }

    pub fn is_any(&self) -> bool {
        self.methods.is_empty()
    }

    /// Methods this filter admits explicitly, HEAD included when implied by GET.
    pub fn allowed(&self) -> Vec<Method> {
        let mut allowed = self.methods.clone();
        if allowed.contains(&Method::GET) && !allowed.contains(&Method::HEAD) {
            allowed.push(Method::HEAD);
        }
        allowed
    }
}
