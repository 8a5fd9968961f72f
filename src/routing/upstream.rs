//! Backend base URLs.

use std::fmt;

use axum::http::HeaderValue;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("backend {url:?} is not a valid URL: {reason}")]
    Invalid { url: String, reason: String },

    #[error("backend {0:?} must use the http scheme")]
    UnsupportedScheme(String),

    #[error("backend {0:?} must not carry a query or fragment")]
    UnexpectedQuery(String),
}

/// A parsed backend base URL, e.g. `http://10.0.0.1:8080/api`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    /// `scheme://authority`, no trailing slash.
    origin: String,
    /// Base path without trailing slash (empty for the root).
    base_path: String,
    /// Value for the outbound Host header.
    host: HeaderValue,
}

impl Upstream {
    pub fn parse(raw: &str) -> Result<Self, UpstreamError> {
        let url = Url::parse(raw).map_err(|e| UpstreamError::Invalid {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "http" {
            return Err(UpstreamError::UnsupportedScheme(raw.to_string()));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(UpstreamError::UnexpectedQuery(raw.to_string()));
        }

        let host = url.host_str().ok_or_else(|| UpstreamError::Invalid {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        })?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let host = HeaderValue::from_str(&authority).map_err(|e| UpstreamError::Invalid {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            origin: format!("{}://{}", url.scheme(), authority),
            base_path: url.path().trim_end_matches('/').to_string(),
            host,
        })
    }

    /// The Host header the backend expects.
    pub fn host_header(&self) -> &HeaderValue {
        &self.host
    }

    /// Full outbound URL for an already-rewritten path and the raw query.
    ///
    /// Neither `path` nor `query` is re-encoded.
    pub fn url_for(&self, path: &str, query: Option<&str>) -> String {
        let mut url =
            String::with_capacity(self.origin.len() + self.base_path.len() + path.len() + 16);
        url.push_str(&self.origin);
        url.push_str(&self.base_path);
        if !path.starts_with('/') {
            url.push('/');
        }
        url.push_str(path);
        if let Some(query) = query {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.origin, self.base_path)
    }
}
