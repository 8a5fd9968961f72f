//! Route matching logic.
//!
//! # Responsibilities
//! - Match a namespace-stripped path against compiled route patterns
//! - Extract raw named segments and the remainder after the pattern
//! - Apply the method filter of the selected route
//!
//! # Design Decisions
//! - Paths are never decoded as a whole: each request segment is
//!   percent-decoded only for comparison against a static segment, so
//!   `%2F` can never split a segment and captures stay byte-exact
//! - Routes are pre-sorted by precedence; the first path match is selected
//!   and only then filtered by method, so a rejected method never falls
//!   through to a less specific route
//! - Routes with the same shape as the selected one share its path, so
//!   their method sets are merged
//! - No regex in the hot path

use axum::http::Method;
use percent_encoding::percent_decode_str;

use crate::routing::method::MethodFilter;
use crate::routing::pattern::{RouteKind, RoutePattern, Segment};
use crate::routing::upstream::Upstream;

/// A compiled route within a namespace.
#[derive(Debug, Clone)]
pub struct Route {
    pub pattern: RoutePattern,
    pub rewrite: Option<String>,
    pub methods: MethodFilter,
    pub upstream: Option<Upstream>,
    /// Position in the namespace's declaration order.
    pub index: usize,
}

impl Route {
    /// Match `path` (always starting with `/`) against this route's pattern.
    pub fn match_path<'p>(&self, path: &'p str) -> Option<Captures<'p>> {
        match_pattern(&self.pattern, path)
    }
}

/// Raw spans of the request path picked out by a pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures<'p> {
    /// Named segment values, in pattern order.
    pub params: Vec<&'p str>,
    /// The wildcard capture, the prefix remainder without its leading
    /// slash, or `""` for a terminated match.
    pub rest: &'p str,
}

pub fn match_pattern<'p>(pattern: &RoutePattern, path: &'p str) -> Option<Captures<'p>> {
    let mut params = Vec::new();
    let mut rest = path;
    for expected in pattern.segments() {
        let (segment, tail) = next_segment(rest)?;
        match expected {
            Segment::Static(literal) if segment_eq(segment, literal) => {}
            Segment::Param(_) if !segment.is_empty() => params.push(segment),
            _ => return None,
        }
        rest = tail;
    }

    let rest = match pattern.kind() {
        RouteKind::Terminated => (rest.is_empty() || rest == "/").then_some("")?,
        RouteKind::Prefix => rest.strip_prefix('/').unwrap_or(rest),
        RouteKind::Wildcard => rest.strip_prefix('/')?,
    };
    Some(Captures { params, rest })
}

/// Split `/segment/tail` into `segment` and `/tail`.
pub(crate) fn next_segment(path: &str) -> Option<(&str, &str)> {
    let after = path.strip_prefix('/')?;
    let end = after.find('/').unwrap_or(after.len());
    Some(after.split_at(end))
}

/// Compare a raw request segment with a literal, decoding only the former.
pub(crate) fn segment_eq(raw: &str, expected: &str) -> bool {
    if raw.contains('%') {
        percent_decode_str(raw).eq(expected.bytes())
    } else {
        raw == expected
    }
}

/// A successful path + method match.
#[derive(Debug, Clone)]
pub struct PathMatch<'r, 'p> {
    pub route: &'r Route,
    pub captures: Captures<'p>,
}

/// Why no route was selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchFailure {
    /// No pattern matched the path.
    NoMatch,
    /// The most specific matching pattern does not admit the method.
    MethodNotAllowed(Vec<Method>),
}

/// Routes of one namespace, sorted by precedence.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(mut routes: Vec<Route>) -> Self {
        routes.sort_by(|a, b| {
            a.pattern
                .precedence(&b.pattern)
                .then_with(|| a.index.cmp(&b.index))
        });
        Self { routes }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Select the most specific route matching `path`, then check `method`.
    pub fn find<'r, 'p>(
        &'r self,
        path: &'p str,
        method: &Method,
    ) -> Result<PathMatch<'r, 'p>, MatchFailure> {
        let mut matching = self
            .routes
            .iter()
            .filter_map(|route| route.match_path(path).map(|captures| (route, captures)));

        let Some((top, captures)) = matching.next() else {
            return Err(MatchFailure::NoMatch);
        };
        if top.methods.allows(method) {
            return Ok(PathMatch {
                route: top,
                captures,
            });
        }

        let mut allowed = top.methods.allowed();
        for (route, captures) in matching.filter(|(r, _)| r.pattern.same_shape(&top.pattern)) {
            if route.methods.allows(method) {
                return Ok(PathMatch { route, captures });
            }
            for m in route.methods.allowed() {
                if !allowed.contains(&m) {
                    allowed.push(m);
                }
            }
        }

        Err(MatchFailure::MethodNotAllowed(allowed))
    }
}
