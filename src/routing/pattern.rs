//! Route pattern parsing and precedence.
//!
//! # Syntax
//! - `/a/b`      prefix match over whole segments (`/a/b`, `/a/b/`, `/a/b/c/...`)
//! - `/a/b/{$}`  terminated: exactly `/a/b` or `/a/b/`
//! - `/a/*`      wildcard: `/a/<anything>`, remainder captured raw
//! - `/a/{id}`   named segment: any single non-empty segment, captured raw
//!
//! The kind may also be given explicitly in configuration, in which case it
//! must agree with any marker present in the pattern.
//!
//! # Precedence
//! More segments first, then more static segments, then terminated before
//! prefix before wildcard. Ties keep declaration order (stable sort).
//!
//! # Rewrite targets
//! A target is a path in which `*` stands for the wildcard capture or prefix
//! remainder and `{name}` for the raw value of a named segment.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use axum::http::uri::PathAndQuery;
use thiserror::Error;

use crate::config::schema::RouteKindConfig;

const WILDCARD: &str = "*";
const TERMINATOR: &str = "{$}";

/// How a pattern relates to the paths below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    /// Exact segment count, optional trailing slash.
    Terminated,
    /// Any path under the static segments.
    Prefix,
    /// Any path strictly under the static segments, remainder captured.
    Wildcard,
}

impl RouteKind {
    fn rank(self) -> u8 {
        match self {
            RouteKind::Terminated => 0,
            RouteKind::Prefix => 1,
            RouteKind::Wildcard => 2,
        }
    }
}

impl From<RouteKindConfig> for RouteKind {
    fn from(kind: RouteKindConfig) -> Self {
        match kind {
            RouteKindConfig::Terminated => RouteKind::Terminated,
            RouteKindConfig::Prefix => RouteKind::Prefix,
            RouteKindConfig::Wildcard => RouteKind::Wildcard,
        }
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteKind::Terminated => write!(f, "terminated"),
            RouteKind::Prefix => write!(f, "prefix"),
            RouteKind::Wildcard => write!(f, "wildcard"),
        }
    }
}

/// Errors produced while parsing a route pattern.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern {0:?} must start with '/'")]
    MissingLeadingSlash(String),

    #[error("pattern {0:?} contains an empty segment")]
    EmptySegment(String),

    #[error("pattern {0:?} may only use '*' or '{{$}}' as its final segment")]
    MisplacedMarker(String),

    #[error("pattern {0:?} has a malformed named segment")]
    InvalidParam(String),

    #[error("pattern {pattern:?} names segment {name:?} more than once")]
    DuplicateParam { pattern: String, name: String },

    #[error("pattern {pattern:?} is {marker} but was declared {declared}")]
    KindMismatch {
        pattern: String,
        marker: RouteKind,
        declared: RouteKind,
    },
}

/// One segment of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text, compared against the decoded request segment.
    Static(String),
    /// `{name}`: matches any single non-empty segment.
    Param(String),
}

impl Segment {
    fn parse(segment: &str) -> Option<Self> {
        match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) if is_param_name(name) => Some(Segment::Param(name.to_string())),
            Some(_) => None,
            None if segment.contains(is_brace) => None,
            None => Some(Segment::Static(segment.to_string())),
        }
    }
}

fn is_brace(c: char) -> bool {
    c == '{' || c == '}'
}

fn is_param_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// A parsed, immutable route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
    kind: RouteKind,
}

impl RoutePattern {
    /// Parse a pattern, honouring an explicitly configured kind.
    pub fn parse(pattern: &str, declared: Option<RouteKind>) -> Result<Self, PatternError> {
        let body = pattern
            .strip_prefix('/')
            .ok_or_else(|| PatternError::MissingLeadingSlash(pattern.to_string()))?;

        let (body, marker) = if body == WILDCARD || body.ends_with("/*") {
            (&body[..body.len() - WILDCARD.len()], Some(RouteKind::Wildcard))
        } else if body == TERMINATOR || body.ends_with("/{$}") {
            (&body[..body.len() - TERMINATOR.len()], Some(RouteKind::Terminated))
        } else {
            (body, None)
        };

        let kind = match (marker, declared) {
            (Some(marker), Some(declared)) if marker != declared => {
                return Err(PatternError::KindMismatch {
                    pattern: pattern.to_string(),
                    marker,
                    declared,
                });
            }
            (Some(marker), _) => marker,
            (None, Some(declared)) => declared,
            (None, None) => RouteKind::Prefix,
        };

        let body = body.strip_suffix('/').unwrap_or(body);
        let mut segments = Vec::new();
        if !body.is_empty() {
            for segment in body.split('/') {
                if segment.is_empty() {
                    return Err(PatternError::EmptySegment(pattern.to_string()));
                }
                if segment.contains(WILDCARD) || segment.contains(TERMINATOR) {
                    return Err(PatternError::MisplacedMarker(pattern.to_string()));
                }
                let segment = Segment::parse(segment)
                    .ok_or_else(|| PatternError::InvalidParam(pattern.to_string()))?;
                if let Segment::Param(name) = &segment {
                    if segments.contains(&segment) {
                        return Err(PatternError::DuplicateParam {
                            pattern: pattern.to_string(),
                            name: name.clone(),
                        });
                    }
                }
                segments.push(segment);
            }
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
            kind,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    /// Segments before any marker; static ones in their literal (decoded) form.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn static_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Static(_)))
            .count()
    }

    /// Position of the named segment among the pattern's named segments.
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(param) => Some(param),
                Segment::Static(_) => None,
            })
            .position(|param| param == name)
    }

    /// Order two patterns by specificity; `Less` means `self` is tried first.
    pub fn precedence(&self, other: &RoutePattern) -> Ordering {
        other
            .segments
            .len()
            .cmp(&self.segments.len())
            .then_with(|| other.static_count().cmp(&self.static_count()))
            .then_with(|| self.kind.rank().cmp(&other.kind.rank()))
    }

    /// Whether both patterns match exactly the same paths.
    ///
    /// Named segments match regardless of their names.
    pub fn same_shape(&self, other: &RoutePattern) -> bool {
        self.kind == other.kind
            && self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Static(a), Segment::Static(b)) => a == b,
                    (Segment::Param(_), Segment::Param(_)) => true,
                    _ => false,
                })
    }

    /// Check that `target` is a usable rewrite target for this pattern.
    pub fn check_rewrite(&self, target: &str) -> Result<(), RewriteError> {
        if !target.starts_with('/') {
            return Err(RewriteError::NotAbsolute(target.to_string()));
        }

        let mut placeholders = 0;
        let mut sample = String::with_capacity(target.len());
        for part in template_parts(target) {
            match part {
                TemplatePart::Literal(text) => {
                    if text.contains(is_brace) {
                        return Err(RewriteError::UnbalancedBrace(target.to_string()));
                    }
                    sample.push_str(text);
                }
                TemplatePart::Rest => {
                    placeholders += 1;
                    sample.push('x');
                }
                TemplatePart::Param(name) => {
                    if self.param_index(name).is_none() {
                        return Err(RewriteError::UnknownParam {
                            target: target.to_string(),
                            name: name.to_string(),
                        });
                    }
                    sample.push('x');
                }
            }
        }
        if placeholders > 1 {
            return Err(RewriteError::MultiplePlaceholders(target.to_string()));
        }

        let parsed = PathAndQuery::from_str(&sample).map_err(|e| RewriteError::InvalidUri {
            target: target.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.query().is_some() || parsed.as_str() != sample {
            return Err(RewriteError::InvalidUri {
                target: target.to_string(),
                reason: "query or fragment not allowed".into(),
            });
        }
        Ok(())
    }
}

/// Errors in a rewrite target.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RewriteError {
    #[error("rewrite target {0:?} must start with '/'")]
    NotAbsolute(String),

    #[error("rewrite target {0:?} contains more than one '*'")]
    MultiplePlaceholders(String),

    #[error("rewrite target {target:?} refers to unknown segment {{{name}}}")]
    UnknownParam { target: String, name: String },

    #[error("rewrite target {0:?} has an unbalanced brace")]
    UnbalancedBrace(String),

    #[error("rewrite target {target:?} is not a valid path: {reason}")]
    InvalidUri { target: String, reason: String },
}

/// A piece of a rewrite target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplatePart<'t> {
    Literal(&'t str),
    /// `*`
    Rest,
    /// `{name}`
    Param(&'t str),
}

/// Split a rewrite target into literals and placeholders.
pub fn template_parts(target: &str) -> TemplateParts<'_> {
    TemplateParts { rest: target }
}

#[derive(Debug, Clone)]
pub struct TemplateParts<'t> {
    rest: &'t str,
}

impl<'t> Iterator for TemplateParts<'t> {
    type Item = TemplatePart<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        if let Some(after) = self.rest.strip_prefix('*') {
            self.rest = after;
            return Some(TemplatePart::Rest);
        }
        if let Some(inner) = self.rest.strip_prefix('{') {
            if let Some(end) = inner.find('}') {
                self.rest = &inner[end + 1..];
                return Some(TemplatePart::Param(&inner[..end]));
            }
        }

        let end = self
            .rest
            .char_indices()
            .skip(1)
            .find(|&(_, c)| c == '*' || c == '{')
            .map_or(self.rest.len(), |(i, _)| i);
        let (literal, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(TemplatePart::Literal(literal))
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.raw, self.kind)
    }
}
