//! Outbound path rewriting.
//!
//! # Rules
//! - `no_rewrite_path`: the original request path, mount prefix included
//! - No rewrite target: the path with the mount prefix removed
//! - `{name}` in the target: the raw value of that named segment
//! - `*` in the target: the wildcard capture or prefix remainder
//! - Wildcard route without `*`: the capture is appended after the target
//!   with a single `/`
//! - Terminated/prefix route without `*`: the remainder is dropped
//!
//! Captures are raw slices of the request path; nothing here decodes or
//! re-encodes, so `%2F` reaches the backend as `%2F`.

use std::borrow::Cow;

use crate::routing::matcher::Captures;
use crate::routing::pattern::{template_parts, TemplatePart};
use crate::routing::{RouteKind, RouteMatch, RoutePattern};

const PLACEHOLDER: char = '*';

/// Compute the outbound path for a routed request.
pub fn outbound_path<'a>(matched: &RouteMatch<'a, 'a>, original_path: &'a str) -> Cow<'a, str> {
    if matched.namespace.no_rewrite_path {
        return Cow::Borrowed(original_path);
    }

    let Some(target) = matched.route.rewrite.as_deref() else {
        return Cow::Borrowed(matched.stripped);
    };

    apply_template(target, &matched.route.pattern, &matched.captures)
}

/// Substitute captured spans into a rewrite target.
pub fn apply_template<'a>(
    target: &'a str,
    pattern: &RoutePattern,
    captures: &Captures<'_>,
) -> Cow<'a, str> {
    let append_rest = pattern.kind() == RouteKind::Wildcard && !target.contains(PLACEHOLDER);

    if !target.contains(|c| c == PLACEHOLDER || c == '{') {
        return if append_rest {
            Cow::Owned(join(target, captures.rest))
        } else {
            Cow::Borrowed(target)
        };
    }

    let mut path = String::with_capacity(target.len() + captures.rest.len());
    for part in template_parts(target) {
        match part {
            TemplatePart::Literal(text) => path.push_str(text),
            TemplatePart::Rest => path.push_str(captures.rest),
            TemplatePart::Param(name) => {
                match pattern
                    .param_index(name)
                    .and_then(|i| captures.params.get(i))
                {
                    Some(value) => path.push_str(value),
                    None => {
                        path.push('{');
                        path.push_str(name);
                        path.push('}');
                    }
                }
            }
        }
    }

    if append_rest {
        path = join(&path, captures.rest);
    }
    Cow::Owned(path)
}

fn join(base: &str, rest: &str) -> String {
    let base = base.trim_end_matches('/');
    let mut path = String::with_capacity(base.len() + 1 + rest.len());
    path.push_str(base);
    path.push('/');
    path.push_str(rest);
    path
}
