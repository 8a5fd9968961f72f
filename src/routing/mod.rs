//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, method, raw path)
//!     → namespace.rs (host/prefix resolution, prefix stripping)
//!     → matcher.rs (pattern match by precedence, capture extraction)
//!     → method.rs (per-route method filter)
//!     → Return: RouteMatch, or NotFound / MethodNotAllowed
//!
//! Route Compilation (at startup and on reload):
//!     NamespaceConfig[]
//!     → pattern.rs (parse, infer kind)
//!     → Sort by precedence (stable)
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled once per snapshot, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always matches same route
//! - Paths stay percent-encoded end to end

pub mod matcher;
pub mod method;
pub mod namespace;
pub mod pattern;
pub mod router;
pub mod upstream;

pub use matcher::{Route, RouteTable};
pub use namespace::Namespace;
pub use pattern::{RouteKind, RoutePattern};
pub use router::{BuildError, RouteMatch, Router};
pub use upstream::Upstream;
