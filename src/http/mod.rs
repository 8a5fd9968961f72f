//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, catch-all handler)
//!     → proxy::Gateway (routing, rewrite, header policy, forwarding)
//!     → error.rs (routing/upstream failures as status codes)
//!     → Send to client
//! ```

pub mod server;

pub use server::HttpServer;
