//! Namespace gateway.
//!
//! An HTTP API gateway that resolves each request to a namespace by Host
//! header and/or path prefix, selects a route by precedence, rewrites the
//! path and forwards the request to the namespace's backend, relaying the
//! response unmodified.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ routing::namespace ──▶ routing::matcher
//!                                                               │ (method filter)
//!                                                               ▼
//!                                     proxy::headers ◀── proxy::rewrite
//!                                           │
//!                                           ▼
//!     Client Response ◀─────────────── proxy::forwarder ◀────────── Backend
//!
//!     Cross-cutting: config (TOML, hot reload) · observability · lifecycle
//! ```

use std::path::PathBuf;

use clap::Parser;

use namespace_gateway::config::schema::LogFormat;
use namespace_gateway::lifecycle::startup::{self, StartupOptions};

#[derive(Debug, Parser)]
#[command(name = "namespace-gateway", version, about = "Namespace-aware HTTP API gateway")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,

    /// Reload the configuration when the file changes.
    #[arg(long)]
    watch: bool,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,

    /// Override the configured log format.
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    startup::run(StartupOptions {
        config_path: args.config,
        watch: args.watch,
        check: args.check,
        log_format: args.log_format,
    })
    .await
}
