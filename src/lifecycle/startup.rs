//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging and metrics
//! - Start the config watcher and signal listener
//! - Bind the listener and run the server until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener starts last (traffic only when ready)

use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::LogFormat;
use crate::config::watcher::ConfigWatcher;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_signal;
use crate::observability::{logging, metrics};
use crate::proxy::Gateway;

/// Options resolved from the command line.
#[derive(Debug, Clone)]
pub struct StartupOptions {
    pub config_path: PathBuf,
    /// Reload the config file when it changes.
    pub watch: bool,
    /// Validate the config and exit.
    pub check: bool,
    /// Overrides `observability.log_format`.
    pub log_format: Option<LogFormat>,
}

/// Load, validate and compile the config without serving.
///
/// Returns the number of namespaces.
pub fn check(options: &StartupOptions) -> Result<usize, Box<dyn Error>> {
    let config = load_config(&options.config_path)?;
    let gateway = Gateway::from_config(&config)?;
    Ok(gateway.router().namespaces().len())
}

/// Run the gateway until a termination signal arrives.
pub async fn run(options: StartupOptions) -> Result<(), Box<dyn Error>> {
    if options.check {
        let namespaces = check(&options)?;
        println!(
            "{}: configuration OK ({namespaces} namespaces)",
            options.config_path.display()
        );
        return Ok(());
    }

    let config = load_config(&options.config_path)?;
    let format = options.log_format.unwrap_or(config.observability.log_format);
    logging::init(&config.observability.log_level, format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %options.config_path.display(),
        "namespace-gateway starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        namespaces = config.namespaces.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        if let Err(e) = metrics::init_metrics(addr) {
            tracing::error!(error = %e, address = %addr, "Failed to start metrics endpoint");
        }
    }

    let (watcher, config_updates) = if options.watch {
        let (watcher, updates) = ConfigWatcher::new(&options.config_path);
        (Some(watcher.run()?), updates)
    } else {
        let (_, updates) = mpsc::unbounded_channel();
        (None, updates)
    };

    let server = HttpServer::new(config)?;
    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(signal) => {
                tracing::info!(signal, "Termination signal received");
                signal_shutdown.trigger();
            }
            Err(e) => tracing::error!(error = %e, "Failed to install signal handlers"),
        }
    });

    server.run(listener, config_updates, server_shutdown).await?;

    drop(watcher);
    tracing::info!("Shutdown complete");
    Ok(())
}
