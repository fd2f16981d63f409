// a2o - Anthropic Messages API proxy for OpenAI-compatible backends
//
// Clients speaking the Anthropic Messages protocol point at this server; each
// request is routed to an OpenAI-compatible provider, translated, and the
// answer (buffered JSON or SSE) is translated back.

mod cli;
mod config;
mod logging;
mod proxy;
mod startup;
mod util;

use anyhow::Result;
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Handle CLI commands first (config --show, --path, --init)
    // If a command was handled, exit early
    if cli::handle_cli()? {
        return Ok(());
    }

    // Configuration is built once here and never re-read
    let config = Config::load()?;

    // The guard must be kept alive for the duration of the program to ensure logs flush
    let _file_guard = logging::init(&config.logging)?;

    startup::print_startup(&config);
    startup::log_startup(&config);

    proxy::start_proxy(config, shutdown_signal()).await
}

/// Resolves on Ctrl-C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
