//! FlashRESP server
//!
//! This is the main entry point for the server.
//! It loads the configuration, sets up logging and the TCP listener, and
//! hands every accepted connection to its own task.

use flashresp::commands::CommandHandler;
use flashresp::connection::{handle_connection, ConnectionStats};
use flashresp::protocol::ParserLimits;
use flashresp::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_banner(config: &Config) {
    println!(
        r#"
FlashRESP v{} - Redis-compatible RESP server
──────────────────────────────────────────────────────────────
Server started on {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        flashresp::VERSION,
        config.bind_address()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments and the optional config file
    let config = Config::load()?;

    // Set up logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Print the banner
    print_banner(&config);

    info!(
        max_line_length = config.limits.max_line_length,
        max_bulk_length = config.limits.max_bulk_length,
        max_array_length = config.limits.max_array_length,
        max_depth = config.limits.max_depth,
        "Protocol limits"
    );

    // Create connection statistics
    let stats = Arc::new(ConnectionStats::new());

    // Bind the TCP listener
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", config.bind_address());

    // Set up graceful shutdown
    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, stopping server..."),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    };

    // Main accept loop
    tokio::select! {
        _ = accept_loop(listener, Arc::clone(&stats), config.limits) => {}
        _ = shutdown => {}
    }

    info!(
        connections = stats.connections_accepted.load(std::sync::atomic::Ordering::Relaxed),
        commands = stats.commands_processed.load(std::sync::atomic::Ordering::Relaxed),
        protocol_errors = stats.protocol_errors.load(std::sync::atomic::Ordering::Relaxed),
        "Server shutdown complete"
    );
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(listener: TcpListener, stats: Arc<ConnectionStats>, limits: ParserLimits) {
    let handler = CommandHandler::new();

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = handler.clone();
                let stats = Arc::clone(&stats);

                // Spawn a task to handle this connection
                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, stats, limits).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
