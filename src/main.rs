use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sobrio30_backend::api;
use sobrio30_backend::config::{Config, DispatchPolicy};
use sobrio30_backend::mail::build_transport;
use sobrio30_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (also reads .env)
    let config = Config::from_env()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    tracing::info!("Starting Sobrio30 backend...");
    tracing::info!(
        host = %config.server_host,
        port = %config.server_port,
        environment = ?config.environment,
        dispatch_policy = ?config.dispatch_policy,
        "Configuration loaded"
    );

    // Create mail transport
    let mailer = build_transport(&config)?;
    tracing::info!(transport = mailer.name(), "Mail transport initialized");

    if config.dispatch_policy == DispatchPolicy::Synchronous {
        match mailer.verify().await {
            Ok(()) => tracing::info!("Mail transport ready"),
            Err(e) => {
                tracing::error!(error = %e, "Mail transport preflight failed");
                // Continue anyway, sends report their own failures
            }
        }
    }

    let addr: SocketAddr = config.server_addr().parse()?;
    let state = AppState::new(config, mailer);
    let background = state.background.clone();

    // Build router
    let app = api::create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(address = %addr, "Server listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Acknowledged background sends must still run to completion
    let pending = background.pending();
    if pending > 0 {
        tracing::info!(pending, "Waiting for background sends to finish");
    }
    background.drain().await;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Handle shutdown signals
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, shutting down...");
        },
    }
}
