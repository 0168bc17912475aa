//! Planeja REST API entry point.
//!
//! Binary name: `planeja`
//!
//! Parses CLI arguments, initializes the database and services, spawns the
//! credential expiry sweeper, and starts the API server with graceful
//! shutdown.

mod http;
mod state;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use state::AppState;

#[derive(Parser)]
#[command(name = "planeja", about = "Planeja backend API server")]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Port to listen on.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,planeja=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let (state, sweeper) = AppState::init().await?;

    // The sweeper runs its first cycle immediately, then on its interval
    // until shutdown.
    let shutdown = CancellationToken::new();
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown.clone()));

    let host = cli
        .host
        .unwrap_or_else(|| state.config.server.host.clone());
    let port = cli.port.unwrap_or(state.config.server.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "planeja API listening");

    let router = http::router::build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    let _ = sweeper_handle.await;
    tracing::info!("server stopped");

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
