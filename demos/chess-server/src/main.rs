//! Knightwire chess relay.
//!
//! Serves the game WebSocket and a small HTTP API side by side.
//!
//! Run with:
//! ```not_rust
//! cargo run -p chess-server
//! cargo run -p chess-server -- --ws-addr 0.0.0.0:3001 --http-addr 0.0.0.0:3000 --grace-secs 60
//! ```

mod http;
mod validator;

use std::time::Duration;

use clap::Parser;
use knightwire::prelude::*;

use crate::validator::ShakmatyValidator;

#[derive(Parser, Debug)]
#[command(name = "chess-server")]
#[command(about = "Real-time relay for two-player chess rooms", long_about = None)]
struct Args {
    /// Address for the game WebSocket
    #[arg(long, default_value = "0.0.0.0:3001")]
    ws_addr: String,

    /// Address for the HTTP API
    #[arg(long, default_value = "0.0.0.0:3000")]
    http_addr: String,

    /// Seconds an empty room survives before it is deleted
    #[arg(long, default_value_t = 300)]
    grace_secs: u64,

    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    knightwire::logging::init(env!("CARGO_BIN_NAME"), &args.log_level)?;

    let server = KnightwireServerBuilder::new()
        .bind(&args.ws_addr)
        .room_config(RoomConfig {
            deletion_grace: Duration::from_secs(args.grace_secs),
            ..RoomConfig::default()
        })
        .build::<ShakmatyValidator>()
        .await?;
    let handle = server.handle();

    let listener = tokio::net::TcpListener::bind(&args.http_addr).await?;
    tracing::info!(
        ws = %server.local_addr()?,
        http = %listener.local_addr()?,
        "chess server listening"
    );
    tracing::info!("Press Ctrl+C to shut down");

    let relay = tokio::spawn(server.run());

    axum::serve(listener, http::router(handle.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    handle.shutdown().await;
    relay.await??;
    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
