//! Line-based TCP Chat Relay - Entry Point
//!
//! Binds the listening socket and runs the relay. Takes a single required
//! argument, the listening port, and exits non-zero when it cannot start.

use std::env;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chat_relay::serve;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .init();

    let Some(arg) = env::args().nth(1) else {
        eprintln!("usage: chat_relay <port>");
        return ExitCode::FAILURE;
    };
    let port: u16 = match arg.parse() {
        Ok(port) => port,
        Err(_) => {
            eprintln!("invalid port: {}", arg);
            return ExitCode::FAILURE;
        }
    };

    let addr = format!("0.0.0.0:{}", port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };
    info!("chat relay listening on {}", addr);

    serve(listener).await;
    ExitCode::SUCCESS
}
