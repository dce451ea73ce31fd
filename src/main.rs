//! Chat Relay - Entry Point
//!
//! Loads the configuration, starts the chat listener and the optional
//! JSON query endpoint, then accepts connections.
//!
//! Usage: `chat_relay [config.json]`

use std::env;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chat_relay::{query, ActionLog, ChatServer, Config};

/// Default configuration file
const DEFAULT_CONFIG: &str = "config.json";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .init();

    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = Config::load_or_default(&config_path)?;

    let action_log = Arc::new(match &config.log_file {
        Some(path) => {
            info!("Logging actions to {}", path.display());
            ActionLog::with_file(path)
        }
        None => ActionLog::new(),
    });

    // Start TCP listener; failing to bind is fatal
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Chat relay listening on {}", addr);

    if let Some(endpoint_addr) = config.json_endpoint_addr() {
        let endpoint = TcpListener::bind(&endpoint_addr).await?;
        let log = action_log.clone();

        tokio::spawn(async move {
            if let Err(e) = query::serve(endpoint, log).await {
                error!("JSON endpoint error: {}", e);
            }
        });
    }

    let server = Arc::new(ChatServer::new(config.lobby.clone(), action_log));
    server.run(listener).await;

    Ok(())
}
