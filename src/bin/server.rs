//! SkolAI table server
//!
//! Serves the record buckets over HTTP with a WebSocket change feed per
//! table, for the CLI's synced store.
//!
//! # Configuration
//!
//! Environment variables:
//! - `SKOLAI_SERVER_PORT`: Port to listen on (default: 8080)
//! - `SKOLAI_SERVER_DATA_DIR`: Directory for the table database (default: ~/.local/share/skolai-server)
//! - `SKOLAI_SERVER_CONFIG`: Path to config file (default: ~/.config/skolai-server/config.yaml)
//!
//! # Config File Format
//!
//! ```yaml
//! api_keys:
//!   - key: "your-secret-key-here"
//!     client: "front-desk"
//! ```
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint (no auth required)
//! - `/rest/{table}`: Record CRUD (auth required)
//! - `GET /realtime/{table}`: WebSocket change feed (auth required)

use skolai::server::{serve, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skolai=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    if let Err(e) = serve(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
