//! Mindmap server binary
//!
//! ```bash
//! # Local defaults: ./data/mindmap.db, embedded graph engine, in-process search
//! cargo run --bin mindmap-server
//!
//! # Against external mirrors
//! SURREAL_ENDPOINT=http://localhost:8000 MEILI_HOST=http://localhost:7700 \
//!   cargo run --bin mindmap-server
//! ```
//!
//! `RUST_LOG` controls log verbosity (default: `info`).

use clap::Parser;
use mindmap_server::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();

    tracing::info!("🚀 Mindmap Sync Server");
    tracing::info!("   Database: {}", config.db_path.display());

    start_server(config).await
}
