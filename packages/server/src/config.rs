//! Server configuration
//!
//! Every option can be given as a flag or an environment variable, so a plain
//! `.env`-style deployment needs no flags at all.

use clap::Parser;
use mindmap_core::mirrors::{DEFAULT_MEILI_INDEX, DEFAULT_MEILI_KEY};
use mindmap_core::services::SyncConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Mindmap sync server
#[derive(Parser, Debug, Clone)]
#[command(name = "mindmap-server", version, about, long_about = None)]
pub struct ServerConfig {
    /// Address to bind (use 127.0.0.1 to keep the server local)
    #[arg(long, env = "MINDMAP_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Canonical store file
    #[arg(long, env = "MINDMAP_DB_PATH", default_value = "./data/mindmap.db")]
    pub db_path: PathBuf,

    /// SurrealDB HTTP endpoint for the graph mirror; embedded in-memory engine when unset
    #[arg(long, env = "SURREAL_ENDPOINT")]
    pub surreal_endpoint: Option<String>,

    #[arg(long, env = "SURREAL_NS", default_value = "mindmap")]
    pub surreal_ns: String,

    #[arg(long, env = "SURREAL_DB", default_value = "graph")]
    pub surreal_db: String,

    #[arg(long, env = "SURREAL_USER", default_value = "root")]
    pub surreal_user: String,

    #[arg(long, env = "SURREAL_PASS", default_value = "root", hide_env_values = true)]
    pub surreal_pass: String,

    /// Meilisearch host for the search mirror; in-process index when unset
    #[arg(long, env = "MEILI_HOST")]
    pub meili_host: Option<String>,

    #[arg(long, env = "MEILI_MASTER_KEY", default_value = DEFAULT_MEILI_KEY, hide_env_values = true)]
    pub meili_master_key: String,

    #[arg(long, env = "MEILI_INDEX", default_value = DEFAULT_MEILI_INDEX)]
    pub meili_index: String,

    /// Deadline for canonical store calls, in milliseconds
    #[arg(long, env = "MINDMAP_STORE_TIMEOUT_MS", default_value_t = 5000)]
    pub store_timeout_ms: u64,

    /// Deadline for graph/search mirror calls, in milliseconds
    #[arg(long, env = "MINDMAP_MIRROR_TIMEOUT_MS", default_value_t = 3000)]
    pub mirror_timeout_ms: u64,

    /// Relay queue depth per realtime namespace; slow sessions drop the oldest moves
    #[arg(long, env = "MINDMAP_SESSION_BUFFER", default_value_t = 256)]
    pub session_buffer: usize,

    /// Single allowed CORS origin; any origin when unset
    #[arg(long, env = "CORS_ALLOW_ORIGIN")]
    pub cors_allow_origin: Option<String>,
}

impl ServerConfig {
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            store_timeout: Duration::from_millis(self.store_timeout_ms),
            mirror_timeout: Duration::from_millis(self.mirror_timeout_ms),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
