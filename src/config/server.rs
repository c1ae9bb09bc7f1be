//! Process settings read from the environment (`.env` honored via dotenvy).

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_SCHEMA_PATH: &str = "demos/sample/schema.json";
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub schema_path: PathBuf,
    /// Optional JSON seed `{ Entity: { id: object } }` loaded into the memory store.
    pub seed_path: Option<PathBuf>,
    pub max_body_bytes: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] over an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.into())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Load(format!("BIND_ADDR: {}", e)))?;
        let schema_path = PathBuf::from(lookup("SCHEMA_PATH").unwrap_or_else(|| DEFAULT_SCHEMA_PATH.into()));
        let seed_path = lookup("SEED_PATH").filter(|s| !s.trim().is_empty()).map(PathBuf::from);
        let max_body_bytes = match lookup("MAX_BODY_BYTES") {
            Some(v) => v
                .parse::<usize>()
                .map_err(|e| ConfigError::Load(format!("MAX_BODY_BYTES: {}", e)))?,
            None => DEFAULT_MAX_BODY_BYTES,
        };
        Ok(Self {
            bind_addr,
            schema_path,
            seed_path,
            max_body_bytes,
        })
    }
}
