use std::{
    collections::HashMap,
    fs::{self, File},
    io::prelude::*,
    path::Path,
    time::Duration,
};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::player::GameMode;

/// Top-level configuration for the server, loaded from a TOML file.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Socket address to bind to, e.g. "0.0.0.0:25565".
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Status-screen description.
    #[serde(default = "default_motd")]
    pub motd: String,

    #[serde(default = "default_max_players")]
    pub max_players: u32,

    /// Maximum concurrent connections, including status pings.
    #[serde(default = "default_max_conn")]
    pub max_conn: u32,

    /// Connections accepted per second from a single IP.
    #[serde(default = "default_cooldown")]
    pub cooldown: u32,

    /// Payload size at which frames get compressed; negative disables.
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold: i32,

    /// Bounded outbound queue length per session.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,

    #[serde(default = "default_protocol_version")]
    pub protocol_version: i32,

    #[serde(default)]
    pub default_gamemode: GameMode,

    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,

    #[serde(flatten)]
    pub other_fields: HashMap<String, toml::Value>,
}

fn default_bind() -> String {
    "0.0.0.0:25565".to_string()
}

fn default_motd() -> String {
    "A Basalt server".to_string()
}

fn default_max_players() -> u32 {
    20
}

fn default_max_conn() -> u32 {
    1024
}

fn default_cooldown() -> u32 {
    3
}

fn default_compression_threshold() -> i32 {
    256
}

fn default_outbound_queue() -> usize {
    1024
}

fn default_protocol_version() -> i32 {
    767
}

fn default_handshake_timeout() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            motd: default_motd(),
            max_players: default_max_players(),
            max_conn: default_max_conn(),
            cooldown: default_cooldown(),
            compression_threshold: default_compression_threshold(),
            outbound_queue: default_outbound_queue(),
            protocol_version: default_protocol_version(),
            default_gamemode: GameMode::default(),
            handshake_timeout_secs: default_handshake_timeout(),
            other_fields: HashMap::new(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigLoadError> {
        let config: Self = toml::from_str(raw)?;

        for (key, value) in &config.other_fields {
            warn!("Unknown configuration '{key}' with value {value:?}");
        }

        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let config_str = toml::to_string(&self)?;
        let mut file = File::create(path)?;
        file.write_all(config_str.as_bytes())?;
        Ok(())
    }

    /// `None` when compression is disabled.
    #[must_use]
    pub fn compression(&self) -> Option<usize> {
        usize::try_from(self.compression_threshold).ok()
    }

    #[must_use]
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Could not open config")]
    Io(#[from] std::io::Error),
    #[error("Could not parse")]
    Parse(#[from] toml::de::Error),
}
