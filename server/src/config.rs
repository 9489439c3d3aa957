use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use crate::irc::connection::ConnectionLimits;
use crate::irc::session::DEFAULT_OUTBOUND_QUEUE;

/// Top-level server configuration, loaded from parlor.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub limits: LimitsSection,
    pub irc: IrcSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub irc_address: String,
    /// Prefix on server-originated lines.
    pub server_name: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            irc_address: "0.0.0.0:6667".into(),
            server_name: "parlor".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LimitsSection {
    pub max_line_length: usize,
    pub idle_timeout_secs: u64,
    pub outbound_queue: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_line_length: 4096,
            idle_timeout_secs: 300,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
        }
    }
}

impl LimitsSection {
    pub fn connection_limits(&self) -> ConnectionLimits {
        ConnectionLimits {
            max_line_length: self.max_line_length,
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            outbound_queue: self.outbound_queue,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct IrcSection {
    /// Message of the day lines. If empty, clients see ERR_NOMOTD.
    pub motd: Vec<String>,
}

impl ServerConfig {
    /// Load config from a TOML file. Falls back to defaults if the file doesn't exist.
    /// Environment variables override TOML values.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let mut config = if Path::new(path).exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {path}"))?;
            Self::from_toml(&contents).with_context(|| format!("failed to parse config file {path}"))?
        } else {
            info!("No config file found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("IRC_ADDRESS") {
            self.server.irc_address = v;
        }
        if let Ok(v) = std::env::var("SERVER_NAME") {
            self.server.server_name = v;
        }
        if let Ok(v) = std::env::var("MAX_LINE_LENGTH")
            && let Ok(len) = v.parse()
        {
            self.limits.max_line_length = len;
        }
        if let Ok(v) = std::env::var("IDLE_TIMEOUT_SECS")
            && let Ok(secs) = v.parse()
        {
            self.limits.idle_timeout_secs = secs;
        }
        if let Ok(v) = std::env::var("OUTBOUND_QUEUE")
            && let Ok(n) = v.parse()
        {
            self.limits.outbound_queue = n;
        }
    }
}
