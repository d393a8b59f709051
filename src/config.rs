//! Configuration loader and validator for the Librus→Discord relay.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::relay::Timing;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub app: App,
    pub portal: Portal,
    pub discord: Discord,
    pub channels: Vec<ChannelConfig>,
}

/// Relay loop timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for App {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            startup_delay_ms: default_startup_delay_ms(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    7 * 60
}

fn default_retry_delay_secs() -> u64 {
    2 * 60
}

fn default_startup_delay_ms() -> u64 {
    2000
}

fn default_http_timeout_secs() -> u64 {
    30
}

impl App {
    pub fn timing(&self) -> Timing {
        Timing {
            startup_delay: Duration::from_millis(self.startup_delay_ms),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            retry_delay: Duration::from_secs(self.retry_delay_secs),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// School portal API access. The token and push device are issued out of band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Portal {
    #[serde(default = "default_portal_base_url")]
    pub base_url: String,
    pub access_token: String,
    pub push_device: String,
}

fn default_portal_base_url() -> String {
    "https://api.librus.pl/2.0/".to_string()
}

/// Discord bot settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Discord {
    pub bot_token: String,
    #[serde(default = "default_discord_api_base")]
    pub api_base: String,
    /// Channel receiving plain-text operational messages (errors, skips).
    #[serde(default)]
    pub debug_channel_id: Option<String>,
}

fn default_discord_api_base() -> String {
    "https://discord.com/api/v10/".to_string()
}

/// One recipient channel; order in the file is delivery order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelConfig {
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub tag_roles: bool,
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.poll_interval_secs == 0 {
        return Err(ConfigError::Invalid("app.poll_interval_secs must be > 0"));
    }
    if cfg.app.retry_delay_secs == 0 {
        return Err(ConfigError::Invalid("app.retry_delay_secs must be > 0"));
    }

    if cfg.portal.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("portal.base_url must be non-empty"));
    }
    if cfg.portal.access_token.trim().is_empty() {
        return Err(ConfigError::Invalid("portal.access_token must be non-empty"));
    }
    if cfg.portal.push_device.trim().is_empty() {
        return Err(ConfigError::Invalid("portal.push_device must be non-empty"));
    }

    if cfg.discord.bot_token.trim().is_empty() {
        return Err(ConfigError::Invalid("discord.bot_token must be non-empty"));
    }
    if cfg.discord.api_base.trim().is_empty() {
        return Err(ConfigError::Invalid("discord.api_base must be non-empty"));
    }

    if cfg.channels.is_empty() {
        return Err(ConfigError::Invalid("channels must list at least one channel"));
    }
    for channel in &cfg.channels {
        if channel.channel_id.trim().is_empty() {
            return Err(ConfigError::Invalid("channels[].channel_id must be non-empty"));
        }
        let has_guild = channel
            .guild_id
            .as_deref()
            .is_some_and(|g| !g.trim().is_empty());
        if channel.tag_roles && !has_guild {
            return Err(ConfigError::Invalid(
                "channels[].guild_id is required when tag_roles is set",
            ));
        }
    }

    Ok(())
}

/// Returns the example YAML document shipped with the README.
pub fn example() -> &'static str {
    r#"app:
  poll_interval_secs: 420
  retry_delay_secs: 120
  startup_delay_ms: 2000
  http_timeout_secs: 30

portal:
  base_url: "https://api.librus.pl/2.0/"
  access_token: "YOUR_LIBRUS_ACCESS_TOKEN"
  push_device: "123456"

discord:
  bot_token: "YOUR_DISCORD_BOT_TOKEN"
  debug_channel_id: "100000000000000001"

channels:
  - channel_id: "100000000000000002"
    guild_id: "100000000000000000"
    tag_roles: true
  - channel_id: "100000000000000003"
"#
}
