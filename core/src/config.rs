use crate::types::{LobbyId, Millis};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_POLL_INTERVAL_MS: Millis = 1000;
pub const DEFAULT_FRAME_INTERVAL_MS: Millis = 16;
pub const DEFAULT_PLAYER_NAME: &str = "Player";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url:   String,
    pub lobby_id:   LobbyId,
    /// When absent the `csrftoken` cookie set by the server is used.
    pub csrf_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url:   DEFAULT_BASE_URL.to_string(),
            lobby_id:   1,
            csrf_token: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub poll_interval_ms:  Millis,
    pub frame_interval_ms: Millis,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms:  DEFAULT_POLL_INTERVAL_MS,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectatorConfig {
    pub server:      ServerConfig,
    pub timing:      TimingConfig,
    pub player_name: String,
}

impl Default for SpectatorConfig {
    fn default() -> Self {
        Self {
            server:      ServerConfig::default(),
            timing:      TimingConfig::default(),
            player_name: DEFAULT_PLAYER_NAME.to_string(),
        }
    }
}

impl SpectatorConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Cannot parse {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.base_url.trim().is_empty() {
            anyhow::bail!("server.base_url must not be empty");
        }
        if self.server.lobby_id == 0 {
            anyhow::bail!("server.lobby_id must be positive");
        }
        if self.timing.poll_interval_ms <= 0 {
            anyhow::bail!("timing.poll_interval_ms must be positive, got {}", self.timing.poll_interval_ms);
        }
        if self.timing.frame_interval_ms <= 0 {
            anyhow::bail!("timing.frame_interval_ms must be positive, got {}", self.timing.frame_interval_ms);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SpectatorConfig::default();
        assert_eq!(config.server.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.server.lobby_id, 1);
        assert_eq!(config.timing.poll_interval_ms, 1000);
        assert_eq!(config.timing.frame_interval_ms, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: SpectatorConfig =
            serde_json::from_str(r#"{"server": {"lobby_id": 7}, "player_name": "Ada"}"#).unwrap();
        assert_eq!(config.server.lobby_id, 7);
        assert_eq!(config.server.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timing, TimingConfig::default());
        assert_eq!(config.player_name, "Ada");
    }

    #[test]
    fn zero_values_are_rejected() {
        let mut config = SpectatorConfig::default();
        config.timing.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = SpectatorConfig::default();
        config.server.lobby_id = 0;
        assert!(config.validate().is_err());

        let mut config = SpectatorConfig::default();
        config.server.base_url = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = SpectatorConfig::load(Path::new("/nonexistent/spectator.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/spectator.json"));
    }
}
