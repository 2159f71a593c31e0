use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub resolver: ResolverSection,
    #[serde(default)]
    pub polling: PollingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSection {
    /// Relay prefix prepended to every probe URL (e.g. the nowplaying-relay
    /// fetch endpoint). Absent means direct requests.
    #[serde(default)]
    pub relay_url: Option<String>,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSection {
    /// Refresh cadence for `--watch` mode.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            relay_url: None,
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_probe_timeout_secs() -> u64 {
    6
}

fn default_poll_interval_secs() -> u64 {
    30
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nowplaying")
            .join("config.toml")
    }
}
