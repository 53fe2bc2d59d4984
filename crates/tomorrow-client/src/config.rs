use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Backend the dashboard talks to when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8002";

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "tomorrow.toml";

/// Client configuration, loaded from `tomorrow.toml` and the environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// Total timeout for ordinary dashboard API requests.
    pub request_timeout_secs: u64,
    /// Total timeout for scenario API requests (generation is slower).
    pub scenario_timeout_secs: u64,
    /// Connect timeout, also applied to the analysis stream.
    pub connect_timeout_secs: u64,
    pub refresh_interval_secs: u64,
    /// Delay between scenario list retries while analysis is in progress.
    pub scenario_retry_secs: u64,
    pub deadline_days_ahead: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 10,
            scenario_timeout_secs: 30,
            connect_timeout_secs: 5,
            refresh_interval_secs: 30,
            scenario_retry_secs: 3,
            deadline_days_ahead: 30,
        }
    }
}

impl ClientConfig {
    /// Load config from `tomorrow.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = Self::load_file(Path::new(CONFIG_FILE));
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Read a config file, falling back to defaults when it is missing or invalid.
    pub fn load_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<ClientConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!(path = %path.display(), "Loaded configuration");
                    cfg
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Failed to parse config: {e}, using defaults");
                    ClientConfig::default()
                },
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                ClientConfig::default()
            },
        }
    }

    /// Apply `TOMORROW_*` overrides. Empty or unparseable values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("TOMORROW_API_URL")
            && !url.is_empty()
        {
            self.api_base_url = url;
        }

        let secs = |key: &str| lookup(key).and_then(|v| v.parse::<u64>().ok());
        if let Some(n) = secs("TOMORROW_REFRESH_INTERVAL_SECS") {
            self.refresh_interval_secs = n;
        }
        if let Some(n) = secs("TOMORROW_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = n;
        }
        if let Some(n) = secs("TOMORROW_SCENARIO_TIMEOUT_SECS") {
            self.scenario_timeout_secs = n;
        }
        if let Some(n) = secs("TOMORROW_SCENARIO_RETRY_SECS") {
            self.scenario_retry_secs = n;
        }
        if let Some(days) = lookup("TOMORROW_DEADLINE_DAYS").and_then(|v| v.parse::<u32>().ok()) {
            self.deadline_days_ahead = days;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.api_base_url).map_err(|_| {
            ConfigError::InvalidBaseUrl(self.api_base_url.clone())
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ConfigError::InvalidBaseUrl(self.api_base_url.clone()));
        }

        for (field, value) in [
            ("request_timeout_secs", self.request_timeout_secs),
            ("scenario_timeout_secs", self.scenario_timeout_secs),
            ("connect_timeout_secs", self.connect_timeout_secs),
            ("refresh_interval_secs", self.refresh_interval_secs),
            ("scenario_retry_secs", self.scenario_retry_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroValue { field });
            }
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn scenario_retry(&self) -> Duration {
        Duration::from_secs(self.scenario_retry_secs)
    }
}
