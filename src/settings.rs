use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

use crate::progress::EmptyStopPolicy;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost/busbeacon/api";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    /// Background poll period while the route screen is focused.
    pub poll_interval_secs: u64,
    /// Upper bound for the poll delay after repeated failures.
    pub max_backoff_secs: u64,
    /// Random spread added to backed-off delays.
    pub backoff_jitter_ms: u64,
    pub request_timeout_secs: u64,
    pub empty_stop_policy: EmptyStopPolicy,
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            poll_interval_secs: 15,
            max_backoff_secs: 120,
            backoff_jitter_ms: 1_000,
            request_timeout_secs: 20,
            empty_stop_policy: EmptyStopPolicy::default(),
            debug: false,
        }
    }
}

impl AppConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs).max(self.poll_interval())
    }

    pub fn backoff_jitter(&self) -> Duration {
        Duration::from_millis(self.backoff_jitter_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// `BUSBEACON_API_URL`, `BUSBEACON_POLL_SECS` and `BUSBEACON_DEBUG` win
    /// over the file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("BUSBEACON_API_URL").filter(|value| !value.is_empty()) {
            self.api_base_url = url;
        }
        if let Some(secs) = lookup("BUSBEACON_POLL_SECS").and_then(|value| value.parse().ok()) {
            self.poll_interval_secs = secs;
        }
        if let Some(flag) = lookup("BUSBEACON_DEBUG") {
            self.debug = flag_enabled(&flag);
        }
    }
}

/// `1` or `true` (any case), as the debug switch has always been read.
pub fn flag_enabled(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// `AppConfig` persisted as JSON in the app data directory.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<AppConfig>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let mut data: AppConfig = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            AppConfig::default()
        };
        data.apply_env_overrides();

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn config(&self) -> Result<AppConfig> {
        self.data
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| anyhow!("settings lock poisoned"))
    }

    pub fn update(&self, config: AppConfig) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        *guard = config;
        self.persist(&guard)
    }

    fn persist(&self, data: &AppConfig) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
