use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "fortress-console";
const CONFIG_FILE: &str = "config.toml";
const BASE_URL_ENV: &str = "FORTRESS_BACKEND_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Root configuration, one table per section of `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Unset means the HTTP client default (no timeout).
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: None,
        }
    }
}

/// Refresh intervals in seconds for each polled resource family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_health_secs")]
    pub health_secs: u64,
    #[serde(default = "default_detailed_health_secs")]
    pub detailed_health_secs: u64,
    #[serde(default = "default_stats_secs")]
    pub stats_secs: u64,
    #[serde(default = "default_charts_secs")]
    pub charts_secs: u64,
    #[serde(default = "default_job_secs")]
    pub job_secs: u64,
}

fn default_health_secs() -> u64 {
    10
}

fn default_detailed_health_secs() -> u64 {
    15
}

fn default_stats_secs() -> u64 {
    30
}

fn default_charts_secs() -> u64 {
    60
}

fn default_job_secs() -> u64 {
    10
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            health_secs: default_health_secs(),
            detailed_health_secs: default_detailed_health_secs(),
            stats_secs: default_stats_secs(),
            charts_secs: default_charts_secs(),
            job_secs: default_job_secs(),
        }
    }
}

impl PollingConfig {
    pub fn health(&self) -> Duration {
        Duration::from_secs(self.health_secs)
    }

    pub fn detailed_health(&self) -> Duration {
        Duration::from_secs(self.detailed_health_secs)
    }

    pub fn stats(&self) -> Duration {
        Duration::from_secs(self.stats_secs)
    }

    pub fn charts(&self) -> Duration {
        Duration::from_secs(self.charts_secs)
    }

    pub fn job(&self) -> Duration {
        Duration::from_secs(self.job_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Where the session context is kept between runs.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also write daily-rotated log files under the app directory.
    #[serde(default = "default_log_file")]
    pub file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

impl AppConfig {
    /// App directory under the platform config dir (`~/.config/fortress-console` on Linux).
    pub fn app_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    pub fn default_path() -> PathBuf {
        Self::app_dir().join(CONFIG_FILE)
    }

    pub fn log_dir() -> PathBuf {
        Self::app_dir().join("logs")
    }

    /// Loads the config at `path`, falling back to defaults when the file is absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str::<AppConfig>(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            tracing::debug!("No config file at {:?}, using defaults", path);
            AppConfig::default()
        };

        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.backend.base_url = url;
            }
        }

        config.backend.base_url = config.backend.base_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path())
    }

    pub fn session_path(&self) -> PathBuf {
        self.session
            .path
            .clone()
            .unwrap_or_else(|| Self::app_dir().join("session.json"))
    }
}
