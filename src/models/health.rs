use serde::{Deserialize, Serialize};

/// Snapshot served by `/admin/system/health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHealth {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub uptime_seconds: u64,
    #[serde(default)]
    pub system: SystemMetrics,
    pub model_server: ModelServerHealth,
    #[serde(default)]
    pub db: Option<DbHealth>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    #[serde(default)]
    pub cpu_percent: f64,
    #[serde(default)]
    pub memory_percent: f64,
    #[serde(default)]
    pub free_memory_gb: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelServerHealth {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub ok: bool,
    /// Absent when the model server could not be reached at all.
    #[serde(default)]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DbHealth {
    #[serde(default)]
    pub ok: bool,
}

impl SystemHealth {
    pub fn db_ok(&self) -> bool {
        self.db.map(|db| db.ok).unwrap_or(false)
    }
}
