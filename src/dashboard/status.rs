use crate::models::SystemHealth;
use std::fmt;

const LATENCY_WINDOW_MS: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HealthStatus {
    Checking,
    Healthy,
    Warning,
    Critical,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthStatus::Checking => "checking",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBadge {
    pub status: HealthStatus,
    pub label: &'static str,
}

/// Header badge for the latest health snapshot.
///
/// An offline model server is critical whatever the host metrics say. Any
/// single metric over its critical threshold makes the whole system critical.
pub fn classify_health(health: Option<&SystemHealth>) -> StatusBadge {
    let Some(h) = health else {
        return StatusBadge {
            status: HealthStatus::Checking,
            label: "Checking…",
        };
    };

    if !h.model_server.ok {
        return StatusBadge {
            status: HealthStatus::Critical,
            label: "Model Offline",
        };
    }

    let cpu = h.system.cpu_percent;
    let mem = h.system.memory_percent;
    let lat = h.model_server.latency_ms.unwrap_or(0);

    if cpu >= 90.0 || mem >= 90.0 || lat >= 800 {
        StatusBadge {
            status: HealthStatus::Critical,
            label: "Partial Outage",
        }
    } else if cpu >= 70.0 || mem >= 80.0 || lat >= 300 {
        StatusBadge {
            status: HealthStatus::Warning,
            label: "Degraded Performance",
        }
    } else {
        StatusBadge {
            status: HealthStatus::Healthy,
            label: "All Systems Operational",
        }
    }
}

/// One gauge of the detailed system health panel.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemMetric {
    pub name: &'static str,
    /// Progress value, 0..=100.
    pub value: f64,
    pub status: HealthStatus,
    pub display: String,
}

fn load_status(percent: f64) -> HealthStatus {
    if percent < 70.0 {
        HealthStatus::Healthy
    } else if percent < 90.0 {
        HealthStatus::Warning
    } else {
        HealthStatus::Critical
    }
}

fn latency_status(latency_ms: u64) -> HealthStatus {
    match latency_ms {
        0 => HealthStatus::Warning,
        1..=299 => HealthStatus::Healthy,
        300..=799 => HealthStatus::Warning,
        _ => HealthStatus::Critical,
    }
}

fn format_percent(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}%", value as i64)
    } else {
        format!("{}%", value)
    }
}

/// Model server, latency, CPU and memory gauges.
pub fn system_metrics(health: Option<&SystemHealth>) -> Vec<SystemMetric> {
    let Some(h) = health else {
        return vec![
            SystemMetric {
                name: "Model Server",
                value: 0.0,
                status: HealthStatus::Warning,
                display: "Checking…".into(),
            },
            SystemMetric {
                name: "Model Latency",
                value: 0.0,
                status: HealthStatus::Warning,
                display: "—".into(),
            },
            SystemMetric {
                name: "CPU Usage",
                value: 0.0,
                status: HealthStatus::Warning,
                display: "0%".into(),
            },
            SystemMetric {
                name: "Memory Usage",
                value: 0.0,
                status: HealthStatus::Warning,
                display: "0%".into(),
            },
        ];
    };

    let cpu = h.system.cpu_percent;
    let mem = h.system.memory_percent;
    let latency = h.model_server.latency_ms.unwrap_or(0);
    let latency_pct = (latency as f64 / LATENCY_WINDOW_MS * 100.0).clamp(0.0, 100.0);

    vec![
        SystemMetric {
            name: "Model Server",
            value: if h.model_server.ok { 100.0 } else { 0.0 },
            status: if h.model_server.ok {
                HealthStatus::Healthy
            } else {
                HealthStatus::Critical
            },
            display: if h.model_server.ok { "Online" } else { "Offline" }.into(),
        },
        SystemMetric {
            name: "Model Latency",
            value: latency_pct,
            status: latency_status(latency),
            display: h
                .model_server
                .latency_ms
                .map(|ms| format!("{} ms", ms))
                .unwrap_or_else(|| "—".into()),
        },
        SystemMetric {
            name: "CPU Usage",
            value: cpu,
            status: load_status(cpu),
            display: format_percent(cpu),
        },
        SystemMetric {
            name: "Memory Usage",
            value: mem,
            status: load_status(mem),
            display: format_percent(mem),
        },
    ]
}

/// Worst status among the gauges.
pub fn overall_status(metrics: &[SystemMetric]) -> HealthStatus {
    if metrics.iter().any(|m| m.status == HealthStatus::Critical) {
        HealthStatus::Critical
    } else if metrics.iter().any(|m| m.status == HealthStatus::Warning) {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStatus {
    Ok,
    Slow,
    Down,
    Checking,
}

impl fmt::Display for TileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TileStatus::Ok => "OK",
            TileStatus::Slow => "Slow",
            TileStatus::Down => "Down",
            TileStatus::Checking => "Checking",
        };
        write!(f, "{}", s)
    }
}

/// Service tile of the overview page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTile {
    pub name: &'static str,
    pub status: TileStatus,
    pub subtitle: &'static str,
}

/// Gateway, database and authentication tiles.
///
/// `auth_ok` comes from the overview's own verify poll; `None` until it
/// first resolves.
pub fn overview_tiles(health: Option<&SystemHealth>, auth_ok: Option<bool>) -> Vec<StatusTile> {
    const CHECKING: (TileStatus, &str) = (TileStatus::Checking, "Checking");

    let gateway = match health {
        None => CHECKING,
        Some(h) if h.system.cpu_percent >= 90.0 || h.system.memory_percent >= 90.0 => (TileStatus::Slow, "High load"),
        Some(_) => (TileStatus::Ok, "Operational"),
    };

    let database = match health {
        None => CHECKING,
        Some(h) if h.db_ok() => (TileStatus::Ok, "Operational"),
        Some(_) => (TileStatus::Down, "Unavailable"),
    };

    let auth = match auth_ok {
        None => CHECKING,
        Some(true) => (TileStatus::Ok, "Operational"),
        Some(false) => (TileStatus::Down, "Unavailable"),
    };

    [("API Gateway", gateway), ("Database", database), ("Authentication", auth)]
        .into_iter()
        .map(|(name, (status, subtitle))| StatusTile { name, status, subtitle })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DbHealth, ModelServerHealth, SystemMetrics};

    fn health(cpu: f64, mem: f64, latency: Option<u64>, model_ok: bool) -> SystemHealth {
        SystemHealth {
            ok: model_ok,
            uptime_seconds: 120,
            system: SystemMetrics {
                cpu_percent: cpu,
                memory_percent: mem,
                free_memory_gb: 4.0,
            },
            model_server: ModelServerHealth {
                url: "http://localhost:8000/generate".into(),
                ok: model_ok,
                latency_ms: latency,
            },
            db: Some(DbHealth { ok: true }),
        }
    }

    #[test]
    fn test_model_offline_wins_over_metrics() {
        let badge = classify_health(Some(&health(5.0, 5.0, Some(20), false)));
        assert_eq!(badge.status, HealthStatus::Critical);
        assert_eq!(badge.label, "Model Offline");

        let sparse: SystemHealth =
            serde_json::from_value(serde_json::json!({ "model_server": { "ok": false } })).unwrap();
        assert_eq!(classify_health(Some(&sparse)).label, "Model Offline");
    }

    #[test]
    fn test_cpu_alone_is_partial_outage() {
        let badge = classify_health(Some(&health(95.0, 50.0, Some(50), true)));
        assert_eq!(badge.status, HealthStatus::Critical);
        assert_eq!(badge.label, "Partial Outage");
    }

    #[test]
    fn test_warning_and_healthy_thresholds() {
        assert_eq!(
            classify_health(Some(&health(10.0, 80.0, Some(50), true))).label,
            "Degraded Performance"
        );
        assert_eq!(
            classify_health(Some(&health(10.0, 10.0, Some(300), true))).status,
            HealthStatus::Warning
        );
        assert_eq!(
            classify_health(Some(&health(10.0, 10.0, Some(800), true))).status,
            HealthStatus::Critical
        );
        assert_eq!(
            classify_health(Some(&health(69.9, 79.9, None, true))).label,
            "All Systems Operational"
        );
        assert_eq!(classify_health(None).status, HealthStatus::Checking);
    }

    #[test]
    fn test_metrics_without_snapshot_are_pending() {
        let metrics = system_metrics(None);
        assert_eq!(metrics.len(), 4);
        assert!(metrics.iter().all(|m| m.status == HealthStatus::Warning));
        assert_eq!(metrics[0].display, "Checking…");
        assert_eq!(overall_status(&metrics), HealthStatus::Warning);
    }

    #[test]
    fn test_metric_statuses() {
        let metrics = system_metrics(Some(&health(72.5, 91.0, Some(1500), true)));
        assert_eq!(metrics[0].display, "Online");
        assert_eq!(metrics[1].value, 100.0);
        assert_eq!(metrics[1].status, HealthStatus::Critical);
        assert_eq!(metrics[1].display, "1500 ms");
        assert_eq!(metrics[2].status, HealthStatus::Warning);
        assert_eq!(metrics[2].display, "72.5%");
        assert_eq!(metrics[3].status, HealthStatus::Critical);
        assert_eq!(overall_status(&metrics), HealthStatus::Critical);

        let zero_latency = system_metrics(Some(&health(1.0, 1.0, None, true)));
        assert_eq!(zero_latency[1].status, HealthStatus::Warning);
        assert_eq!(zero_latency[1].display, "—");
    }

    #[test]
    fn test_overview_tiles() {
        let tiles = overview_tiles(Some(&health(92.0, 10.0, Some(40), true)), Some(true));
        assert_eq!(tiles[0].status, TileStatus::Slow);
        assert_eq!(tiles[0].subtitle, "High load");
        assert_eq!(tiles[1].status, TileStatus::Ok);
        assert_eq!(tiles[2].status, TileStatus::Ok);

        let mut no_db = health(10.0, 10.0, Some(40), true);
        no_db.db = None;
        let tiles = overview_tiles(Some(&no_db), None);
        assert_eq!(tiles[1].status, TileStatus::Down);
        assert_eq!(tiles[2].status, TileStatus::Checking);

        let tiles = overview_tiles(None, Some(true));
        assert_eq!(tiles[0].status, TileStatus::Checking);
        assert_eq!(tiles[1].status, TileStatus::Checking);
        assert_eq!(tiles[2].status, TileStatus::Ok);
    }
}
