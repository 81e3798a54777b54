use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// `/admin/stats/summary`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub measured_at: i64,
    #[serde(default)]
    pub uptime_seconds: u64,
    pub projects: ProjectCounts,
    pub api_keys: ApiKeyCounts,
    pub requests: RequestCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectCounts {
    pub total: u64,
    #[serde(default)]
    pub added_last_30d: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyCounts {
    pub active: u64,
    #[serde(default)]
    pub created_last_7d: u64,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestCounts {
    pub total: u64,
    #[serde(default)]
    pub last_30d: u64,
}

/// `/admin/stats/projects/status`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectStatusBreakdown {
    #[serde(default)]
    pub measured_at: i64,
    #[serde(default)]
    pub active: u64,
    #[serde(default)]
    pub paused: u64,
    #[serde(default)]
    pub archived: u64,
    #[serde(default)]
    pub total: u64,
}

/// `/admin/stats/apikeys/status`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyStatusBreakdown {
    #[serde(default)]
    pub measured_at: i64,
    #[serde(default)]
    pub active: u64,
    #[serde(default)]
    pub revoked: u64,
    #[serde(default)]
    pub total: u64,
}

/// `/admin/stats/requests/weekly`: seven calendar days, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyRequests {
    #[serde(default)]
    pub measured_at: i64,
    #[serde(default)]
    pub days: Vec<DayCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayCount {
    pub date: NaiveDate,
    #[serde(default)]
    pub count: u64,
}

/// `/admin/metrics/requests/24h`: hourly buckets labelled `HH:00`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyRequests {
    #[serde(default)]
    pub measured_at: i64,
    #[serde(default)]
    pub points: Vec<HourPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourPoint {
    pub time: String,
    #[serde(default)]
    pub requests: u64,
}

/// `/admin/metrics/latency/histogram` over the last 24 hours
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyHistogram {
    #[serde(default)]
    pub measured_at: i64,
    #[serde(default)]
    pub buckets: Vec<LatencyBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyBucket {
    pub range: String,
    #[serde(default)]
    pub count: u64,
}

impl LatencyHistogram {
    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

/// `/admin/metrics/tokens/per-key`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokensPerKey {
    #[serde(default)]
    pub measured_at: i64,
    #[serde(default)]
    pub keys: Vec<KeyTokens>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyTokens {
    pub key: String,
    #[serde(default)]
    pub tokens: u64,
    #[serde(default)]
    pub requests: u64,
    #[serde(default)]
    pub errors: u64,
}

impl TokensPerKey {
    pub fn total_tokens(&self) -> u64 {
        self.keys.iter().map(|k| k.tokens).sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.keys.iter().map(|k| k.errors).sum()
    }

    /// Errors as a percentage of all requests; 0 when nothing was served.
    pub fn error_rate_percent(&self) -> f64 {
        let requests: u64 = self.keys.iter().map(|k| k.requests).sum();
        if requests == 0 {
            return 0.0;
        }
        self.total_errors() as f64 * 100.0 / requests as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_parses() {
        let json = serde_json::json!({
            "measured_at": 1_758_000_000,
            "uptime_seconds": 90061,
            "projects": { "total": 4, "added_last_30d": 1 },
            "api_keys": { "active": 7, "created_last_7d": 2, "total": 9 },
            "requests": { "total": 12450, "last_30d": 3250 }
        });
        let summary: StatsSummary = serde_json::from_value(json).unwrap();
        assert_eq!(summary.api_keys.total, 9);
        assert_eq!(summary.requests.last_30d, 3250);
    }

    #[test]
    fn test_weekly_dates_are_calendar_days() {
        let json = serde_json::json!({
            "measured_at": 0,
            "days": [{ "date": "2025-09-15", "count": 3 }, { "date": "2025-09-16", "count": 0 }]
        });
        let weekly: WeeklyRequests = serde_json::from_value(json).unwrap();
        assert_eq!(weekly.days[0].date, NaiveDate::from_ymd_opt(2025, 9, 15).unwrap());
        assert_eq!(weekly.days[1].count, 0);
    }

    #[test]
    fn test_error_rate() {
        let tokens = TokensPerKey {
            measured_at: 0,
            keys: vec![
                KeyTokens { key: "Production".into(), tokens: 2_840_000, requests: 9_000, errors: 1 },
                KeyTokens { key: "Testing".into(), tokens: 150_000, requests: 1_000, errors: 1 },
            ],
        };
        assert_eq!(tokens.total_tokens(), 2_990_000);
        assert!((tokens.error_rate_percent() - 0.02).abs() < 1e-9);
        assert_eq!(TokensPerKey::default().error_rate_percent(), 0.0);
    }
}
