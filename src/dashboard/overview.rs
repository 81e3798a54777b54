use super::fetcher;
use super::format::{format_thousands, format_uptime, updated_ago, weekday_label};
use super::status::{overview_tiles, StatusTile};
use crate::client::BackendClient;
use crate::config::PollingConfig;
use crate::models::{ApiKeyStatusBreakdown, StatsSummary, SystemHealth, VerifyResponse, WeeklyRequests};
use crate::poll::{FailurePolicy, PollError, PollHandle, Poller};

const PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatCard {
    pub title: &'static str,
    pub value: String,
    pub change: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartPoint {
    pub label: String,
    pub value: u64,
}

impl ChartPoint {
    fn new(label: impl Into<String>, value: u64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// The four counters at the top of the overview page.
///
/// Without a summary every value is a placeholder and the change line reads
/// `loading…`.
pub fn stats_cards(summary: Option<&StatsSummary>, now: i64) -> Vec<StatCard> {
    let Some(s) = summary else {
        return ["Total Projects", "Active API Keys", "Total Requests", "System Uptime"]
            .into_iter()
            .map(|title| StatCard {
                title,
                value: PLACEHOLDER.to_string(),
                change: "loading…".to_string(),
            })
            .collect();
    };

    let updated = updated_ago(s.measured_at, now);
    vec![
        StatCard {
            title: "Total Projects",
            value: s.projects.total.to_string(),
            change: format!("+{} last 30d • {}", s.projects.added_last_30d, updated),
        },
        StatCard {
            title: "Active API Keys",
            value: s.api_keys.active.to_string(),
            change: format!("+{} last 7d • {}", s.api_keys.created_last_7d, updated),
        },
        StatCard {
            title: "Total Requests",
            value: format_thousands(s.requests.total),
            change: format!("+{} last 30d • {}", format_thousands(s.requests.last_30d), updated),
        },
        StatCard {
            title: "System Uptime",
            value: format_uptime(s.uptime_seconds),
            change: updated,
        },
    ]
}

/// Active/revoked split; zeros when the breakdown is unknown.
pub fn key_status_points(breakdown: Option<&ApiKeyStatusBreakdown>) -> Vec<ChartPoint> {
    let b = breakdown.copied().unwrap_or_default();
    vec![ChartPoint::new("Active", b.active), ChartPoint::new("Revoked", b.revoked)]
}

pub fn weekly_points(weekly: Option<&WeeklyRequests>) -> Vec<ChartPoint> {
    weekly
        .map(|w| {
            w.days
                .iter()
                .map(|d| ChartPoint::new(weekday_label(d.date), d.count))
                .collect()
        })
        .unwrap_or_default()
}

/// Overview page: counters, service tiles and the two small charts.
pub struct OverviewView {
    stats: PollHandle<StatsSummary>,
    key_status: PollHandle<ApiKeyStatusBreakdown>,
    weekly: PollHandle<WeeklyRequests>,
    health: PollHandle<SystemHealth>,
    auth: PollHandle<VerifyResponse>,
}

impl OverviewView {
    pub fn mount(client: &BackendClient, polling: &PollingConfig) -> Result<Self, PollError> {
        let stats = Poller::new("stats summary", polling.stats(), FailurePolicy::RetainOnError)?
            .spawn(fetcher(client, |c| async move { c.stats_summary().await }));
        let key_status = Poller::new("api key status", polling.charts(), FailurePolicy::ClearOnError)?
            .spawn(fetcher(client, |c| async move { c.api_key_status().await }));
        let weekly = Poller::new("weekly requests", polling.charts(), FailurePolicy::RetainOnError)?
            .spawn(fetcher(client, |c| async move { c.weekly_requests().await }));
        let health = Poller::new("overview health", polling.health(), FailurePolicy::ClearOnError)?
            .spawn(fetcher(client, |c| async move { c.system_health().await }));
        let auth = Poller::new("auth check", polling.health(), FailurePolicy::ClearOnError)?
            .spawn(fetcher(client, |c| async move { c.verify_session().await }));

        Ok(Self {
            stats,
            key_status,
            weekly,
            health,
            auth,
        })
    }

    pub fn stats_cards(&self) -> Vec<StatCard> {
        let now = chrono::Utc::now().timestamp();
        self.stats.with(|s| stats_cards(s.data.as_ref(), now))
    }

    pub fn stats_error(&self) -> Option<String> {
        self.stats.with(|s| s.error.clone())
    }

    pub fn key_status(&self) -> Vec<ChartPoint> {
        self.key_status.with(|s| key_status_points(s.data.as_ref()))
    }

    pub fn weekly_requests(&self) -> Vec<ChartPoint> {
        self.weekly.with(|s| weekly_points(s.data.as_ref()))
    }

    /// First chart error, if any.
    pub fn charts_error(&self) -> Option<String> {
        self.key_status
            .with(|s| s.error.clone())
            .or_else(|| self.weekly.with(|s| s.error.clone()))
    }

    pub fn status_tiles(&self) -> Vec<StatusTile> {
        let auth_ok = self.auth.with(|s| match (&s.data, &s.error) {
            (Some(session), _) => Some(session.valid),
            (None, Some(_)) => Some(false),
            (None, None) => None,
        });
        self.health.with(|s| overview_tiles(s.data.as_ref(), auth_ok))
    }

    /// Any resource on the page was refused with 401.
    pub fn session_expired(&self) -> bool {
        self.auth.with(|s| s.is_session_expired())
            || self.stats.with(|s| s.is_session_expired())
            || self.key_status.with(|s| s.is_session_expired())
            || self.weekly.with(|s| s.is_session_expired())
            || self.health.with(|s| s.is_session_expired())
    }

    /// Waits until any of the page's resources publishes a change.
    pub async fn changed(&mut self) -> bool {
        tokio::select! {
            ok = self.stats.changed() => ok,
            ok = self.key_status.changed() => ok,
            ok = self.weekly.changed() => ok,
            ok = self.health.changed() => ok,
            ok = self.auth.changed() => ok,
        }
    }
}
