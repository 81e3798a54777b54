use super::fetcher;
use super::overview::ChartPoint;
use crate::client::BackendClient;
use crate::config::PollingConfig;
use crate::models::{HourlyRequests, LatencyHistogram, TokensPerKey};
use crate::poll::{FailurePolicy, PollError, PollHandle, PollPhase, Poller, Snapshot};

/// Usage analytics: 24 hour traffic, latency distribution and token spend per key.
pub struct UsageView {
    hourly: PollHandle<HourlyRequests>,
    latency: PollHandle<LatencyHistogram>,
    tokens: PollHandle<TokensPerKey>,
}

impl UsageView {
    pub fn mount(client: &BackendClient, polling: &PollingConfig) -> Result<Self, PollError> {
        let hourly = Poller::new("requests 24h", polling.charts(), FailurePolicy::RetainOnError)?
            .spawn(fetcher(client, |c| async move { c.hourly_requests().await }));
        let latency = Poller::new("latency histogram", polling.charts(), FailurePolicy::RetainOnError)?
            .spawn(fetcher(client, |c| async move { c.latency_histogram().await }));
        let tokens = Poller::new("tokens per key", polling.charts(), FailurePolicy::RetainOnError)?
            .spawn(fetcher(client, |c| async move { c.tokens_per_key().await }));

        Ok(Self { hourly, latency, tokens })
    }

    pub fn hourly_requests(&self) -> Vec<ChartPoint> {
        self.hourly.with(|s| hourly_points(s.data.as_ref()))
    }

    pub fn latency_buckets(&self) -> Vec<ChartPoint> {
        self.latency.with(|s| {
            s.data
                .iter()
                .flat_map(|h| h.buckets.iter())
                .map(|b| ChartPoint {
                    label: b.range.clone(),
                    value: b.count,
                })
                .collect()
        })
    }

    pub fn tokens(&self) -> Snapshot<TokensPerKey> {
        self.tokens.snapshot()
    }

    /// Errors of the three resources, in display order.
    pub fn errors(&self) -> Vec<String> {
        [
            self.hourly.with(|s| s.error.clone()),
            self.latency.with(|s| s.error.clone()),
            self.tokens.with(|s| s.error.clone()),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn session_expired(&self) -> bool {
        self.hourly.with(|s| s.is_session_expired())
            || self.latency.with(|s| s.is_session_expired())
            || self.tokens.with(|s| s.is_session_expired())
    }

    /// Every resource has answered at least once.
    pub fn is_settled(&self) -> bool {
        let done = |phase: PollPhase| matches!(phase, PollPhase::Success | PollPhase::Error);
        done(self.hourly.with(|s| s.phase)) && done(self.latency.with(|s| s.phase)) && done(self.tokens.with(|s| s.phase))
    }

    pub async fn changed(&mut self) -> bool {
        tokio::select! {
            ok = self.hourly.changed() => ok,
            ok = self.latency.changed() => ok,
            ok = self.tokens.changed() => ok,
        }
    }

    /// Requests in the last 24 hours and the busiest hour.
    pub fn traffic_summary(&self) -> Option<(u64, ChartPoint)> {
        let points = self.hourly_requests();
        let total = points.iter().map(|p| p.value).sum();
        let peak = points.into_iter().max_by_key(|p| p.value)?;
        Some((total, peak))
    }
}

pub fn hourly_points(hourly: Option<&HourlyRequests>) -> Vec<ChartPoint> {
    hourly
        .map(|h| {
            h.points
                .iter()
                .map(|p| ChartPoint {
                    label: p.time.clone(),
                    value: p.requests,
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HourPoint;

    #[test]
    fn test_hourly_points_keep_order() {
        let hourly = HourlyRequests {
            measured_at: 0,
            points: vec![
                HourPoint {
                    time: "22:00".into(),
                    requests: 4,
                },
                HourPoint {
                    time: "23:00".into(),
                    requests: 9,
                },
            ],
        };
        let points = hourly_points(Some(&hourly));
        assert_eq!(points[0].label, "22:00");
        assert_eq!(points[1].value, 9);
        assert!(hourly_points(None).is_empty());
    }
}
