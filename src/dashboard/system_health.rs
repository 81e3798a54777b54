use super::fetcher;
use super::status::{overall_status, system_metrics, HealthStatus, SystemMetric};
use crate::client::BackendClient;
use crate::config::PollingConfig;
use crate::models::SystemHealth;
use crate::poll::{FailurePolicy, PollError, PollHandle, Poller};

/// Detailed system health panel.
pub struct SystemHealthView {
    health: PollHandle<SystemHealth>,
}

impl SystemHealthView {
    pub fn mount(client: &BackendClient, polling: &PollingConfig) -> Result<Self, PollError> {
        let health = Poller::new("system health", polling.detailed_health(), FailurePolicy::RetainOnError)?
            .spawn(fetcher(client, |c| async move { c.system_health().await }));
        Ok(Self { health })
    }

    pub fn metrics(&self) -> Vec<SystemMetric> {
        self.health.with(|s| system_metrics(s.data.as_ref()))
    }

    pub fn overall(&self) -> HealthStatus {
        overall_status(&self.metrics())
    }

    pub fn free_memory_gb(&self) -> Option<f64> {
        self.health.with(|s| s.data.as_ref().map(|h| h.system.free_memory_gb))
    }

    pub fn error(&self) -> Option<String> {
        self.health.with(|s| s.error.clone())
    }

    pub fn session_expired(&self) -> bool {
        self.health.with(|s| s.is_session_expired())
    }

    pub async fn changed(&mut self) -> bool {
        self.health.changed().await
    }
}
