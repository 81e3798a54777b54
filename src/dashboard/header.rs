use super::fetcher;
use super::status::{classify_health, StatusBadge};
use crate::client::BackendClient;
use crate::config::PollingConfig;
use crate::models::SystemHealth;
use crate::poll::{FailurePolicy, PollError, PollHandle, Poller, Snapshot};
use crate::session::SessionContext;

/// Top bar: signed-in user and the overall system badge.
pub struct HeaderView {
    username: String,
    company: String,
    health: PollHandle<SystemHealth>,
}

impl HeaderView {
    pub fn mount(client: &BackendClient, polling: &PollingConfig, session: &SessionContext) -> Result<Self, PollError> {
        let health = Poller::new("header health", polling.health(), FailurePolicy::ClearOnError)?
            .spawn(fetcher(client, |c| async move { c.system_health().await }));

        Ok(Self {
            username: session.username().to_string(),
            company: session.company_name().to_string(),
            health,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn badge(&self) -> StatusBadge {
        self.health.with(|s| classify_health(s.data.as_ref()))
    }

    pub fn health(&self) -> Snapshot<SystemHealth> {
        self.health.snapshot()
    }

    pub fn session_expired(&self) -> bool {
        self.health.with(|s| s.is_session_expired())
    }

    pub async fn changed(&mut self) -> bool {
        self.health.changed().await
    }
}
