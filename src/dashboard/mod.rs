//! Framework-free view state for the admin dashboard.
//!
//! Polled views own their [`PollHandle`](crate::poll::PollHandle)s and derive
//! display values from the latest snapshots on demand. CRUD panels hold plain
//! row state and turn every action into a [`Notice`].

pub mod format;
pub mod header;
pub mod keys;
pub mod models;
pub mod notice;
pub mod overview;
pub mod projects;
pub mod status;
pub mod system_health;
pub mod usage;
pub mod users;

pub use header::HeaderView;
pub use keys::{ApiKeyPanel, KeyRow};
pub use models::{follow_job, ModelHub};
pub use notice::{Notice, NoticeLevel};
pub use overview::{ChartPoint, OverviewView, StatCard};
pub use projects::ProjectsPanel;
pub use status::{classify_health, overall_status, system_metrics, HealthStatus, StatusBadge, StatusTile, SystemMetric, TileStatus};
pub use system_health::SystemHealthView;
pub use usage::UsageView;
pub use users::UsersPanel;

use crate::client::BackendClient;
use crate::error::ApiError;
use crate::poll::FetchFuture;
use futures::FutureExt;
use std::future::Future;

/// Turns a client call into the fetch closure a [`Poller`](crate::poll::Poller) runs.
pub(crate) fn fetcher<T, F, Fut>(client: &BackendClient, call: F) -> impl Fn() -> FetchFuture<T> + Send + Sync + 'static
where
    T: Send + 'static,
    F: Fn(BackendClient) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    let client = client.clone();
    move || call(client.clone()).boxed()
}
