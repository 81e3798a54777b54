use crate::error::ApiError;
use chrono::{DateTime, Utc};

/// What a failed fetch does to the data already on display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Drop the last good data; the view shows the resource as unknown.
    ClearOnError,
    /// Keep showing the last good data next to the error message.
    RetainOnError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    Loading,
    Success,
    Error,
}

/// Latest view of one polled resource.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    /// HTTP status of the last failure, if the backend answered.
    pub error_status: Option<u16>,
    pub phase: PollPhase,
    /// Time of the last successful fetch.
    pub fetched_at: Option<DateTime<Utc>>,
    /// Fetches started since mount.
    pub attempts: u64,
    /// Failed fetches since the last success.
    pub failures: u32,
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            error_status: None,
            phase: PollPhase::Idle,
            fetched_at: None,
            attempts: 0,
            failures: 0,
        }
    }
}

impl<T> Snapshot<T> {
    pub(crate) fn begin(&mut self) {
        self.phase = PollPhase::Loading;
        self.attempts += 1;
    }

    /// Replaces the whole snapshot with the outcome of one fetch.
    pub(crate) fn apply(&mut self, result: Result<T, ApiError>, policy: FailurePolicy) {
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
                self.error_status = None;
                self.failures = 0;
                self.phase = PollPhase::Success;
                self.fetched_at = Some(Utc::now());
            }
            Err(e) => {
                if policy == FailurePolicy::ClearOnError {
                    self.data = None;
                }
                self.error = Some(e.to_string());
                self.error_status = e.status();
                self.failures += 1;
                self.phase = PollPhase::Error;
            }
        }
    }

    /// The last fetch was refused with 401.
    pub fn is_session_expired(&self) -> bool {
        self.error_status == Some(401)
    }

    pub fn is_stale(&self) -> bool {
        self.data.is_some() && self.error.is_some()
    }

    /// Seconds since the last successful fetch.
    pub fn age_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        self.fetched_at.map(|at| (now - at).num_seconds().max(0))
    }
}
