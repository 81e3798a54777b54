use super::fetcher;
use super::notice::Notice;
use crate::client::BackendClient;
use crate::models::{CuratedModel, DownloadJob, DownloadedModel};
use crate::poll::{FailurePolicy, PollError, PollHandle, Poller, Snapshot};
use std::time::Duration;

/// Model catalog, local models and download jobs.
pub struct ModelHub {
    client: BackendClient,
    curated: Vec<CuratedModel>,
    downloaded: Vec<DownloadedModel>,
}

impl ModelHub {
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            curated: Vec::new(),
            downloaded: Vec::new(),
        }
    }

    pub async fn load_curated(&mut self) -> Result<usize, Notice> {
        self.curated = self
            .client
            .curated_models()
            .await
            .map_err(|e| Notice::failure("Failed to load models", &e))?;
        Ok(self.curated.len())
    }

    pub async fn load_downloaded(&mut self) -> Result<usize, Notice> {
        self.downloaded = self
            .client
            .downloaded_models()
            .await
            .map_err(|e| Notice::failure("Failed to load downloaded models", &e))?;
        Ok(self.downloaded.len())
    }

    pub fn search(&self, term: &str) -> Vec<&CuratedModel> {
        self.curated.iter().filter(|m| m.matches(term)).collect()
    }

    pub fn downloaded(&self) -> &[DownloadedModel] {
        &self.downloaded
    }

    /// Queues a download and returns its job id.
    pub async fn download(&self, repo_id: &str) -> Result<String, Notice> {
        if repo_id.trim().is_empty() {
            return Err(Notice::error("Missing model").with_description("Enter a model repository id"));
        }
        let accepted = self
            .client
            .start_download(repo_id)
            .await
            .map_err(|e| Notice::failure("Download failed", &e))?;
        tracing::info!("Download of {} queued as job {}", repo_id.trim(), accepted.job_id);
        Ok(accepted.job_id)
    }

    /// Polls a download job until the handle is dropped.
    pub fn track(&self, job_id: &str, interval: Duration) -> Result<PollHandle<DownloadJob>, PollError> {
        let job_id = job_id.to_string();
        Ok(Poller::new(format!("job {}", job_id), interval, FailurePolicy::RetainOnError)?
            .spawn(fetcher(&self.client, move |c| {
                let job_id = job_id.clone();
                async move { c.download_job(&job_id).await }
            })))
    }
}

/// Consecutive failed polls after which a job is given up.
pub const MAX_JOB_FAILURES: u32 = 3;

/// Waits for a tracked job to reach `done` or `error`, reporting each update.
///
/// Fails as soon as the job is unknown to the backend (404) or the session is
/// refused (401), after `MAX_JOB_FAILURES` failed polls in a row, or when the
/// poll loop stops.
pub async fn follow_job(
    handle: &mut PollHandle<DownloadJob>,
    mut on_update: impl FnMut(&DownloadJob),
) -> Result<DownloadJob, Notice> {
    let mut last: Option<DownloadJob> = None;
    loop {
        let (job, failure) = handle.with(|s| (s.data.clone(), tracking_failure(s)));
        if let Some(job) = job {
            if last.as_ref() != Some(&job) {
                on_update(&job);
            }
            if job.status.is_finished() {
                return Ok(job);
            }
            last = Some(job);
        }
        if let Some(notice) = failure {
            return Err(notice);
        }
        if !handle.changed().await {
            return Err(Notice::error("Stopped tracking download"));
        }
    }
}

fn tracking_failure(snap: &Snapshot<DownloadJob>) -> Option<Notice> {
    let error = snap.error.as_deref()?;
    match snap.error_status {
        Some(401) => Some(Notice::session_expired(error)),
        Some(404) => Some(Notice::error("Download job not found").with_description(error)),
        _ if snap.failures >= MAX_JOB_FAILURES => {
            Some(Notice::error("Download tracking failed").with_description(error))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::models::JobStatus;
    use reqwest::StatusCode;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicU8, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_follow_job_until_done() {
        let step = Arc::new(AtomicU8::new(0));
        let counter = step.clone();
        let mut handle = Poller::new("job test", Duration::from_secs(10), FailurePolicy::RetainOnError)
            .unwrap()
            .spawn(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    let (status, percent) = match n {
                        0 => (JobStatus::Queued, 0),
                        1 => (JobStatus::Running, 40),
                        _ => (JobStatus::Done, 100),
                    };
                    Ok(DownloadJob {
                        repo_id: "TinyLlama/TinyLlama-1.1B-Chat-v1.0".into(),
                        status,
                        percent,
                        error: None,
                    })
                }
                .boxed()
            });

        let mut seen = Vec::new();
        let job = follow_job(&mut handle, |j| seen.push(j.percent)).await.unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(seen, vec![0, 40, 100]);
        assert_eq!(step.load(Ordering::SeqCst), 3);
    }

    fn failing_job(status: StatusCode, body: &'static str) -> (Arc<AtomicU8>, PollHandle<DownloadJob>) {
        let calls = Arc::new(AtomicU8::new(0));
        let counter = calls.clone();
        let handle = Poller::new("job test", Duration::from_secs(10), FailurePolicy::RetainOnError)
            .unwrap()
            .spawn(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Err(ApiError::from_status(status, body)) }.boxed()
            });
        (calls, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_job_stops_on_missing_job() {
        let (calls, mut handle) = failing_job(StatusCode::NOT_FOUND, r#"{"detail":"Job not found"}"#);

        let notice = tokio::time::timeout(Duration::from_secs(3600), follow_job(&mut handle, |_| {}))
            .await
            .expect("follow_job returned")
            .unwrap_err();
        assert!(notice.is_error());
        assert_eq!(notice.description.as_deref(), Some("Job not found"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_job_stops_on_expired_session() {
        let (_, mut handle) = failing_job(StatusCode::UNAUTHORIZED, r#"{"detail":"Invalid token"}"#);

        let notice = follow_job(&mut handle, |_| {}).await.unwrap_err();
        assert!(notice.is_session_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_job_gives_up_after_repeated_failures() {
        let (calls, mut handle) = failing_job(StatusCode::BAD_GATEWAY, r#"{"detail":"model server unreachable"}"#);

        let notice = tokio::time::timeout(Duration::from_secs(3600), follow_job(&mut handle, |_| {}))
            .await
            .expect("follow_job returned")
            .unwrap_err();
        assert!(!notice.is_session_expired());
        assert_eq!(notice.description.as_deref(), Some("model server unreachable"));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_JOB_FAILURES as u8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_job_rides_out_a_transient_failure() {
        let step = Arc::new(AtomicU8::new(0));
        let counter = step.clone();
        let mut handle = Poller::new("job test", Duration::from_secs(10), FailurePolicy::RetainOnError)
            .unwrap()
            .spawn(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        return Err(ApiError::from_status(StatusCode::SERVICE_UNAVAILABLE, "busy"));
                    }
                    Ok(DownloadJob {
                        repo_id: "Qwen/Qwen2.5-0.5B-Instruct".into(),
                        status: JobStatus::Error,
                        percent: 12,
                        error: Some("disk full".into()),
                    })
                }
                .boxed()
            });

        let job = follow_job(&mut handle, |_| {}).await.unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.as_deref(), Some("disk full"));
    }
}
