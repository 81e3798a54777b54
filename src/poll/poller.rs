use super::snapshot::{FailurePolicy, Snapshot};
use crate::error::ApiError;
use futures::future::BoxFuture;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub const MIN_INTERVAL: Duration = Duration::from_secs(10);
pub const MAX_INTERVAL: Duration = Duration::from_secs(60);

pub type FetchFuture<T> = BoxFuture<'static, Result<T, ApiError>>;

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Refresh interval for {resource} must be between {min:?} and {max:?}, got {interval:?}")]
    IntervalOutOfRange {
        resource: String,
        interval: Duration,
        min: Duration,
        max: Duration,
    },
}

/// Definition of one polled resource: name, interval and failure policy.
#[derive(Debug, Clone)]
pub struct Poller {
    resource: String,
    interval: Duration,
    policy: FailurePolicy,
}

impl Poller {
    pub fn new(resource: impl Into<String>, interval: Duration, policy: FailurePolicy) -> Result<Self, PollError> {
        let resource = resource.into();
        if interval < MIN_INTERVAL || interval > MAX_INTERVAL {
            return Err(PollError::IntervalOutOfRange {
                resource,
                interval,
                min: MIN_INTERVAL,
                max: MAX_INTERVAL,
            });
        }

        Ok(Self {
            resource,
            interval,
            policy,
        })
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Mounts the resource: one fetch now, then one per interval until the
    /// handle is dropped.
    ///
    /// Ticks follow the wall clock. A tick that falls due while a fetch is
    /// still running fires as soon as that fetch completes, so a resource
    /// never has two requests in flight.
    pub fn spawn<T, F>(self, fetch: F) -> PollHandle<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> FetchFuture<T> + Send + Sync + 'static,
    {
        let (tx, rx) = watch::channel(Snapshot::default());
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let Poller {
            resource,
            interval,
            policy,
        } = self;

        tracing::debug!("Polling {} every {:?} ({:?})", resource, interval, policy);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                tx.send_modify(|snap| snap.begin());

                let result = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    result = fetch() => result,
                };

                // Unmounted while the response was being decoded.
                if token.is_cancelled() {
                    break;
                }

                if let Err(e) = &result {
                    tracing::debug!("Refresh of {} failed: {}", resource, e);
                }
                tx.send_modify(|snap| snap.apply(result, policy));
            }

            tracing::trace!("Polling of {} stopped", resource);
        });

        PollHandle { rx, cancel, task }
    }
}

/// A mounted poll loop. Dropping it unmounts the resource.
pub struct PollHandle<T> {
    rx: watch::Receiver<Snapshot<T>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl<T: Clone> PollHandle<T> {
    pub fn snapshot(&self) -> Snapshot<T> {
        self.rx.borrow().clone()
    }
}

impl<T> PollHandle<T> {
    /// Reads the current snapshot without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&Snapshot<T>) -> R) -> R {
        f(&self.rx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.rx.clone()
    }

    /// Waits for the next published change; `false` once the loop is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Stops the loop. Equivalent to dropping the handle.
    pub fn unmount(self) {}

    pub fn is_mounted(&self) -> bool {
        !self.cancel.is_cancelled() && !self.task.is_finished()
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}
