//! Fixed-interval refresh of backend resources.
//!
//! A [`Poller`] owns one resource: it fetches immediately when spawned, then
//! once per interval, and publishes each result as a [`Snapshot`] through a
//! watch channel. The returned [`PollHandle`] is the mount; dropping it stops
//! the loop and discards whatever fetch is still in flight.

pub mod poller;
pub mod snapshot;

pub use poller::{FetchFuture, PollError, PollHandle, Poller, MAX_INTERVAL, MIN_INTERVAL};
pub use snapshot::{FailurePolicy, PollPhase, Snapshot};
