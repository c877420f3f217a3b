//! Jobs: the unit of work the main loop dispatches, and the repeated-job scheduler that turns
//! "run this every N milliseconds" into due jobs the loop pops each iteration.

use std::time::{Duration, Instant};

use crate::{
    error::{Error, Result},
    ua::Guid,
};

/// Opaque per-connection/channel handle a [`crate::network::NetworkLayer`] associates with a
/// job; this core never interprets it, only threads it back to the layer that produced it.
pub type ChannelContext = std::sync::Arc<dyn std::any::Any + Send + Sync>;

/// A unit of work the main loop either runs inline or hands to a worker.
pub enum Job {
    /// A connection was closed or reset; always runs on the loop thread (see the concurrency
    /// model notes on the dispatch rules).
    DetachConnection(ChannelContext),
    /// A decoded service request ready for dispatch.
    DecodedRequest(ChannelContext),
    /// A method call deferred past its originating request (e.g. an asynchronous call).
    DelayedMethodCall(ChannelContext),
    /// A raw message still awaiting decoding.
    BinaryMessage(ChannelContext),
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DetachConnection(_) => "DetachConnection",
            Self::DecodedRequest(_) => "DecodedRequest",
            Self::DelayedMethodCall(_) => "DelayedMethodCall",
            Self::BinaryMessage(_) => "BinaryMessage",
        };
        f.debug_tuple(name).finish()
    }
}

impl Job {
    /// Whether this job must run on the loop thread rather than a worker (detach-connection
    /// jobs always do; repeated jobs are excluded from worker dispatch separately since they are
    /// not represented as [`Job`] values at all).
    #[must_use]
    pub const fn must_run_on_loop_thread(&self) -> bool {
        matches!(self, Self::DetachConnection(_))
    }
}

/// Identifies a registered repeated job, minted fresh on [`RepeatedJobScheduler::add`].
pub type RepeatedJobId = Guid;

/// The minimum interval this scheduler accepts, below which timer jitter would dominate the
/// requested period.
pub const MINIMUM_INTERVAL: Duration = Duration::from_millis(5);

struct RepeatedJob {
    id: RepeatedJobId,
    interval: Duration,
    next_fire: Instant,
    callback: Box<dyn FnMut() + Send>,
    pending_removal: bool,
}

/// Schedules callbacks to run on a fixed interval, re-based after every fire so drift never
/// accumulates (`next_fire += interval`, never `now() + interval`).
///
/// Removal is deferred to the next [`RepeatedJobScheduler::due`] call rather than applied
/// in-place, so a job removed from within its own callback does not invalidate the iteration in
/// progress; at most one extra fire is tolerated as a result.
pub struct RepeatedJobScheduler {
    jobs: Vec<RepeatedJob>,
}

impl Default for RepeatedJobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl RepeatedJobScheduler {
    #[must_use]
    pub const fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    /// Registers a new repeated job, due to first fire one `interval` from now.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::ArgumentInvalid`](crate::error::ErrorKind::ArgumentInvalid) if `interval` is
    /// below [`MINIMUM_INTERVAL`].
    pub fn add(
        &mut self,
        interval: Duration,
        callback: Box<dyn FnMut() + Send>,
    ) -> Result<RepeatedJobId> {
        Self::validate_interval(interval)?;
        let id = RepeatedJobId::new_v4();
        self.insert(id, interval, callback);
        Ok(id)
    }

    /// Checks `interval` against [`MINIMUM_INTERVAL`] without touching any scheduler state; split
    /// out so a caller can validate synchronously before handing the job off to whatever thread
    /// actually owns the scheduler.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::ArgumentInvalid`](crate::error::ErrorKind::ArgumentInvalid) if `interval` is
    /// at or below [`MINIMUM_INTERVAL`].
    pub fn validate_interval(interval: Duration) -> Result<()> {
        if interval <= MINIMUM_INTERVAL {
            return Err(Error::argument_invalid(format!(
                "repeated job interval {interval:?} is below the minimum of {MINIMUM_INTERVAL:?}"
            )));
        }
        Ok(())
    }

    /// Inserts a job under a pre-minted `id` and already-validated `interval`, first fire one
    /// `interval` from now.
    pub fn insert(&mut self, id: RepeatedJobId, interval: Duration, callback: Box<dyn FnMut() + Send>) {
        self.jobs.push(RepeatedJob {
            id,
            interval,
            next_fire: Instant::now() + interval,
            callback,
            pending_removal: false,
        });
    }

    /// Marks a job for removal. The job may still fire once more if it was already due when this
    /// is called; it is guaranteed gone by the next call to [`RepeatedJobScheduler::due`] after
    /// that.
    pub fn remove(&mut self, id: RepeatedJobId) {
        if let Some(job) = self.jobs.iter_mut().find(|job| job.id == id) {
            job.pending_removal = true;
        }
    }

    /// Runs every job that is due as of `now`, re-basing each by adding its interval exactly
    /// once (tying a single stall to a single catch-up fire, never a burst), then sweeps jobs
    /// marked for removal.
    pub fn run_due(&mut self, now: Instant) {
        for job in &mut self.jobs {
            if job.next_fire <= now {
                (job.callback)();
                job.next_fire += job.interval;
                if job.next_fire <= now {
                    job.next_fire = now + job.interval;
                }
            }
        }
        self.jobs.retain(|job| !job.pending_removal);
    }

    /// The duration until the next job is due, or `None` if no jobs are registered — the main
    /// loop uses this to bound how long it waits on the first network layer's `getJobs` call.
    #[must_use]
    pub fn next_due_in(&self, now: Instant) -> Option<Duration> {
        self.jobs
            .iter()
            .map(|job| job.next_fire.saturating_duration_since(now))
            .min()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    #[test]
    fn rejects_interval_below_minimum() {
        let mut scheduler = RepeatedJobScheduler::new();
        let result = scheduler.add(Duration::from_millis(1), Box::new(|| {}));
        assert!(result.is_err());
    }

    #[test]
    fn rejects_interval_at_minimum_accepts_just_above() {
        let mut scheduler = RepeatedJobScheduler::new();
        assert!(scheduler.add(MINIMUM_INTERVAL, Box::new(|| {})).is_err());
        assert!(scheduler
            .add(MINIMUM_INTERVAL + Duration::from_millis(1), Box::new(|| {}))
            .is_ok());
    }

    #[test]
    fn fires_once_per_due_tick_and_rebases_without_drift() {
        let mut scheduler = RepeatedJobScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let id = scheduler
            .add(Duration::from_millis(10), Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        let start = Instant::now();
        scheduler.run_due(start);
        assert_eq!(count.load(Ordering::SeqCst), 0, "not due yet");

        // Simulate a long stall well past several intervals: only one catch-up fire happens.
        scheduler.run_due(start + Duration::from_millis(100));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        scheduler.remove(id);
        scheduler.run_due(start + Duration::from_millis(200));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn detach_connection_must_run_on_loop_thread() {
        let context: ChannelContext = Arc::new(42u32);
        assert!(Job::DetachConnection(context.clone()).must_run_on_loop_thread());
        assert!(!Job::DecodedRequest(context).must_run_on_loop_thread());
    }
}
