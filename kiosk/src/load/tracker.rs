//! Lock-free run accounting
//!
//! The [`CompletionTracker`] is the only state shared between the dispatcher
//! and the units it spawns. Every counter is an atomic so submission and
//! completion never contend on a lock, no matter how many units are in
//! flight.
//!
//! Decrements are tied to an [`InFlightGuard`] handed out by
//! [`CompletionTracker::on_submit`]. Each guard decrements exactly once,
//! either through [`InFlightGuard::complete`] or when it is dropped, so the
//! in-flight count can never go below zero and a panicking unit cannot keep
//! the drain phase waiting.

use crate::load::WorkError;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Instant;

/// Lifecycle of a run
///
/// A run always moves forward through every phase, including `Draining`
/// when nothing was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum RunPhase {
    Configuring = 0,
    Dispatching = 1,
    Draining = 2,
    Complete = 3,
}

impl RunPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => RunPhase::Configuring,
            1 => RunPhase::Dispatching,
            2 => RunPhase::Draining,
            _ => RunPhase::Complete,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Configuring => "configuring",
            RunPhase::Dispatching => "dispatching",
            RunPhase::Draining => "draining",
            RunPhase::Complete => "complete",
        }
    }
}

/// Shared counters for one run
pub struct CompletionTracker {
    /// Run creation time
    start_time: Instant,

    /// Units handed to the runtime
    started: AtomicU64,
    /// Units not yet finished
    in_flight: AtomicU64,

    /// Finished units by outcome
    succeeded: AtomicU64,
    failed: AtomicU64,
    throttled: AtomicU64,

    phase: AtomicU8,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            started: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            throttled: AtomicU64::new(0),
            phase: AtomicU8::new(RunPhase::Configuring as u8),
        }
    }

    /// Record a submission and return the guard that must outlive the unit
    ///
    /// `started` is raised before `in_flight` so a reader can never see more
    /// units in flight than were submitted.
    pub fn on_submit(self: &Arc<Self>) -> InFlightGuard {
        self.started.fetch_add(1, Ordering::AcqRel);
        self.in_flight.fetch_add(1, Ordering::AcqRel);

        InFlightGuard {
            tracker: Arc::clone(self),
            recorded: false,
        }
    }

    fn record(&self, outcome: &Result<(), WorkError>) {
        match outcome {
            Ok(()) => self.succeeded.fetch_add(1, Ordering::Release),
            Err(e) if e.is_transient() => self.throttled.fetch_add(1, Ordering::Release),
            Err(_) => self.failed.fetch_add(1, Ordering::Release),
        };
    }

    fn release(&self) {
        let previous = self.in_flight.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "in-flight count released without a submission");
    }

    pub fn started(&self) -> u64 {
        self.started.load(Ordering::Acquire)
    }

    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> RunPhase {
        RunPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub(crate) fn set_phase(&self, phase: RunPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Seconds since the tracker was created
    pub fn uptime_seconds(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> TrackerSnapshot {
        // Read in the reverse of write order: outcomes, then in_flight, then
        // started. Every value observed earlier was counted in started first.
        let succeeded = self.succeeded.load(Ordering::Acquire);
        let failed = self.failed.load(Ordering::Acquire);
        let throttled = self.throttled.load(Ordering::Acquire);
        let in_flight = self.in_flight();

        TrackerSnapshot {
            phase: self.phase(),
            started: self.started(),
            in_flight,
            succeeded,
            failed,
            throttled,
        }
    }
}

impl Default for CompletionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of the tracker counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSnapshot {
    pub phase: RunPhase,
    pub started: u64,
    pub in_flight: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub throttled: u64,
}

impl TrackerSnapshot {
    pub fn completed(&self) -> u64 {
        self.succeeded + self.failed + self.throttled
    }
}

/// Outstanding unit registered with a [`CompletionTracker`]
///
/// Dropping the guard without calling [`complete`](InFlightGuard::complete)
/// counts the unit as failed.
#[must_use = "dropping the guard immediately marks the unit as finished"]
pub struct InFlightGuard {
    tracker: Arc<CompletionTracker>,
    recorded: bool,
}

impl InFlightGuard {
    /// Record the unit's outcome and release its in-flight slot
    pub fn complete(mut self, outcome: &Result<(), WorkError>) {
        self.tracker.record(outcome);
        self.recorded = true;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.recorded {
            self.tracker.failed.fetch_add(1, Ordering::Release);
        }
        self.tracker.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_creation() {
        let tracker = CompletionTracker::new();
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.phase, RunPhase::Configuring);
        assert_eq!(snapshot.started, 0);
        assert_eq!(snapshot.in_flight, 0);
        assert_eq!(snapshot.completed(), 0);
    }

    #[test]
    fn test_submit_and_complete() {
        let tracker = Arc::new(CompletionTracker::new());

        let first = tracker.on_submit();
        let second = tracker.on_submit();
        assert_eq!(tracker.started(), 2);
        assert_eq!(tracker.in_flight(), 2);

        first.complete(&Ok(()));
        assert_eq!(tracker.in_flight(), 1);

        second.complete(&Err(WorkError::StaleSignal));
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.in_flight, 0);
        assert_eq!(snapshot.started, 2);
        assert_eq!(snapshot.succeeded, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.throttled, 0);
    }

    #[test]
    fn test_transient_failures_are_counted_separately() {
        let tracker = Arc::new(CompletionTracker::new());

        let guard = tracker.on_submit();
        let error = anyhow::Error::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "GOAWAY",
        ));
        guard.complete(&Err(WorkError::classify(error)));

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.throttled, 1);
        assert_eq!(snapshot.failed, 0);
        assert_eq!(snapshot.in_flight, 0);
    }

    #[test]
    fn test_dropped_guard_releases_slot() {
        let tracker = Arc::new(CompletionTracker::new());

        drop(tracker.on_submit());

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.in_flight, 0);
        assert_eq!(snapshot.failed, 1);
    }

    #[test]
    fn test_phase_transitions() {
        let tracker = CompletionTracker::new();
        for phase in [
            RunPhase::Dispatching,
            RunPhase::Draining,
            RunPhase::Complete,
        ] {
            tracker.set_phase(phase);
            assert_eq!(tracker.phase(), phase);
        }
        assert_eq!(RunPhase::Draining.as_str(), "draining");
    }

    #[tokio::test]
    async fn test_panicking_unit_still_releases_slot() {
        let tracker = Arc::new(CompletionTracker::new());
        let guard = tracker.on_submit();

        fn explode(guard: InFlightGuard) -> Result<(), WorkError> {
            let _guard = guard;
            panic!("unit blew up");
        }

        let handle = tokio::spawn(async move { explode(guard) });
        assert!(handle.await.is_err());

        assert_eq!(tracker.in_flight(), 0);
        assert_eq!(tracker.snapshot().failed, 1);
    }
}
