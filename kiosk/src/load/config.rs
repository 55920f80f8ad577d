//! Load test configuration
//!
//! [`LoadTestConfig`] is fixed for the lifetime of a run. It describes how
//! fast units are dispatched, for how long, and the policies that shape how
//! individual units behave and how the run is reported.

use std::time::Duration;

/// Default target rate when none is configured
pub const DEFAULT_RATE_PER_SECOND: i64 = 10;

/// Default period between drain progress checks
pub const DEFAULT_DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default pause before each optional AddItem step
pub const DEFAULT_THINK_TIME: Duration = Duration::from_secs(3);

/// Configuration for a single load test run
///
/// A run with `rate_per_second <= 0`, or with a `duration_seconds` that is
/// present and `<= 0`, performs no work. A run without `duration_seconds`
/// dispatches until it is stopped.
///
/// # Example
///
/// ```
/// use kiosk::LoadTestConfig;
/// use std::time::Duration;
///
/// let config = LoadTestConfig::new(5, Some(2));
/// assert_eq!(config.total_submissions(), Some(10));
/// assert_eq!(config.pacing_interval(), Some(Duration::from_millis(200)));
/// ```
#[derive(Debug, Clone)]
pub struct LoadTestConfig {
    /// Target number of units dispatched per second
    pub rate_per_second: i64,
    /// Run length in seconds, unbounded when `None`
    pub duration_seconds: Option<i64>,
    /// How often the drain phase checks for outstanding units
    pub drain_poll_interval: Duration,
    /// Whether transient transport failures are retried
    pub transient_retry: TransientRetryPolicy,
    /// How transient failures are counted in the summary
    pub accounting: ThroughputAccounting,
    /// Shape of each simulated interaction
    pub work_unit: WorkUnitConfig,
}

impl LoadTestConfig {
    pub fn new(rate_per_second: i64, duration_seconds: Option<i64>) -> Self {
        Self {
            rate_per_second,
            duration_seconds,
            ..Self::default()
        }
    }

    /// Time slept between two submissions
    ///
    /// The interval is `1000 / rate` whole milliseconds. The remainder is
    /// truncated, so rates that do not divide 1000 run slightly fast: rate 7
    /// sleeps 142ms instead of 142.857ms. Rates above 1000 sleep zero.
    ///
    /// Returns `None` when the rate is not positive.
    pub fn pacing_interval(&self) -> Option<Duration> {
        if self.rate_per_second <= 0 {
            return None;
        }

        Some(Duration::from_millis((1000 / self.rate_per_second) as u64))
    }

    /// Whether the pacing interval lost a fractional millisecond
    pub fn pacing_truncated(&self) -> bool {
        self.rate_per_second > 0 && 1000 % self.rate_per_second != 0
    }

    /// Number of units a bounded run dispatches
    ///
    /// Returns `Some(0)` for runs that perform no work and `None` for
    /// unbounded runs.
    pub fn total_submissions(&self) -> Option<u64> {
        if self.rate_per_second <= 0 {
            return Some(0);
        }

        match self.duration_seconds {
            Some(seconds) if seconds <= 0 => Some(0),
            Some(seconds) => Some((self.rate_per_second as u64).saturating_mul(seconds as u64)),
            None => None,
        }
    }

    /// True when this configuration dispatches nothing
    pub fn is_idle(&self) -> bool {
        self.total_submissions() == Some(0)
    }
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            rate_per_second: DEFAULT_RATE_PER_SECOND,
            duration_seconds: None,
            drain_poll_interval: DEFAULT_DRAIN_POLL_INTERVAL,
            transient_retry: TransientRetryPolicy::default(),
            accounting: ThroughputAccounting::default(),
            work_unit: WorkUnitConfig::default(),
        }
    }
}

/// Retry behaviour for transient transport failures
///
/// Only the individual remote call that hit the failure is repeated. Other
/// failures are never retried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransientRetryPolicy {
    /// Report the failure immediately
    #[default]
    Never,
    /// Retry up to the given number of times per call
    Limited(u32),
    /// Retry until the call stops failing transiently
    Unlimited,
}

impl TransientRetryPolicy {
    /// Whether another attempt is allowed after `retries` retries
    pub fn allows(&self, retries: u32) -> bool {
        match self {
            TransientRetryPolicy::Never => false,
            TransientRetryPolicy::Limited(max) => retries < *max,
            TransientRetryPolicy::Unlimited => true,
        }
    }
}

/// Which submissions count as "started" in the run summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThroughputAccounting {
    /// Every dispatched unit counts
    #[default]
    CountAll,
    /// Units that ended in a transient transport failure are left out
    ExcludeTransient,
}

/// Shape of one simulated kiosk interaction
#[derive(Debug, Clone)]
pub struct WorkUnitConfig {
    /// AddItem signals sent before Checkout (0 keeps two remote calls per unit)
    pub add_item_steps: u32,
    /// Pause before each AddItem signal, standing in for a human decision
    pub think_time: Duration,
}

impl Default for WorkUnitConfig {
    fn default() -> Self {
        Self {
            add_item_steps: 0,
            think_time: DEFAULT_THINK_TIME,
        }
    }
}
