//! Core components of the kiosk load driver
//!
//! This module contains the building blocks of a run:
//! - [`config`]: Run parameters and the policies that shape a run
//! - [`gateway`]: The remote calls a unit issues and transport error classification
//! - [`work_unit`]: One simulated kiosk interaction
//! - [`tracker`]: Lock-free accounting of submitted and in-flight units
//! - [`load_test`]: The rate-paced dispatcher and drain controller
//! - [`retry`]: Transient-failure retry shared by every gateway caller
//! - [`stop`]: Graceful stop signal for unbounded runs

pub mod config;
pub mod gateway;
pub mod retry;
pub mod stop;
pub mod tracker;
pub mod work_unit;

pub use config::{LoadTestConfig, ThroughputAccounting, TransientRetryPolicy, WorkUnitConfig};
pub use gateway::{AdvanceResponse, StartedWorkflow, WorkflowGateway, is_transient_transport_error};
pub use load_test::{LoadTest, Summary, run_load_test};
pub use retry::call_with_retry;
pub use stop::{StopHandle, StopToken, stop_channel};
pub use tracker::{CompletionTracker, InFlightGuard, RunPhase, TrackerSnapshot};
pub use work_unit::KioskOrder;

use thiserror::Error;

/// Ways a single kiosk interaction can fail
///
/// Every variant is caught at the unit boundary; none of them stops the
/// dispatcher or affects other units.
///
/// # Example
///
/// ```
/// use kiosk::WorkError;
///
/// let error = WorkError::StartFailed { status: 503 };
/// assert_eq!(error.to_string(), "start failed: 503");
/// assert!(!error.is_transient());
/// ```
#[derive(Debug, Error)]
pub enum WorkError {
    /// The start call returned a non-success status
    #[error("start failed: {status}")]
    StartFailed { status: u16 },

    /// The workflow ran to completion without pausing at its wait task
    #[error("completed before reaching yield point")]
    PrematureCompletion,

    /// The service reported the signal as already applied
    #[error("stale completion signal")]
    StaleSignal,

    /// A signal returned an unexpected status
    #[error("resume failed: {status}")]
    ResumeFailed { status: u16 },

    /// The peer closed the connection mid-call
    #[error("transient transport failure: {0:#}")]
    TransientTransport(#[source] anyhow::Error),

    /// Any other transport or protocol error
    #[error("{0:#}")]
    Unclassified(#[source] anyhow::Error),
}

impl WorkError {
    /// Sort a gateway error into the transient or unclassified bucket
    pub fn classify(error: anyhow::Error) -> Self {
        if is_transient_transport_error(&error) {
            WorkError::TransientTransport(error)
        } else {
            WorkError::Unclassified(error)
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, WorkError::TransientTransport(_))
    }

    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            WorkError::StartFailed { .. } => "start_failure",
            WorkError::PrematureCompletion => "premature_completion",
            WorkError::StaleSignal => "stale_signal",
            WorkError::ResumeFailed { .. } => "resume_failure",
            WorkError::TransientTransport(_) => "transient_transport_failure",
            WorkError::Unclassified(_) => "unclassified",
        }
    }
}
