//! # Kiosk
//!
//! A rate-paced load driver for workflow orchestration services.
//!
//! ## Overview
//!
//! Kiosk simulates many customers placing orders at self-service kiosks. Each
//! simulated order is a short workflow interaction: start a workflow, wait
//! for it to pause at its "customer is deciding" step, then signal Checkout.
//! The driver launches these interactions at a fixed rate, tracks them while
//! they are in flight, and reports how many it started and how fast.
//!
//! - **Non-blocking dispatch**: every order runs on its own tokio task; slow
//!   orders never hold up the next submission
//! - **Failure isolation**: an order that fails is logged and counted, and the
//!   run carries on
//! - **Transport awareness**: connection-reset failures are recognised and
//!   counted separately, and can optionally be retried
//! - **Clean drain**: the run ends only after every order has finished
//!
//! ## Quick Start
//!
//! ```no_run
//! use async_trait::async_trait;
//! use kiosk::{AdvanceResponse, LoadTestConfig, StartedWorkflow, WorkflowGateway, run_load_test};
//! use std::sync::Arc;
//!
//! struct Loopback;
//!
//! #[async_trait]
//! impl WorkflowGateway for Loopback {
//!     async fn start_workflow(&self, sequence: u64) -> anyhow::Result<StartedWorkflow> {
//!         Ok(StartedWorkflow {
//!             status: 200,
//!             workflow_id: format!("order-{sequence}"),
//!             reached_yield_point: true,
//!         })
//!     }
//!
//!     async fn advance_workflow(&self, _id: &str, _action: &str) -> anyhow::Result<AdvanceResponse> {
//!         Ok(AdvanceResponse { status: 204 })
//!     }
//! }
//!
//! # async fn example() {
//! // 5 orders per second for 2 seconds
//! let summary = run_load_test(LoadTestConfig::new(5, Some(2)), Arc::new(Loopback)).await;
//! println!(
//!     "Started {} orders at {:.2}/s",
//!     summary.started, summary.achieved_rate_per_second
//! );
//! # }
//! ```
//!
//! ## Run Lifecycle
//!
//! ```text
//! CONFIGURING ──▶ DISPATCHING ──▶ DRAINING ──▶ COMPLETE
//! ```
//!
//! Every run passes through every phase. A run configured with a non-positive
//! rate or duration dispatches nothing and drains immediately.
//!
//! ## Pacing
//!
//! Submissions are spaced `1000 / rate` whole milliseconds apart. Rates that
//! do not divide 1000 lose the fractional part of the interval and run a
//! little faster than requested over long runs.
//!
//! ## Stopping
//!
//! Runs without a duration dispatch until their [`StopToken`] is signalled.
//! Stopping ends dispatch only; in-flight orders are still drained.
//!
//! ```no_run
//! # use kiosk::{LoadTest, LoadTestConfig, WorkflowGateway, stop_channel};
//! # use std::sync::Arc;
//! # async fn example(gateway: Arc<dyn WorkflowGateway>) {
//! let (handle, token) = stop_channel();
//! let load_test = LoadTest::new(LoadTestConfig::new(20, None), gateway);
//!
//! tokio::spawn(async move {
//!     tokio::signal::ctrl_c().await.ok();
//!     handle.stop();
//! });
//!
//! let summary = load_test.run(token).await;
//! # }
//! ```

pub mod load;

pub use load::{
    AdvanceResponse, CompletionTracker, InFlightGuard, KioskOrder, LoadTest, LoadTestConfig,
    RunPhase, StartedWorkflow, StopHandle, StopToken, Summary, ThroughputAccounting,
    TrackerSnapshot, TransientRetryPolicy, WorkError, WorkUnitConfig, WorkflowGateway,
    call_with_retry, is_transient_transport_error, run_load_test, stop_channel,
};

// Re-export so clients can reach the status constants and config defaults
pub use crate::load::{config, gateway};
