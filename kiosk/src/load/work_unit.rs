//! One simulated kiosk interaction
//!
//! A [`KioskOrder`] starts a workflow that pauses at a wait task, optionally
//! adds items while it stays paused, then checks out. Every remote call goes
//! through the [`WorkflowGateway`]; every failure comes back as a
//! [`WorkError`] so the caller can record it without unwinding anything.

use crate::load::WorkError;
use crate::load::config::{TransientRetryPolicy, WorkUnitConfig};
use crate::load::gateway::{
    ACTION_ADD_ITEM, ACTION_CHECKOUT, STATUS_COMPLETED, STATUS_NOT_MODIFIED, STATUS_YIELDED,
    WorkflowGateway, is_success,
};
use crate::load::retry::call_with_retry;
use std::sync::Arc;

/// Kiosk order interaction bound to a gateway
///
/// # Example
///
/// ```ignore
/// let order = KioskOrder::new(gateway, TransientRetryPolicy::Never, WorkUnitConfig::default());
/// match order.execute(42).await {
///     Ok(()) => println!("order 42 checked out"),
///     Err(e) => println!("order 42 failed: {e}"),
/// }
/// ```
pub struct KioskOrder {
    gateway: Arc<dyn WorkflowGateway>,
    retry: TransientRetryPolicy,
    config: WorkUnitConfig,
}

impl KioskOrder {
    pub fn new(
        gateway: Arc<dyn WorkflowGateway>,
        retry: TransientRetryPolicy,
        config: WorkUnitConfig,
    ) -> Self {
        Self {
            gateway,
            retry,
            config,
        }
    }

    /// Run the interaction for `sequence` to completion
    ///
    /// With the default configuration this issues exactly two remote calls:
    /// start and Checkout. A failed start never issues a signal.
    pub async fn execute(&self, sequence: u64) -> Result<(), WorkError> {
        let gateway = &*self.gateway;

        let started =
            call_with_retry(self.retry, sequence, move || gateway.start_workflow(sequence))
                .await?;

        if !is_success(started.status) {
            return Err(WorkError::StartFailed {
                status: started.status,
            });
        }

        if !started.reached_yield_point {
            return Err(WorkError::PrematureCompletion);
        }

        let workflow_id = started.workflow_id.as_str();

        for _ in 0..self.config.add_item_steps {
            tokio::time::sleep(self.config.think_time).await;

            let response = call_with_retry(self.retry, sequence, move || {
                gateway.advance_workflow(workflow_id, ACTION_ADD_ITEM)
            })
            .await?;

            match response.status {
                STATUS_YIELDED => {}
                STATUS_COMPLETED => return Err(WorkError::PrematureCompletion),
                STATUS_NOT_MODIFIED => return Err(WorkError::StaleSignal),
                status => return Err(WorkError::ResumeFailed { status }),
            }
        }

        let response = call_with_retry(self.retry, sequence, move || {
            gateway.advance_workflow(workflow_id, ACTION_CHECKOUT)
        })
        .await?;

        match response.status {
            STATUS_COMPLETED => Ok(()),
            STATUS_NOT_MODIFIED => Err(WorkError::StaleSignal),
            status => Err(WorkError::ResumeFailed { status }),
        }
    }
}
