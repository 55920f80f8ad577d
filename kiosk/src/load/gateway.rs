//! Boundary between the load driver and the orchestration service
//!
//! The driver never speaks HTTP itself. It drives a [`WorkflowGateway`],
//! which issues the two remote calls a kiosk interaction needs and hands back
//! the raw status codes. Transport errors are returned untouched so the work
//! unit can inspect their full cause chain.

use async_trait::async_trait;
use std::io;

/// Status returned by a signal that moved the workflow to completion
pub const STATUS_COMPLETED: u16 = 204;

/// Status returned by a signal the service considered already applied
pub const STATUS_NOT_MODIFIED: u16 = 304;

/// Status returned by a signal that left the workflow at another yield point
pub const STATUS_YIELDED: u16 = 200;

/// Substring the transport layer uses when the peer closes a connection it
/// had been multiplexing
pub const TRANSIENT_TRANSPORT_SIGNATURE: &str = "GOAWAY";

/// I/O error kinds reported when the peer tears a connection down mid-call
const CONNECTION_CLOSED_KINDS: [io::ErrorKind; 3] = [
    io::ErrorKind::ConnectionReset,
    io::ErrorKind::ConnectionAborted,
    io::ErrorKind::BrokenPipe,
];

/// Action that completes a kiosk order
pub const ACTION_CHECKOUT: &str = "Checkout";

/// Action that adds an item while the order stays open
pub const ACTION_ADD_ITEM: &str = "AddItem";

/// Result of starting a workflow instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedWorkflow {
    /// HTTP status of the start call
    pub status: u16,
    /// Identifier of the started instance (empty when the start failed)
    pub workflow_id: String,
    /// Whether the instance paused at its wait task instead of finishing
    pub reached_yield_point: bool,
}

/// Result of signalling a workflow instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceResponse {
    /// HTTP status of the signal call
    pub status: u16,
}

/// Remote calls issued by one kiosk interaction
///
/// Implementations must be cheap to share across thousands of concurrent
/// units and must not decode transport failures: the driver classifies them
/// with [`is_transient_transport_error`].
#[async_trait]
pub trait WorkflowGateway: Send + Sync {
    /// Begin an interaction identified by `sequence`
    async fn start_workflow(&self, sequence: u64) -> anyhow::Result<StartedWorkflow>;

    /// Signal the paused instance to take `action`
    async fn advance_workflow(
        &self,
        workflow_id: &str,
        action: &str,
    ) -> anyhow::Result<AdvanceResponse>;
}

/// Check whether an error was caused by the peer closing the connection
///
/// Walks the cause chain to the first [`io::Error`]. It is transient when its
/// kind is a reset, abort or broken pipe, or when its message mentions
/// [`TRANSIENT_TRANSPORT_SIGNATURE`] or a reset. Errors without an I/O cause
/// (refused connections included) are never transient.
pub fn is_transient_transport_error(error: &anyhow::Error) -> bool {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<io::Error>())
        .is_some_and(is_connection_closed)
}

fn is_connection_closed(error: &io::Error) -> bool {
    if CONNECTION_CLOSED_KINDS.contains(&error.kind()) {
        return true;
    }

    let message = error.to_string();
    message.contains(TRANSIENT_TRANSPORT_SIGNATURE)
        || message.to_ascii_lowercase().contains("reset")
}

/// Whether a status code reports success
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}
