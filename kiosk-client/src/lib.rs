//! HTTP client for the workflow orchestration service
//!
//! This crate talks to the orchestration service's REST API over HTTP/1.1:
//! publishing workflow definitions, starting and signalling workflows, and
//! sweeping leftover RUNNING executions. [`KioskGateway`] adapts the client
//! to the [`kiosk::WorkflowGateway`] trait used by the load driver.

pub mod client;
pub mod error;
pub mod gateway;
pub mod protocol;

pub use client::ConductorClient;
pub use error::{ClientError, Result};
pub use gateway::KioskGateway;
pub use protocol::{StartWorkflowRequest, WorkflowSpecifier};

// Re-export commonly used items
pub use client::ClientBuilder;
