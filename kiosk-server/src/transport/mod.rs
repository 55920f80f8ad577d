//! Transport layer for the kiosk service
//!
//! The listener implements the [`Transport`] trait and serves requests from
//! the shared [`AppState`](http::AppState) until its stop token fires.
//!
//! # Available Transports
//!
//! - [`http`]: REST API with JSON (start a workflow, health, metrics)

pub mod http;

#[cfg(test)]
mod http_test;

use crate::transport::http::AppState;
use anyhow::Result;
use async_trait::async_trait;
use kiosk::StopToken;
use std::sync::Arc;

/// Common interface for transport implementations
///
/// Each transport is responsible for:
/// - Accepting client connections
/// - Translating requests into workflow gateway calls
/// - Stopping gracefully once `shutdown` is signalled
#[async_trait]
pub trait Transport {
    /// Start the transport server
    ///
    /// Runs until an error occurs or `shutdown` is signalled, in which case
    /// in-progress requests finish before the method returns.
    async fn start(self, state: Arc<AppState>, shutdown: StopToken) -> Result<()>;
}
