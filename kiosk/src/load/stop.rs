//! Graceful stop signal for a running load test
//!
//! The dispatcher checks its [`StopToken`] between submissions. Stopping
//! never interrupts units that are already in flight: the run still drains.

use std::future;
use tokio::sync::watch;

/// Create a connected stop handle and token
pub fn stop_channel() -> (StopHandle, StopToken) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx }, StopToken { rx: Some(rx) })
}

/// Sending side of a stop signal
#[derive(Debug)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    /// Ask the dispatcher to stop after the current submission
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving side of a stop signal
///
/// Dropping the [`StopHandle`] without calling `stop` leaves the token
/// unsignalled forever.
#[derive(Debug, Clone)]
pub struct StopToken {
    rx: Option<watch::Receiver<bool>>,
}

impl StopToken {
    /// A token that is never signalled
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_stopped(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolve once the stop signal has been sent
    pub async fn stopped(&mut self) {
        let Some(rx) = self.rx.as_mut() else {
            return future::pending().await;
        };

        let sender_dropped = rx.wait_for(|stopped| *stopped).await.is_err();
        if sender_dropped {
            future::pending::<()>().await;
        }
    }
}
