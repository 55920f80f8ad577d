//! Transient-failure retry shared by every caller of a [`WorkflowGateway`]
//!
//! [`WorkflowGateway`]: crate::load::gateway::WorkflowGateway

use crate::load::WorkError;
use crate::load::config::TransientRetryPolicy;
use std::future::Future;

/// Issue one remote call, repeating it on transient transport failures while
/// `policy` allows
///
/// Every error is classified once with [`WorkError::classify`]. Only the
/// call itself is repeated; non-transient failures return immediately.
pub async fn call_with_retry<T, F, Fut>(
    policy: TransientRetryPolicy,
    sequence: u64,
    mut op: F,
) -> Result<T, WorkError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut retries = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let error = WorkError::classify(e);
                if error.is_transient() && policy.allows(retries) {
                    retries += 1;
                    tracing::debug!(
                        sequence,
                        retries,
                        "Retrying call after transient transport failure"
                    );
                    continue;
                }
                return Err(error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails transiently `failures` times, then returns the attempt count
    async fn flaky(attempts: &AtomicU32, failures: u32) -> anyhow::Result<u32> {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= failures {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset").into());
        }
        Ok(attempt)
    }

    #[tokio::test]
    async fn test_never_reports_first_failure() {
        let attempts = AtomicU32::new(0);
        let error = call_with_retry(TransientRetryPolicy::Never, 1, || flaky(&attempts, 1))
            .await
            .unwrap_err();

        assert!(error.is_transient());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_limited_stops_at_cap() {
        let attempts = AtomicU32::new(0);
        let error = call_with_retry(TransientRetryPolicy::Limited(2), 1, || {
            flaky(&attempts, 10)
        })
        .await
        .unwrap_err();

        assert!(error.is_transient());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        let attempts = AtomicU32::new(0);
        let value = call_with_retry(TransientRetryPolicy::Limited(2), 1, || {
            flaky(&attempts, 2)
        })
        .await
        .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn test_unlimited_retries_until_success() {
        let attempts = AtomicU32::new(0);
        let value = call_with_retry(TransientRetryPolicy::Unlimited, 1, || {
            flaky(&attempts, 25)
        })
        .await
        .unwrap();

        assert_eq!(value, 26);
    }

    #[tokio::test]
    async fn test_non_transient_failure_is_not_retried() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let error = call_with_retry(TransientRetryPolicy::Unlimited, 1, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(anyhow::anyhow!("invalid response body"))
        })
        .await
        .unwrap_err();

        assert_eq!(error.kind(), "unclassified");
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
