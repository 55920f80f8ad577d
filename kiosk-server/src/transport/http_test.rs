#[cfg(test)]
mod tests {
    use super::super::http::{AppState, HttpErrorResponse, StartWorkflowResponse, router};
    use crate::metrics::Metrics;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode};
    use kiosk::{
        AdvanceResponse, CompletionTracker, StartedWorkflow, TransientRetryPolicy,
        WorkflowGateway,
    };
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
    use tower::ServiceExt;

    /// Gateway with a scripted start status and a number of GOAWAY failures
    /// before it succeeds
    struct TestGateway {
        status: u16,
        transient_failures: AtomicU32,
        calls: AtomicU32,
        last_sequence: AtomicU64,
    }

    impl TestGateway {
        fn new(status: u16, transient_failures: u32) -> Arc<Self> {
            Arc::new(Self {
                status,
                transient_failures: AtomicU32::new(transient_failures),
                calls: AtomicU32::new(0),
                last_sequence: AtomicU64::new(u64::MAX),
            })
        }
    }

    #[async_trait]
    impl WorkflowGateway for TestGateway {
        async fn start_workflow(&self, sequence: u64) -> anyhow::Result<StartedWorkflow> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.last_sequence.store(sequence, Ordering::SeqCst);

            if self
                .transient_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "GOAWAY").into());
            }

            Ok(StartedWorkflow {
                status: self.status,
                workflow_id: format!("wf-{sequence}"),
                reached_yield_point: self.status != 204,
            })
        }

        async fn advance_workflow(
            &self,
            _workflow_id: &str,
            _action: &str,
        ) -> anyhow::Result<AdvanceResponse> {
            Ok(AdvanceResponse { status: 204 })
        }
    }

    fn state(gateway: Arc<TestGateway>, retry: TransientRetryPolicy) -> Arc<AppState> {
        Arc::new(AppState::new(gateway, retry, Arc::new(Metrics::new())))
    }

    async fn send(state: &Arc<AppState>, method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = router(Arc::clone(state)).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_health() {
        let state = state(TestGateway::new(200, 0), TransientRetryPolicy::Never);
        let (status, body) = send(&state, Method::GET, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }

    #[tokio::test]
    async fn test_start_workflow_post_and_get() {
        let gateway = TestGateway::new(200, 0);
        let state = state(gateway.clone(), TransientRetryPolicy::Never);

        let (status, body) = send(&state, Method::POST, "/start-workflow").await;
        assert_eq!(status, StatusCode::OK);
        let response: StartWorkflowResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(response.workflow_id, "wf-0");

        let (status, body) = send(&state, Method::GET, "/start-workflow").await;
        assert_eq!(status, StatusCode::OK);
        let raw: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(raw["workflowId"], "wf-1");

        assert_eq!(gateway.last_sequence.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_completed_workflow_still_returns_id() {
        let state = state(TestGateway::new(204, 0), TransientRetryPolicy::Never);
        let (status, body) = send(&state, Method::POST, "/start-workflow").await;

        assert_eq!(status, StatusCode::OK);
        let response: StartWorkflowResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(response.workflow_id, "wf-0");
    }

    #[tokio::test]
    async fn test_failed_start_is_bad_gateway() {
        let state = state(TestGateway::new(500, 0), TransientRetryPolicy::Never);
        let (status, body) = send(&state, Method::POST, "/start-workflow").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let error: HttpErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.error, "start failed: 500");
        assert_eq!(state.metrics().workflows_failed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_without_retry() {
        let gateway = TestGateway::new(200, 1);
        let state = state(gateway.clone(), TransientRetryPolicy::Never);

        let (status, _) = send(&state, Method::POST, "/start-workflow").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            state.metrics().workflows_throttled.load(Ordering::Relaxed),
            1
        );
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_when_enabled() {
        let gateway = TestGateway::new(200, 2);
        let state = state(gateway.clone(), TransientRetryPolicy::Unlimited);

        let (status, _) = send(&state, Method::POST, "/start-workflow").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 3);
        assert_eq!(state.metrics().workflows_started.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_transient_retry_respects_cap() {
        let gateway = TestGateway::new(200, 3);
        let state = state(gateway.clone(), TransientRetryPolicy::Limited(1));

        let (status, body) = send(&state, Method::POST, "/start-workflow").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let error: HttpErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(error.error.starts_with("transient transport failure"));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 2);

        let (status, _) = send(&state, Method::POST, "/start-workflow").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_metrics_include_attached_load_test() {
        let state = state(TestGateway::new(200, 0), TransientRetryPolicy::Never);

        let (_, body) = send(&state, Method::GET, "/metrics").await;
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("kiosk_requests_by_route{route=\"metrics\"} 1"));
        assert!(!text.contains("kiosk_load_test_started"));

        let tracker = Arc::new(CompletionTracker::new());
        let guard = tracker.on_submit();
        state.attach_load_test(Arc::clone(&tracker));

        let (status, body) = send(&state, Method::GET, "/metrics").await;
        let text = String::from_utf8(body).unwrap();
        assert_eq!(status, StatusCode::OK);
        assert!(text.contains("kiosk_load_test_phase{phase=\"configuring\"} 1"));
        assert!(text.contains("kiosk_load_test_started 1"));
        assert!(text.contains("kiosk_load_test_in_flight 1"));

        guard.complete(&Ok(()));
        let (_, body) = send(&state, Method::GET, "/metrics").await;
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("kiosk_load_test_in_flight 0"));
        assert!(text.contains("kiosk_load_test_completed{outcome=\"succeeded\"} 1"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let state = state(TestGateway::new(200, 0), TransientRetryPolicy::Never);
        let (status, _) = send(&state, Method::GET, "/resume-workflow").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
