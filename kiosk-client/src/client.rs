use std::time::Duration;

use futures::future::join_all;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, StatusCode, Url};

use crate::error::{ClientError, Result};
use crate::protocol::{
    ACTION_HEADER, AUTHORIZATION_HEADER, ExecuteResponse, SearchResult, SignalRequest,
    StartWorkflowRequest, WORKFLOW_ID_HEADER, WorkflowIdBody, WorkflowSpecifier,
};

/// Seconds the service waits for a started workflow to reach a yield point
const EXECUTE_WAIT_SECONDS: &str = "3";

/// Page size used by the cleanup sweep
const SEARCH_PAGE_SIZE: &str = "100";

/// Builder for creating a ConductorClient
pub struct ClientBuilder {
    token: Option<String>,
    connect_timeout: Duration,
    http1_only: bool,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            token: None,
            connect_timeout: Duration::from_secs(5),
            http1_only: true,
        }
    }
}

impl ClientBuilder {
    /// Create a new client builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Send a static access token with every request
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Restrict the client to HTTP/1.1 (the default)
    ///
    /// HTTP/2 connections to the service are closed with GOAWAY under load;
    /// over HTTP/1.1 the same condition surfaces as a connection reset.
    pub fn http1_only(mut self, enabled: bool) -> Self {
        self.http1_only = enabled;
        self
    }

    /// Build the client for the given service base URL
    pub fn build(self, endpoint: &str) -> Result<ConductorClient> {
        let url = Url::parse(endpoint)
            .map_err(|e| ClientError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidEndpoint(format!(
                "{endpoint}: scheme must be http or https"
            )));
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(token)
                .map_err(|_| ClientError::Protocol("token is not a valid header value".into()))?;
            headers.insert(AUTHORIZATION_HEADER, value);
        }

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(self.connect_timeout);
        if self.http1_only {
            builder = builder.http1_only();
        }

        Ok(ConductorClient {
            http: builder.build()?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

/// Client for the workflow orchestration service
#[derive(Clone)]
pub struct ConductorClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ConductorClient {
    /// Create a new client with default configuration
    pub fn connect(endpoint: &str) -> Result<Self> {
        ClientBuilder::new().build(endpoint)
    }

    /// Create a new client builder for advanced configuration
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn post_json(&self, path: &str) -> RequestBuilder {
        self.http
            .post(self.url(path))
            .header(CONTENT_TYPE, "application/json")
    }

    /// Start a workflow and wait briefly for it to reach its first wait task
    ///
    /// Any HTTP status is returned as-is. The workflow id is taken from the
    /// `workflowId` response header, falling back to the JSON body.
    pub async fn execute_workflow(
        &self,
        workflow: &WorkflowSpecifier,
        request: &StartWorkflowRequest,
    ) -> Result<ExecuteResponse> {
        let path = format!(
            "/api/workflow/execute/{}/{}",
            workflow.name, workflow.version
        );

        let response = self
            .post_json(&path)
            .query(&[
                ("waitForSeconds", EXECUTE_WAIT_SECONDS),
                ("returnStrategy", "BLOCKING_TASK_INPUT"),
                ("consistency", "SYNCHRONOUS"),
            ])
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let header_id = response
            .headers()
            .get(WORKFLOW_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let workflow_id = match header_id {
            Some(id) => Some(id),
            None => {
                let body = response.bytes().await?;
                serde_json::from_slice::<WorkflowIdBody>(&body)
                    .ok()
                    .map(|body| body.workflow_id)
            }
        };

        Ok(ExecuteResponse {
            status,
            workflow_id,
        })
    }

    /// Complete the wait task a workflow is blocked on and return the status
    pub async fn signal_task(&self, workflow_id: &str, action: &str) -> Result<u16> {
        let path = format!("/api/tasks/{workflow_id}/COMPLETED/signal/sync");

        let response = self
            .post_json(&path)
            .header(ACTION_HEADER, action)
            .query(&[("returnStrategy", "BLOCKING_TASK_INPUT")])
            .json(&SignalRequest {
                action: action.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::trace!("Workflow {} resumed with {}", workflow_id, action);
        } else if status != StatusCode::NOT_MODIFIED {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("Failed to resume workflow {}: {} {}", workflow_id, status, body);
        }

        Ok(status.as_u16())
    }

    /// Register a workflow definition, overwriting the current version
    pub async fn publish_workflow(&self, definition: &serde_json::Value) -> Result<()> {
        let response = self
            .post_json("/api/metadata/workflow")
            .query(&[("overwrite", "true"), ("newVersion", "false")])
            .json(definition)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        Ok(())
    }

    /// Fetch one page of RUNNING workflow ids
    pub async fn search_running(&self) -> Result<Vec<String>> {
        let response = self
            .http
            .get(self.url("/api/workflow/search"))
            .query(&[
                ("start", "0"),
                ("size", SEARCH_PAGE_SIZE),
                ("freeText", "*"),
                ("query", "status = RUNNING"),
                ("skipCache", "true"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        let body = response.bytes().await?;
        let page: SearchResult = serde_json::from_slice(&body)
            .map_err(|e| ClientError::Protocol(format!("invalid search response: {e}")))?;

        Ok(page
            .results
            .into_iter()
            .map(|summary| summary.workflow_id)
            .collect())
    }

    /// Remove a single workflow execution
    pub async fn terminate(&self, workflow_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("/api/workflow/{workflow_id}")))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        Ok(())
    }

    /// Terminate RUNNING executions page by page until none remain
    ///
    /// Returns the total number terminated. A page whose ids all fail to
    /// terminate ends the sweep so it cannot loop forever on the same page.
    pub async fn cleanup_running(&self) -> Result<u64> {
        let mut total = 0u64;

        loop {
            let ids = self.search_running().await?;
            if ids.is_empty() {
                break;
            }

            let results = join_all(ids.iter().map(|id| self.terminate(id))).await;

            let mut terminated = 0u64;
            for (id, result) in ids.iter().zip(results) {
                match result {
                    Ok(()) => terminated += 1,
                    Err(e) => tracing::warn!("Failed to terminate workflow {}: {}", id, e),
                }
            }

            tracing::info!("Cleaned up {} workflows.", terminated);
            total += terminated;

            if terminated == 0 {
                break;
            }
        }

        Ok(total)
    }
}
