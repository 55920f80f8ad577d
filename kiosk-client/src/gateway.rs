//! [`WorkflowGateway`] backed by the orchestration service

use anyhow::Context;
use async_trait::async_trait;
use kiosk::gateway::{STATUS_COMPLETED, is_success};
use kiosk::{AdvanceResponse, StartedWorkflow, WorkflowGateway};

use crate::client::ConductorClient;
use crate::error::ClientError;
use crate::protocol::{StartWorkflowRequest, WorkflowSpecifier};

/// Starts and advances kiosk order workflows over HTTP
#[derive(Clone)]
pub struct KioskGateway {
    client: ConductorClient,
    workflow: WorkflowSpecifier,
    api_test_uri: String,
}

impl KioskGateway {
    pub fn new(
        client: ConductorClient,
        workflow: WorkflowSpecifier,
        api_test_uri: impl Into<String>,
    ) -> Self {
        Self {
            client,
            workflow,
            api_test_uri: api_test_uri.into(),
        }
    }

    pub fn workflow(&self) -> &WorkflowSpecifier {
        &self.workflow
    }

    pub fn client(&self) -> &ConductorClient {
        &self.client
    }
}

#[async_trait]
impl WorkflowGateway for KioskGateway {
    async fn start_workflow(&self, sequence: u64) -> anyhow::Result<StartedWorkflow> {
        let request = StartWorkflowRequest::new(&self.workflow, &self.api_test_uri, sequence);

        let response = self
            .client
            .execute_workflow(&self.workflow, &request)
            .await
            .with_context(|| format!("starting workflow {}", self.workflow.name))?;

        if !is_success(response.status) {
            return Ok(StartedWorkflow {
                status: response.status,
                workflow_id: response.workflow_id.unwrap_or_default(),
                reached_yield_point: false,
            });
        }

        let workflow_id = response
            .workflow_id
            .ok_or(ClientError::MissingWorkflowId)?;

        Ok(StartedWorkflow {
            status: response.status,
            workflow_id,
            reached_yield_point: response.status != STATUS_COMPLETED,
        })
    }

    async fn advance_workflow(
        &self,
        workflow_id: &str,
        action: &str,
    ) -> anyhow::Result<AdvanceResponse> {
        let status = self
            .client
            .signal_task(workflow_id, action)
            .await
            .with_context(|| format!("signalling {action} to workflow {workflow_id}"))?;

        Ok(AdvanceResponse { status })
    }
}
