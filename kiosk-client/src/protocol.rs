//! Wire payloads exchanged with the orchestration service
//!
//! Field names follow the service's camelCase JSON.

use serde::{Deserialize, Serialize};

/// Response header carrying the id of a started workflow
pub const WORKFLOW_ID_HEADER: &str = "workflowId";

/// Request header carrying the static access token
pub const AUTHORIZATION_HEADER: &str = "X-Authorization";

/// Debug header naming the signalled action
pub const ACTION_HEADER: &str = "X-Kiosk-Action";

/// A published workflow definition, addressed by name and version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSpecifier {
    pub name: String,
    pub version: u32,
}

impl WorkflowSpecifier {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Read the name and version out of a full workflow definition
    pub fn from_definition(definition: &serde_json::Value) -> Option<Self> {
        let name = definition.get("name")?.as_str()?;
        let version = definition.get("version")?.as_u64()?;
        Some(Self::new(name, u32::try_from(version).ok()?))
    }
}

/// Input handed to each started workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInput {
    pub uri: String,
    pub sequence: u64,
}

/// Body of the synchronous execute call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartWorkflowRequest {
    pub name: String,
    pub version: u32,
    pub correlation_id: String,
    pub input: WorkflowInput,
}

impl StartWorkflowRequest {
    pub fn new(workflow: &WorkflowSpecifier, uri: impl Into<String>, sequence: u64) -> Self {
        Self {
            name: workflow.name.clone(),
            version: workflow.version,
            correlation_id: format!("kiosk-{sequence}"),
            input: WorkflowInput {
                uri: uri.into(),
                sequence,
            },
        }
    }
}

/// Body of a task completion signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRequest {
    pub action: String,
}

/// Body fallback when the workflow id header is absent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowIdBody {
    pub workflow_id: String,
}

/// One page of workflow search results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default)]
    pub total_hits: u64,
    #[serde(default)]
    pub results: Vec<WorkflowSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub workflow_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Outcome of the execute call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteResponse {
    pub status: u16,
    pub workflow_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_request_shape() {
        let workflow = WorkflowSpecifier::new("KioskOrder", 2);
        let request = StartWorkflowRequest::new(&workflow, "http://tester.local/", 41);

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "KioskOrder",
                "version": 2,
                "correlationId": "kiosk-41",
                "input": { "uri": "http://tester.local/", "sequence": 41 }
            })
        );
    }

    #[test]
    fn test_specifier_from_definition() {
        let definition = json!({ "name": "KioskOrder", "version": 3, "tasks": [] });
        assert_eq!(
            WorkflowSpecifier::from_definition(&definition),
            Some(WorkflowSpecifier::new("KioskOrder", 3))
        );

        assert_eq!(WorkflowSpecifier::from_definition(&json!({ "name": "x" })), None);
        assert_eq!(
            WorkflowSpecifier::from_definition(&json!({ "name": "x", "version": "1" })),
            None
        );
    }

    #[test]
    fn test_search_result_tolerates_missing_fields() {
        let page: SearchResult = serde_json::from_str(r#"{"results":[{"workflowId":"a"}]}"#).unwrap();
        assert_eq!(page.total_hits, 0);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].workflow_id, "a");

        let empty: SearchResult = serde_json::from_str("{}").unwrap();
        assert!(empty.results.is_empty());
    }
}
