//! Workflow definition publishing
//!
//! Definitions are plain JSON files. Each is published with overwrite
//! semantics so repeated runs converge on the files on disk.

use anyhow::{Context, Result, anyhow};
use kiosk_client::{ConductorClient, WorkflowSpecifier};
use std::path::{Path, PathBuf};

/// A definition read from disk
#[derive(Debug, Clone)]
pub struct WorkflowDefinition {
    pub path: PathBuf,
    pub specifier: WorkflowSpecifier,
    pub body: serde_json::Value,
}

/// Read every `*.json` definition in `dir`, ordered by file name
pub async fn load_definitions(dir: &Path) -> Result<Vec<WorkflowDefinition>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read workflow directory {}", dir.display()))?;

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut definitions = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let body: serde_json::Value = serde_json::from_slice(&raw)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?;
        let specifier = WorkflowSpecifier::from_definition(&body).ok_or_else(|| {
            anyhow!(
                "Workflow definition {} needs a string \"name\" and numeric \"version\"",
                path.display()
            )
        })?;

        definitions.push(WorkflowDefinition {
            path,
            specifier,
            body,
        });
    }

    Ok(definitions)
}

/// Publish every definition in `dir` and return what was published
///
/// The first rejected definition aborts publishing.
pub async fn publish_definitions(
    client: &ConductorClient,
    dir: &Path,
) -> Result<Vec<WorkflowSpecifier>> {
    let definitions = load_definitions(dir).await?;
    if definitions.is_empty() {
        tracing::warn!("No workflow definitions found in {}", dir.display());
    }

    let mut published = Vec::with_capacity(definitions.len());
    for definition in definitions {
        client
            .publish_workflow(&definition.body)
            .await
            .with_context(|| {
                format!("Failed to publish workflow '{}'", definition.specifier.name)
            })?;

        tracing::info!(
            "Workflow '{}' published successfully.",
            definition.specifier.name
        );
        published.push(definition.specifier);
    }

    Ok(published)
}

/// Pick the workflow units start: a published definition named `name`
/// wins over the configured version
pub fn resolve_workflow(
    published: &[WorkflowSpecifier],
    name: &str,
    configured_version: u32,
) -> WorkflowSpecifier {
    published
        .iter()
        .find(|specifier| specifier.name == name)
        .cloned()
        .unwrap_or_else(|| WorkflowSpecifier::new(name, configured_version))
}
