//! Wire types for the Deployments API
//!
//! Field names follow the API's camelCase JSON. Maps are `BTreeMap` so the
//! serialized bytes are stable for identical inputs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of `POST /api/stacks/{org}/{project}/{name}/deployments/settings`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSettingsPayload {
    pub source_context: SourceContext,
    pub git_hub: GitHubSettings,
    pub operation_context: OperationContext,
}

impl DeploymentSettingsPayload {
    /// Git ref deployments are sourced from (`refs/heads/<branch>`).
    pub fn source_branch(&self) -> &str {
        &self.source_context.git.branch
    }

    pub fn repository(&self) -> &str {
        &self.git_hub.repository
    }

    pub fn pre_run_commands(&self) -> &[String] {
        &self.operation_context.pre_run_commands
    }

    pub fn trust_role_arn(&self) -> &str {
        &self.operation_context.oidc.aws.role_arn
    }

    pub fn session_name(&self) -> &str {
        &self.operation_context.oidc.aws.session_name
    }

    pub fn environment_variables(&self) -> &BTreeMap<String, String> {
        &self.operation_context.environment_variables
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceContext {
    pub git: GitSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitSource {
    pub branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubSettings {
    /// `<org>/<repo>`
    pub repository: String,
    pub deploy_commits: bool,
    pub preview_pull_requests: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationContext {
    /// Run in order before every deployment operation
    pub pre_run_commands: Vec<String>,
    pub oidc: OidcSettings,
    pub environment_variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcSettings {
    pub aws: AwsOidc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsOidc {
    pub role_arn: String,
    pub session_name: String,
}

/// Operation dispatched against an existing stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentOperation {
    /// Provision or reconcile
    Update,
    /// Tear down
    Delete,
}

impl DeploymentOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentOperation::Update => "update",
            DeploymentOperation::Delete => "delete",
        }
    }
}

impl std::fmt::Display for DeploymentOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /api/stacks/{org}/{project}/{name}/deployments`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub operation: DeploymentOperation,
}

/// Acceptance of a dispatched operation.
///
/// The remote system has queued the operation; completion is not tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchAck {
    /// Deployment ID, when the API reports one
    pub id: Option<String>,
    /// Per-stack deployment version, when reported
    pub version: Option<u64>,
    /// Console link for the deployment, when reported
    pub console_url: Option<String>,
    /// Raw response body
    pub body: serde_json::Value,
}

impl DispatchAck {
    /// Extract the known fields from a response body.
    pub fn from_body(body: serde_json::Value) -> Self {
        DispatchAck {
            id: body.get("id").and_then(|v| v.as_str()).map(str::to_string),
            version: body.get("version").and_then(|v| v.as_u64()),
            console_url: body
                .get("consoleUrl")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            body,
        }
    }
}
