//! Account provisioning workflows.
//!
//! Creation: create stack, write `name` and `email`, refresh, register
//! deployment settings, dispatch `update`. Deletion: select stack, dispatch
//! `delete`.
//!
//! Failing to create (or, for deletion, select) the stack ends the request.
//! Every later failure is recorded and the workflow carries on, so a
//! settings-registration failure still leads to a dispatch attempt. Nothing
//! is retried or rolled back.

use std::sync::Arc;

use deploy_client::{DeploymentApi, DeploymentOperation};
use serde::{Deserialize, Serialize};
use stack_state::{QualifiedName, StackBackend};
use tracing::Instrument;

use crate::account::{AccountRequest, DirectoryEvent};
use crate::config::EnvironmentConfig;
use crate::error::Result;
use crate::obs::ProvisionSpan;
use crate::report::{OutcomeReport, StepFailure, WorkflowKind, WorkflowState, WorkflowStep};
use crate::settings::DeploymentSettingsBuilder;

/// A provisioned account as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub name: String,
    pub stack: String,
}

/// Sequences backend and deployment API calls for one request at a time.
///
/// Holds no per-request state, so one orchestrator can serve concurrent
/// requests.
#[derive(Clone)]
pub struct ProvisioningOrchestrator {
    env: Arc<EnvironmentConfig>,
    backend: Arc<dyn StackBackend>,
    deployments: Arc<dyn DeploymentApi>,
}

impl ProvisioningOrchestrator {
    pub fn new(
        env: Arc<EnvironmentConfig>,
        backend: Arc<dyn StackBackend>,
        deployments: Arc<dyn DeploymentApi>,
    ) -> Self {
        ProvisioningOrchestrator {
            env,
            backend,
            deployments,
        }
    }

    pub fn env(&self) -> &EnvironmentConfig {
        &self.env
    }

    /// Provision a new account. Never fails; inspect the report.
    pub async fn create_account(&self, request: &AccountRequest) -> OutcomeReport {
        let mut report = OutcomeReport::new(
            WorkflowKind::Create,
            &request.name,
            &self.display_stack(&request.name),
        );
        let span = ProvisionSpan::span(
            &report.request_id().to_string(),
            WorkflowKind::Create.as_str(),
            &request.name,
        );
        async move {
            report.begin();
            self.run_create(request, &mut report).await;
            report.finish()
        }
        .instrument(span)
        .await
    }

    async fn run_create(&self, request: &AccountRequest, report: &mut OutcomeReport) {
        let stack = match self.resolve_name(request) {
            Ok(stack) => stack,
            Err(failure) => {
                report.record_failure(WorkflowStep::CreateStack, failure);
                return;
            }
        };

        let created = self.backend.create(&stack).await;
        let Some(mut record) = report.record(WorkflowStep::CreateStack, created) else {
            return;
        };
        report.advance(WorkflowState::StackResolved);

        for (key, value) in [("name", &request.name), ("email", &request.email)] {
            let result = self.backend.set_config(&mut record, key, value).await;
            report.record(WorkflowStep::set_config(key), result);
        }
        report.record(WorkflowStep::RefreshStack, self.backend.refresh(&record).await);
        report.advance(WorkflowState::ConfigWritten);

        let payload = DeploymentSettingsBuilder::build(request, &self.env);
        report.record(
            WorkflowStep::RegisterSettings,
            self.deployments.register_settings(&stack, &payload).await,
        );
        report.advance(WorkflowState::SettingsAttempted);

        self.dispatch(&stack, DeploymentOperation::Update, report).await;
    }

    /// Tear down an existing account. Never fails; inspect the report.
    pub async fn delete_account(&self, name: &str) -> OutcomeReport {
        let mut report =
            OutcomeReport::new(WorkflowKind::Delete, name, &self.display_stack(name));
        let span = ProvisionSpan::span(
            &report.request_id().to_string(),
            WorkflowKind::Delete.as_str(),
            name,
        );
        async move {
            report.begin();
            self.run_delete(name, &mut report).await;
            report.finish()
        }
        .instrument(span)
        .await
    }

    async fn run_delete(&self, name: &str, report: &mut OutcomeReport) {
        let stack = match self.env.qualified_name(name) {
            Ok(stack) => stack,
            Err(err) => {
                report.record_failure(
                    WorkflowStep::SelectStack,
                    StepFailure::invalid_request(err.to_string()),
                );
                return;
            }
        };

        if report
            .record(WorkflowStep::SelectStack, self.backend.select(&stack).await)
            .is_none()
        {
            return;
        }
        report.advance(WorkflowState::StackResolved);

        self.dispatch(&stack, DeploymentOperation::Delete, report).await;
    }

    async fn dispatch(
        &self,
        stack: &QualifiedName,
        operation: DeploymentOperation,
        report: &mut OutcomeReport,
    ) {
        let step = WorkflowStep::dispatch(operation);
        match self.deployments.dispatch(stack, operation).await {
            Ok(ack) => report.record_success(step, ack.id),
            Err(err) => report.record_failure(step, err),
        }
        report.advance(WorkflowState::OperationDispatched);
    }

    /// Accounts known to the backend, sorted by name.
    pub async fn list_accounts(&self) -> Result<Vec<AccountSummary>> {
        let mut accounts: Vec<AccountSummary> = self
            .backend
            .list()
            .await?
            .into_iter()
            .map(|record| AccountSummary {
                name: record.qualified_name.name().to_string(),
                stack: record.qualified_name.to_string(),
            })
            .collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }

    /// Provision the account for a directory user.
    ///
    /// Fails only when no request can be derived from the event; the
    /// workflow outcome is in the report.
    pub async fn handle_directory_event(&self, event: &DirectoryEvent) -> Result<OutcomeReport> {
        let request = event.to_account_request()?;
        tracing::info!(email = %event.primary_email, account = %request.name, "Directory event accepted");
        Ok(self.create_account(&request).await)
    }

    fn resolve_name(&self, request: &AccountRequest) -> std::result::Result<QualifiedName, StepFailure> {
        request
            .validate()
            .and_then(|_| self.env.qualified_name(&request.name))
            .map_err(|err| StepFailure::invalid_request(err.to_string()))
    }

    fn display_stack(&self, name: &str) -> String {
        format!("{}/{}/{}", self.env.organization, self.env.project, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_vars;
    use crate::report::{FailureKind, StepOutcome};
    use deploy_client::fakes::RecordingDeploymentApi;
    use stack_state::fakes::{BackendOp, MemoryStackBackend};

    fn setup() -> (
        ProvisioningOrchestrator,
        Arc<MemoryStackBackend>,
        Arc<RecordingDeploymentApi>,
    ) {
        let vars = sample_vars();
        let env = EnvironmentConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        let backend = Arc::new(MemoryStackBackend::new());
        let api = Arc::new(RecordingDeploymentApi::new());
        let orchestrator =
            ProvisioningOrchestrator::new(Arc::new(env), backend.clone(), api.clone());
        (orchestrator, backend, api)
    }

    #[tokio::test]
    async fn test_blank_request_is_rejected_before_backend() {
        let (orch, backend, api) = setup();
        let report = orch
            .create_account(&AccountRequest::new("acme", "", "Alice", "Smith"))
            .await;
        assert_eq!(report.entries().len(), 1);
        assert_eq!(
            report.entries()[0].failure().map(|f| f.kind),
            Some(FailureKind::InvalidRequest)
        );
        assert!(backend.calls().is_empty());
        assert!(api.calls().is_empty());
        assert_eq!(report.state(), WorkflowState::Reported);
    }

    #[tokio::test]
    async fn test_name_with_slash_is_rejected() {
        let (orch, backend, _api) = setup();
        let report = orch.delete_account("a/b").await;
        assert_eq!(report.entries().len(), 1);
        assert_eq!(report.entries()[0].step, WorkflowStep::SelectStack);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_note_carries_deployment_id() {
        let (orch, _backend, _api) = setup();
        let report = orch
            .create_account(&AccountRequest::new("acme", "a@x.com", "A", "B"))
            .await;
        let last = report.entries().last().unwrap();
        assert!(matches!(
            &last.outcome,
            StepOutcome::Success { note: Some(id) } if id.starts_with("fake-deployment-")
        ));
    }

    #[tokio::test]
    async fn test_create_failure_other_than_duplicate_is_fatal() {
        let (orch, backend, api) = setup();
        backend.fail_on(BackendOp::Create);
        let report = orch
            .create_account(&AccountRequest::new("acme", "a@x.com", "A", "B"))
            .await;
        assert_eq!(report.entries().len(), 1);
        assert_eq!(
            report.entries()[0].failure().map(|f| f.kind),
            Some(FailureKind::Backend)
        );
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_accounts_sorted() {
        let (orch, _backend, _api) = setup();
        for name in ["zeta", "alpha", "mid"] {
            orch.create_account(&AccountRequest::new(name, "a@x.com", "A", "B"))
                .await;
        }
        let names: Vec<String> = orch
            .list_accounts()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn test_list_failure_propagates() {
        let (orch, backend, _api) = setup();
        backend.fail_on(BackendOp::List);
        assert!(orch.list_accounts().await.is_err());
    }
}
