//! Outcome reports.
//!
//! An [`OutcomeReport`] is the only thing a workflow returns. Every attempted
//! step lands in it as a [`ReportEntry`], success or failure, in the order
//! the steps ran. Nothing is dropped once recorded.

use std::fmt;

use chrono::{DateTime, Utc};
use deploy_client::{ApiError, DeploymentOperation};
use serde::{Deserialize, Serialize};
use stack_state::StackError;
use uuid::Uuid;

use crate::metrics::METRICS;
use crate::obs;

/// Which workflow produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    Create,
    Delete,
}

impl WorkflowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::Create => "create",
            WorkflowKind::Delete => "delete",
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowStep {
    CreateStack,
    SelectStack,
    SetConfig { key: String },
    RefreshStack,
    RegisterSettings,
    DispatchOperation { operation: DeploymentOperation },
}

impl WorkflowStep {
    pub fn set_config(key: &str) -> Self {
        WorkflowStep::SetConfig {
            key: key.to_string(),
        }
    }

    pub fn dispatch(operation: DeploymentOperation) -> Self {
        WorkflowStep::DispatchOperation { operation }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStep::CreateStack => f.write_str("create_stack"),
            WorkflowStep::SelectStack => f.write_str("select_stack"),
            WorkflowStep::SetConfig { key } => write!(f, "set_config:{}", key),
            WorkflowStep::RefreshStack => f.write_str("refresh_stack"),
            WorkflowStep::RegisterSettings => f.write_str("register_settings"),
            WorkflowStep::DispatchOperation { operation } => {
                write!(f, "dispatch_operation:{}", operation)
            }
        }
    }
}

/// Classification of a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureKind {
    AlreadyExists,
    NotFound,
    Backend,
    Api { status_code: Option<u16> },
    InvalidRequest,
}

/// Why a step failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl StepFailure {
    pub fn invalid_request(detail: impl Into<String>) -> Self {
        StepFailure {
            kind: FailureKind::InvalidRequest,
            detail: detail.into(),
        }
    }
}

impl From<StackError> for StepFailure {
    fn from(err: StackError) -> Self {
        let kind = match &err {
            StackError::AlreadyExists { .. } => FailureKind::AlreadyExists,
            StackError::NotFound { .. } => FailureKind::NotFound,
            StackError::InvalidName { .. } => FailureKind::InvalidRequest,
            _ => FailureKind::Backend,
        };
        StepFailure {
            kind,
            detail: err.to_string(),
        }
    }
}

impl From<ApiError> for StepFailure {
    fn from(err: ApiError) -> Self {
        StepFailure {
            kind: FailureKind::Api {
                status_code: err.status_code(),
            },
            detail: err.to_string(),
        }
    }
}

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepOutcome {
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    Failure(StepFailure),
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub step: WorkflowStep,
    pub outcome: StepOutcome,
    pub at: DateTime<Utc>,
}

impl ReportEntry {
    pub fn failure(&self) -> Option<&StepFailure> {
        match &self.outcome {
            StepOutcome::Failure(failure) => Some(failure),
            StepOutcome::Success { .. } => None,
        }
    }
}

/// Workflow progress. Only ever moves forward; `Reported` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Requested,
    StackResolved,
    ConfigWritten,
    SettingsAttempted,
    OperationDispatched,
    Reported,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Requested => "requested",
            WorkflowState::StackResolved => "stack_resolved",
            WorkflowState::ConfigWritten => "config_written",
            WorkflowState::SettingsAttempted => "settings_attempted",
            WorkflowState::OperationDispatched => "operation_dispatched",
            WorkflowState::Reported => "reported",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Danger,
}

/// A user-facing rendering of one report entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub severity: Severity,
    pub text: String,
}

/// Everything that happened while handling one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeReport {
    request_id: Uuid,
    workflow: WorkflowKind,
    account: String,
    stack: String,
    entries: Vec<ReportEntry>,
    state: WorkflowState,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl OutcomeReport {
    /// Create a report in the `Requested` state.
    pub fn new(workflow: WorkflowKind, account: &str, stack: &str) -> Self {
        OutcomeReport {
            request_id: Uuid::new_v4(),
            workflow,
            account: account.to_string(),
            stack: stack.to_string(),
            entries: Vec::new(),
            state: WorkflowState::Requested,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Count the request and emit `workflow.started`.
    ///
    /// Call inside the request span so the event carries its context.
    pub fn begin(&self) {
        METRICS.inc_requests();
        obs::emit_workflow_started(
            &self.request_id.to_string(),
            self.workflow.as_str(),
            &self.stack,
        );
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn workflow(&self) -> WorkflowKind {
        self.workflow
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn record_success(&mut self, step: WorkflowStep, note: Option<String>) {
        obs::emit_step(&self.request_id.to_string(), &step.to_string(), true, "");
        if matches!(step, WorkflowStep::DispatchOperation { .. }) {
            METRICS.inc_dispatches_accepted();
        }
        self.push(step, StepOutcome::Success { note });
    }

    pub fn record_failure(&mut self, step: WorkflowStep, failure: impl Into<StepFailure>) {
        let failure = failure.into();
        obs::emit_step(
            &self.request_id.to_string(),
            &step.to_string(),
            false,
            &failure.detail,
        );
        METRICS.inc_failed_steps();
        self.push(step, StepOutcome::Failure(failure));
    }

    /// Record a step result, handing back the success value.
    pub fn record<T, E>(&mut self, step: WorkflowStep, result: Result<T, E>) -> Option<T>
    where
        E: Into<StepFailure>,
    {
        match result {
            Ok(value) => {
                self.record_success(step, None);
                Some(value)
            }
            Err(err) => {
                self.record_failure(step, err);
                None
            }
        }
    }

    fn push(&mut self, step: WorkflowStep, outcome: StepOutcome) {
        self.entries.push(ReportEntry {
            step,
            outcome,
            at: Utc::now(),
        });
    }

    /// Move to `to` if it lies ahead of the current state.
    ///
    /// Returns whether the state changed.
    pub fn advance(&mut self, to: WorkflowState) -> bool {
        if to <= self.state {
            return false;
        }
        obs::emit_state(&self.request_id.to_string(), self.state.as_str(), to.as_str());
        self.state = to;
        true
    }

    /// Seal the report in the `Reported` state.
    pub fn finish(mut self) -> Self {
        self.advance(WorkflowState::Reported);
        let finished_at = Utc::now();
        self.finished_at = Some(finished_at);
        let duration_ms = (finished_at - self.started_at).num_milliseconds().max(0) as u64;
        obs::emit_workflow_finished(
            &self.request_id.to_string(),
            duration_ms,
            self.entries.len(),
            self.failures().count(),
            self.succeeded(),
        );
        self
    }

    /// True iff an operation was dispatched and accepted.
    pub fn succeeded(&self) -> bool {
        self.entries.iter().any(|e| {
            matches!(e.step, WorkflowStep::DispatchOperation { .. }) && e.outcome.is_success()
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| !e.outcome.is_success())
    }

    /// One message per entry, in order.
    pub fn messages(&self) -> Vec<Message> {
        self.entries
            .iter()
            .map(|entry| self.render(entry))
            .collect()
    }

    fn render(&self, entry: &ReportEntry) -> Message {
        let name = &self.account;
        match &entry.outcome {
            StepOutcome::Success { .. } => Message {
                severity: Severity::Success,
                text: match &entry.step {
                    WorkflowStep::CreateStack => format!("Created stack '{}'", self.stack),
                    WorkflowStep::SelectStack => format!("Found stack '{}'", self.stack),
                    WorkflowStep::SetConfig { key } => format!("Set {} for '{}'", key, name),
                    WorkflowStep::RefreshStack => format!("Refreshed stack '{}'", self.stack),
                    WorkflowStep::RegisterSettings => {
                        format!("Registered deployment settings for '{}'", name)
                    }
                    WorkflowStep::DispatchOperation {
                        operation: DeploymentOperation::Update,
                    } => format!("Successfully dispatched account deployment '{}'", name),
                    WorkflowStep::DispatchOperation {
                        operation: DeploymentOperation::Delete,
                    } => format!("Successfully dispatched '{}' deletion!", name),
                },
            },
            StepOutcome::Failure(failure) => Message {
                severity: Severity::Danger,
                text: match (&entry.step, failure.kind) {
                    (WorkflowStep::CreateStack, FailureKind::AlreadyExists) => format!(
                        "Error: Deployment with name '{}' already exists, pick a unique name",
                        name
                    ),
                    (WorkflowStep::CreateStack, _) => {
                        format!("Error creating stack '{}': {}", name, failure.detail)
                    }
                    (WorkflowStep::SelectStack, FailureKind::NotFound) => {
                        format!("Error: No deployment named '{}' exists", name)
                    }
                    (WorkflowStep::SelectStack, _) => {
                        format!("Error selecting stack '{}': {}", name, failure.detail)
                    }
                    (WorkflowStep::SetConfig { key }, _) => {
                        format!("Error setting {} for '{}': {}", key, name, failure.detail)
                    }
                    (WorkflowStep::RefreshStack, _) => {
                        format!("Error refreshing stack '{}': {}", name, failure.detail)
                    }
                    (WorkflowStep::RegisterSettings, _) => {
                        format!("Error creating deployment settings: {}", failure.detail)
                    }
                    (
                        WorkflowStep::DispatchOperation {
                            operation: DeploymentOperation::Update,
                        },
                        _,
                    ) => format!("Error creating deployment: {}", failure.detail),
                    (
                        WorkflowStep::DispatchOperation {
                            operation: DeploymentOperation::Delete,
                        },
                        _,
                    ) => format!(
                        "Error dispatching account deletion deployment: {}",
                        failure.detail
                    ),
                },
            },
        }
    }
}
