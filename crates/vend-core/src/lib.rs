//! Vend-Core: account provisioning orchestration
//!
//! Turns an account request into a stack in the state backend plus a
//! dispatched deployment, and reports every step of the way.
//!
//! ## Key Components
//!
//! - `EnvironmentConfig`: process-wide settings read once at start-up
//! - `AccountRequest` / `DirectoryEvent`: workflow inputs
//! - `DeploymentSettingsBuilder`: pure settings payload assembly
//! - `ProvisioningOrchestrator`: creation, deletion and listing workflows
//! - `OutcomeReport`: ordered step results with user-facing messages

pub mod account;
pub mod config;
mod error;
pub mod metrics;
pub mod obs;
pub mod orchestrator;
pub mod report;
pub mod settings;
pub mod telemetry;

pub use account::{AccountRequest, DirectoryEvent};
pub use config::{EnvironmentConfig, DEFAULT_GIT_BRANCH};
pub use error::{Result, VendError};
pub use metrics::METRICS;
pub use obs::{emit_state, emit_step, emit_workflow_finished, emit_workflow_started, ProvisionSpan};
pub use orchestrator::{AccountSummary, ProvisioningOrchestrator};
pub use report::{
    FailureKind, Message, OutcomeReport, ReportEntry, Severity, StepFailure, StepOutcome,
    WorkflowKind, WorkflowState, WorkflowStep,
};
pub use settings::{DeploymentSettingsBuilder, DEPLOYMENT_REGION, OIDC_SESSION_NAME};
pub use telemetry::init_tracing;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
