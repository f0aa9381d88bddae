//! Deploy-Client: Pulumi Deployments API integration for account vending
//!
//! Provides the wire payloads for deployment settings and operation
//! dispatch, the `DeploymentApi` seam, its reqwest-backed implementation
//! and a recording fake for tests.

pub mod client;
mod error;
pub mod fakes;
pub mod payload;

pub use client::{DeploymentApi, DeploymentApiClient, DeploymentApiConfig, DEFAULT_API_URL};
pub use error::{ApiError, ApiResult};
pub use payload::{
    AwsOidc, DeploymentOperation, DeploymentSettingsPayload, DispatchAck, DispatchRequest,
    GitHubSettings, GitSource, OidcSettings, OperationContext, SourceContext,
};
