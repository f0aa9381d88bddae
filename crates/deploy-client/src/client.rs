//! Deployments API client
//!
//! Registers deployment settings for a stack and dispatches operations
//! against it. Both calls carry the same `Authorization: token <access token>`
//! header. A dispatch is fire-and-forget: success means the operation was
//! accepted, and nothing here polls for completion.

use std::time::Duration;

use async_trait::async_trait;
use stack_state::QualifiedName;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::payload::{DeploymentOperation, DeploymentSettingsPayload, DispatchAck, DispatchRequest};

/// Default Pulumi Cloud API endpoint
pub const DEFAULT_API_URL: &str = "https://api.pulumi.com";

/// Deployments API configuration
#[derive(Clone)]
pub struct DeploymentApiConfig {
    /// API base URL, without trailing slash
    pub base_url: String,
    /// Access token sent as `Authorization: token <access_token>`
    pub access_token: String,
    /// Request timeout in seconds (0 disables the limit)
    pub timeout_secs: u64,
}

impl std::fmt::Debug for DeploymentApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentApiConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl DeploymentApiConfig {
    /// Create config for the given endpoint and token
    pub fn new(base_url: &str, access_token: &str) -> Self {
        DeploymentApiConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            timeout_secs: 30,
        }
    }

    /// Config for Pulumi Cloud
    pub fn pulumi_cloud(access_token: &str) -> Self {
        Self::new(DEFAULT_API_URL, access_token)
    }

    /// Set request timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Remote deployment API.
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    /// Register source, pre-run commands and OIDC binding for a stack.
    async fn register_settings(
        &self,
        stack: &QualifiedName,
        payload: &DeploymentSettingsPayload,
    ) -> ApiResult<()>;

    /// Ask the remote system to run `operation` against a stack.
    async fn dispatch(
        &self,
        stack: &QualifiedName,
        operation: DeploymentOperation,
    ) -> ApiResult<DispatchAck>;
}

/// HTTP client for the Pulumi Deployments API
pub struct DeploymentApiClient {
    config: DeploymentApiConfig,
    http_client: reqwest::Client,
}

impl DeploymentApiClient {
    /// Create a new client
    pub fn new(config: DeploymentApiConfig) -> ApiResult<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("account-vending/", env!("CARGO_PKG_VERSION")));
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let http_client = builder.build()?;

        Ok(DeploymentApiClient {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &DeploymentApiConfig {
        &self.config
    }

    /// `{base}/api/stacks/{org}/{project}/{name}/deployments`
    pub fn deployments_url(&self, stack: &QualifiedName) -> String {
        format!(
            "{}/api/stacks/{}/{}/{}/deployments",
            self.config.base_url,
            stack.org(),
            stack.project(),
            stack.name()
        )
    }

    /// `{base}/api/stacks/{org}/{project}/{name}/deployments/settings`
    pub fn settings_url(&self, stack: &QualifiedName) -> String {
        format!("{}/settings", self.deployments_url(stack))
    }

    /// POST a JSON body and decode the JSON response.
    async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> ApiResult<serde_json::Value> {
        let url = reqwest::Url::parse(url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        debug!(url = %url, "POST deployment API");

        let response = self
            .http_client
            .post(url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("token {}", self.config.access_token),
            )
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), body = %text, "Deployment API call failed");
            return Err(ApiError::Status {
                status_code: status.as_u16(),
                body: text,
            });
        }

        decode_body(&text)
    }
}

/// Decode a 2xx body.
///
/// Empty bodies become `Null` and plain text becomes a JSON string. Only a
/// body that starts as a JSON object or array and then fails to parse is an
/// error.
fn decode_body(text: &str) -> ApiResult<serde_json::Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(serde_json::Value::Null);
    }
    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(value),
        Err(err) if trimmed.starts_with('{') || trimmed.starts_with('[') => Err(err.into()),
        Err(_) => {
            debug!(body = %trimmed, "Non-JSON success body kept as text");
            Ok(serde_json::Value::String(trimmed.to_string()))
        }
    }
}

#[async_trait]
impl DeploymentApi for DeploymentApiClient {
    async fn register_settings(
        &self,
        stack: &QualifiedName,
        payload: &DeploymentSettingsPayload,
    ) -> ApiResult<()> {
        let body = self.post_json(&self.settings_url(stack), payload).await?;
        info!(stack = %stack, "Registered deployment settings");
        debug!(response = %body, "Settings response");
        Ok(())
    }

    async fn dispatch(
        &self,
        stack: &QualifiedName,
        operation: DeploymentOperation,
    ) -> ApiResult<DispatchAck> {
        let body = self
            .post_json(&self.deployments_url(stack), &DispatchRequest { operation })
            .await?;
        let ack = DispatchAck::from_body(body);
        info!(
            stack = %stack,
            operation = %operation,
            deployment_id = ack.id.as_deref().unwrap_or("-"),
            "Dispatched deployment"
        );
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack() -> QualifiedName {
        QualifiedName::new("org", "proj", "acme").unwrap()
    }

    #[test]
    fn test_config_trims_trailing_slash() {
        let config = DeploymentApiConfig::new("https://api.example.com/", "tok");
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_config_debug_redacts_token() {
        let config = DeploymentApiConfig::pulumi_cloud("pul-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("pul-secret"));
        assert!(debug.contains(DEFAULT_API_URL));
    }

    #[test]
    fn test_urls() {
        let client = DeploymentApiClient::new(DeploymentApiConfig::pulumi_cloud("tok")).unwrap();
        assert_eq!(
            client.deployments_url(&stack()),
            "https://api.pulumi.com/api/stacks/org/proj/acme/deployments"
        );
        assert_eq!(
            client.settings_url(&stack()),
            "https://api.pulumi.com/api/stacks/org/proj/acme/deployments/settings"
        );
    }

    #[test]
    fn test_decode_body_variants() {
        assert_eq!(decode_body("  ").unwrap(), serde_json::Value::Null);
        assert_eq!(
            decode_body("accepted").unwrap(),
            serde_json::Value::String("accepted".to_string())
        );
        assert_eq!(decode_body(r#"{"id":"d-1"}"#).unwrap()["id"], "d-1");
        assert!(matches!(
            decode_body(r#"{"id":"#).unwrap_err(),
            ApiError::Decode(_)
        ));
    }

    #[tokio::test]
    async fn test_invalid_base_url_is_reported() {
        let client = DeploymentApiClient::new(DeploymentApiConfig::new("not a url", "tok")).unwrap();
        let err = client
            .dispatch(&stack(), DeploymentOperation::Update)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }
}
