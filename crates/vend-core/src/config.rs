//! Process-wide environment configuration.
//!
//! Built once at start-up and shared read-only (`Arc<EnvironmentConfig>`)
//! by every request.

use std::path::PathBuf;

use deploy_client::{DeploymentApiConfig, DEFAULT_API_URL};
use stack_state::{PulumiCliConfig, QualifiedName};

use crate::error::{Result, VendError};

/// Branch deployments are sourced from when `GITHUB_BRANCH` is unset.
pub const DEFAULT_GIT_BRANCH: &str = "main";

/// Organizations, source repository, account placement and credentials.
#[derive(Clone)]
pub struct EnvironmentConfig {
    /// Pulumi organization owning the account stacks
    pub organization: String,
    /// Pulumi project the account stacks belong to
    pub project: String,
    /// GitHub organization hosting the account program
    pub git_org: String,
    /// GitHub repository hosting the account program
    pub git_repo: String,
    /// Branch deployments are sourced from
    pub git_branch: String,
    /// Organizational unit new accounts are placed in
    pub organizational_unit: String,
    /// Organizational unit ID accounts are moved to when deleted
    pub organizational_unit_on_delete: String,
    /// Role the deployment runner assumes through OIDC
    pub oidc_role_arn: String,
    /// Deployments API access token
    pub access_token: String,
    /// Deployments API base URL
    pub api_url: String,
    pub http_timeout_secs: u64,
    pub command_timeout_secs: u64,
    /// Exported as `PULUMI_HOME` for the CLI backend when set
    pub pulumi_home: Option<PathBuf>,
}

impl std::fmt::Debug for EnvironmentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentConfig")
            .field("organization", &self.organization)
            .field("project", &self.project)
            .field("git_org", &self.git_org)
            .field("git_repo", &self.git_repo)
            .field("git_branch", &self.git_branch)
            .field("organizational_unit", &self.organizational_unit)
            .field(
                "organizational_unit_on_delete",
                &self.organizational_unit_on_delete,
            )
            .field("oidc_role_arn", &self.oidc_role_arn)
            .field("access_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .field("pulumi_home", &self.pulumi_home)
            .finish()
    }
}

impl EnvironmentConfig {
    /// Create from environment variables
    ///
    /// Reads:
    /// - PULUMI_ORG, PULUMI_PROJECT_NAME (required)
    /// - GITHUB_ORG, GITHUB_REPO (required), GITHUB_BRANCH (default: "main")
    /// - ACCOUNT_OU or AWS_CONTROLTOWER_ORG (required)
    /// - ACCOUNT_OU_ON_DELETE or AWS_CONTROLTOWER_ORG_ID_ON_DELETE (required)
    /// - OIDC_ROLE_ARN, PULUMI_ACCESS_TOKEN (required)
    /// - PULUMI_API_URL (default: "https://api.pulumi.com")
    /// - VEND_HTTP_TIMEOUT_SECS (default: 30), VEND_COMMAND_TIMEOUT_SECS (default: 300)
    /// - PULUMI_HOME (optional)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create from an arbitrary key lookup (environment, map, flags).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| -> Option<String> {
            keys.iter()
                .filter_map(|k| lookup(*k))
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };
        let required = |keys: &[&str]| -> Result<String> {
            get(keys).ok_or_else(|| VendError::Config(format!("{} is not set", keys.join(" or "))))
        };
        let seconds = |key: &str, default: u64| -> Result<u64> {
            match get(&[key]) {
                Some(raw) => raw.parse().map_err(|_| {
                    VendError::Config(format!("{} must be a whole number of seconds, got '{}'", key, raw))
                }),
                None => Ok(default),
            }
        };

        Ok(EnvironmentConfig {
            organization: required(&["PULUMI_ORG"])?,
            project: required(&["PULUMI_PROJECT_NAME"])?,
            git_org: required(&["GITHUB_ORG"])?,
            git_repo: required(&["GITHUB_REPO"])?,
            git_branch: get(&["GITHUB_BRANCH"]).unwrap_or_else(|| DEFAULT_GIT_BRANCH.to_string()),
            organizational_unit: required(&["ACCOUNT_OU", "AWS_CONTROLTOWER_ORG"])?,
            organizational_unit_on_delete: required(&[
                "ACCOUNT_OU_ON_DELETE",
                "AWS_CONTROLTOWER_ORG_ID_ON_DELETE",
            ])?,
            oidc_role_arn: required(&["OIDC_ROLE_ARN"])?,
            access_token: required(&["PULUMI_ACCESS_TOKEN"])?,
            api_url: get(&["PULUMI_API_URL"]).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            http_timeout_secs: seconds("VEND_HTTP_TIMEOUT_SECS", 30)?,
            command_timeout_secs: seconds("VEND_COMMAND_TIMEOUT_SECS", 300)?,
            pulumi_home: get(&["PULUMI_HOME"]).map(PathBuf::from),
        })
    }

    /// `org/project/<account>` for an account name.
    pub fn qualified_name(&self, account: &str) -> Result<QualifiedName> {
        Ok(QualifiedName::new(
            &self.organization,
            &self.project,
            account,
        )?)
    }

    /// Deployments API client configuration.
    pub fn deployment_api_config(&self) -> DeploymentApiConfig {
        DeploymentApiConfig::new(&self.api_url, &self.access_token)
            .with_timeout_secs(self.http_timeout_secs)
    }

    /// Pulumi CLI backend configuration.
    pub fn pulumi_cli_config(&self) -> PulumiCliConfig {
        let config = PulumiCliConfig::new(&self.organization, &self.project)
            .with_token(&self.access_token)
            .with_timeout_secs(self.command_timeout_secs);
        match &self.pulumi_home {
            Some(home) => config.with_pulumi_home(home.clone()),
            None => config,
        }
    }
}
