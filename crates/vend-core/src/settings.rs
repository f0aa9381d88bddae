//! Deployment settings for a new account stack.
//!
//! Pure transform from an [`AccountRequest`] and the [`EnvironmentConfig`]
//! to the settings payload. Identical inputs always serialize to identical
//! bytes.

use std::collections::BTreeMap;

use deploy_client::{
    AwsOidc, DeploymentSettingsPayload, GitHubSettings, GitSource, OidcSettings,
    OperationContext, SourceContext,
};

use crate::account::AccountRequest;
use crate::config::EnvironmentConfig;

/// Region exported to every deployment run. Fixed, not derived from input.
pub const DEPLOYMENT_REGION: &str = "us-west-2";

/// Session name used when the runner assumes the OIDC role.
pub const OIDC_SESSION_NAME: &str = "deployment";

/// Config keys written by the pre-run commands, in execution order.
pub const PRE_RUN_CONFIG_KEYS: [&str; 7] = [
    "name",
    "email",
    "organizationalUnit",
    "organizationalUnitIdOnDelete",
    "ssoEmail",
    "ssoFirstName",
    "ssoLastName",
];

/// One `pulumi config set` run before each deployment operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigAssignment<'a> {
    pub key: &'static str,
    pub value: &'a str,
}

impl ConfigAssignment<'_> {
    /// Render the command against `<org>/<account>`.
    pub fn render(&self, org: &str, account: &str) -> String {
        format!(
            "pulumi config set {} {} -s {}/{}",
            self.key,
            shell_quote(self.value),
            org,
            account
        )
    }
}

/// Builds [`DeploymentSettingsPayload`]s.
pub struct DeploymentSettingsBuilder;

impl DeploymentSettingsBuilder {
    /// Build the settings payload for `request`.
    pub fn build(request: &AccountRequest, env: &EnvironmentConfig) -> DeploymentSettingsPayload {
        DeploymentSettingsPayload {
            source_context: SourceContext {
                git: GitSource {
                    branch: format!("refs/heads/{}", env.git_branch),
                },
            },
            git_hub: GitHubSettings {
                repository: format!("{}/{}", env.git_org, env.git_repo),
                deploy_commits: true,
                preview_pull_requests: true,
            },
            operation_context: OperationContext {
                pre_run_commands: Self::pre_run_commands(request, env),
                oidc: OidcSettings {
                    aws: AwsOidc {
                        role_arn: env.oidc_role_arn.clone(),
                        session_name: OIDC_SESSION_NAME.to_string(),
                    },
                },
                environment_variables: BTreeMap::from([(
                    "AWS_REGION".to_string(),
                    DEPLOYMENT_REGION.to_string(),
                )]),
            },
        }
    }

    /// The seven config assignments, in [`PRE_RUN_CONFIG_KEYS`] order.
    pub fn assignments<'a>(
        request: &'a AccountRequest,
        env: &'a EnvironmentConfig,
    ) -> [ConfigAssignment<'a>; 7] {
        let [name, email, ou, ou_on_delete, sso_email, sso_first, sso_last] = PRE_RUN_CONFIG_KEYS;
        [
            ConfigAssignment { key: name, value: &request.name },
            ConfigAssignment { key: email, value: &request.email },
            ConfigAssignment { key: ou, value: &env.organizational_unit },
            ConfigAssignment { key: ou_on_delete, value: &env.organizational_unit_on_delete },
            ConfigAssignment { key: sso_email, value: &request.email },
            ConfigAssignment { key: sso_first, value: &request.first_name },
            ConfigAssignment { key: sso_last, value: &request.last_name },
        ]
    }

    /// Rendered pre-run commands.
    pub fn pre_run_commands(request: &AccountRequest, env: &EnvironmentConfig) -> Vec<String> {
        Self::assignments(request, env)
            .iter()
            .map(|a| a.render(&env.organization, &request.name))
            .collect()
    }
}

/// Quote a value for the runner's shell unless it is plainly safe.
fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@._-+:/=,".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
