//! Account vending CLI
//!
//! The `vend` command provisions and tears down managed accounts.
//!
//! ## Commands
//!
//! - `create`: create the account stack and dispatch its deployment
//! - `delete`: dispatch teardown of an existing account
//! - `list`: list provisioned accounts
//! - `settings`: print the deployment settings payload without sending it
//! - `event`: provision from a directory-change notification
//! - `env-info`: show the effective configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use deploy_client::DeploymentApiClient;
use stack_state::PulumiCliBackend;
use tokio::io::AsyncReadExt;
use tracing::{info, Level};
use vend_core::{
    AccountRequest, DeploymentSettingsBuilder, DirectoryEvent, EnvironmentConfig, OutcomeReport,
    ProvisioningOrchestrator, Severity, METRICS,
};

#[derive(Parser)]
#[command(name = "vend")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Provision managed cloud accounts through Pulumi Deployments", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Deployments API base URL
    #[arg(long, global = true, env = "PULUMI_API_URL")]
    api_url: Option<String>,

    /// Branch deployments are sourced from
    #[arg(long, global = true, env = "GITHUB_BRANCH")]
    branch: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account stack and dispatch its deployment
    Create {
        #[command(flatten)]
        account: AccountArgs,

        /// Print the full report as JSON instead of messages
        #[arg(long)]
        json_report: bool,
    },

    /// Dispatch teardown of an existing account
    Delete {
        /// Account name
        name: String,

        /// Print the full report as JSON instead of messages
        #[arg(long)]
        json_report: bool,
    },

    /// List provisioned accounts
    List,

    /// Print the deployment settings payload for an account (no network)
    Settings {
        #[command(flatten)]
        account: AccountArgs,
    },

    /// Provision from a directory-change notification
    Event {
        /// JSON file with a `primaryEmail` field (default: stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Print the full report as JSON instead of messages
        #[arg(long)]
        json_report: bool,
    },

    /// Show the effective configuration
    EnvInfo,
}

#[derive(clap::Args)]
struct AccountArgs {
    /// Account name, unique within the project
    #[arg(short, long)]
    name: String,

    /// Account root email
    #[arg(short, long)]
    email: String,

    /// SSO user first name
    #[arg(long)]
    first_name: String,

    /// SSO user last name
    #[arg(long)]
    last_name: String,
}

impl AccountArgs {
    fn to_request(&self) -> AccountRequest {
        AccountRequest::new(&self.name, &self.email, &self.first_name, &self.last_name)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    vend_core::init_tracing(cli.json, level);

    let mut env = EnvironmentConfig::from_env().context("Failed to load configuration")?;
    if let Some(api_url) = cli.api_url {
        env.api_url = api_url;
    }
    if let Some(branch) = cli.branch {
        env.git_branch = branch;
    }

    let result = match cli.command {
        Commands::Create {
            account,
            json_report,
        } => cmd_create(env, &account.to_request(), json_report).await,
        Commands::Delete { name, json_report } => cmd_delete(env, &name, json_report).await,
        Commands::List => cmd_list(env).await,
        Commands::Settings { account } => cmd_settings(&env, &account.to_request()),
        Commands::Event { file, json_report } => {
            cmd_event(env, file.as_deref(), json_report).await
        }
        Commands::EnvInfo => cmd_env_info(&env),
    };

    METRICS.flush();
    result
}

fn orchestrator(env: EnvironmentConfig) -> Result<ProvisioningOrchestrator> {
    let backend = PulumiCliBackend::new(env.pulumi_cli_config())
        .context("Failed to prepare Pulumi workspace")?;
    let deployments = DeploymentApiClient::new(env.deployment_api_config())
        .context("Failed to build Deployments API client")?;
    Ok(ProvisioningOrchestrator::new(
        Arc::new(env),
        Arc::new(backend),
        Arc::new(deployments),
    ))
}

/// Create an account
async fn cmd_create(env: EnvironmentConfig, request: &AccountRequest, json_report: bool) -> Result<()> {
    let orch = orchestrator(env)?;
    info!(account = %request.name, "Creating account");
    let report = orch.create_account(request).await;
    print_report(&report, json_report)
}

/// Delete an account
async fn cmd_delete(env: EnvironmentConfig, name: &str, json_report: bool) -> Result<()> {
    let orch = orchestrator(env)?;
    info!(account = %name, "Deleting account");
    let report = orch.delete_account(name).await;
    print_report(&report, json_report)
}

/// List accounts
async fn cmd_list(env: EnvironmentConfig) -> Result<()> {
    let orch = orchestrator(env)?;
    let accounts = orch
        .list_accounts()
        .await
        .context("Failed to list accounts")?;

    if accounts.is_empty() {
        println!("No accounts found");
        return Ok(());
    }

    for account in accounts {
        println!("{:<32} {}", account.name, account.stack);
    }
    Ok(())
}

/// Print the settings payload
fn cmd_settings(env: &EnvironmentConfig, request: &AccountRequest) -> Result<()> {
    request.validate()?;
    let payload = DeploymentSettingsBuilder::build(request, env);
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

/// Handle a directory event
async fn cmd_event(env: EnvironmentConfig, file: Option<&Path>, json_report: bool) -> Result<()> {
    let body = match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read event from {}", path.display()))?,
        None => {
            let mut body = String::new();
            tokio::io::stdin()
                .read_to_string(&mut body)
                .await
                .context("Failed to read event from stdin")?;
            body
        }
    };
    let event = DirectoryEvent::from_json(&body).context("Invalid directory event")?;

    let orch = orchestrator(env)?;
    let report = orch.handle_directory_event(&event).await?;
    print_report(&report, json_report)
}

/// Show configuration
fn cmd_env_info(env: &EnvironmentConfig) -> Result<()> {
    println!("Organization:      {}", env.organization);
    println!("Project:           {}", env.project);
    println!(
        "Source:            {}/{}@{}",
        env.git_org, env.git_repo, env.git_branch
    );
    println!("OU:                {}", env.organizational_unit);
    println!("OU on delete:      {}", env.organizational_unit_on_delete);
    println!("OIDC role:         {}", env.oidc_role_arn);
    println!("API:               {}", env.api_url);
    println!("Access token:      <redacted>");
    println!(
        "Timeouts:          http {}s, commands {}s",
        env.http_timeout_secs, env.command_timeout_secs
    );
    if let Some(home) = &env.pulumi_home {
        println!("PULUMI_HOME:       {}", home.display());
    }
    Ok(())
}

fn print_report(report: &OutcomeReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        for message in report.messages() {
            let marker = match message.severity {
                Severity::Success => "ok ",
                Severity::Danger => "err",
            };
            println!("[{}] {}", marker, message.text);
        }
    }

    if !report.succeeded() {
        bail!(
            "{} '{}' did not dispatch ({} failed step(s))",
            report.workflow(),
            report.account(),
            report.failures().count()
        );
    }
    Ok(())
}
