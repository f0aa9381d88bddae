//! Pulumi CLI stack backend
//!
//! Drives the `pulumi` binary from a scratch workspace. The workspace holds a
//! `Pulumi.yaml` for the account project whose program declares no resources
//! ([`WorkspaceProgram::Empty`]), so `refresh` only reconciles state and never
//! provisions anything locally.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::backend::*;
use crate::error::StackError;

/// Pulumi CLI backend configuration
#[derive(Clone)]
pub struct PulumiCliConfig {
    /// Pulumi organization owning the stacks
    pub org: String,
    /// Pulumi project the account stacks belong to
    pub project: String,
    /// Access token exported as `PULUMI_ACCESS_TOKEN` (optional if already logged in)
    pub access_token: Option<String>,
    /// Exported as `PULUMI_HOME` when set (e.g. a writable dir on read-only hosts)
    pub pulumi_home: Option<PathBuf>,
    /// Binary to invoke
    pub binary: String,
    /// Per-command time budget in seconds (0 disables the limit)
    pub timeout_secs: u64,
}

impl std::fmt::Debug for PulumiCliConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PulumiCliConfig")
            .field("org", &self.org)
            .field("project", &self.project)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("pulumi_home", &self.pulumi_home)
            .field("binary", &self.binary)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl PulumiCliConfig {
    /// Create config for an organization and project
    pub fn new(org: &str, project: &str) -> Self {
        PulumiCliConfig {
            org: org.to_string(),
            project: project.to_string(),
            access_token: None,
            pulumi_home: None,
            binary: "pulumi".to_string(),
            timeout_secs: 300,
        }
    }

    /// Set access token
    pub fn with_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    /// Set `PULUMI_HOME`
    pub fn with_pulumi_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.pulumi_home = Some(home.into());
        self
    }

    /// Use a different binary (tests, pinned installs)
    pub fn with_binary(mut self, binary: &str) -> Self {
        self.binary = binary.to_string();
        self
    }

    /// Set per-command timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Captured result of one CLI invocation
#[derive(Debug)]
struct CommandOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

/// Stack backend that shells out to the Pulumi CLI
pub struct PulumiCliBackend {
    config: PulumiCliConfig,
    workspace: tempfile::TempDir,
}

impl PulumiCliBackend {
    /// Create the backend and materialize its scratch workspace.
    pub fn new(config: PulumiCliConfig) -> StackResult<Self> {
        let workspace = tempfile::Builder::new()
            .prefix("account-vending-")
            .tempdir()?;
        std::fs::write(
            workspace.path().join("Pulumi.yaml"),
            render_project_file(&config.project, WorkspaceProgram::Empty),
        )?;
        debug!(workspace = ?workspace.path(), "Created Pulumi workspace");

        Ok(PulumiCliBackend { config, workspace })
    }

    /// Directory the CLI runs in
    pub fn workspace_dir(&self) -> &Path {
        self.workspace.path()
    }

    pub fn config(&self) -> &PulumiCliConfig {
        &self.config
    }

    async fn run(&self, args: &[&str]) -> StackResult<CommandOutput> {
        let command_line = format!("{} {}", self.config.binary, args.join(" "));
        debug!(command = %command_line, "Running backend command");

        let mut command = Command::new(&self.config.binary);
        command
            .args(args)
            .current_dir(self.workspace.path())
            .env("PULUMI_SKIP_UPDATE_CHECK", "true")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(token) = &self.config.access_token {
            command.env("PULUMI_ACCESS_TOKEN", token);
        }
        if let Some(home) = &self.config.pulumi_home {
            command.env("PULUMI_HOME", home);
        }

        let child = command.spawn()?;
        let output = if self.config.timeout_secs > 0 {
            tokio::time::timeout(
                Duration::from_secs(self.config.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| StackError::Timeout {
                command: command_line.clone(),
                secs: self.config.timeout_secs,
            })??
        } else {
            child.wait_with_output().await?
        };

        let result = CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        if !result.success {
            warn!(command = %command_line, stderr = %result.stderr.trim(), "Backend command failed");
        }
        Ok(result)
    }
}

#[async_trait]
impl StackBackend for PulumiCliBackend {
    async fn create(&self, name: &QualifiedName) -> StackResult<StackRecord> {
        let stack = name.to_string();
        let output = self
            .run(&["stack", "init", &stack, "--non-interactive"])
            .await?;
        if !output.success {
            return Err(if output.stderr.contains("already exists") {
                StackError::AlreadyExists { stack }
            } else {
                StackError::Backend(output.stderr.trim().to_string())
            });
        }
        info!(stack = %stack, "Created stack");
        Ok(StackRecord::new(name.clone()))
    }

    async fn select(&self, name: &QualifiedName) -> StackResult<StackRecord> {
        let stack = name.to_string();
        let output = self
            .run(&["stack", "select", &stack, "--non-interactive"])
            .await?;
        if !output.success {
            let stderr = output.stderr.to_lowercase();
            return Err(
                if stderr.contains("no stack named") || stderr.contains("not found") {
                    StackError::NotFound { stack }
                } else {
                    StackError::Backend(output.stderr.trim().to_string())
                },
            );
        }

        let output = self
            .run(&["config", "--json", "--stack", &stack])
            .await?;
        if !output.success {
            return Err(StackError::Backend(output.stderr.trim().to_string()));
        }

        Ok(StackRecord {
            qualified_name: name.clone(),
            configuration: parse_config_json(&self.config.project, &output.stdout)?,
        })
    }

    async fn list(&self) -> StackResult<Vec<StackRecord>> {
        let output = self
            .run(&[
                "stack",
                "ls",
                "--json",
                "--organization",
                &self.config.org,
                "--project",
                &self.config.project,
            ])
            .await?;
        if !output.success {
            return Err(StackError::Backend(output.stderr.trim().to_string()));
        }
        parse_stack_list(&self.config.org, &self.config.project, &output.stdout)
    }

    async fn set_config(
        &self,
        record: &mut StackRecord,
        key: &str,
        value: &str,
    ) -> StackResult<()> {
        let stack = record.qualified_name.to_string();
        let output = self
            .run(&["config", "set", "--stack", &stack, "--", key, value])
            .await?;
        if !output.success {
            return Err(StackError::Backend(output.stderr.trim().to_string()));
        }
        record
            .configuration
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn refresh(&self, record: &StackRecord) -> StackResult<()> {
        let stack = record.qualified_name.to_string();
        let output = self
            .run(&["refresh", "--yes", "--non-interactive", "--stack", &stack])
            .await?;
        if !output.success {
            return Err(StackError::Backend(output.stderr.trim().to_string()));
        }
        Ok(())
    }
}

/// Render the workspace's `Pulumi.yaml`.
fn render_project_file(project: &str, program: WorkspaceProgram) -> String {
    match program {
        WorkspaceProgram::Empty => format!(
            "name: {}\nruntime: yaml\ndescription: Account stacks deployed remotely\nresources: {{}}\n",
            project
        ),
    }
}

#[derive(Deserialize)]
struct ConfigEntry {
    value: Option<serde_json::Value>,
}

/// Parse `pulumi config --json` output, dropping the `<project>:` namespace.
///
/// Secret values come back without a `value` and are skipped.
fn parse_config_json(project: &str, stdout: &str) -> StackResult<BTreeMap<String, String>> {
    if stdout.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let entries: BTreeMap<String, ConfigEntry> = serde_json::from_str(stdout)?;
    let prefix = format!("{}:", project);

    Ok(entries
        .into_iter()
        .filter_map(|(key, entry)| {
            let value = match entry.value? {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            let key = key.strip_prefix(&prefix).map(str::to_string).unwrap_or(key);
            Some((key, value))
        })
        .collect())
}

#[derive(Deserialize)]
struct StackSummary {
    name: String,
}

/// Parse `pulumi stack ls --json` output.
///
/// The CLI reports names as `name`, `org/name` or `org/project/name`
/// depending on backend and version; only the last segment is kept.
fn parse_stack_list(org: &str, project: &str, stdout: &str) -> StackResult<Vec<StackRecord>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    let summaries: Vec<StackSummary> = serde_json::from_str(stdout)?;
    summaries
        .into_iter()
        .map(|summary| {
            let short = summary.name.rsplit('/').next().unwrap_or(&summary.name);
            QualifiedName::new(org, project, short).map(StackRecord::new)
        })
        .collect()
}
