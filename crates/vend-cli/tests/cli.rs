//! Runs the `vend` binary for the commands that need no network.

use std::process::{Command, Output};

const VARS: [(&str, &str); 8] = [
    ("PULUMI_ORG", "org"),
    ("PULUMI_PROJECT_NAME", "proj"),
    ("GITHUB_ORG", "lbrlabs"),
    ("GITHUB_REPO", "aws-accounts"),
    ("ACCOUNT_OU", "Testing"),
    ("ACCOUNT_OU_ON_DELETE", "ou-p8qa-7ts76j9l"),
    ("OIDC_ROLE_ARN", "arn:aws:iam::123456789012:role/pulumi-deploy"),
    ("PULUMI_ACCESS_TOKEN", "pul-cli-secret"),
];

fn vend(args: &[&str], vars: &[(&str, &str)]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vend"))
        .args(args)
        .env_clear()
        .envs(vars.iter().copied())
        .output()
        .expect("failed to run vend")
}

#[test]
fn settings_prints_payload_json() {
    let output = vend(
        &[
            "settings",
            "--name",
            "acme",
            "--email",
            "alice@example.com",
            "--first-name",
            "Alice",
            "--last-name",
            "Smith",
        ],
        &VARS,
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["sourceContext"]["git"]["branch"], "refs/heads/main");
    assert_eq!(payload["gitHub"]["repository"], "lbrlabs/aws-accounts");
    assert_eq!(
        payload["operationContext"]["preRunCommands"][0],
        "pulumi config set name acme -s org/acme"
    );
    assert_eq!(
        payload["operationContext"]["environmentVariables"]["AWS_REGION"],
        "us-west-2"
    );
}

#[test]
fn branch_flag_overrides_environment() {
    let output = vend(
        &[
            "--branch",
            "release",
            "settings",
            "--name",
            "acme",
            "--email",
            "a@x.com",
            "--first-name",
            "A",
            "--last-name",
            "B",
        ],
        &VARS,
    );
    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["sourceContext"]["git"]["branch"], "refs/heads/release");
}

#[test]
fn env_info_redacts_token() {
    let output = vend(&["env-info"], &VARS);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("org"));
    assert!(stdout.contains("<redacted>"));
    assert!(!stdout.contains("pul-cli-secret"));
}

#[test]
fn missing_configuration_exits_non_zero() {
    let vars: Vec<(&str, &str)> = VARS
        .iter()
        .copied()
        .filter(|(key, _)| *key != "OIDC_ROLE_ARN")
        .collect();
    let output = vend(&["env-info"], &vars);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("OIDC_ROLE_ARN"));
}

#[test]
fn settings_rejects_blank_email() {
    let output = vend(
        &[
            "settings",
            "--name",
            "acme",
            "--email",
            " ",
            "--first-name",
            "A",
            "--last-name",
            "B",
        ],
        &VARS,
    );
    assert!(!output.status.success());
}
