//! HTTP contract tests for DeploymentApiClient against a mock server.

use std::collections::BTreeMap;

use deploy_client::{
    ApiError, AwsOidc, DeploymentApi, DeploymentApiClient, DeploymentApiConfig,
    DeploymentOperation, DeploymentSettingsPayload, GitHubSettings, GitSource, OidcSettings,
    OperationContext, SourceContext,
};
use mockito::Matcher;
use serde_json::json;
use stack_state::QualifiedName;

fn stack() -> QualifiedName {
    QualifiedName::new("org", "proj", "acme").unwrap()
}

fn client(server: &mockito::ServerGuard) -> DeploymentApiClient {
    DeploymentApiClient::new(DeploymentApiConfig::new(&server.url(), "pul-abc").with_timeout_secs(5))
        .unwrap()
}

fn payload() -> DeploymentSettingsPayload {
    DeploymentSettingsPayload {
        source_context: SourceContext {
            git: GitSource {
                branch: "refs/heads/main".to_string(),
            },
        },
        git_hub: GitHubSettings {
            repository: "lbrlabs/aws-accounts".to_string(),
            deploy_commits: true,
            preview_pull_requests: true,
        },
        operation_context: OperationContext {
            pre_run_commands: vec!["pulumi config set name acme -s org/acme".to_string()],
            oidc: OidcSettings {
                aws: AwsOidc {
                    role_arn: "arn:aws:iam::123456789012:role/deploy".to_string(),
                    session_name: "deployment".to_string(),
                },
            },
            environment_variables: BTreeMap::from([(
                "AWS_REGION".to_string(),
                "us-west-2".to_string(),
            )]),
        },
    }
}

#[tokio::test]
async fn register_settings_posts_payload_with_token_header() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/stacks/org/proj/acme/deployments/settings")
        .match_header("authorization", "token pul-abc")
        .match_body(Matcher::Json(json!({
            "sourceContext": {"git": {"branch": "refs/heads/main"}},
            "gitHub": {
                "repository": "lbrlabs/aws-accounts",
                "deployCommits": true,
                "previewPullRequests": true
            },
            "operationContext": {
                "preRunCommands": ["pulumi config set name acme -s org/acme"],
                "oidc": {"aws": {
                    "roleArn": "arn:aws:iam::123456789012:role/deploy",
                    "sessionName": "deployment"
                }},
                "environmentVariables": {"AWS_REGION": "us-west-2"}
            }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    client(&server)
        .register_settings(&stack(), &payload())
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn register_settings_surfaces_status_and_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/stacks/org/proj/acme/deployments/settings")
        .with_status(400)
        .with_body(r#"{"code":400,"message":"invalid repository"}"#)
        .create_async()
        .await;

    let err = client(&server)
        .register_settings(&stack(), &payload())
        .await
        .unwrap_err();

    match err {
        ApiError::Status { status_code, body } => {
            assert_eq!(status_code, 400);
            assert!(body.contains("invalid repository"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn dispatch_update_returns_ack() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/stacks/org/proj/acme/deployments")
        .match_header("authorization", "token pul-abc")
        .match_body(Matcher::Json(json!({"operation": "update"})))
        .with_status(202)
        .with_body(r#"{"id":"dep-1","version":7,"consoleUrl":"https://app.pulumi.com/x"}"#)
        .expect(1)
        .create_async()
        .await;

    let ack = client(&server)
        .dispatch(&stack(), DeploymentOperation::Update)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(ack.id.as_deref(), Some("dep-1"));
    assert_eq!(ack.version, Some(7));
}

#[tokio::test]
async fn dispatch_delete_sends_delete_operation() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/stacks/org/proj/acme/deployments")
        .match_body(Matcher::Json(json!({"operation": "delete"})))
        .with_status(200)
        .with_body("")
        .expect(1)
        .create_async()
        .await;

    let ack = client(&server)
        .dispatch(&stack(), DeploymentOperation::Delete)
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(ack.id.is_none());
    assert!(ack.body.is_null());
}

#[tokio::test]
async fn dispatch_server_error_is_structured() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/stacks/org/proj/acme/deployments")
        .with_status(503)
        .with_body("unavailable")
        .create_async()
        .await;

    let err = client(&server)
        .dispatch(&stack(), DeploymentOperation::Update)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(503));
}

#[tokio::test]
async fn success_with_plain_text_body_is_accepted() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/stacks/org/proj/acme/deployments")
        .with_status(202)
        .with_body("accepted")
        .create_async()
        .await;

    let ack = client(&server)
        .dispatch(&stack(), DeploymentOperation::Update)
        .await
        .unwrap();

    assert_eq!(ack.id, None);
    assert_eq!(ack.body, serde_json::Value::String("accepted".to_string()));
}

#[tokio::test]
async fn success_with_truncated_json_is_decode_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/stacks/org/proj/acme/deployments")
        .with_status(200)
        .with_body("{\"id\": \"dep-")
        .create_async()
        .await;

    let err = client(&server)
        .dispatch(&stack(), DeploymentOperation::Update)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let client = DeploymentApiClient::new(
        DeploymentApiConfig::new("http://127.0.0.1:9", "pul-abc").with_timeout_secs(5),
    )
    .unwrap();

    let err = client
        .dispatch(&stack(), DeploymentOperation::Update)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)));
}
