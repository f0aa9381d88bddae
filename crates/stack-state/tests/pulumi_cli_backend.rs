//! PulumiCliBackend against a scripted stand-in for the `pulumi` binary.
//!
//! Kept as a single test so the script is written and executed from one
//! thread only.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;

use stack_state::{PulumiCliBackend, PulumiCliConfig, QualifiedName, StackBackend, StackError};

const FAKE_PULUMI: &str = r#"#!/bin/sh
case "$1 $2" in
  "stack init")
    if [ "$3" = "org/proj/taken" ]; then
      echo "error: stack 'org/proj/taken' already exists" >&2
      exit 255
    fi
    exit 0 ;;
  "stack select")
    if [ "$3" = "org/proj/ghost" ]; then
      echo "error: no stack named 'org/proj/ghost' found" >&2
      exit 255
    fi
    exit 0 ;;
  "stack ls")
    if [ -z "$PULUMI_ACCESS_TOKEN" ]; then
      echo "error: not logged in" >&2
      exit 3
    fi
    echo '[{"name":"org/acme"},{"name":"globex"}]'
    exit 0 ;;
  "config --json")
    echo '{"proj:name":{"value":"acme","secret":false},"proj:email":{"value":"alice@example.com","secret":false}}'
    exit 0 ;;
  "config set")
    exit 0 ;;
  "refresh --yes")
    echo "error: refresh exploded" >&2
    exit 1 ;;
esac
echo "unexpected invocation: $*" >&2
exit 2
"#;

#[tokio::test]
async fn cli_backend_maps_outcomes_from_the_binary() {
    let bin_dir = tempfile::tempdir().unwrap();
    let script = bin_dir.path().join("fake-pulumi");
    std::fs::write(&script, FAKE_PULUMI).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let config = PulumiCliConfig::new("org", "proj")
        .with_binary(script.to_str().unwrap())
        .with_token("pul-test")
        .with_timeout_secs(30);
    let backend = PulumiCliBackend::new(config).unwrap();
    let qn = |name: &str| QualifiedName::new("org", "proj", name).unwrap();

    // create: success and duplicate
    let mut record = backend.create(&qn("acme")).await.unwrap();
    assert!(record.configuration.is_empty());
    let err = backend.create(&qn("taken")).await.unwrap_err();
    assert!(matches!(err, StackError::AlreadyExists { .. }));

    // select: configuration loaded, unknown stack
    let selected = backend.select(&qn("acme")).await.unwrap();
    assert_eq!(selected.config("name"), Some("acme"));
    assert_eq!(selected.config("email"), Some("alice@example.com"));
    let err = backend.select(&qn("ghost")).await.unwrap_err();
    assert!(matches!(err, StackError::NotFound { .. }));

    // list: token forwarded, names qualified
    let listed = backend.list().await.unwrap();
    let names: Vec<String> = listed.iter().map(|r| r.qualified_name.to_string()).collect();
    assert_eq!(names, vec!["org/proj/acme", "org/proj/globex"]);

    // set_config updates the local view
    backend
        .set_config(&mut record, "email", "b@y.com")
        .await
        .unwrap();
    assert_eq!(record.config("email"), Some("b@y.com"));

    // refresh failure is a plain backend error
    let err = backend.refresh(&record).await.unwrap_err();
    match err {
        StackError::Backend(msg) => assert!(msg.contains("refresh exploded")),
        other => panic!("expected backend error, got {other:?}"),
    }
}
