//! Stack backend contract
//!
//! A stack is the durable, named record that represents one managed account.
//! The backend owns its lifecycle; callers reference it by qualified name.
//!
//! Guarantees every implementation must uphold:
//! - `create` fails with `StackError::AlreadyExists` for a taken name and
//!   leaves the existing record untouched.
//! - `select` fails with `StackError::NotFound` for an unknown name.
//! - `set_config` overwrites a key in place; no history is kept.
//! - `list` may return records in any order; an empty list is not an error.
//!
//! In-memory fakes are provided for testing via the `fakes` module.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StackError;

/// Result type for stack backend operations
pub type StackResult<T> = std::result::Result<T, StackError>;

// ---------------------------------------------------------------------------
// QualifiedName
// ---------------------------------------------------------------------------

/// Fully qualified stack name: `org/project/name`.
///
/// Each segment is non-empty and free of `/` and whitespace, so the rendered
/// form can be split back into the same three parts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedName {
    org: String,
    project: String,
    name: String,
}

impl QualifiedName {
    /// Build a qualified name from its three segments.
    pub fn new(
        org: impl Into<String>,
        project: impl Into<String>,
        name: impl Into<String>,
    ) -> StackResult<Self> {
        let qn = QualifiedName {
            org: org.into(),
            project: project.into(),
            name: name.into(),
        };
        for (label, segment) in [
            ("organization", &qn.org),
            ("project", &qn.project),
            ("name", &qn.name),
        ] {
            if segment.is_empty() {
                return Err(qn.invalid(format!("{} segment is empty", label)));
            }
            if segment.contains('/') || segment.chars().any(char::is_whitespace) {
                return Err(qn.invalid(format!(
                    "{} segment must not contain '/' or whitespace",
                    label
                )));
            }
        }
        Ok(qn)
    }

    /// Parse `org/project/name`.
    pub fn parse(s: &str) -> StackResult<Self> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [org, project, name] => Self::new(*org, *project, *name),
            _ => Err(StackError::InvalidName {
                name: s.to_string(),
                reason: "expected org/project/name".to_string(),
            }),
        }
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Short stack name (the account name).
    pub fn name(&self) -> &str {
        &self.name
    }

    fn invalid(&self, reason: String) -> StackError {
        StackError::InvalidName {
            name: format!("{}/{}/{}", self.org, self.project, self.name),
            reason,
        }
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.org, self.project, self.name)
    }
}

impl TryFrom<String> for QualifiedName {
    type Error = StackError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<QualifiedName> for String {
    fn from(qn: QualifiedName) -> Self {
        qn.to_string()
    }
}

// ---------------------------------------------------------------------------
// StackRecord
// ---------------------------------------------------------------------------

/// Local view of a backend stack and its configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackRecord {
    pub qualified_name: QualifiedName,
    /// Per-stack configuration, keyed without the project namespace.
    pub configuration: BTreeMap<String, String>,
}

impl StackRecord {
    /// A record with no configuration yet.
    pub fn new(qualified_name: QualifiedName) -> Self {
        StackRecord {
            qualified_name,
            configuration: BTreeMap::new(),
        }
    }

    /// Look up a configuration value.
    pub fn config(&self, key: &str) -> Option<&str> {
        self.configuration.get(key).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// WorkspaceProgram
// ---------------------------------------------------------------------------

/// Program attached to the stacks a backend operates on.
///
/// Account stacks are deployed remotely from source control, so the local
/// side never runs infrastructure code. `Empty` is the only variant and
/// describes a program that declares no resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkspaceProgram {
    #[default]
    Empty,
}

// ---------------------------------------------------------------------------
// StackBackend
// ---------------------------------------------------------------------------

/// Stack backend client.
#[async_trait]
pub trait StackBackend: Send + Sync {
    /// Create a new, unconfigured stack. Fails with `AlreadyExists` if taken.
    async fn create(&self, name: &QualifiedName) -> StackResult<StackRecord>;

    /// Select an existing stack, loading its configuration. Fails with `NotFound`.
    async fn select(&self, name: &QualifiedName) -> StackResult<StackRecord>;

    /// List the stacks of the backend's project.
    async fn list(&self) -> StackResult<Vec<StackRecord>>;

    /// Write one configuration value, overwriting any previous value.
    ///
    /// On success the record's local configuration is updated as well.
    async fn set_config(&self, record: &mut StackRecord, key: &str, value: &str)
        -> StackResult<()>;

    /// Reconcile the backend's view of the stack with its declared state.
    async fn refresh(&self, record: &StackRecord) -> StackResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name_display_round_trip() {
        let qn = QualifiedName::new("org", "proj", "acme").unwrap();
        assert_eq!(qn.to_string(), "org/proj/acme");
        assert_eq!(QualifiedName::parse("org/proj/acme").unwrap(), qn);
        assert_eq!(qn.name(), "acme");
    }

    #[test]
    fn test_qualified_name_rejects_bad_segments() {
        assert!(QualifiedName::new("org", "proj", "").is_err());
        assert!(QualifiedName::new("org", "proj", "a/b").is_err());
        assert!(QualifiedName::new("org", "proj", "has space").is_err());
        assert!(QualifiedName::parse("org/acme").is_err());
        assert!(QualifiedName::parse("a/b/c/d").is_err());
    }

    #[test]
    fn test_qualified_name_serde_as_string() {
        let qn = QualifiedName::new("org", "proj", "acme").unwrap();
        let json = serde_json::to_string(&qn).unwrap();
        assert_eq!(json, "\"org/proj/acme\"");
        let back: QualifiedName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, qn);
    }

    #[test]
    fn test_new_record_has_empty_configuration() {
        let record = StackRecord::new(QualifiedName::parse("org/proj/acme").unwrap());
        assert!(record.configuration.is_empty());
        assert_eq!(record.config("email"), None);
    }
}
