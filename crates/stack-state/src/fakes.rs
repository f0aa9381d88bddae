//! In-memory fakes for the stack backend (testing only)
//!
//! `MemoryStackBackend` satisfies the `StackBackend` contract without any
//! external dependencies and can be told to fail individual operations so
//! callers can exercise their failure policy.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::backend::*;
use crate::error::StackError;

/// Operations of the `StackBackend` contract, used to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    Create,
    Select,
    List,
    SetConfig,
    Refresh,
}

/// In-memory stack backend backed by a `HashMap<qualified name, record>`.
#[derive(Debug, Default)]
pub struct MemoryStackBackend {
    stacks: Mutex<HashMap<String, StackRecord>>,
    failing: Mutex<HashSet<BackendOp>>,
    calls: Mutex<Vec<BackendOp>>,
}

impl MemoryStackBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of `op` fail with `StackError::Backend`.
    pub fn fail_on(&self, op: BackendOp) {
        self.failing.lock().unwrap().insert(op);
    }

    /// Operations invoked so far, in call order.
    pub fn calls(&self) -> Vec<BackendOp> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of times `op` was invoked.
    pub fn call_count(&self, op: BackendOp) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == op).count()
    }

    fn enter(&self, op: BackendOp) -> StackResult<()> {
        self.calls.lock().unwrap().push(op);
        if self.failing.lock().unwrap().contains(&op) {
            return Err(StackError::Backend(format!("injected {:?} failure", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl StackBackend for MemoryStackBackend {
    async fn create(&self, name: &QualifiedName) -> StackResult<StackRecord> {
        self.enter(BackendOp::Create)?;
        let mut stacks = self.stacks.lock().unwrap();
        let key = name.to_string();
        if stacks.contains_key(&key) {
            return Err(StackError::AlreadyExists { stack: key });
        }
        let record = StackRecord::new(name.clone());
        stacks.insert(key, record.clone());
        Ok(record)
    }

    async fn select(&self, name: &QualifiedName) -> StackResult<StackRecord> {
        self.enter(BackendOp::Select)?;
        let stacks = self.stacks.lock().unwrap();
        stacks
            .get(&name.to_string())
            .cloned()
            .ok_or_else(|| StackError::NotFound {
                stack: name.to_string(),
            })
    }

    async fn list(&self) -> StackResult<Vec<StackRecord>> {
        self.enter(BackendOp::List)?;
        let stacks = self.stacks.lock().unwrap();
        Ok(stacks.values().cloned().collect())
    }

    async fn set_config(
        &self,
        record: &mut StackRecord,
        key: &str,
        value: &str,
    ) -> StackResult<()> {
        self.enter(BackendOp::SetConfig)?;
        let mut stacks = self.stacks.lock().unwrap();
        let stored = stacks
            .get_mut(&record.qualified_name.to_string())
            .ok_or_else(|| StackError::NotFound {
                stack: record.qualified_name.to_string(),
            })?;
        stored
            .configuration
            .insert(key.to_string(), value.to_string());
        record
            .configuration
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn refresh(&self, record: &StackRecord) -> StackResult<()> {
        self.enter(BackendOp::Refresh)?;
        let stacks = self.stacks.lock().unwrap();
        if !stacks.contains_key(&record.qualified_name.to_string()) {
            return Err(StackError::NotFound {
                stack: record.qualified_name.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qn(name: &str) -> QualifiedName {
        QualifiedName::new("org", "proj", name).unwrap()
    }

    #[tokio::test]
    async fn injected_failure_is_backend_error_and_recorded() {
        let backend = MemoryStackBackend::new();
        backend.fail_on(BackendOp::Refresh);

        let record = backend.create(&qn("acme")).await.unwrap();
        let err = backend.refresh(&record).await.unwrap_err();

        assert!(matches!(err, StackError::Backend(_)));
        assert_eq!(backend.calls(), vec![BackendOp::Create, BackendOp::Refresh]);
    }

    #[tokio::test]
    async fn failed_create_does_not_store_record() {
        let backend = MemoryStackBackend::new();
        backend.fail_on(BackendOp::Create);

        assert!(backend.create(&qn("acme")).await.is_err());
        assert!(backend.list().await.unwrap().is_empty());
    }
}
