//! In-memory fake for the Deployments API (testing only)
//!
//! `RecordingDeploymentApi` records every call and answers with either a
//! canned acknowledgement or a configured error.

use std::sync::Mutex;

use async_trait::async_trait;
use stack_state::QualifiedName;

use crate::client::DeploymentApi;
use crate::error::{ApiError, ApiResult};
use crate::payload::{DeploymentOperation, DeploymentSettingsPayload, DispatchAck};

/// A call observed by the fake.
#[derive(Debug, Clone, PartialEq)]
pub enum DeploymentCall {
    RegisterSettings {
        stack: QualifiedName,
        payload: DeploymentSettingsPayload,
    },
    Dispatch {
        stack: QualifiedName,
        operation: DeploymentOperation,
    },
}

/// Recording fake for [`DeploymentApi`].
#[derive(Debug, Default)]
pub struct RecordingDeploymentApi {
    calls: Mutex<Vec<DeploymentCall>>,
    settings_error: Mutex<Option<ApiError>>,
    dispatch_error: Mutex<Option<ApiError>>,
}

impl RecordingDeploymentApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every `register_settings` call with `err`.
    pub fn fail_settings_with(&self, err: ApiError) {
        *self.settings_error.lock().unwrap() = Some(err);
    }

    /// Answer every `dispatch` call with `err`.
    pub fn fail_dispatch_with(&self, err: ApiError) {
        *self.dispatch_error.lock().unwrap() = Some(err);
    }

    pub fn calls(&self) -> Vec<DeploymentCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Operations dispatched so far, in order.
    pub fn dispatched(&self) -> Vec<(QualifiedName, DeploymentOperation)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DeploymentCall::Dispatch { stack, operation } => Some((stack, operation)),
                _ => None,
            })
            .collect()
    }

    /// Settings payloads registered so far, in order.
    pub fn registered_settings(&self) -> Vec<(QualifiedName, DeploymentSettingsPayload)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DeploymentCall::RegisterSettings { stack, payload } => Some((stack, payload)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl DeploymentApi for RecordingDeploymentApi {
    async fn register_settings(
        &self,
        stack: &QualifiedName,
        payload: &DeploymentSettingsPayload,
    ) -> ApiResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(DeploymentCall::RegisterSettings {
                stack: stack.clone(),
                payload: payload.clone(),
            });
        match self.settings_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn dispatch(
        &self,
        stack: &QualifiedName,
        operation: DeploymentOperation,
    ) -> ApiResult<DispatchAck> {
        let seq = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(DeploymentCall::Dispatch {
                stack: stack.clone(),
                operation,
            });
            calls.len()
        };
        if let Some(err) = self.dispatch_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(DispatchAck::from_body(serde_json::json!({
            "id": format!("fake-deployment-{}", seq),
            "version": seq,
        })))
    }
}
