//! Structured observability hooks for provisioning workflows.
//!
//! Every request gets a span tagged with its request id, workflow kind and
//! account name. The emit functions produce one event per lifecycle point
//! so that a log pipeline can reconstruct a report from the event stream.

use tracing::{info, warn};

/// RAII guard that keeps a request-scoped span entered.
///
/// Only use this in synchronous sections. Async code should attach the span
/// with [`ProvisionSpan::span`] and `tracing::Instrument`.
pub struct ProvisionSpan {
    _span: tracing::span::EnteredSpan,
}

impl ProvisionSpan {
    /// Create and enter a span for one request.
    pub fn enter(request_id: &str, workflow: &str, account: &str) -> Self {
        Self {
            _span: Self::span(request_id, workflow, account).entered(),
        }
    }

    /// The span without entering it.
    pub fn span(request_id: &str, workflow: &str, account: &str) -> tracing::Span {
        tracing::info_span!(
            "vend.request",
            request_id = %request_id,
            workflow = %workflow,
            account = %account
        )
    }
}

/// Emit event: a workflow accepted a request.
pub fn emit_workflow_started(request_id: &str, workflow: &str, stack: &str) {
    info!(event = "workflow.started", request_id = %request_id, workflow = %workflow, stack = %stack);
}

/// Emit event: a step finished. Failures log at warn.
pub fn emit_step(request_id: &str, step: &str, success: bool, detail: &str) {
    if success {
        info!(event = "workflow.step", request_id = %request_id, step = %step, success = true);
    } else {
        warn!(
            event = "workflow.step",
            request_id = %request_id,
            step = %step,
            success = false,
            detail = %detail
        );
    }
}

/// Emit event: the workflow moved to a new state.
pub fn emit_state(request_id: &str, from: &str, to: &str) {
    info!(event = "workflow.state", request_id = %request_id, from = %from, to = %to);
}

/// Emit event: the report was sealed.
pub fn emit_workflow_finished(
    request_id: &str,
    duration_ms: u64,
    total_steps: usize,
    failed_steps: usize,
    success: bool,
) {
    info!(
        event = "workflow.finished",
        request_id = %request_id,
        duration_ms = duration_ms,
        total_steps = total_steps,
        failed_steps = failed_steps,
        success = success,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provision_span_enter() {
        let _span = ProvisionSpan::enter("req-1", "create", "acme");
    }
}
