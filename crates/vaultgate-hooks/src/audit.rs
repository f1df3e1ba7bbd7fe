//! Structured audit log of gateway activity.

use std::sync::Arc;

use crate::events::HookEvent;
use crate::registry::{HookHandler, HookRegistry};

/// Handler that writes every event to the `vaultgate::audit` tracing target.
pub fn audit_handler() -> HookHandler {
    Arc::new(|event| {
        Box::pin(async move {
            log_event(&event);
        })
    })
}

/// Subscribe the audit log to all events.
pub async fn register_audit_log(registry: &HookRegistry) {
    registry.on_all(audit_handler()).await;
}

fn log_event(event: &HookEvent) {
    match event {
        HookEvent::GatewayStartup { addr } => {
            tracing::info!(target: "vaultgate::audit", %addr, "gateway started");
        }
        HookEvent::SessionStart { namespace } => {
            // Digest prefix only
            let short = &namespace[..namespace.len().min(12)];
            tracing::info!(target: "vaultgate::audit", namespace = short, "session started");
        }
        HookEvent::ToolCallBefore {
            tool_call_id,
            tool_name,
            state,
        } => {
            tracing::info!(target: "vaultgate::audit", %tool_call_id, %tool_name, state = ?state, "tool call started");
        }
        HookEvent::ToolCallAfter {
            tool_call_id,
            tool_name,
            state,
            is_error,
        } => {
            tracing::info!(
                target: "vaultgate::audit",
                %tool_call_id,
                %tool_name,
                state = ?state,
                is_error,
                "tool call finished"
            );
        }
        HookEvent::ApprovalRequested {
            approval_id,
            tool_call_id,
            tool_name,
        } => {
            tracing::info!(
                target: "vaultgate::audit",
                %approval_id,
                %tool_call_id,
                %tool_name,
                "approval requested"
            );
        }
        HookEvent::ApprovalResolved {
            approval_id,
            tool_name,
            approved,
            reason,
        } => {
            tracing::info!(
                target: "vaultgate::audit",
                %approval_id,
                %tool_name,
                approved,
                reason = reason.as_deref().unwrap_or(""),
                "approval resolved"
            );
        }
    }
}
