//! Hook event types.

use serde::{Deserialize, Serialize};

use vaultgate_types::ToolCallState;

/// Events that hooks can subscribe to.
///
/// Events carry identifiers and outcomes only, never tool arguments or
/// upstream payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HookEvent {
    /// Gateway is listening.
    GatewayStartup { addr: String },
    /// First request for a credential namespace since startup.
    SessionStart { namespace: String },
    /// A tool call passed validation and policy.
    ToolCallBefore {
        tool_call_id: String,
        tool_name: String,
        state: ToolCallState,
    },
    /// A tool call reached a terminal state.
    ToolCallAfter {
        tool_call_id: String,
        tool_name: String,
        state: ToolCallState,
        is_error: bool,
    },
    /// An approval-gated tool is waiting for a decision.
    ApprovalRequested {
        approval_id: String,
        tool_call_id: String,
        tool_name: String,
    },
    /// A pending approval was decided (or timed out).
    ApprovalResolved {
        approval_id: String,
        tool_name: String,
        approved: bool,
        reason: Option<String>,
    },
}

/// Groups of events a handler can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Gateway startup and session creation.
    Lifecycle,
    /// Tool calls entering and leaving the router.
    ToolCall,
    /// Approval requests and their decisions.
    Approval,
}

impl HookEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            HookEvent::GatewayStartup { .. } | HookEvent::SessionStart { .. } => EventKind::Lifecycle,
            HookEvent::ToolCallBefore { .. } | HookEvent::ToolCallAfter { .. } => EventKind::ToolCall,
            HookEvent::ApprovalRequested { .. } | HookEvent::ApprovalResolved { .. } => {
                EventKind::Approval
            }
        }
    }
}
