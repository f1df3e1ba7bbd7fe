//! Human approval for destructive tools.
//!
//! A gated call opens a pending request and waits on a oneshot channel.
//! `respond` (from any later request in the same session) removes the
//! entry and delivers the decision. Unanswered requests are denied when the
//! timeout elapses. Dropping the [`PendingApproval`] handle, for example when
//! the waiting request is cancelled, takes the entry out of the table.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use vaultgate_types::{ApprovalDecision, ToolCallState};

pub const DEFAULT_DENY_REASON: &str = "User denied tool execution";
pub const TIMEOUT_REASON: &str = "Approval request timed out";

/// A request for a human decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApprovalRequest {
    pub id: String,
    pub tool_call_id: String,
    pub tool_name: String,
    pub requested_at: String,
    /// `approval-requested` while pending, `approval-responded` once decided.
    pub state: ToolCallState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("No pending approval with id {0}")]
    NotFound(String),
}

struct PendingEntry {
    request: ApprovalRequest,
    reply: oneshot::Sender<ApprovalDecision>,
}

type PendingTable = Mutex<HashMap<String, PendingEntry>>;

// Never held across an await, and usable from `Drop`.
fn lock(table: &PendingTable) -> MutexGuard<'_, HashMap<String, PendingEntry>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle for a request that is waiting on a decision.
///
/// The pending entry lives exactly as long as this handle.
pub struct PendingApproval {
    pub request: ApprovalRequest,
    rx: oneshot::Receiver<ApprovalDecision>,
    table: Weak<PendingTable>,
}

impl Drop for PendingApproval {
    fn drop(&mut self) {
        let Some(table) = self.table.upgrade() else {
            return;
        };
        if lock(&table).remove(&self.request.id).is_some() {
            tracing::debug!(
                approval_id = %self.request.id,
                tool_name = %self.request.tool_name,
                "Approval abandoned"
            );
        }
    }
}

/// Pending approvals for one session.
pub struct ApprovalGate {
    pending: Arc<PendingTable>,
    timeout: Duration,
}

impl ApprovalGate {
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Register a pending request for a tool call.
    pub async fn open(&self, tool_call_id: &str, tool_name: &str) -> PendingApproval {
        let request = ApprovalRequest {
            id: uuid::Uuid::new_v4().to_string(),
            tool_call_id: tool_call_id.to_string(),
            tool_name: tool_name.to_string(),
            requested_at: chrono::Utc::now().to_rfc3339(),
            state: ToolCallState::ApprovalRequested,
            approved: None,
            reason: None,
        };
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(
            request.id.clone(),
            PendingEntry {
                request: request.clone(),
                reply: tx,
            },
        );
        tracing::debug!(approval_id = %request.id, tool_name, "Approval pending");
        PendingApproval {
            request,
            rx,
            table: Arc::downgrade(&self.pending),
        }
    }

    /// Block until a decision arrives or the timeout elapses.
    ///
    /// The returned decision always carries a reason when denied.
    pub async fn wait(&self, mut pending: PendingApproval) -> ApprovalDecision {
        let decision = match tokio::time::timeout(self.timeout, &mut pending.rx).await {
            Ok(Ok(decision)) => decision,
            // Sender dropped without a decision
            Ok(Err(_)) => ApprovalDecision::deny(DEFAULT_DENY_REASON),
            Err(_) => {
                tracing::warn!(
                    approval_id = %pending.request.id,
                    tool_name = %pending.request.tool_name,
                    "Approval timed out"
                );
                ApprovalDecision::deny(TIMEOUT_REASON)
            }
        };
        // Dropping the handle clears any entry still in the table
        drop(pending);
        normalize(decision)
    }

    /// Pending requests, oldest first.
    pub async fn list(&self) -> Vec<ApprovalRequest> {
        let mut requests: Vec<ApprovalRequest> = lock(&self.pending)
            .values()
            .map(|p| p.request.clone())
            .collect();
        requests.sort_by(|a, b| a.requested_at.cmp(&b.requested_at).then(a.id.cmp(&b.id)));
        requests
    }

    pub async fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Deliver a decision. The request leaves the pending table.
    pub async fn respond(
        &self,
        id: &str,
        decision: ApprovalDecision,
    ) -> Result<ApprovalRequest, ApprovalError> {
        let entry = lock(&self.pending)
            .remove(id)
            .ok_or_else(|| ApprovalError::NotFound(id.to_string()))?;

        let decision = normalize(decision);
        let mut request = entry.request;
        request.state = ToolCallState::ApprovalResponded;
        request.approved = Some(decision.approved);
        request.reason = decision.reason.clone();

        // Receiver gone means the waiter already gave up
        entry
            .reply
            .send(decision)
            .map_err(|_| ApprovalError::NotFound(id.to_string()))?;
        Ok(request)
    }
}

/// Denials without a reason get the default one.
pub fn normalize(decision: ApprovalDecision) -> ApprovalDecision {
    if !decision.approved && decision.reason.as_deref().is_none_or(str::is_empty) {
        return ApprovalDecision::deny(DEFAULT_DENY_REASON);
    }
    decision
}
