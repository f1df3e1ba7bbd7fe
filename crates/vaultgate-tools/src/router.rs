//! Tool call dispatch.
//!
//! Every call runs the same pipeline:
//!
//! 1. lookup + policy
//! 2. argument validation
//! 3. approval (inline decision or a pending request)
//! 4. execution
//! 5. audience split for sensitive categories
//!
//! Hook events are emitted before execution and at the terminal state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use vaultgate_hooks::{HookEvent, HookRegistry};
use vaultgate_types::{
    ApprovalDecision, DisclosureLevel, ToolCallState, ToolDescriptor, ToolResult,
};

use crate::approval::{self, ApprovalGate};
use crate::audience;
use crate::context::ToolContext;
use crate::error::ToolError;
use crate::gateway_tool::{GatewayTool, Summarizer, ToolOutput};
use crate::policy::ToolPolicy;
use crate::tools::{ToolRegistry, registry};

/// One tool invocation as received from a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default = "new_call_id")]
    pub tool_call_id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
    /// Decision collected by the client before dispatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalDecision>,
}

fn new_call_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool_call_id: new_call_id(),
            name: name.into(),
            arguments,
            approval: None,
        }
    }

    pub fn with_approval(mut self, decision: ApprovalDecision) -> Self {
        self.approval = Some(decision);
        self
    }
}

/// Terminal outcome of a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallOutcome {
    pub tool_call_id: String,
    pub state: ToolCallState,
    pub result: ToolResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<String>,
}

/// Per-session dispatcher over the shared tool registry.
pub struct ToolRouter {
    ctx: ToolContext,
    approvals: Arc<ApprovalGate>,
    hooks: Arc<HookRegistry>,
    policy: Arc<ToolPolicy>,
    registry: &'static ToolRegistry,
}

impl ToolRouter {
    pub fn new(
        ctx: ToolContext,
        approvals: Arc<ApprovalGate>,
        hooks: Arc<HookRegistry>,
        policy: Arc<ToolPolicy>,
    ) -> Self {
        Self {
            ctx,
            approvals,
            hooks,
            policy,
            registry: registry(),
        }
    }

    pub fn approvals(&self) -> &Arc<ApprovalGate> {
        &self.approvals
    }

    /// Descriptors of every tool the policy exposes, in catalogue order.
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.registry
            .descriptors()
            .filter(|d| self.policy.is_allowed(&d.name))
            .cloned()
            .collect()
    }

    /// Resolve a name to a tool the policy exposes.
    fn lookup(&self, name: &str) -> Result<&Arc<dyn GatewayTool>, ToolError> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        if !self.policy.is_allowed(name) {
            return Err(ToolError::NotAllowed(name.to_string()));
        }
        Ok(tool)
    }

    /// Run a call to its terminal state.
    ///
    /// Errors are returned only for request errors (unknown tool, policy,
    /// validation). Everything after validation ends in a [`CallOutcome`].
    pub async fn call(&self, call: ToolCall) -> Result<CallOutcome, ToolError> {
        let ToolCall {
            tool_call_id,
            name,
            arguments,
            approval,
        } = call;

        let tool = self.lookup(&name)?;
        tool.validate(&arguments)?;

        self.hooks
            .emit(HookEvent::ToolCallBefore {
                tool_call_id: tool_call_id.clone(),
                tool_name: name.clone(),
                state: ToolCallState::InputAvailable,
            })
            .await;

        let mut approval_id = None;
        if tool.descriptor().needs_approval {
            let (id, decision) = self.approve(&tool_call_id, &name, approval).await;
            approval_id = Some(id);
            if !decision.approved {
                let reason = decision
                    .reason
                    .unwrap_or_else(|| approval::DEFAULT_DENY_REASON.to_string());
                tracing::info!(tool_call_id = %tool_call_id, tool = %name, reason = %reason, "Tool call denied");
                return Ok(self
                    .finish(
                        tool_call_id,
                        &name,
                        ToolCallState::OutputDenied,
                        ToolResult::text(reason),
                        approval_id,
                    )
                    .await);
            }
        }

        tracing::debug!(tool_call_id = %tool_call_id, tool = %name, "Executing tool");
        let result = match tool.execute(&self.ctx, arguments).await {
            Ok(output) => self.render(tool.descriptor(), output).await,
            Err(e) => {
                tracing::warn!(tool_call_id = %tool_call_id, tool = %name, error = %e, "Tool call failed");
                Err(e)
            }
        };

        let (state, result) = match result {
            Ok(result) => (ToolCallState::OutputAvailable, result),
            Err(e) => (ToolCallState::OutputError, e.into_result()),
        };
        Ok(self.finish(tool_call_id, &name, state, result, approval_id).await)
    }

    /// Obtain a decision for a gated call. Returns the approval id with it.
    async fn approve(
        &self,
        tool_call_id: &str,
        tool_name: &str,
        inline: Option<ApprovalDecision>,
    ) -> (String, ApprovalDecision) {
        let (id, decision) = match inline {
            Some(decision) => (uuid::Uuid::new_v4().to_string(), approval::normalize(decision)),
            None => {
                let pending = self.approvals.open(tool_call_id, tool_name).await;
                let id = pending.request.id.clone();
                self.hooks
                    .emit(HookEvent::ApprovalRequested {
                        approval_id: id.clone(),
                        tool_call_id: tool_call_id.to_string(),
                        tool_name: tool_name.to_string(),
                    })
                    .await;
                (id, self.approvals.wait(pending).await)
            }
        };

        self.hooks
            .emit(HookEvent::ApprovalResolved {
                approval_id: id.clone(),
                tool_name: tool_name.to_string(),
                approved: decision.approved,
                reason: decision.reason.clone(),
            })
            .await;
        (id, decision)
    }

    /// Turn tool output into the result the client receives.
    async fn render(
        &self,
        descriptor: &ToolDescriptor,
        output: ToolOutput,
    ) -> Result<ToolResult, ToolError> {
        match output {
            ToolOutput::Result(result) => Ok(result),
            ToolOutput::Sensitive { raw, summarize } => {
                let level = self.disclosure_level(descriptor).await?;
                Ok(sensitive_result(&raw, summarize, level))
            }
        }
    }

    /// Fixed categories always summarize at the default level.
    async fn disclosure_level(&self, descriptor: &ToolDescriptor) -> Result<DisclosureLevel, ToolError> {
        match descriptor.sensitive.and_then(|c| c.disclosure_category()) {
            Some(category) => Ok(self.ctx.disclosure.get_level(category).await?),
            None => Ok(DisclosureLevel::default()),
        }
    }

    async fn finish(
        &self,
        tool_call_id: String,
        tool_name: &str,
        state: ToolCallState,
        result: ToolResult,
        approval_id: Option<String>,
    ) -> CallOutcome {
        self.hooks
            .emit(HookEvent::ToolCallAfter {
                tool_call_id: tool_call_id.clone(),
                tool_name: tool_name.to_string(),
                state,
                is_error: result.is_error,
            })
            .await;
        CallOutcome {
            tool_call_id,
            state,
            result,
            approval_id,
        }
    }
}

fn sensitive_result(raw: &Value, summarize: Summarizer, level: DisclosureLevel) -> ToolResult {
    audience::wrap(raw, summarize(raw, level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use vaultgate_config::{ToolProfile, ToolsConfig};
    use vaultgate_storage::VaultEntry;
    use vaultgate_types::{Audience, DisclosureCategory};

    use crate::testing::{MockUpstream, context};

    fn router(upstream: MockUpstream) -> (ToolRouter, Arc<MockUpstream>) {
        router_with(upstream, ToolPolicy::allow_all(), Duration::from_secs(300))
    }

    fn router_with(
        upstream: MockUpstream,
        policy: ToolPolicy,
        timeout: Duration,
    ) -> (ToolRouter, Arc<MockUpstream>) {
        let (ctx, upstream) = context(upstream);
        let router = ToolRouter::new(
            ctx,
            Arc::new(ApprovalGate::new(timeout)),
            Arc::new(HookRegistry::new()),
            Arc::new(policy),
        );
        (router, upstream)
    }

    async fn store(router: &ToolRouter, alias: &str, token: &str) {
        router
            .ctx
            .vault
            .store(alias, &VaultEntry::new(token, Some("itm_1".into())))
            .await
            .unwrap();
    }

    fn transfer_call() -> ToolCall {
        ToolCall::new(
            "create_transfer",
            json!({
                "item_ref": "chase-checking",
                "account_id": "acc_1",
                "type": "debit",
                "network": "ach",
                "amount": "25.00",
                "description": "Rent",
                "user": {"legal_name": "Ada Lovelace"}
            }),
        )
    }

    fn accounts_payload() -> Value {
        json!({
            "accounts": [{
                "account_id": "acc_1",
                "name": "Plaid Checking",
                "type": "depository",
                "subtype": "checking",
                "mask": "0000",
                "balances": {"current": 110.0, "available": 100.0, "iso_currency_code": "USD"}
            }],
            "numbers": {"ach": [{"account": "1111222233330000", "routing": "011401533"}]}
        })
    }

    #[tokio::test]
    async fn test_denied_transfer_never_calls_upstream() {
        let upstream = MockUpstream::new().with_response("/transfer/create", json!({}));
        let (router, upstream) = router(upstream);
        store(&router, "chase-checking", "tok").await;

        let outcome = router
            .call(transfer_call().with_approval(ApprovalDecision {
                approved: false,
                reason: None,
            }))
            .await
            .unwrap();

        assert_eq!(outcome.state, ToolCallState::OutputDenied);
        assert!(!outcome.result.is_error);
        assert_eq!(outcome.result.content.len(), 1);
        assert_eq!(
            outcome.result.content[0].as_text(),
            approval::DEFAULT_DENY_REASON
        );
        assert!(outcome.approval_id.is_some());
        assert_eq!(upstream.calls_to("/transfer/create"), 0);
    }

    #[tokio::test]
    async fn test_approved_transfer_calls_upstream_once() {
        let upstream = MockUpstream::new()
            .with_response("/transfer/create", json!({"transfer": {"id": "tr_1"}}));
        let (router, upstream) = router(upstream);
        store(&router, "chase-checking", "tok").await;

        let outcome = router
            .call(transfer_call().with_approval(ApprovalDecision::approve()))
            .await
            .unwrap();
        assert_eq!(outcome.state, ToolCallState::OutputAvailable);
        assert_eq!(upstream.calls_to("/transfer/create"), 1);
    }

    #[tokio::test]
    async fn test_pending_approval_resolved_by_respond() {
        let upstream = MockUpstream::new().with_response("/item/remove", json!({"request_id": "r"}));
        let (router, upstream) = router(upstream);
        store(&router, "chase-checking", "tok").await;
        let router = Arc::new(router);

        let call = {
            let router = router.clone();
            tokio::spawn(async move {
                router
                    .call(ToolCall::new("remove_item", json!({"item_ref": "chase-checking"})))
                    .await
            })
        };

        let pending = loop {
            let listed = router.approvals().list().await;
            if let Some(p) = listed.into_iter().next() {
                break p;
            }
            tokio::task::yield_now().await;
        };
        assert_eq!(pending.tool_name, "remove_item");
        assert_eq!(upstream.calls().len(), 0);

        router
            .approvals()
            .respond(&pending.id, ApprovalDecision::approve())
            .await
            .unwrap();

        let outcome = call.await.unwrap().unwrap();
        assert_eq!(outcome.state, ToolCallState::OutputAvailable);
        assert_eq!(outcome.approval_id.as_deref(), Some(pending.id.as_str()));
        assert_eq!(upstream.calls_to("/item/remove"), 1);
        assert!(!router.ctx.vault.has("chase-checking").await.unwrap());
    }

    #[tokio::test]
    async fn test_cancelled_call_clears_pending_approval() {
        let (router, upstream) = router(MockUpstream::new());
        store(&router, "a", "tok").await;
        let router = Arc::new(router);

        let call = {
            let router = router.clone();
            tokio::spawn(async move {
                router
                    .call(ToolCall::new("remove_stored_item", json!({"item_ref": "a"})))
                    .await
            })
        };

        let pending = loop {
            let listed = router.approvals().list().await;
            if let Some(p) = listed.into_iter().next() {
                break p;
            }
            tokio::task::yield_now().await;
        };

        call.abort();
        assert!(call.await.unwrap_err().is_cancelled());

        assert!(router.approvals().list().await.is_empty());
        assert!(
            router
                .approvals()
                .respond(&pending.id, ApprovalDecision::approve())
                .await
                .is_err()
        );
        assert!(router.ctx.vault.has("a").await.unwrap());
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_approval_times_out() {
        let (router, upstream) =
            router_with(MockUpstream::new(), ToolPolicy::allow_all(), Duration::from_secs(1));
        store(&router, "a", "tok").await;

        let outcome = router
            .call(ToolCall::new("remove_stored_item", json!({"item_ref": "a"})))
            .await
            .unwrap();
        assert_eq!(outcome.state, ToolCallState::OutputDenied);
        assert_eq!(outcome.result.content[0].as_text(), approval::TIMEOUT_REASON);
        assert!(router.ctx.vault.has("a").await.unwrap());
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_validation_rejected_before_approval() {
        let (router, upstream) = router(MockUpstream::new());
        let mut call = transfer_call();
        call.arguments["amount"] = json!("-1");

        let err = router.call(call).await.unwrap_err();
        assert!(err.is_request_error());
        assert!(router.approvals().list().await.is_empty());
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_and_disallowed_tools() {
        let policy = ToolPolicy::new(
            &ToolsConfig {
                profile: ToolProfile::ReadOnly,
                deny: vec![],
            },
            registry().descriptors(),
        );
        let (router, _) = router_with(MockUpstream::new(), policy, Duration::from_secs(1));

        let err = router
            .call(ToolCall::new("no_such_tool", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));

        let err = router
            .call(transfer_call())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotAllowed(_)));

        let listed: Vec<String> = router.list_tools().into_iter().map(|d| d.name).collect();
        assert!(listed.contains(&"get_accounts".to_string()));
        assert!(!listed.contains(&"create_transfer".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_alias_is_output_error() {
        let (router, upstream) = router(MockUpstream::new());
        let outcome = router
            .call(ToolCall::new("get_accounts", json!({"item_ref": "ghost"})))
            .await
            .unwrap();
        assert_eq!(outcome.state, ToolCallState::OutputError);
        assert!(outcome.result.is_error);
        let text = outcome.result.content[0].as_text();
        assert!(text.contains("list_items"));
        assert!(text.contains("exchange_public_token"));
        assert!(text.contains("sandbox_create_public_token"));
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_sensitive_success_is_split() {
        let upstream = MockUpstream::new().with_response("/auth/get", accounts_payload());
        let (router, _) = router(upstream);
        store(&router, "chase-checking", "tok").await;

        let outcome = router
            .call(ToolCall::new("get_auth", json!({"item_ref": "chase-checking"})))
            .await
            .unwrap();
        let content = &outcome.result.content;
        assert_eq!(content.len(), 2);
        assert_eq!(content[0].audience(), Some(&[Audience::Assistant][..]));
        assert_eq!(content[1].audience(), Some(&[Audience::User][..]));
        assert!(!content[0].as_text().contains("1111222233330000"));
        assert!(!content[0].as_text().contains("011401533"));
        assert!(content[1].as_text().contains("1111222233330000"));

        let model = audience::to_model_output(&outcome.result);
        assert!(model.iter().all(|b| !b.as_text().contains("1111222233330000")));
    }

    #[tokio::test]
    async fn test_upstream_error_single_untagged_block() {
        let upstream = MockUpstream::new().with_error("/accounts/get", "ITEM_LOGIN_REQUIRED");
        let (router, _) = router(upstream);
        store(&router, "chase-checking", "tok").await;

        let outcome = router
            .call(ToolCall::new("get_accounts", json!({"item_ref": "chase-checking"})))
            .await
            .unwrap();
        assert_eq!(outcome.state, ToolCallState::OutputError);
        assert!(outcome.result.is_error);
        assert_eq!(outcome.result.content.len(), 1);
        assert!(outcome.result.content[0].audience().is_none());
        assert!(
            outcome.result.content[0]
                .as_text()
                .starts_with("Plaid API Error:")
        );
    }

    #[tokio::test]
    async fn test_disclosure_does_not_change_fixed_categories() {
        let upstream = MockUpstream::new().with_response("/accounts/get", accounts_payload());
        let (router, _) = router(upstream);
        store(&router, "chase-checking", "tok").await;
        let call = || ToolCall::new("get_accounts", json!({"item_ref": "chase-checking"}));

        let before = router.call(call()).await.unwrap().result;
        for category in DisclosureCategory::ALL {
            router
                .ctx
                .disclosure
                .set_level(category, DisclosureLevel::Detailed)
                .await
                .unwrap();
        }
        let after = router.call(call()).await.unwrap().result;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_disclosure_level_changes_transactions_summary() {
        let payload = json!({
            "added": [{"transaction_id": "t1", "name": "Coffee Shop", "merchant_name": "Blue Bottle", "amount": 4.5, "date": "2024-01-02"}],
            "modified": [],
            "removed": [],
            "has_more": false,
            "next_cursor": "c1"
        });
        let upstream = MockUpstream::new().with_response("/transactions/sync", payload);
        let (router, _) = router(upstream);
        store(&router, "a", "tok").await;
        let call = || ToolCall::new("get_transactions_sync", json!({"item_ref": "a"}));

        let summary = router.call(call()).await.unwrap().result;
        assert!(!summary.content[0].as_text().contains("Blue Bottle"));

        router
            .call(ToolCall::new(
                "set_disclosure_level",
                json!({"category": "transactions", "level": "detailed"}),
            ))
            .await
            .unwrap();
        let detailed = router.call(call()).await.unwrap().result;
        assert!(detailed.content[0].as_text().contains("Blue Bottle"));
    }

    #[tokio::test]
    async fn test_chase_checking_listing_hides_token() {
        let (router, _) = router(MockUpstream::new());
        store(&router, "chase-checking", "tok_abc").await;

        let outcome = router
            .call(ToolCall::new("list_items", json!({})))
            .await
            .unwrap();
        let text = outcome.result.content[0].as_text();
        assert!(text.contains("chase-checking"));
        assert!(text.contains("itm_1"));
        assert!(!text.contains("tok_abc"));
    }
}
