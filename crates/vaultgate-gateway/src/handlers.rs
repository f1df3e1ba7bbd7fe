//! JSON-RPC method handlers.

use serde::Deserialize;
use serde_json::{Value, json};

use vaultgate_tools::{ToolCall, ToolError, ToolRouter};
use vaultgate_types::ApprovalDecision;

use crate::jsonrpc::{INTERNAL_ERROR, INVALID_PARAMS, JsonRpcResponse, METHOD_NOT_FOUND};

pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Route a JSON-RPC request to the appropriate handler.
pub async fn handle_rpc(
    method: &str,
    params: Value,
    id: Value,
    router: &ToolRouter,
) -> JsonRpcResponse {
    match method {
        "initialize" => handle_initialize(id),
        "ping" => JsonRpcResponse::success(id, json!({})),
        "tools/list" => handle_tools_list(id, router),
        "tools/call" => handle_tools_call(params, id, router).await,
        "approvals/list" => handle_approvals_list(id, router).await,
        "approvals/respond" => handle_approvals_respond(params, id, router).await,
        _ => JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {method}")),
    }
}

/// initialize: protocol handshake.
fn handle_initialize(id: Value) -> JsonRpcResponse {
    JsonRpcResponse::success(
        id,
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {"listChanged": false}},
            "serverInfo": {
                "name": "vaultgate",
                "version": env!("CARGO_PKG_VERSION"),
            },
        }),
    )
}

/// tools/list: descriptors the policy exposes.
fn handle_tools_list(id: Value, router: &ToolRouter) -> JsonRpcResponse {
    JsonRpcResponse::success(id, json!({"tools": router.list_tools()}))
}

/// tools/call: run a tool to its terminal state.
///
/// Params:
///   - name: string (required)
///   - arguments: object (optional)
///   - tool_call_id: string (optional, generated if missing)
///   - approval: {approved, reason?} (optional)
async fn handle_tools_call(params: Value, id: Value, router: &ToolRouter) -> JsonRpcResponse {
    let call: ToolCall = match serde_json::from_value(params) {
        Ok(call) => call,
        Err(e) => return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {e}")),
    };

    match router.call(call).await {
        Ok(outcome) => {
            let mut result = match serde_json::to_value(&outcome.result) {
                Ok(v) => v,
                Err(e) => return JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
            };
            if let Value::Object(map) = &mut result {
                map.insert("state".into(), json!(outcome.state));
                map.insert("toolCallId".into(), json!(outcome.tool_call_id));
                if let Some(approval_id) = outcome.approval_id {
                    map.insert("approvalId".into(), json!(approval_id));
                }
            }
            JsonRpcResponse::success(id, result)
        }
        Err(e) => request_error(id, e),
    }
}

fn request_error(id: Value, e: ToolError) -> JsonRpcResponse {
    let code = if e.is_request_error() {
        INVALID_PARAMS
    } else {
        INTERNAL_ERROR
    };
    JsonRpcResponse::error(id, code, e.to_string())
}

/// approvals/list: pending approvals for this session.
async fn handle_approvals_list(id: Value, router: &ToolRouter) -> JsonRpcResponse {
    let approvals = router.approvals().list().await;
    JsonRpcResponse::success(id, json!({"approvals": approvals}))
}

#[derive(Debug, Deserialize)]
struct RespondParams {
    id: String,
    approved: bool,
    #[serde(default)]
    reason: Option<String>,
}

/// approvals/respond: decide a pending approval.
///
/// Params:
///   - id: string (required)
///   - approved: bool (required)
///   - reason: string (optional)
async fn handle_approvals_respond(
    params: Value,
    id: Value,
    router: &ToolRouter,
) -> JsonRpcResponse {
    let params: RespondParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {e}")),
    };

    let decision = ApprovalDecision {
        approved: params.approved,
        reason: params.reason,
    };
    match router.approvals().respond(&params.id, decision).await {
        Ok(request) => JsonRpcResponse::success(id, json!({"approval": request})),
        Err(e) => JsonRpcResponse::error(id, INVALID_PARAMS, e.to_string()),
    }
}
