//! JSON-RPC 2.0 envelopes for `POST /mcp`.
//!
//! | Method              | Params                                               |
//! |---------------------|------------------------------------------------------|
//! | `initialize`        | `{}`                                                 |
//! | `ping`              | `{}`                                                 |
//! | `tools/list`        | `{}`                                                 |
//! | `tools/call`        | `{ name, arguments, tool_call_id?, approval? }`      |
//! | `approvals/list`    | `{}`                                                 |
//! | `approvals/respond` | `{ id, approved, reason? }`                          |

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 request. A missing `id` is treated as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// ──────────────────── Error codes ────────────────────

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
/// Missing or malformed credentials.
pub const UNAUTHORIZED: i64 = -32001;

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let req: JsonRpcRequest =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "ping"})).unwrap();
        assert_eq!(req.id, Value::Null);
        assert_eq!(req.params, Value::Null);
    }

    #[test]
    fn test_error_shape() {
        let resp = JsonRpcResponse::error(Value::Null, UNAUTHORIZED, "Unauthorized");
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            v,
            json!({"jsonrpc": "2.0", "id": null, "error": {"code": -32001, "message": "Unauthorized"}})
        );
    }
}
