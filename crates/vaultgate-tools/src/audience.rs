//! Audience tagging for tool output.
//!
//! Producing side: [`wrap`] splits a sensitive payload into an assistant
//! summary and a user-only full copy. Consuming side: [`to_model_output`]
//! drops user-only blocks before anything reaches model context.

use serde_json::Value;

use vaultgate_types::{Audience, ContentBlock, ToolResult};
use vaultgate_upstream::UpstreamError;

/// Stand-in when every block of a result was user-only.
pub const GENERIC_SENSITIVE_MESSAGE: &str = "Tool executed successfully. The results contain sensitive data and have been displayed directly to the user.";

/// Exactly two blocks: `summary` for the assistant, then the full pretty
/// JSON for the user.
pub fn wrap(raw: &Value, summary: String) -> ToolResult {
    let full = serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string());
    ToolResult {
        content: vec![
            ContentBlock::for_audience(summary, Audience::Assistant),
            ContentBlock::for_audience(full, Audience::User),
        ],
        is_error: false,
    }
}

/// Same text to the assistant and a different text to the user.
pub fn split(assistant: impl Into<String>, user: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![
            ContentBlock::for_audience(assistant, Audience::Assistant),
            ContentBlock::for_audience(user, Audience::User),
        ],
        is_error: false,
    }
}

/// Blocks the model may see. Never empty.
pub fn to_model_output(result: &ToolResult) -> Vec<ContentBlock> {
    let visible: Vec<ContentBlock> = result
        .content
        .iter()
        .filter(|block| !block.is_user_only())
        .cloned()
        .collect();

    if visible.is_empty() {
        vec![ContentBlock::text(GENERIC_SENSITIVE_MESSAGE)]
    } else {
        visible
    }
}

/// Blocks the human operator sees: untagged and user-tagged ones.
pub fn to_user_output(result: &ToolResult) -> Vec<ContentBlock> {
    result
        .content
        .iter()
        .filter(|block| match block.audience() {
            Some(audience) => audience.contains(&Audience::User),
            None => true,
        })
        .cloned()
        .collect()
}

/// Upstream failure as a single untagged error block.
pub fn upstream_error(err: &UpstreamError) -> ToolResult {
    let e = err.to_api_error();
    ToolResult::error(format!(
        "Plaid API Error:\n- Type: {}\n- Code: {}\n- Message: {}\n- Request ID: {}",
        e.error_type,
        e.error_code,
        e.error_message,
        e.request_id.as_deref().unwrap_or("unknown"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vaultgate_upstream::ApiError;

    #[test]
    fn test_wrap_two_blocks() {
        let raw = json!({"accounts": [{"account_id": "acc_1"}]});
        let result = wrap(&raw, "Retrieved 1 account(s)".into());
        assert_eq!(result.content.len(), 2);
        assert_eq!(result.content[0].audience(), Some(&[Audience::Assistant][..]));
        assert_eq!(result.content[1].audience(), Some(&[Audience::User][..]));
        assert!(result.content[1].as_text().contains("acc_1"));
        assert!(!result.is_error);
    }

    #[test]
    fn test_model_output_strips_user_blocks() {
        let result = wrap(&json!({"secret": "123"}), "summary".into());
        let model = to_model_output(&result);
        assert_eq!(model.len(), 1);
        assert_eq!(model[0].as_text(), "summary");

        let user = to_user_output(&result);
        assert_eq!(user.len(), 1);
        assert!(user[0].as_text().contains("123"));
    }

    #[test]
    fn test_model_output_generic_fallback() {
        let result = ToolResult {
            content: vec![ContentBlock::for_audience("full data", Audience::User)],
            is_error: false,
        };
        let model = to_model_output(&result);
        assert_eq!(model.len(), 1);
        assert_eq!(model[0].as_text(), GENERIC_SENSITIVE_MESSAGE);
        assert!(model[0].audience().is_none());
    }

    #[test]
    fn test_model_output_keeps_untagged() {
        let result = ToolResult::text("plain");
        assert_eq!(to_model_output(&result), result.content);
        assert_eq!(to_user_output(&result), result.content);
    }

    #[test]
    fn test_upstream_error_format() {
        let err = UpstreamError::Api(ApiError {
            error_type: "ITEM_ERROR".into(),
            error_code: "ITEM_LOGIN_REQUIRED".into(),
            error_message: "the login details of this item have changed".into(),
            display_message: None,
            request_id: Some("req_42".into()),
        });
        let result = upstream_error(&err);
        assert!(result.is_error);
        assert_eq!(result.content.len(), 1);
        assert!(result.content[0].audience().is_none());
        assert_eq!(
            result.content[0].as_text(),
            "Plaid API Error:\n- Type: ITEM_ERROR\n- Code: ITEM_LOGIN_REQUIRED\n- Message: the login details of this item have changed\n- Request ID: req_42"
        );
    }

    #[test]
    fn test_upstream_error_unknown_request_id() {
        let err = UpstreamError::Api(ApiError::default());
        let result = upstream_error(&err);
        assert!(result.content[0].as_text().ends_with("- Request ID: unknown"));
    }
}
