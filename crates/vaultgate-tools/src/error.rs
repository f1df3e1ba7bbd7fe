use vaultgate_storage::StorageError;
use vaultgate_types::ToolResult;
use vaultgate_upstream::UpstreamError;

use crate::audience;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(
        "Unknown item_ref \"{0}\". Use list_items to see stored references, or exchange_public_token / sandbox_create_public_token to create one."
    )]
    UnknownAlias(String),
    #[error("Item ref \"{0}\" not found in vault.")]
    NotInVault(String),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Invalid arguments for {tool}: {message}")]
    Validation { tool: String, message: String },
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Tool not enabled: {0}")]
    NotAllowed(String),
}

impl ToolError {
    pub fn validation(tool: &str, message: impl Into<String>) -> Self {
        ToolError::Validation {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    /// Rejected before the tool ran: the caller sent a bad request.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            ToolError::Validation { .. } | ToolError::UnknownTool(_) | ToolError::NotAllowed(_)
        )
    }

    /// Execution failure rendered as a single untagged error block.
    pub fn into_result(self) -> ToolResult {
        match self {
            ToolError::Upstream(e) => audience::upstream_error(&e),
            other => ToolResult::error(other.to_string()),
        }
    }
}
