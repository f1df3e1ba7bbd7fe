//! Gateway tool trait.

use async_trait::async_trait;
use serde_json::Value;

use vaultgate_types::{DisclosureLevel, ToolDescriptor, ToolResult};

use crate::context::ToolContext;
use crate::error::ToolError;

/// Turns a raw upstream payload into an assistant-safe digest.
pub type Summarizer = fn(&Value, DisclosureLevel) -> String;

/// What a tool hands back to the router.
pub enum ToolOutput {
    /// Final result, returned as-is.
    Result(ToolResult),
    /// Raw upstream data for a sensitive category. The router applies the
    /// session's disclosure level, the summarizer and audience tagging.
    Sensitive { raw: Value, summarize: Summarizer },
}

impl From<ToolResult> for ToolOutput {
    fn from(result: ToolResult) -> Self {
        ToolOutput::Result(result)
    }
}

/// A tool exposed by the gateway.
///
/// Implementations are stateless; everything session-specific arrives in
/// the [`ToolContext`].
#[async_trait]
pub trait GatewayTool: Send + Sync {
    fn descriptor(&self) -> &ToolDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Reject malformed arguments. Runs before approval and execution.
    fn validate(&self, args: &Value) -> Result<(), ToolError>;

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError>;
}
