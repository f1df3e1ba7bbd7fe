//! vaultgate-tools: the tool catalogue and everything a call passes through.
//!
//! Provides:
//! - `GatewayTool` implementations for vault, disclosure, sandbox, link, item,
//!   data and transfer operations
//! - Response summarizers and the audience filter for sensitive results
//! - The approval gate for destructive tools
//! - Tool groups and the profile/deny policy
//! - `ToolRouter`, the single entry point for executing a tool call

pub mod approval;
pub mod audience;
pub mod context;
pub mod error;
pub mod gateway_tool;
pub mod groups;
pub mod input;
pub mod policy;
pub mod router;
pub mod summarize;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use approval::{ApprovalGate, ApprovalRequest};
pub use context::ToolContext;
pub use error::ToolError;
pub use gateway_tool::{GatewayTool, ToolOutput};
pub use policy::ToolPolicy;
pub use router::{CallOutcome, ToolCall, ToolRouter};
pub use tools::{ToolRegistry, registry};
