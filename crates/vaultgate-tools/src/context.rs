//! Per-session state handed to every tool.

use std::sync::Arc;

use vaultgate_storage::{DisclosureRegistry, Vault};
use vaultgate_upstream::UpstreamClient;

use crate::error::ToolError;

/// What a tool may touch: the session's vault and disclosure settings, and
/// an upstream client carrying this request's credentials.
#[derive(Clone)]
pub struct ToolContext {
    pub vault: Vault,
    pub disclosure: DisclosureRegistry,
    pub upstream: Arc<dyn UpstreamClient>,
}

impl ToolContext {
    pub fn new(
        vault: Vault,
        disclosure: DisclosureRegistry,
        upstream: Arc<dyn UpstreamClient>,
    ) -> Self {
        Self {
            vault,
            disclosure,
            upstream,
        }
    }

    /// Access token behind `alias`, or [`ToolError::UnknownAlias`].
    pub async fn resolve_alias(&self, alias: &str) -> Result<String, ToolError> {
        self.vault
            .resolve(alias)
            .await?
            .ok_or_else(|| ToolError::UnknownAlias(alias.to_string()))
    }
}
