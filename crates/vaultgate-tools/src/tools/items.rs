//! Item tools: plain item-scoped calls and `remove_item`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use vaultgate_types::{ToolDescriptor, ToolResult};

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::gateway_tool::{GatewayTool, ToolOutput};
use crate::input::{self, ItemRef};

use super::{UPSTREAM_DESTRUCTIVE, UPSTREAM_READ, describe, gated, item_ref_schema};

#[derive(Debug, Deserialize)]
struct ItemArgs {
    item_ref: ItemRef,
}

fn item_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "item_ref": item_ref_schema(description)
        },
        "required": ["item_ref"]
    })
}

/// Resolve `item_ref`, POST `{access_token}` to one endpoint, return the JSON.
pub struct ItemCallTool {
    descriptor: ToolDescriptor,
    endpoint: &'static str,
}

impl ItemCallTool {
    pub fn get_item() -> Self {
        Self {
            descriptor: describe(
                "get_item",
                "Get metadata about a connected Plaid Item (bank connection), including institution info, status, and available products.",
                item_schema("The item reference alias for the Item"),
                UPSTREAM_READ,
            ),
            endpoint: "/item/get",
        }
    }

    pub fn sandbox_reset_login() -> Self {
        Self {
            descriptor: gated(describe(
                "sandbox_reset_login",
                "Force an Item into an error state to test re-authentication flows in sandbox.",
                item_schema("The item reference alias for the Item to reset"),
                UPSTREAM_DESTRUCTIVE,
            )),
            endpoint: "/sandbox/item/reset_login",
        }
    }
}

#[async_trait]
impl GatewayTool for ItemCallTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        input::parse::<ItemArgs>(self.name(), args).map(drop)
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError> {
        let args: ItemArgs = input::parse(self.name(), &args)?;
        let access_token = ctx.resolve_alias(args.item_ref.as_str()).await?;
        let raw = ctx
            .upstream
            .request(self.endpoint, json!({"access_token": access_token}))
            .await?;
        Ok(ToolResult::json(&raw).into())
    }
}

pub struct RemoveItemTool {
    descriptor: ToolDescriptor,
}

impl RemoveItemTool {
    pub fn new() -> Self {
        Self {
            descriptor: gated(describe(
                "remove_item",
                "Remove a Plaid Item (bank connection). The access token will be invalidated and the vault entry will be deleted.",
                item_schema("The item reference alias for the Item to remove"),
                UPSTREAM_DESTRUCTIVE,
            )),
        }
    }
}

impl Default for RemoveItemTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayTool for RemoveItemTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        input::parse::<ItemArgs>(self.name(), args).map(drop)
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError> {
        let args: ItemArgs = input::parse(self.name(), &args)?;
        let alias = args.item_ref.as_str();
        let access_token = ctx.resolve_alias(alias).await?;

        // Vault entry survives an upstream failure
        let raw = ctx
            .upstream
            .request("/item/remove", json!({"access_token": access_token}))
            .await?;
        ctx.vault.delete(alias).await?;
        tracing::info!(alias, "Item removed upstream and from vault");

        Ok(ToolResult::json(&raw).into())
    }
}
