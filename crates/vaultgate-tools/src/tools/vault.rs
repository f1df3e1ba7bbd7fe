//! `list_items` and `remove_stored_item`: local vault management.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use vaultgate_types::{ToolDescriptor, ToolResult};

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::gateway_tool::{GatewayTool, ToolOutput};
use crate::input::{self, ItemRef};

use super::{LOCAL_DESTRUCTIVE, LOCAL_READ, describe, gated, item_ref_schema};

const EMPTY_HINT: &str =
    "No items stored. Use sandbox_create_public_token or exchange_public_token to add one.";

pub struct ListItemsTool {
    descriptor: ToolDescriptor,
}

impl ListItemsTool {
    pub fn new() -> Self {
        Self {
            descriptor: describe(
                "list_items",
                "List all stored item references and their metadata (institution, creation date). Does not reveal access tokens.",
                json!({"type": "object", "properties": {}}),
                LOCAL_READ,
            ),
        }
    }
}

impl Default for ListItemsTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayTool for ListItemsTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn validate(&self, _args: &Value) -> Result<(), ToolError> {
        Ok(())
    }

    async fn execute(&self, ctx: &ToolContext, _args: Value) -> Result<ToolOutput, ToolError> {
        let items = ctx.vault.list().await?;
        let mut body = json!({
            "items": items,
            "count": items.len(),
        });
        if items.is_empty() {
            body["hint"] = Value::String(EMPTY_HINT.to_string());
        }
        Ok(ToolResult::json(&body).into())
    }
}

#[derive(Debug, Deserialize)]
struct RemoveStoredItemArgs {
    item_ref: ItemRef,
}

pub struct RemoveStoredItemTool {
    descriptor: ToolDescriptor,
}

impl RemoveStoredItemTool {
    pub fn new() -> Self {
        Self {
            descriptor: gated(describe(
                "remove_stored_item",
                "Remove an item reference from the local vault. This does NOT revoke the token at Plaid; use remove_item for that.",
                json!({
                    "type": "object",
                    "properties": {
                        "item_ref": item_ref_schema("The item reference alias to remove from the vault")
                    },
                    "required": ["item_ref"]
                }),
                LOCAL_DESTRUCTIVE,
            )),
        }
    }
}

impl Default for RemoveStoredItemTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayTool for RemoveStoredItemTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        input::parse::<RemoveStoredItemArgs>(self.name(), args).map(drop)
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError> {
        let args: RemoveStoredItemArgs = input::parse(self.name(), &args)?;
        let alias = args.item_ref.as_str();

        if !ctx.vault.delete(alias).await? {
            return Err(ToolError::NotInVault(alias.to_string()));
        }
        Ok(ToolResult::text(format!("Removed \"{alias}\" from vault.")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockUpstream, context};
    use vaultgate_storage::VaultEntry;

    fn expect_result(output: ToolOutput) -> ToolResult {
        match output {
            ToolOutput::Result(r) => r,
            ToolOutput::Sensitive { .. } => panic!("unexpected sensitive output"),
        }
    }

    #[tokio::test]
    async fn test_list_items_empty_has_hint() {
        let (ctx, _upstream) = context(MockUpstream::new());
        let out = expect_result(ListItemsTool::new().execute(&ctx, json!({})).await.unwrap());
        let body: Value = serde_json::from_str(out.content[0].as_text()).unwrap();
        assert_eq!(body["count"], 0);
        assert_eq!(body["hint"], EMPTY_HINT);
    }

    #[tokio::test]
    async fn test_list_items_json_without_tokens() {
        let (ctx, _upstream) = context(MockUpstream::new());
        ctx.vault
            .store(
                "chase-checking",
                &VaultEntry::new("access-sandbox-secret", Some("item_abc".into())),
            )
            .await
            .unwrap();

        let out = expect_result(ListItemsTool::new().execute(&ctx, json!({})).await.unwrap());
        let text = out.content[0].as_text();
        assert!(!text.contains("access-sandbox-secret"));

        let body: Value = serde_json::from_str(text).unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(body["items"]["chase-checking"]["item_id"], "item_abc");
        assert!(body.get("hint").is_none());
    }

    #[tokio::test]
    async fn test_remove_stored_item() {
        let (ctx, upstream) = context(MockUpstream::new());
        ctx.vault
            .store("a", &VaultEntry::new("tok", None))
            .await
            .unwrap();

        let tool = RemoveStoredItemTool::new();
        let out = expect_result(tool.execute(&ctx, json!({"item_ref": "a"})).await.unwrap());
        assert_eq!(out.content[0].as_text(), "Removed \"a\" from vault.");
        assert!(!ctx.vault.has("a").await.unwrap());
        assert!(upstream.calls().is_empty());

        let err = tool
            .execute(&ctx, json!({"item_ref": "a"}))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ToolError::NotInVault(_)));
    }
}
