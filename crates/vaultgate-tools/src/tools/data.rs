//! Item-scoped data tools whose results are split by audience.
//!
//! All of these take `{item_ref, options?: {account_ids?}}`, hit one
//! endpoint and hand the raw payload to the router as sensitive output.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use vaultgate_types::{DataCategory, ToolDescriptor};

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::gateway_tool::{GatewayTool, Summarizer, ToolOutput};
use crate::input::{self, ItemRef};
use crate::summarize;

use super::{UPSTREAM_READ, account_filter_schema, describe, item_ref_schema, sensitive};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_ids: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ItemDataArgs {
    item_ref: ItemRef,
    #[serde(default)]
    options: Option<AccountFilter>,
}

pub struct ItemDataTool {
    descriptor: ToolDescriptor,
    endpoint: &'static str,
    summarize: Summarizer,
}

impl ItemDataTool {
    fn new(
        name: &str,
        description: &str,
        endpoint: &'static str,
        category: DataCategory,
        summarize: Summarizer,
    ) -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "item_ref": item_ref_schema("The item reference alias for the Item"),
                "options": account_filter_schema()
            },
            "required": ["item_ref"]
        });
        Self {
            descriptor: sensitive(describe(name, description, schema, UPSTREAM_READ), category),
            endpoint,
            summarize,
        }
    }

    pub fn accounts() -> Self {
        Self::new(
            "get_accounts",
            "List all accounts associated with a Plaid Item. Returns account names, types, balances, and masks.",
            "/accounts/get",
            DataCategory::Accounts,
            summarize::accounts,
        )
    }

    pub fn auth() -> Self {
        Self::new(
            "get_auth",
            "Get bank account and routing numbers for ACH payments. Requires the 'auth' product.",
            "/auth/get",
            DataCategory::Auth,
            summarize::auth,
        )
    }

    pub fn balance() -> Self {
        Self::new(
            "get_balance",
            "Get real-time account balances. Unlike cached balances from get_accounts, this makes a live request to the financial institution.",
            "/accounts/balance/get",
            DataCategory::Balance,
            summarize::balance,
        )
    }

    pub fn identity() -> Self {
        Self::new(
            "get_identity",
            "Get account owner identity information (name, address, email, phone). Requires the 'identity' product.",
            "/identity/get",
            DataCategory::Identity,
            summarize::identity,
        )
    }

    pub fn investments_holdings() -> Self {
        Self::new(
            "get_investments_holdings",
            "Get investment holdings (stocks, funds, etc.) for an Item. Requires the 'investments' product.",
            "/investments/holdings/get",
            DataCategory::Investments,
            summarize::investments_holdings,
        )
    }

    pub fn liabilities() -> Self {
        Self::new(
            "get_liabilities",
            "Get liability data (credit cards, student loans, mortgages) for an Item. Requires the 'liabilities' product.",
            "/liabilities/get",
            DataCategory::Liabilities,
            summarize::liabilities,
        )
    }
}

#[async_trait]
impl GatewayTool for ItemDataTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        input::parse::<ItemDataArgs>(self.name(), args).map(drop)
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError> {
        let args: ItemDataArgs = input::parse(self.name(), &args)?;
        let access_token = ctx.resolve_alias(args.item_ref.as_str()).await?;

        let raw = ctx
            .upstream
            .request(
                self.endpoint,
                input::request_body(json!({
                    "access_token": access_token,
                    "options": args.options,
                })),
            )
            .await?;

        Ok(ToolOutput::Sensitive {
            raw,
            summarize: self.summarize,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockUpstream, context};
    use vaultgate_storage::VaultEntry;

    #[tokio::test]
    async fn test_resolves_alias_and_forwards_options() {
        let upstream = MockUpstream::new().with_response("/accounts/get", json!({"accounts": []}));
        let (ctx, upstream) = context(upstream);
        ctx.vault
            .store("chase", &VaultEntry::new("tok_chase", None))
            .await
            .unwrap();

        let tool = ItemDataTool::accounts();
        let out = tool
            .execute(
                &ctx,
                json!({"item_ref": "chase", "options": {"account_ids": ["acc_1"]}}),
            )
            .await
            .unwrap();
        assert!(matches!(out, ToolOutput::Sensitive { .. }));

        let calls = upstream.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "/accounts/get");
        assert_eq!(calls[0].1["access_token"], "tok_chase");
        assert_eq!(calls[0].1["options"]["account_ids"], json!(["acc_1"]));
    }

    #[tokio::test]
    async fn test_omits_absent_options() {
        let upstream = MockUpstream::new().with_response("/identity/get", json!({"accounts": []}));
        let (ctx, upstream) = context(upstream);
        ctx.vault
            .store("a", &VaultEntry::new("tok", None))
            .await
            .unwrap();

        ItemDataTool::identity()
            .execute(&ctx, json!({"item_ref": "a"}))
            .await
            .unwrap();
        assert!(upstream.calls()[0].1.get("options").is_none());
    }

    #[tokio::test]
    async fn test_unknown_alias_skips_upstream() {
        let (ctx, upstream) = context(MockUpstream::new());
        let err = ItemDataTool::balance()
            .execute(&ctx, json!({"item_ref": "nope"}))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ToolError::UnknownAlias(ref a) if a == "nope"));
        assert!(upstream.calls().is_empty());
    }
}
