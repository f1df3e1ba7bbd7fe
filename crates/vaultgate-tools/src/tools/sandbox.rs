//! Sandbox-only tools.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use vaultgate_types::{ToolDescriptor, ToolResult};

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::gateway_tool::{GatewayTool, ToolOutput};
use crate::input::{self, ItemRef, optional_alias};

use super::link::{commit, exchange, required_str};
use super::{UPSTREAM_WRITE, alias_schema, describe, gated, item_ref_schema};

const DEFAULT_INSTITUTION: &str = "ins_109508";

fn default_institution() -> String {
    DEFAULT_INSTITUTION.to_string()
}

fn default_products() -> Vec<String> {
    vec!["transactions".to_string()]
}

#[derive(Debug, Serialize, Deserialize)]
struct SandboxOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    webhook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    override_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    override_password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatePublicTokenArgs {
    #[serde(default = "default_institution")]
    institution_id: String,
    #[serde(default = "default_products")]
    initial_products: Vec<String>,
    #[serde(default)]
    options: Option<SandboxOptions>,
    #[serde(default, deserialize_with = "optional_alias")]
    alias: Option<ItemRef>,
}

/// Create, exchange and store a sandbox item in one call.
pub struct SandboxCreatePublicTokenTool {
    descriptor: ToolDescriptor,
}

impl SandboxCreatePublicTokenTool {
    pub fn new() -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "institution_id": {
                    "type": "string",
                    "default": DEFAULT_INSTITUTION,
                    "description": "Sandbox institution ID (default \"ins_109508\" for First Platypus Bank)"
                },
                "initial_products": {
                    "type": "array",
                    "items": {"type": "string"},
                    "default": ["transactions"],
                    "description": "Products to enable (default [\"transactions\"])"
                },
                "options": {
                    "type": "object",
                    "properties": {
                        "webhook": {"type": "string"},
                        "override_username": {"type": "string", "description": "Sandbox username (e.g. \"user_good\")"},
                        "override_password": {"type": "string"}
                    },
                    "description": "Optional sandbox configuration"
                },
                "alias": alias_schema()
            }
        });
        Self {
            descriptor: describe(
                "sandbox_create_public_token",
                "Create a sandbox item in one step: creates a public token, exchanges it, and stores the access token in the vault. Returns an opaque item_ref alias.",
                schema,
                UPSTREAM_WRITE,
            ),
        }
    }
}

impl Default for SandboxCreatePublicTokenTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayTool for SandboxCreatePublicTokenTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        let args: CreatePublicTokenArgs = input::parse(self.name(), args)?;
        if args.initial_products.is_empty() {
            return Err(ToolError::validation(
                self.name(),
                "initial_products must name at least one product",
            ));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError> {
        let args: CreatePublicTokenArgs = input::parse(self.name(), &args)?;

        let created = ctx
            .upstream
            .request(
                "/sandbox/public_token/create",
                input::request_body(json!({
                    "institution_id": args.institution_id,
                    "initial_products": args.initial_products,
                    "options": args.options,
                })),
            )
            .await?;
        let public_token = required_str(&created, "public_token")?;

        let exchanged = exchange(ctx, &public_token).await?;
        let alias = commit(
            ctx,
            args.alias.as_ref(),
            exchanged,
            Some(&args.institution_id),
        )
        .await?;
        tracing::info!(alias = %alias, institution_id = %args.institution_id, "Sandbox item stored");

        Ok(ToolResult::text(format!(
            "Sandbox item created and stored. Use item_ref \"{alias}\" for subsequent API calls.\nInstitution: {}\nProducts: {}",
            args.institution_id,
            args.initial_products.join(", ")
        ))
        .into())
    }
}

#[derive(Debug, Deserialize)]
struct FireWebhookArgs {
    item_ref: ItemRef,
    webhook_type: String,
    webhook_code: String,
}

pub struct SandboxFireWebhookTool {
    descriptor: ToolDescriptor,
}

impl SandboxFireWebhookTool {
    pub fn new() -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "item_ref": item_ref_schema("The item reference alias for the Item"),
                "webhook_type": {"type": "string", "description": "Webhook type (e.g. \"TRANSACTIONS\")"},
                "webhook_code": {"type": "string", "description": "Webhook code (e.g. \"SYNC_UPDATES_AVAILABLE\")"}
            },
            "required": ["item_ref", "webhook_type", "webhook_code"]
        });
        Self {
            descriptor: gated(describe(
                "sandbox_fire_webhook",
                "Fire a test webhook in sandbox to simulate webhook delivery.",
                schema,
                UPSTREAM_WRITE,
            )),
        }
    }
}

impl Default for SandboxFireWebhookTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayTool for SandboxFireWebhookTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        input::parse::<FireWebhookArgs>(self.name(), args).map(drop)
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError> {
        let args: FireWebhookArgs = input::parse(self.name(), &args)?;
        let access_token = ctx.resolve_alias(args.item_ref.as_str()).await?;
        let raw = ctx
            .upstream
            .request(
                "/sandbox/item/fire_webhook",
                json!({
                    "access_token": access_token,
                    "webhook_type": args.webhook_type,
                    "webhook_code": args.webhook_code,
                }),
            )
            .await?;
        Ok(ToolResult::json(&raw).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockUpstream, context};
    use vaultgate_storage::VaultEntry;

    fn happy_upstream() -> MockUpstream {
        MockUpstream::new()
            .with_response(
                "/sandbox/public_token/create",
                json!({"public_token": "public-sandbox-1"}),
            )
            .with_response(
                "/item/public_token/exchange",
                json!({"access_token": "access-sandbox-1", "item_id": "Zx9Ab7Cd3Ef"}),
            )
    }

    #[tokio::test]
    async fn test_create_exchange_store_in_order() {
        let (ctx, upstream) = context(happy_upstream());
        let out = SandboxCreatePublicTokenTool::new()
            .execute(&ctx, json!({"alias": "chase-checking"}))
            .await
            .unwrap();

        let calls = upstream.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "/sandbox/public_token/create");
        assert_eq!(calls[0].1["institution_id"], "ins_109508");
        assert_eq!(calls[0].1["initial_products"], json!(["transactions"]));
        assert_eq!(calls[1].1["public_token"], "public-sandbox-1");

        let ToolOutput::Result(result) = out else {
            panic!("expected plain result");
        };
        assert!(result.content[0].as_text().starts_with(
            "Sandbox item created and stored. Use item_ref \"chase-checking\""
        ));
        let listed = ctx.vault.list().await.unwrap();
        assert_eq!(
            listed["chase-checking"].institution_id.as_deref(),
            Some("ins_109508")
        );
    }

    #[tokio::test]
    async fn test_create_failure_aborts_before_exchange() {
        let upstream = MockUpstream::new()
            .with_error("/sandbox/public_token/create", "INVALID_INSTITUTION");
        let (ctx, upstream) = context(upstream);

        let err = SandboxCreatePublicTokenTool::new()
            .execute(&ctx, json!({"institution_id": "ins_bad"}))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ToolError::Upstream(_)));
        assert_eq!(upstream.calls_to("/item/public_token/exchange"), 0);
        assert!(ctx.vault.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exchange_failure_leaves_vault_empty() {
        let upstream = MockUpstream::new()
            .with_response("/sandbox/public_token/create", json!({"public_token": "p"}))
            .with_error("/item/public_token/exchange", "INVALID_PUBLIC_TOKEN");
        let (ctx, _) = context(upstream);

        assert!(
            SandboxCreatePublicTokenTool::new()
                .execute(&ctx, json!({}))
                .await
                .is_err()
        );
        assert!(ctx.vault.list().await.unwrap().is_empty());
    }

    #[test]
    fn test_rejects_bad_alias_and_empty_products() {
        let tool = SandboxCreatePublicTokenTool::new();
        assert!(tool.validate(&json!({"alias": "has space"})).is_err());
        assert!(tool.validate(&json!({"initial_products": []})).is_err());
        assert!(tool.validate(&json!(null)).is_ok());
    }

    #[tokio::test]
    async fn test_fire_webhook() {
        let upstream = MockUpstream::new()
            .with_response("/sandbox/item/fire_webhook", json!({"webhook_fired": true}));
        let (ctx, upstream) = context(upstream);
        ctx.vault
            .store("a", &VaultEntry::new("tok", None))
            .await
            .unwrap();

        SandboxFireWebhookTool::new()
            .execute(
                &ctx,
                json!({"item_ref": "a", "webhook_type": "TRANSACTIONS", "webhook_code": "SYNC_UPDATES_AVAILABLE"}),
            )
            .await
            .unwrap();
        assert_eq!(upstream.calls()[0].1["webhook_code"], "SYNC_UPDATES_AVAILABLE");
        assert!(SandboxFireWebhookTool::new().descriptor().needs_approval);
    }
}
