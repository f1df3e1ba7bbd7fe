//! Link tools and the shared public-token exchange step.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use vaultgate_storage::{VaultEntry, derive_alias};
use vaultgate_types::{ToolDescriptor, ToolResult};
use vaultgate_upstream::UpstreamError;

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::gateway_tool::{GatewayTool, ToolOutput};
use crate::input::{self, ItemRef, optional_alias};

use super::{UPSTREAM_READ, UPSTREAM_WRITE, alias_schema, describe, item_ref_schema};

/// Result of `/item/public_token/exchange`.
#[derive(Deserialize)]
pub(crate) struct Exchanged {
    pub access_token: String,
    pub item_id: String,
}

fn missing_field(field: &str) -> UpstreamError {
    UpstreamError::Decode {
        status: 200,
        message: format!("response is missing `{field}`"),
    }
}

/// Pull a required string field out of an upstream payload.
pub(crate) fn required_str(raw: &Value, field: &str) -> Result<String, UpstreamError> {
    raw.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| missing_field(field))
}

/// Trade a public token for an access token. Writes nothing.
pub(crate) async fn exchange(ctx: &ToolContext, public_token: &str) -> Result<Exchanged, ToolError> {
    let raw = ctx
        .upstream
        .request(
            "/item/public_token/exchange",
            json!({"public_token": public_token}),
        )
        .await?;
    Ok(Exchanged {
        access_token: required_str(&raw, "access_token")?,
        item_id: required_str(&raw, "item_id")?,
    })
}

/// Store an exchanged item under its alias. Returns the alias used.
pub(crate) async fn commit(
    ctx: &ToolContext,
    alias: Option<&ItemRef>,
    exchanged: Exchanged,
    institution_id: Option<&str>,
) -> Result<String, ToolError> {
    let alias = derive_alias(alias.map(ItemRef::as_str), &exchanged.item_id);
    let mut entry = VaultEntry::new(exchanged.access_token, Some(exchanged.item_id));
    if let Some(institution_id) = institution_id {
        entry = entry.with_institution(institution_id);
    }
    ctx.vault.store(&alias, &entry).await?;
    Ok(alias)
}

// ──────────────────── create_link_token ────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct LinkUser {
    client_user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct HostedLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completion_redirect_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url_lifetime_seconds: Option<u64>,
}

fn default_country_codes() -> Vec<String> {
    vec!["US".to_string()]
}

fn default_language() -> String {
    "en".to_string()
}

fn default_client_name() -> String {
    "Plaid MCP".to_string()
}

#[derive(Debug, Deserialize)]
struct CreateLinkTokenArgs {
    user: LinkUser,
    #[serde(default)]
    products: Option<Vec<String>>,
    #[serde(default = "default_country_codes")]
    country_codes: Vec<String>,
    #[serde(default = "default_language")]
    language: String,
    #[serde(default = "default_client_name")]
    client_name: String,
    #[serde(default)]
    redirect_uri: Option<String>,
    #[serde(default)]
    webhook: Option<String>,
    #[serde(default)]
    hosted_link: Option<HostedLink>,
    #[serde(default, deserialize_with = "optional_alias")]
    item_ref: Option<ItemRef>,
}

pub struct CreateLinkTokenTool {
    descriptor: ToolDescriptor,
}

impl CreateLinkTokenTool {
    pub fn new() -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "user": {
                    "type": "object",
                    "properties": {
                        "client_user_id": {"type": "string", "description": "Unique identifier for the user"}
                    },
                    "required": ["client_user_id"],
                    "description": "User information"
                },
                "products": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Products to enable (e.g. [\"transactions\", \"auth\"])"
                },
                "country_codes": {
                    "type": "array",
                    "items": {"type": "string"},
                    "default": ["US"],
                    "description": "Country codes (default [\"US\"])"
                },
                "language": {"type": "string", "default": "en", "description": "Language code"},
                "client_name": {"type": "string", "default": "Plaid MCP", "description": "App name shown in Link"},
                "redirect_uri": {"type": "string", "description": "Redirect URI for OAuth flows"},
                "webhook": {"type": "string", "description": "Webhook URL for updates"},
                "hosted_link": {
                    "type": "object",
                    "properties": {
                        "completion_redirect_uri": {"type": "string"},
                        "url_lifetime_seconds": {"type": "integer", "minimum": 0}
                    },
                    "description": "Include to get a hosted_link_url the user can open in a browser."
                },
                "item_ref": item_ref_schema(
                    "Item reference for update mode (re-auth). Resolves to access_token from vault."
                )
            },
            "required": ["user"]
        });
        Self {
            descriptor: describe(
                "create_link_token",
                "Create a Link token to initialize Plaid Link in your app. Required to start the account connection flow.",
                schema,
                UPSTREAM_WRITE,
            ),
        }
    }
}

impl Default for CreateLinkTokenTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayTool for CreateLinkTokenTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        input::parse::<CreateLinkTokenArgs>(self.name(), args).map(drop)
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError> {
        let args: CreateLinkTokenArgs = input::parse(self.name(), &args)?;

        // Update mode
        let access_token = match &args.item_ref {
            Some(alias) => Some(ctx.resolve_alias(alias.as_str()).await?),
            None => None,
        };

        let raw = ctx
            .upstream
            .request(
                "/link/token/create",
                input::request_body(json!({
                    "user": args.user,
                    "products": args.products,
                    "country_codes": args.country_codes,
                    "language": args.language,
                    "client_name": args.client_name,
                    "redirect_uri": args.redirect_uri,
                    "webhook": args.webhook,
                    "hosted_link": args.hosted_link,
                    "access_token": access_token,
                })),
            )
            .await?;
        Ok(ToolResult::json(&raw).into())
    }
}

// ──────────────────── exchange_public_token ────────────────────

#[derive(Debug, Deserialize)]
struct ExchangeArgs {
    public_token: String,
    #[serde(default, deserialize_with = "optional_alias")]
    alias: Option<ItemRef>,
}

pub struct ExchangePublicTokenTool {
    descriptor: ToolDescriptor,
}

impl ExchangePublicTokenTool {
    pub fn new() -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "public_token": {
                    "type": "string",
                    "description": "The public token from Link's onSuccess callback"
                },
                "alias": alias_schema()
            },
            "required": ["public_token"]
        });
        Self {
            descriptor: describe(
                "exchange_public_token",
                "Exchange a public token from Plaid Link for a permanent access token. The token is stored securely in the server vault; only an opaque item_ref alias is returned.",
                schema,
                UPSTREAM_WRITE,
            ),
        }
    }
}

impl Default for ExchangePublicTokenTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayTool for ExchangePublicTokenTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        let args: ExchangeArgs = input::parse(self.name(), args)?;
        if args.public_token.trim().is_empty() {
            return Err(ToolError::validation(self.name(), "public_token must not be empty"));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError> {
        let args: ExchangeArgs = input::parse(self.name(), &args)?;
        let exchanged = exchange(ctx, &args.public_token).await?;
        let alias = commit(ctx, args.alias.as_ref(), exchanged, None).await?;
        tracing::info!(alias = %alias, "Public token exchanged into vault");

        Ok(ToolResult::text(format!(
            "Token exchanged and stored. Use item_ref \"{alias}\" for subsequent API calls."
        ))
        .into())
    }
}

// ──────────────────── get_link_session ────────────────────

#[derive(Debug, Deserialize)]
struct LinkSessionArgs {
    link_token: String,
}

/// `complete` once any Link session reports an added item.
pub(crate) fn session_status(raw: &Value) -> &'static str {
    let complete = raw
        .get("link_sessions")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|s| s.pointer("/results/item_add_results"))
        .filter_map(Value::as_array)
        .any(|results| !results.is_empty());
    if complete { "complete" } else { "pending" }
}

pub struct GetLinkSessionTool {
    descriptor: ToolDescriptor,
}

impl GetLinkSessionTool {
    pub fn new() -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "link_token": {
                    "type": "string",
                    "description": "The link token returned by create_link_token"
                }
            },
            "required": ["link_token"]
        });
        Self {
            descriptor: describe(
                "get_link_session",
                "Check status of a Plaid Link session. Returns public tokens if the user completed the flow. Use with hosted Link to poll for completion.",
                schema,
                UPSTREAM_READ,
            ),
        }
    }
}

impl Default for GetLinkSessionTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayTool for GetLinkSessionTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        input::parse::<LinkSessionArgs>(self.name(), args).map(drop)
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError> {
        let args: LinkSessionArgs = input::parse(self.name(), &args)?;
        let mut raw = ctx
            .upstream
            .request("/link/token/get", json!({"link_token": args.link_token}))
            .await?;

        let status = session_status(&raw);
        if let Value::Object(map) = &mut raw {
            map.insert("session_status".into(), Value::from(status));
        }
        Ok(ToolResult::json(&raw).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockUpstream, context};

    fn exchange_ok() -> Value {
        json!({"access_token": "access-sandbox-1", "item_id": "Abcdefgh12345", "request_id": "r"})
    }

    #[tokio::test]
    async fn test_exchange_stores_under_alias() {
        let upstream =
            MockUpstream::new().with_response("/item/public_token/exchange", exchange_ok());
        let (ctx, _) = context(upstream);

        let out = ExchangePublicTokenTool::new()
            .execute(&ctx, json!({"public_token": "public-1", "alias": "chase-checking"}))
            .await
            .unwrap();
        let ToolOutput::Result(result) = out else {
            panic!("expected plain result");
        };
        let text = result.content[0].as_text();
        assert!(text.contains("\"chase-checking\""));
        assert!(!text.contains("access-sandbox-1"));
        assert_eq!(
            ctx.vault.resolve("chase-checking").await.unwrap().as_deref(),
            Some("access-sandbox-1")
        );
    }

    #[tokio::test]
    async fn test_exchange_derives_alias() {
        let upstream =
            MockUpstream::new().with_response("/item/public_token/exchange", exchange_ok());
        let (ctx, _) = context(upstream);

        ExchangePublicTokenTool::new()
            .execute(&ctx, json!({"public_token": "public-1", "alias": "  "}))
            .await
            .unwrap();
        assert!(ctx.vault.has("item-Abcdefgh").await.unwrap());
    }

    #[tokio::test]
    async fn test_exchange_failure_writes_nothing() {
        let upstream =
            MockUpstream::new().with_error("/item/public_token/exchange", "INVALID_PUBLIC_TOKEN");
        let (ctx, _) = context(upstream);

        let err = ExchangePublicTokenTool::new()
            .execute(&ctx, json!({"public_token": "bad", "alias": "x"}))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ToolError::Upstream(_)));
        assert!(ctx.vault.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exchange_missing_fields_writes_nothing() {
        let upstream = MockUpstream::new()
            .with_response("/item/public_token/exchange", json!({"item_id": "abc"}));
        let (ctx, _) = context(upstream);

        let err = ExchangePublicTokenTool::new()
            .execute(&ctx, json!({"public_token": "p"}))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ToolError::Upstream(UpstreamError::Decode { .. })));
        assert!(ctx.vault.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_link_token_defaults_and_update_mode() {
        let upstream = MockUpstream::new()
            .with_response("/link/token/create", json!({"link_token": "link-1"}));
        let (ctx, upstream) = context(upstream);
        ctx.vault
            .store("a", &VaultEntry::new("tok_a", None))
            .await
            .unwrap();

        CreateLinkTokenTool::new()
            .execute(&ctx, json!({"user": {"client_user_id": "u1"}, "item_ref": "a"}))
            .await
            .unwrap();

        let body = &upstream.calls()[0].1;
        assert_eq!(body["country_codes"], json!(["US"]));
        assert_eq!(body["language"], "en");
        assert_eq!(body["client_name"], "Plaid MCP");
        assert_eq!(body["access_token"], "tok_a");
        assert!(body.get("products").is_none());
    }

    #[test]
    fn test_link_token_item_ref_schema_has_pattern() {
        let descriptor = CreateLinkTokenTool::new().descriptor().clone();
        let item_ref = &descriptor.input_schema["properties"]["item_ref"];
        assert_eq!(item_ref["pattern"], "^[A-Za-z0-9._-]{1,64}$");
        assert!(descriptor.input_schema["required"].as_array().unwrap().iter().all(|r| r != "item_ref"));
    }

    #[tokio::test]
    async fn test_link_token_unknown_item_ref() {
        let (ctx, upstream) = context(MockUpstream::new());
        let err = CreateLinkTokenTool::new()
            .execute(&ctx, json!({"user": {"client_user_id": "u1"}, "item_ref": "ghost"}))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ToolError::UnknownAlias(_)));
        assert!(upstream.calls().is_empty());
    }

    #[test]
    fn test_session_status() {
        assert_eq!(session_status(&json!({})), "pending");
        assert_eq!(
            session_status(&json!({"link_sessions": [{"results": {"item_add_results": []}}]})),
            "pending"
        );
        assert_eq!(
            session_status(&json!({"link_sessions": [
                {"results": {"item_add_results": []}},
                {"results": {"item_add_results": [{"public_token": "p"}]}}
            ]})),
            "complete"
        );
    }

    #[tokio::test]
    async fn test_link_session_output_has_status() {
        let upstream = MockUpstream::new()
            .with_response("/link/token/get", json!({"link_token": "l", "link_sessions": []}));
        let (ctx, _) = context(upstream);
        let out = GetLinkSessionTool::new()
            .execute(&ctx, json!({"link_token": "l"}))
            .await
            .unwrap();
        let ToolOutput::Result(result) = out else {
            panic!("expected plain result");
        };
        let body: Value = serde_json::from_str(result.content[0].as_text()).unwrap();
        assert_eq!(body["session_status"], "pending");
    }
}
