//! Transfer tools. `create_transfer` moves money and is always gated.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use vaultgate_types::{ToolDescriptor, ToolResult};

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::gateway_tool::{GatewayTool, ToolOutput};
use crate::input::{self, ItemRef};

use super::transactions::check_count;
use super::{UPSTREAM_DESTRUCTIVE, UPSTREAM_READ, describe, gated, item_ref_schema};

/// ACH descriptions are truncated by the network beyond this.
const ACH_DESCRIPTION_MAX: usize = 15;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum TransferType {
    Debit,
    Credit,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum TransferNetwork {
    Ach,
    SameDayAch,
    Wire,
}

impl TransferNetwork {
    fn is_ach(self) -> bool {
        matches!(self, TransferNetwork::Ach | TransferNetwork::SameDayAch)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum AchClass {
    #[default]
    Ppd,
    Ccd,
    Web,
}

#[derive(Debug, Serialize, Deserialize)]
struct TransferUser {
    legal_name: String,
}

#[derive(Debug, Deserialize)]
struct CreateTransferArgs {
    item_ref: ItemRef,
    account_id: String,
    #[serde(rename = "type")]
    kind: TransferType,
    network: TransferNetwork,
    amount: String,
    description: String,
    #[serde(default)]
    ach_class: AchClass,
    user: TransferUser,
}

/// Positive decimal with at most two fractional digits, e.g. `"100.00"`.
fn check_amount(tool: &str, amount: &str) -> Result<(), ToolError> {
    let invalid = || {
        ToolError::validation(
            tool,
            format!("amount must be a positive decimal string with at most 2 decimal places, got {amount:?}"),
        )
    };
    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || !digits(whole) || !digits(fraction) || fraction.len() > 2 {
        return Err(invalid());
    }
    if amount.contains('.') && fraction.is_empty() {
        return Err(invalid());
    }
    if amount.bytes().all(|b| b == b'0' || b == b'.') {
        return Err(invalid());
    }
    Ok(())
}

pub struct CreateTransferTool {
    descriptor: ToolDescriptor,
}

impl CreateTransferTool {
    pub fn new() -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "item_ref": item_ref_schema("The item reference alias for the Item"),
                "account_id": {"type": "string", "description": "The account ID to transfer from/to"},
                "type": {
                    "type": "string",
                    "enum": ["debit", "credit"],
                    "description": "Transfer type: debit (pull from user) or credit (push to user)"
                },
                "network": {
                    "type": "string",
                    "enum": ["ach", "same-day-ach", "wire"],
                    "description": "Transfer network"
                },
                "amount": {
                    "type": "string",
                    "pattern": "^[0-9]+(\\.[0-9]{1,2})?$",
                    "description": "Transfer amount as a string (e.g. \"100.00\")"
                },
                "description": {"type": "string", "description": "Transfer description (max 15 chars for ACH)"},
                "ach_class": {
                    "type": "string",
                    "enum": ["ppd", "ccd", "web"],
                    "default": "ppd",
                    "description": "ACH class code"
                },
                "user": {
                    "type": "object",
                    "properties": {
                        "legal_name": {"type": "string", "description": "User's legal name"}
                    },
                    "required": ["legal_name"],
                    "description": "Transfer user info"
                }
            },
            "required": ["item_ref", "account_id", "type", "network", "amount", "description", "user"]
        });
        Self {
            descriptor: gated(describe(
                "create_transfer",
                "Initiate a bank transfer (ACH or wire). Requires Transfer product setup.",
                schema,
                UPSTREAM_DESTRUCTIVE,
            )),
        }
    }

    fn parse(&self, args: &Value) -> Result<CreateTransferArgs, ToolError> {
        let parsed: CreateTransferArgs = input::parse(self.name(), args)?;
        check_amount(self.name(), &parsed.amount)?;
        if parsed.network.is_ach() && parsed.description.chars().count() > ACH_DESCRIPTION_MAX {
            return Err(ToolError::validation(
                self.name(),
                format!("description must be at most {ACH_DESCRIPTION_MAX} characters for ACH transfers"),
            ));
        }
        Ok(parsed)
    }
}

impl Default for CreateTransferTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayTool for CreateTransferTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        self.parse(args).map(drop)
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError> {
        let args = self.parse(&args)?;
        let access_token = ctx.resolve_alias(args.item_ref.as_str()).await?;

        tracing::info!(
            item_ref = %args.item_ref,
            network = ?args.network,
            kind = ?args.kind,
            amount = %args.amount,
            "Creating transfer"
        );
        let raw = ctx
            .upstream
            .request(
                "/transfer/create",
                json!({
                    "access_token": access_token,
                    "account_id": args.account_id,
                    "type": args.kind,
                    "network": args.network,
                    "amount": args.amount,
                    "description": args.description,
                    "ach_class": args.ach_class,
                    "user": args.user,
                }),
            )
            .await?;
        Ok(ToolResult::json(&raw).into())
    }
}

#[derive(Debug, Deserialize)]
struct GetTransferArgs {
    transfer_id: String,
}

pub struct GetTransferTool {
    descriptor: ToolDescriptor,
}

impl GetTransferTool {
    pub fn new() -> Self {
        Self {
            descriptor: describe(
                "get_transfer",
                "Get the status and details of a specific transfer.",
                json!({
                    "type": "object",
                    "properties": {
                        "transfer_id": {"type": "string", "description": "The transfer ID"}
                    },
                    "required": ["transfer_id"]
                }),
                UPSTREAM_READ,
            ),
        }
    }
}

impl Default for GetTransferTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayTool for GetTransferTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        input::parse::<GetTransferArgs>(self.name(), args).map(drop)
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError> {
        let args: GetTransferArgs = input::parse(self.name(), &args)?;
        let raw = ctx
            .upstream
            .request("/transfer/get", json!({"transfer_id": args.transfer_id}))
            .await?;
        Ok(ToolResult::json(&raw).into())
    }
}

fn default_transfer_page() -> u32 {
    25
}

#[derive(Debug, Deserialize)]
struct ListTransfersArgs {
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default = "default_transfer_page")]
    count: u32,
    #[serde(default)]
    offset: u32,
}

pub struct ListTransfersTool {
    descriptor: ToolDescriptor,
}

impl ListTransfersTool {
    pub fn new() -> Self {
        Self {
            descriptor: describe(
                "list_transfers",
                "List recent transfers with optional filters.",
                json!({
                    "type": "object",
                    "properties": {
                        "start_date": {"type": "string", "description": "Start date in ISO 8601 format"},
                        "end_date": {"type": "string", "description": "End date in ISO 8601 format"},
                        "count": {"type": "integer", "minimum": 1, "maximum": 25, "default": 25, "description": "Number of transfers (default 25)"},
                        "offset": {"type": "integer", "minimum": 0, "default": 0, "description": "Pagination offset"}
                    }
                }),
                UPSTREAM_READ,
            ),
        }
    }

    fn parse(&self, args: &Value) -> Result<ListTransfersArgs, ToolError> {
        let parsed: ListTransfersArgs = input::parse(self.name(), args)?;
        check_count(self.name(), parsed.count, 25)?;
        Ok(parsed)
    }
}

impl Default for ListTransfersTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayTool for ListTransfersTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        self.parse(args).map(drop)
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError> {
        let args = self.parse(&args)?;
        let raw = ctx
            .upstream
            .request(
                "/transfer/list",
                input::request_body(json!({
                    "start_date": args.start_date,
                    "end_date": args.end_date,
                    "count": args.count,
                    "offset": args.offset,
                })),
            )
            .await?;
        Ok(ToolResult::json(&raw).into())
    }
}
