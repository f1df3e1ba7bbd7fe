//! `get_transactions_sync` and `get_investments_transactions`.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use vaultgate_types::{DataCategory, ToolDescriptor};

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::gateway_tool::{GatewayTool, ToolOutput};
use crate::input::{self, ItemRef};
use crate::summarize;

use super::{UPSTREAM_READ, describe, item_ref_schema, sensitive};

fn default_page() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

/// Accepts `YYYY-MM-DD` only.
pub(crate) fn check_date(tool: &str, field: &str, value: &str) -> Result<(), ToolError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(drop)
        .map_err(|_| ToolError::validation(tool, format!("{field} must be YYYY-MM-DD, got {value:?}")))
}

pub(crate) fn check_count(tool: &str, count: u32, max: u32) -> Result<(), ToolError> {
    if count == 0 || count > max {
        return Err(ToolError::validation(
            tool,
            format!("count must be between 1 and {max}, got {count}"),
        ));
    }
    Ok(())
}

// ──────────────────── get_transactions_sync ────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct SyncOptions {
    #[serde(default = "default_true")]
    include_personal_finance_category: bool,
}

#[derive(Debug, Deserialize)]
struct TransactionsSyncArgs {
    item_ref: ItemRef,
    #[serde(default)]
    cursor: Option<String>,
    #[serde(default = "default_page")]
    count: u32,
    #[serde(default)]
    options: Option<SyncOptions>,
}

pub struct TransactionsSyncTool {
    descriptor: ToolDescriptor,
}

impl TransactionsSyncTool {
    pub fn new() -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "item_ref": item_ref_schema("The item reference alias for the Item"),
                "cursor": {
                    "type": "string",
                    "description": "Cursor from previous sync call. Omit for initial sync to get all transactions."
                },
                "count": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 500,
                    "default": 100,
                    "description": "Number of transactions to return per page (default 100)"
                },
                "options": {
                    "type": "object",
                    "properties": {
                        "include_personal_finance_category": {
                            "type": "boolean",
                            "default": true,
                            "description": "Include detailed category info"
                        }
                    }
                }
            },
            "required": ["item_ref"]
        });
        Self {
            descriptor: sensitive(
                describe(
                    "get_transactions_sync",
                    "Get incremental transaction updates using the sync endpoint. Returns added, modified, and removed transactions since the last cursor.",
                    schema,
                    UPSTREAM_READ,
                ),
                DataCategory::Transactions,
            ),
        }
    }

    fn parse(&self, args: &Value) -> Result<TransactionsSyncArgs, ToolError> {
        let parsed: TransactionsSyncArgs = input::parse(self.name(), args)?;
        check_count(self.name(), parsed.count, 500)?;
        Ok(parsed)
    }
}

impl Default for TransactionsSyncTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayTool for TransactionsSyncTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        self.parse(args).map(drop)
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError> {
        let args = self.parse(&args)?;
        let access_token = ctx.resolve_alias(args.item_ref.as_str()).await?;

        // Blank cursor means initial sync
        let cursor = args.cursor.filter(|c| !c.is_empty());
        let raw = ctx
            .upstream
            .request(
                "/transactions/sync",
                input::request_body(json!({
                    "access_token": access_token,
                    "cursor": cursor,
                    "count": args.count,
                    "options": args.options,
                })),
            )
            .await?;

        Ok(ToolOutput::Sensitive {
            raw,
            summarize: summarize::transactions_sync,
        })
    }
}

// ──────────────────── get_investments_transactions ────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct InvestmentsTransactionsOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    account_ids: Option<Vec<String>>,
    #[serde(default = "default_page")]
    count: u32,
    #[serde(default)]
    offset: u32,
}

#[derive(Debug, Deserialize)]
struct InvestmentsTransactionsArgs {
    item_ref: ItemRef,
    start_date: String,
    end_date: String,
    #[serde(default)]
    options: Option<InvestmentsTransactionsOptions>,
}

pub struct InvestmentsTransactionsTool {
    descriptor: ToolDescriptor,
}

impl InvestmentsTransactionsTool {
    pub fn new() -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "item_ref": item_ref_schema("The item reference alias for the Item"),
                "start_date": {"type": "string", "format": "date", "description": "Start date in YYYY-MM-DD format"},
                "end_date": {"type": "string", "format": "date", "description": "End date in YYYY-MM-DD format"},
                "options": {
                    "type": "object",
                    "properties": {
                        "account_ids": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Filter to specific account IDs"
                        },
                        "count": {"type": "integer", "minimum": 1, "maximum": 500, "default": 100, "description": "Number of transactions (default 100)"},
                        "offset": {"type": "integer", "minimum": 0, "default": 0, "description": "Pagination offset"}
                    }
                }
            },
            "required": ["item_ref", "start_date", "end_date"]
        });
        Self {
            descriptor: sensitive(
                describe(
                    "get_investments_transactions",
                    "Get investment transactions (buys, sells, dividends, etc.) for an Item. Requires the 'investments' product.",
                    schema,
                    UPSTREAM_READ,
                ),
                DataCategory::Investments,
            ),
        }
    }

    fn parse(&self, args: &Value) -> Result<InvestmentsTransactionsArgs, ToolError> {
        let parsed: InvestmentsTransactionsArgs = input::parse(self.name(), args)?;
        check_date(self.name(), "start_date", &parsed.start_date)?;
        check_date(self.name(), "end_date", &parsed.end_date)?;
        if parsed.start_date > parsed.end_date {
            return Err(ToolError::validation(
                self.name(),
                "start_date must not be after end_date",
            ));
        }
        if let Some(options) = &parsed.options {
            check_count(self.name(), options.count, 500)?;
        }
        Ok(parsed)
    }
}

impl Default for InvestmentsTransactionsTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayTool for InvestmentsTransactionsTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        self.parse(args).map(drop)
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError> {
        let args = self.parse(&args)?;
        let access_token = ctx.resolve_alias(args.item_ref.as_str()).await?;

        let raw = ctx
            .upstream
            .request(
                "/investments/transactions/get",
                input::request_body(json!({
                    "access_token": access_token,
                    "start_date": args.start_date,
                    "end_date": args.end_date,
                    "options": args.options,
                })),
            )
            .await?;

        Ok(ToolOutput::Sensitive {
            raw,
            summarize: summarize::investments_transactions,
        })
    }
}
