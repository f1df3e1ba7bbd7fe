//! `get_disclosure_settings` and `set_disclosure_level`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use vaultgate_types::{DisclosureCategory, DisclosureLevel, DisclosurePreferences, ToolDescriptor, ToolResult};

use crate::audience;
use crate::context::ToolContext;
use crate::error::ToolError;
use crate::gateway_tool::{GatewayTool, ToolOutput};
use crate::input;

use super::{LOCAL_READ, LOCAL_WRITE, describe};

/// Categories that always use a fixed summary.
pub const FIXED_CATEGORIES: [&str; 3] = ["accounts", "auth", "balance"];

/// What the assistant can see for a category at a level.
pub fn visibility(category: DisclosureCategory, level: DisclosureLevel) -> &'static str {
    use DisclosureCategory::*;
    use DisclosureLevel::*;
    match (category, level) {
        (Transactions, Summary) => {
            "The assistant can only see transaction counts (e.g. \"5 transactions added\")."
        }
        (Transactions, Detailed) => {
            "The assistant can now see individual transaction details: merchant names, amounts, dates, and categories."
        }
        (Investments, Summary) => {
            "The assistant can only see investment counts (e.g. \"3 holdings across 1 account\")."
        }
        (Investments, Detailed) => {
            "The assistant can now see individual holdings and investment transactions: ticker symbols, quantities, values, and dates."
        }
        (Liabilities, Summary) => {
            "The assistant can only see liability counts (e.g. \"2 credit cards, 1 mortgage\")."
        }
        (Liabilities, Detailed) => {
            "The assistant can now see individual liability details: balances, interest rates, and payment amounts."
        }
        (Identity, Summary) => {
            "The assistant can only see owner counts (e.g. \"2 owners\"). All personal details are hidden."
        }
        (Identity, Detailed) => {
            "The assistant can now see first names only. Addresses, SSNs, phone numbers, and emails remain hidden."
        }
    }
}

fn settings_lines(prefs: &DisclosurePreferences) -> String {
    DisclosureCategory::ALL
        .iter()
        .map(|c| format!("- {}: {}", c, prefs.get(*c)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct GetDisclosureSettingsTool {
    descriptor: ToolDescriptor,
}

impl GetDisclosureSettingsTool {
    pub fn new() -> Self {
        Self {
            descriptor: describe(
                "get_disclosure_settings",
                "Show current data disclosure level for each configurable category. Categories set to 'detailed' allow the assistant to see individual records; 'summary' shows only counts and totals.",
                json!({"type": "object", "properties": {}}),
                LOCAL_READ,
            ),
        }
    }
}

impl Default for GetDisclosureSettingsTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayTool for GetDisclosureSettingsTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn validate(&self, _args: &Value) -> Result<(), ToolError> {
        Ok(())
    }

    async fn execute(&self, ctx: &ToolContext, _args: Value) -> Result<ToolOutput, ToolError> {
        let prefs = ctx.disclosure.get_preferences().await?;
        let body = json!({
            "preferences": prefs,
            "configurable": DisclosureCategory::ALL,
            "fixed": FIXED_CATEGORIES,
            "hint": "Use set_disclosure_level to change a category.",
        });
        Ok(ToolResult::json(&body).into())
    }
}

#[derive(Debug, Deserialize)]
struct SetDisclosureLevelArgs {
    category: DisclosureCategory,
    level: DisclosureLevel,
}

pub struct SetDisclosureLevelTool {
    descriptor: ToolDescriptor,
}

impl SetDisclosureLevelTool {
    pub fn new() -> Self {
        Self {
            descriptor: describe(
                "set_disclosure_level",
                "Change the data disclosure level for a category. 'summary' shows only counts/totals to the assistant; 'detailed' includes individual records (merchant names, amounts, etc). Auth, accounts, and balance are not configurable.",
                json!({
                    "type": "object",
                    "properties": {
                        "category": {
                            "type": "string",
                            "enum": DisclosureCategory::ALL,
                            "description": "The data category to configure"
                        },
                        "level": {
                            "type": "string",
                            "enum": ["summary", "detailed"],
                            "description": "Disclosure level: 'summary' (counts only) or 'detailed' (individual records)"
                        }
                    },
                    "required": ["category", "level"]
                }),
                LOCAL_WRITE,
            ),
        }
    }
}

impl Default for SetDisclosureLevelTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayTool for SetDisclosureLevelTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        input::parse::<SetDisclosureLevelArgs>(self.name(), args).map(drop)
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError> {
        let args: SetDisclosureLevelArgs = input::parse(self.name(), &args)?;
        let change = ctx.disclosure.set_level(args.category, args.level).await?;

        let assistant = format!(
            "Updated {} to \"{}\". {}\n\nCurrent settings:\n{}",
            args.category,
            args.level,
            visibility(args.category, args.level),
            settings_lines(&change.preferences)
        );
        let user = format!(
            "Disclosure changed: {} from {} to {}.",
            args.category, change.previous, args.level
        );
        Ok(audience::split(assistant, user).into())
    }
}
