use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ──────────────────── Content Types ────────────────────

/// Intended consumer of a content block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    /// The human operator (rendered by the chat UI, never fed to the model).
    User,
    /// The model.
    Assistant,
}

/// Optional annotations attached to a content block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Annotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<Vec<Audience>>,
}

/// Text payload of a content block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextContent {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Annotations>,
}

/// A single block of tool output.
///
/// Wire shape: `{"type": "text", "text": "...", "annotations": {"audience": ["user"]}}`.
/// A block without an audience is visible to both the user and the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text(TextContent),
}

impl ContentBlock {
    /// Untagged text block.
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text(TextContent {
            text: text.into(),
            annotations: None,
        })
    }

    /// Text block restricted to a single audience.
    pub fn for_audience(text: impl Into<String>, audience: Audience) -> Self {
        ContentBlock::Text(TextContent {
            text: text.into(),
            annotations: Some(Annotations {
                audience: Some(vec![audience]),
            }),
        })
    }

    pub fn as_text(&self) -> &str {
        match self {
            ContentBlock::Text(t) => &t.text,
        }
    }

    /// The audience tag, or `None` when the block is untagged.
    pub fn audience(&self) -> Option<&[Audience]> {
        match self {
            ContentBlock::Text(t) => t
                .annotations
                .as_ref()
                .and_then(|a| a.audience.as_deref()),
        }
    }

    /// True when the block is tagged for the user and not for the assistant.
    pub fn is_user_only(&self) -> bool {
        match self.audience() {
            Some(audience) => {
                audience.contains(&Audience::User) && !audience.contains(&Audience::Assistant)
            }
            None => false,
        }
    }
}

/// Result of a tool call: `{content: [...], isError?: true}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError", default, skip_serializing_if = "is_false")]
    pub is_error: bool,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl ToolResult {
    /// Single untagged text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            is_error: false,
        }
    }

    /// Single untagged block holding pretty-printed JSON.
    pub fn json(value: &Value) -> Self {
        let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        Self::text(text)
    }

    /// Single untagged block flagged as an error.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(message)],
            is_error: true,
        }
    }
}

// ──────────────────── Tool Types ────────────────────

/// Behavioural hints advertised with each tool.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolAnnotations {
    #[serde(rename = "readOnlyHint")]
    pub read_only: bool,
    #[serde(rename = "destructiveHint")]
    pub destructive: bool,
    #[serde(rename = "openWorldHint")]
    pub open_world: bool,
}

/// Static description of a tool, fixed at registration time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    pub annotations: ToolAnnotations,
    /// Execution must be approved by the human operator first.
    #[serde(rename = "needsApproval", default)]
    pub needs_approval: bool,
    /// Data category whose successful results are split by audience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitive: Option<DataCategory>,
}

/// Lifecycle of a single tool invocation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ToolCallState {
    InputAvailable,
    ApprovalRequested,
    ApprovalResponded,
    OutputAvailable,
    OutputError,
    OutputDenied,
}

/// A human decision on a pending approval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApprovalDecision {
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ApprovalDecision {
    pub fn approve() -> Self {
        Self {
            approved: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            reason: Some(reason.into()),
        }
    }
}

// ──────────────────── Disclosure Types ────────────────────

/// Category of data returned by a sensitive tool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DataCategory {
    Accounts,
    Auth,
    Balance,
    Transactions,
    Investments,
    Liabilities,
    Identity,
}

impl DataCategory {
    /// The configurable category backing this one, if any.
    ///
    /// Accounts, auth and balance always use a fixed summary.
    pub fn disclosure_category(&self) -> Option<DisclosureCategory> {
        match self {
            DataCategory::Transactions => Some(DisclosureCategory::Transactions),
            DataCategory::Investments => Some(DisclosureCategory::Investments),
            DataCategory::Liabilities => Some(DisclosureCategory::Liabilities),
            DataCategory::Identity => Some(DisclosureCategory::Identity),
            DataCategory::Accounts | DataCategory::Auth | DataCategory::Balance => None,
        }
    }
}

/// Categories whose disclosure level can be configured.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum DisclosureCategory {
    Transactions,
    Investments,
    Liabilities,
    Identity,
}

impl DisclosureCategory {
    pub const ALL: [DisclosureCategory; 4] = [
        DisclosureCategory::Transactions,
        DisclosureCategory::Investments,
        DisclosureCategory::Liabilities,
        DisclosureCategory::Identity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DisclosureCategory::Transactions => "transactions",
            DisclosureCategory::Investments => "investments",
            DisclosureCategory::Liabilities => "liabilities",
            DisclosureCategory::Identity => "identity",
        }
    }
}

impl fmt::Display for DisclosureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisclosureCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Unknown disclosure category: {s}"))
    }
}

/// How much of a sensitive result the assistant may see.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DisclosureLevel {
    /// Counts and totals only.
    #[default]
    Summary,
    /// Individual records, still masked.
    Detailed,
}

impl DisclosureLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisclosureLevel::Summary => "summary",
            DisclosureLevel::Detailed => "detailed",
        }
    }
}

impl fmt::Display for DisclosureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Disclosure level per configurable category.
///
/// Missing fields deserialize to `summary`, so a partially stored map
/// merges with the defaults.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisclosurePreferences {
    #[serde(default)]
    pub transactions: DisclosureLevel,
    #[serde(default)]
    pub investments: DisclosureLevel,
    #[serde(default)]
    pub liabilities: DisclosureLevel,
    #[serde(default)]
    pub identity: DisclosureLevel,
}

impl DisclosurePreferences {
    pub fn get(&self, category: DisclosureCategory) -> DisclosureLevel {
        match category {
            DisclosureCategory::Transactions => self.transactions,
            DisclosureCategory::Investments => self.investments,
            DisclosureCategory::Liabilities => self.liabilities,
            DisclosureCategory::Identity => self.identity,
        }
    }

    pub fn set(&mut self, category: DisclosureCategory, level: DisclosureLevel) {
        match category {
            DisclosureCategory::Transactions => self.transactions = level,
            DisclosureCategory::Investments => self.investments = level,
            DisclosureCategory::Liabilities => self.liabilities = level,
            DisclosureCategory::Identity => self.identity = level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_block_wire_shape() {
        let block = ContentBlock::for_audience("secret", Audience::User);
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(
            value,
            json!({"type": "text", "text": "secret", "annotations": {"audience": ["user"]}})
        );

        let plain = serde_json::to_value(ContentBlock::text("hi")).unwrap();
        assert_eq!(plain, json!({"type": "text", "text": "hi"}));
    }

    #[test]
    fn test_content_block_parse_untagged() {
        let block: ContentBlock = serde_json::from_value(json!({"type": "text", "text": "x"})).unwrap();
        assert!(block.audience().is_none());
        assert!(!block.is_user_only());
    }

    #[test]
    fn test_is_user_only() {
        assert!(ContentBlock::for_audience("a", Audience::User).is_user_only());
        assert!(!ContentBlock::for_audience("a", Audience::Assistant).is_user_only());

        let both: ContentBlock = serde_json::from_value(json!({
            "type": "text",
            "text": "x",
            "annotations": {"audience": ["user", "assistant"]}
        }))
        .unwrap();
        assert!(!both.is_user_only());
    }

    #[test]
    fn test_tool_result_error_flag() {
        let ok = serde_json::to_value(ToolResult::text("done")).unwrap();
        assert!(ok.get("isError").is_none());

        let err = serde_json::to_value(ToolResult::error("boom")).unwrap();
        assert_eq!(err["isError"], true);
        assert_eq!(err["content"][0]["text"], "boom");
    }

    #[test]
    fn test_tool_descriptor_serde() {
        let desc = ToolDescriptor {
            name: "create_transfer".into(),
            description: "Initiate a bank transfer".into(),
            input_schema: json!({"type": "object"}),
            annotations: ToolAnnotations {
                read_only: false,
                destructive: true,
                open_world: true,
            },
            needs_approval: true,
            sensitive: None,
        };
        let value = serde_json::to_value(&desc).unwrap();
        assert_eq!(value["annotations"]["destructiveHint"], true);
        assert_eq!(value["needsApproval"], true);
        assert!(value.get("sensitive").is_none());
    }

    #[test]
    fn test_tool_call_state_serde() {
        let json = serde_json::to_string(&ToolCallState::OutputDenied).unwrap();
        assert_eq!(json, "\"output-denied\"");
        let json = serde_json::to_string(&ToolCallState::ApprovalResponded).unwrap();
        assert_eq!(json, "\"approval-responded\"");
    }

    #[test]
    fn test_disclosure_preferences_default() {
        let prefs = DisclosurePreferences::default();
        for cat in DisclosureCategory::ALL {
            assert_eq!(prefs.get(cat), DisclosureLevel::Summary);
        }
    }

    #[test]
    fn test_disclosure_preferences_partial_merge() {
        let prefs: DisclosurePreferences =
            serde_json::from_value(json!({"identity": "detailed"})).unwrap();
        assert_eq!(prefs.identity, DisclosureLevel::Detailed);
        assert_eq!(prefs.transactions, DisclosureLevel::Summary);
    }

    #[test]
    fn test_disclosure_category_parse() {
        assert_eq!(
            "liabilities".parse::<DisclosureCategory>().unwrap(),
            DisclosureCategory::Liabilities
        );
        assert!("accounts".parse::<DisclosureCategory>().is_err());
    }

    #[test]
    fn test_fixed_categories_not_configurable() {
        assert!(DataCategory::Accounts.disclosure_category().is_none());
        assert!(DataCategory::Auth.disclosure_category().is_none());
        assert!(DataCategory::Balance.disclosure_category().is_none());
        assert_eq!(
            DataCategory::Identity.disclosure_category(),
            Some(DisclosureCategory::Identity)
        );
    }
}
