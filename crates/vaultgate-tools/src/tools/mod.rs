//! Tool implementations and the static registry.
//!
//! Each tool implements [`GatewayTool`] and receives session state through
//! a [`crate::ToolContext`] at execution time.

pub mod data;
pub mod disclosure;
pub mod items;
pub mod link;
pub mod sandbox;
pub mod transactions;
pub mod transfer;
pub mod vault;

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::{Value, json};

use vaultgate_types::{DataCategory, ToolAnnotations, ToolDescriptor};

use crate::gateway_tool::GatewayTool;

/// Reads gateway-local state only.
pub(crate) const LOCAL_READ: ToolAnnotations = ToolAnnotations {
    read_only: true,
    destructive: false,
    open_world: false,
};
/// Changes gateway-local state.
pub(crate) const LOCAL_WRITE: ToolAnnotations = ToolAnnotations {
    read_only: false,
    destructive: false,
    open_world: false,
};
pub(crate) const LOCAL_DESTRUCTIVE: ToolAnnotations = ToolAnnotations {
    read_only: false,
    destructive: true,
    open_world: false,
};
/// Reads from the upstream API.
pub(crate) const UPSTREAM_READ: ToolAnnotations = ToolAnnotations {
    read_only: true,
    destructive: false,
    open_world: true,
};
pub(crate) const UPSTREAM_WRITE: ToolAnnotations = ToolAnnotations {
    read_only: false,
    destructive: false,
    open_world: true,
};
pub(crate) const UPSTREAM_DESTRUCTIVE: ToolAnnotations = ToolAnnotations {
    read_only: false,
    destructive: true,
    open_world: true,
};

pub(crate) fn describe(
    name: &str,
    description: &str,
    input_schema: Value,
    annotations: ToolAnnotations,
) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
        annotations,
        needs_approval: false,
        sensitive: None,
    }
}

pub(crate) fn gated(mut descriptor: ToolDescriptor) -> ToolDescriptor {
    descriptor.needs_approval = true;
    descriptor
}

pub(crate) fn sensitive(mut descriptor: ToolDescriptor, category: DataCategory) -> ToolDescriptor {
    descriptor.sensitive = Some(category);
    descriptor
}

pub(crate) fn item_ref_schema(description: &str) -> Value {
    json!({
        "type": "string",
        "pattern": "^[A-Za-z0-9._-]{1,64}$",
        "description": description
    })
}

pub(crate) fn alias_schema() -> Value {
    json!({
        "type": "string",
        "pattern": "^[A-Za-z0-9._-]{1,64}$",
        "description": "Friendly name for this item (e.g. \"chase-checking\"). Auto-generated if omitted."
    })
}

pub(crate) fn account_filter_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "account_ids": {
                "type": "array",
                "items": {"type": "string"},
                "description": "Filter to specific account IDs"
            }
        }
    })
}

/// Registered tools, in catalogue order.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn GatewayTool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Arc<dyn GatewayTool>>) -> Self {
        let index = tools
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name().to_string(), i))
            .collect();
        Self { tools, index }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn GatewayTool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Create every gateway tool.
pub fn create_tools() -> Vec<Arc<dyn GatewayTool>> {
    vec![
        Arc::new(vault::ListItemsTool::new()),
        Arc::new(vault::RemoveStoredItemTool::new()),
        Arc::new(disclosure::GetDisclosureSettingsTool::new()),
        Arc::new(disclosure::SetDisclosureLevelTool::new()),
        Arc::new(sandbox::SandboxCreatePublicTokenTool::new()),
        Arc::new(items::ItemCallTool::sandbox_reset_login()),
        Arc::new(sandbox::SandboxFireWebhookTool::new()),
        Arc::new(link::CreateLinkTokenTool::new()),
        Arc::new(link::ExchangePublicTokenTool::new()),
        Arc::new(link::GetLinkSessionTool::new()),
        Arc::new(items::ItemCallTool::get_item()),
        Arc::new(items::RemoveItemTool::new()),
        Arc::new(data::ItemDataTool::accounts()),
        Arc::new(data::ItemDataTool::auth()),
        Arc::new(data::ItemDataTool::balance()),
        Arc::new(transactions::TransactionsSyncTool::new()),
        Arc::new(data::ItemDataTool::identity()),
        Arc::new(data::ItemDataTool::investments_holdings()),
        Arc::new(transactions::InvestmentsTransactionsTool::new()),
        Arc::new(data::ItemDataTool::liabilities()),
        Arc::new(transfer::CreateTransferTool::new()),
        Arc::new(transfer::GetTransferTool::new()),
        Arc::new(transfer::ListTransfersTool::new()),
    ]
}

static REGISTRY: Lazy<ToolRegistry> = Lazy::new(|| ToolRegistry::new(create_tools()));

/// The process-wide tool registry, built on first use.
pub fn registry() -> &'static ToolRegistry {
    &REGISTRY
}
