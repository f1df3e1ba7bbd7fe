//! Tool policy: which registered tools a gateway exposes.
//!
//! Resolution: `profile → expand deny groups → remove denied`. Deny always
//! wins.

use std::collections::HashSet;

use vaultgate_config::{ToolProfile, ToolsConfig};
use vaultgate_types::ToolDescriptor;

use crate::groups;

/// Resolve the effective tool names for a config, sorted.
pub fn resolve_effective_tools<'a>(
    config: &ToolsConfig,
    descriptors: impl IntoIterator<Item = &'a ToolDescriptor>,
) -> Vec<String> {
    let denied: HashSet<String> = groups::expand_names(&config.deny).into_iter().collect();

    let mut result: Vec<String> = descriptors
        .into_iter()
        .filter(|d| match config.profile {
            ToolProfile::Full => true,
            ToolProfile::ReadOnly => d.annotations.read_only,
        })
        .map(|d| d.name.clone())
        .filter(|name| !denied.contains(name))
        .collect();

    result.sort();
    result
}

/// Effective tool set, resolved once and shared by every session.
#[derive(Debug, Clone)]
pub struct ToolPolicy {
    allowed: HashSet<String>,
}

impl ToolPolicy {
    pub fn new<'a>(
        config: &ToolsConfig,
        descriptors: impl IntoIterator<Item = &'a ToolDescriptor>,
    ) -> Self {
        let allowed = resolve_effective_tools(config, descriptors)
            .into_iter()
            .collect();
        Self { allowed }
    }

    /// Every tool in the registry.
    pub fn allow_all() -> Self {
        Self::new(
            &ToolsConfig::default(),
            crate::registry().descriptors(),
        )
    }

    pub fn is_allowed(&self, tool_name: &str) -> bool {
        self.allowed.contains(tool_name)
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}
