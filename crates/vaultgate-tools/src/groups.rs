//! Tool group definitions.
//!
//! Groups provide shorthands for sets of related tools, referenced with
//! `group:name` syntax in the `tools.deny` configuration.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// All built-in tool groups, keyed by name without the `group:` prefix.
pub static TOOL_GROUPS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("vault", &["list_items", "remove_stored_item"][..]);
    m.insert(
        "disclosure",
        &["get_disclosure_settings", "set_disclosure_level"][..],
    );
    m.insert(
        "sandbox",
        &[
            "sandbox_create_public_token",
            "sandbox_reset_login",
            "sandbox_fire_webhook",
        ][..],
    );
    m.insert(
        "link",
        &["create_link_token", "exchange_public_token", "get_link_session"][..],
    );
    m.insert("items", &["get_item", "remove_item"][..]);
    m.insert(
        "data",
        &[
            "get_accounts",
            "get_auth",
            "get_balance",
            "get_transactions_sync",
            "get_identity",
            "get_investments_holdings",
            "get_investments_transactions",
            "get_liabilities",
        ][..],
    );
    m.insert(
        "transfer",
        &["create_transfer", "get_transfer", "list_transfers"][..],
    );
    m
});

/// Expand a single name that may be a `group:xxx` reference.
///
/// Unknown groups and plain names are returned as-is.
pub fn expand_name(name: &str) -> Vec<String> {
    if let Some(group_name) = name.strip_prefix("group:") {
        if let Some(tools) = TOOL_GROUPS.get(group_name) {
            return tools.iter().map(|s| s.to_string()).collect();
        }
    }
    vec![name.to_string()]
}

/// Expand a list of names, resolving any `group:xxx` references.
pub fn expand_names(names: &[String]) -> Vec<String> {
    names.iter().flat_map(|n| expand_name(n)).collect()
}
