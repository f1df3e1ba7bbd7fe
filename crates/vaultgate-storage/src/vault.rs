//! Alias → access-token vault.
//!
//! Access tokens go in through [`Vault::store`] and come out only through
//! [`Vault::resolve`]. Listing returns [`VaultMetadata`], which has no token
//! field at all.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Namespace, Result};

/// Storage key prefix for vault entries.
pub const TOKEN_KEY_PREFIX: &str = "vault:token:";

/// A stored access token plus item metadata.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VaultEntry {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_id: Option<String>,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

impl VaultEntry {
    /// New entry stamped with the current time.
    pub fn new(access_token: impl Into<String>, item_id: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            item_id,
            institution_id: None,
            created_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }

    pub fn with_institution(mut self, institution_id: impl Into<String>) -> Self {
        self.institution_id = Some(institution_id.into());
        self
    }

    /// Everything except the token.
    pub fn metadata(&self) -> VaultMetadata {
        VaultMetadata {
            item_id: self.item_id.clone(),
            institution_id: self.institution_id.clone(),
            created_at: self.created_at.clone(),
        }
    }
}

impl fmt::Debug for VaultEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultEntry")
            .field("access_token", &"<redacted>")
            .field("item_id", &self.item_id)
            .field("institution_id", &self.institution_id)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Public view of a vault entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VaultMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_id: Option<String>,
    pub created_at: String,
}

/// Alias for a freshly exchanged item: the explicit name if given,
/// otherwise `item-<first 8 chars of item_id>`.
pub fn derive_alias(explicit: Option<&str>, item_id: &str) -> String {
    match explicit.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            let short: String = item_id.chars().take(8).collect();
            format!("item-{short}")
        }
    }
}

/// Durable alias → access-token store for one session.
#[derive(Clone)]
pub struct Vault {
    ns: Namespace,
}

impl Vault {
    pub fn new(ns: Namespace) -> Self {
        Self { ns }
    }

    fn key(alias: &str) -> String {
        format!("{TOKEN_KEY_PREFIX}{alias}")
    }

    /// Insert or overwrite the entry for `alias`.
    pub async fn store(&self, alias: &str, entry: &VaultEntry) -> Result<()> {
        self.ns.put(&Self::key(alias), entry).await?;
        tracing::debug!(namespace = %self.ns.name(), alias, "Vault entry stored");
        Ok(())
    }

    /// The access token for `alias`, if stored.
    pub async fn resolve(&self, alias: &str) -> Result<Option<String>> {
        let entry: Option<VaultEntry> = self.ns.get(&Self::key(alias)).await?;
        Ok(entry.map(|e| e.access_token))
    }

    pub async fn has(&self, alias: &str) -> Result<bool> {
        let entry: Option<VaultEntry> = self.ns.get(&Self::key(alias)).await?;
        Ok(entry.is_some())
    }

    /// Remove the entry for `alias`. Returns whether one existed.
    pub async fn delete(&self, alias: &str) -> Result<bool> {
        let removed = self.ns.delete(&Self::key(alias)).await?;
        tracing::debug!(namespace = %self.ns.name(), alias, removed, "Vault entry deleted");
        Ok(removed)
    }

    /// All aliases with their metadata, sorted by alias.
    pub async fn list(&self) -> Result<BTreeMap<String, VaultMetadata>> {
        let rows: Vec<(String, VaultEntry)> = self.ns.list_prefix(TOKEN_KEY_PREFIX).await?;
        Ok(rows
            .into_iter()
            .map(|(key, entry)| {
                let alias = key[TOKEN_KEY_PREFIX.len()..].to_string();
                (alias, entry.metadata())
            })
            .collect())
    }
}
