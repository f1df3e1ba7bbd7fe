//! Typed tool arguments.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ToolError;

static ALIAS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,64}$").expect("alias pattern is valid"));

/// A vault alias: 1-64 characters of `[A-Za-z0-9._-]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemRef(String);

impl ItemRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ItemRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if ALIAS_RE.is_match(&value) {
            Ok(ItemRef(value))
        } else {
            Err(format!(
                "invalid item_ref {value:?}: use 1-64 letters, digits, '.', '_' or '-'"
            ))
        }
    }
}

impl From<ItemRef> for String {
    fn from(value: ItemRef) -> Self {
        value.0
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `alias` fields: blank means "derive one".
pub fn optional_alias<'de, D>(deserializer: D) -> Result<Option<ItemRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.map(|s| s.trim().to_string()) {
        Some(s) if !s.is_empty() => ItemRef::try_from(s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// Decode tool arguments, treating a missing/null payload as `{}`.
pub fn parse<T: DeserializeOwned>(tool: &str, args: &Value) -> Result<T, ToolError> {
    let args = match args {
        Value::Null => Value::Object(Map::new()),
        other => other.clone(),
    };
    serde_json::from_value(args).map_err(|e| ToolError::validation(tool, e.to_string()))
}

/// Drop top-level `null` fields so optional inputs are omitted upstream.
pub fn request_body(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => other,
    }
}
