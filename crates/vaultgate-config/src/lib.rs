use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Config directory not found")]
    NoDirFound,
    #[error("Invalid upstream environment: {0}")]
    InvalidEnv(String),
}

/// Gateway server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Seconds a session may sit idle before its in-memory state is dropped.
    #[serde(default = "default_session_idle")]
    pub session_idle_secs: u64,
}

fn default_port() -> u16 {
    8787
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_session_idle() -> u64 {
    1800
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            session_idle_secs: default_session_idle(),
        }
    }
}

/// Upstream banking API environment.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamEnv {
    #[default]
    Sandbox,
    Production,
}

impl UpstreamEnv {
    pub fn base_url(&self) -> &'static str {
        match self {
            UpstreamEnv::Sandbox => "https://sandbox.plaid.com",
            UpstreamEnv::Production => "https://production.plaid.com",
        }
    }
}

impl std::str::FromStr for UpstreamEnv {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(UpstreamEnv::Sandbox),
            "production" => Ok(UpstreamEnv::Production),
            other => Err(ConfigError::InvalidEnv(other.to_string())),
        }
    }
}

/// Upstream banking API settings. Credentials are never configured here;
/// they arrive with each request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub env: UpstreamEnv,
    /// Explicit base URL (overrides `env`, useful for local mocks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl UpstreamConfig {
    pub fn resolved_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.env.base_url())
    }
}

/// Vault storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path. Defaults to `~/.vaultgate/vault.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Approval gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Seconds a pending approval waits before it is auto-denied.
    #[serde(default = "default_approval_timeout")]
    pub timeout_secs: u64,
}

fn default_approval_timeout() -> u64 {
    300
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_approval_timeout(),
        }
    }
}

/// Base tool profile.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolProfile {
    /// Every registered tool (default).
    #[default]
    Full,
    /// Only tools annotated read-only.
    ReadOnly,
}

/// Which tools the gateway exposes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub profile: ToolProfile,
    /// Tool names or `group:name` references to hide (takes priority).
    #[serde(default)]
    pub deny: Vec<String>,
}

/// Top-level vaultgate configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultGateConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub approval: ApprovalConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl VaultGateConfig {
    /// Resolve the SQLite path, defaulting into the config directory.
    pub fn storage_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.path {
            Some(p) => Ok(p.clone()),
            None => Ok(ensure_config_dir()?.join("vault.db")),
        }
    }

    /// Apply environment overrides (`PLAID_ENV`).
    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(env) = std::env::var("PLAID_ENV") {
            if !env.trim().is_empty() {
                self.upstream.env = env.parse()?;
            }
        }
        Ok(())
    }
}

/// Resolve the vaultgate config directory (~/.vaultgate/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".vaultgate"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.vaultgate/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load configuration from the default path, falling back to defaults.
pub fn load_config() -> Result<VaultGateConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let path = config_file_path()?;
    let mut config = load_config_from(&path)?;
    config.apply_env()?;
    Ok(config)
}

/// Load configuration from a specific path, falling back to defaults if not found.
pub fn load_config_from(path: &Path) -> Result<VaultGateConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(VaultGateConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: VaultGateConfig = json5::from_str(&content)?;
    Ok(config)
}

/// Ensure the config directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = config_dir()?;
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VaultGateConfig::default();
        assert_eq!(config.gateway.port, 8787);
        assert_eq!(config.upstream.env, UpstreamEnv::Sandbox);
        assert_eq!(config.approval.timeout_secs, 300);
        assert_eq!(config.gateway.session_idle_secs, 1800);
        assert_eq!(config.tools.profile, ToolProfile::Full);
        assert!(config.tools.deny.is_empty());
    }

    #[test]
    fn test_json5_parse() {
        let json5_str = r#"{
            gateway: { port: 9000 },
            upstream: { env: "production" },
            approval: { timeout_secs: 60 },
            tools: { profile: "read_only", deny: ["group:transfer"] },
        }"#;
        let config: VaultGateConfig = json5::from_str(json5_str).unwrap();
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(config.upstream.env, UpstreamEnv::Production);
        assert_eq!(config.approval.timeout_secs, 60);
        assert_eq!(config.tools.profile, ToolProfile::ReadOnly);
        assert_eq!(config.tools.deny, vec!["group:transfer"]);
    }

    #[test]
    fn test_base_url_override() {
        let config: VaultGateConfig = json5::from_str(
            r#"{ upstream: { env: "production", base_url: "http://127.0.0.1:4010" } }"#,
        )
        .unwrap();
        assert_eq!(config.upstream.resolved_base_url(), "http://127.0.0.1:4010");

        let default = UpstreamConfig::default();
        assert_eq!(default.resolved_base_url(), "https://sandbox.plaid.com");
    }

    #[test]
    fn test_env_parse() {
        assert_eq!("Production".parse::<UpstreamEnv>().unwrap(), UpstreamEnv::Production);
        assert!("development".parse::<UpstreamEnv>().is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("nope.json5")).unwrap();
        assert_eq!(config.gateway.port, 8787);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json5");
        std::fs::write(&path, "{ storage: { path: '/tmp/v.db' } }").unwrap();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.storage_path().unwrap(), PathBuf::from("/tmp/v.db"));
    }
}
