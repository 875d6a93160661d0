//! Configuration loading, validation, and management for Dayloop.
//!
//! Loads configuration from `~/.dayloop/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.dayloop/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default oracle provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per oracle response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Agent loop limits
    #[serde(default)]
    pub agent: AgentConfig,

    /// Remote capability server
    #[serde(default)]
    pub mcp: McpConfig,

    /// Memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Final answer delivery
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("agent", &self.agent)
            .field("mcp", &self.mcp)
            .field("memory", &self.memory)
            .field("notify", &self.notify)
            .field("providers", &self.providers)
            .finish()
    }
}

/// Per-provider overrides.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Iteration ceiling for one run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Seconds to wait for a single oracle answer
    #[serde(default = "default_oracle_timeout_secs")]
    pub oracle_timeout_secs: u64,

    /// Memory items recalled into each prompt
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,
}

fn default_max_iterations() -> usize {
    15
}
fn default_oracle_timeout_secs() -> u64 {
    10
}
fn default_recall_limit() -> usize {
    5
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            oracle_timeout_secs: default_oracle_timeout_secs(),
            recall_limit: default_recall_limit(),
        }
    }
}

/// How to launch the MCP server spoken to over stdio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default = "default_mcp_command")]
    pub command: String,

    #[serde(default = "default_mcp_args")]
    pub args: Vec<String>,

    /// Extra environment for the server process
    #[serde(default)]
    pub env: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_mcp_command() -> String {
    "python".into()
}
fn default_mcp_args() -> Vec<String> {
    vec!["mcp_server.py".into()]
}
fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            command: default_mcp_command(),
            args: default_mcp_args(),
            env: HashMap::new(),
            working_dir: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Where user preferences are persisted between runs
    #[serde(default = "default_preference_file")]
    pub preference_file: PathBuf,
}

fn default_preference_file() -> PathBuf {
    AppConfig::config_dir().join("preferences.json")
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            preference_file: default_preference_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_notify_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_notify_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_notify_endpoint() -> String {
    "http://localhost:3000/api/output".into()
}
fn default_notify_timeout_secs() -> u64 {
    10
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_notify_endpoint(),
            timeout_secs: default_notify_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.dayloop/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `DAYLOOP_API_KEY` (highest priority)
    /// - `GEMINI_API_KEY`
    /// - `API_TOKEN`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = ["DAYLOOP_API_KEY", "GEMINI_API_KEY", "API_TOKEN", "OPENAI_API_KEY"]
                .iter()
                .find_map(|key| lookup(key).filter(|v| !v.is_empty()));
        }

        if let Some(provider) = lookup("DAYLOOP_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("DAYLOOP_MODEL") {
            self.default_model = model;
        }

        if let Some(endpoint) = lookup("DAYLOOP_NOTIFY_URL") {
            self.notify.endpoint = endpoint;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".dayloop")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.agent.oracle_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent.oracle_timeout_secs must be > 0".into(),
            ));
        }

        if self.mcp.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "mcp.request_timeout_secs must be > 0".into(),
            ));
        }

        if self.mcp.command.trim().is_empty() {
            return Err(ConfigError::ValidationError("mcp.command must not be empty".into()));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            agent: AgentConfig::default(),
            mcp: McpConfig::default(),
            memory: MemoryConfig::default(),
            notify: NotifyConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for dayloop_core::Error {
    fn from(e: ConfigError) -> Self {
        dayloop_core::Error::Config {
            message: e.to_string(),
        }
    }
}
