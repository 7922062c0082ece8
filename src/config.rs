//! Configuration management for Cisco CLI Expert
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{CliExpertError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Providers accepted by `provider.type`
pub const VALID_PROVIDERS: [&str; 3] = ["gemini", "azure", "proxy"];

/// Main configuration structure
///
/// Holds provider credentials, session timing policy, and proxy server
/// settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Provider configuration (Gemini, Azure OpenAI, proxy)
    pub provider: ProviderConfig,
    /// Session manager behavior
    #[serde(default)]
    pub session: SessionConfig,
    /// Proxy server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Provider configuration
///
/// Specifies which completion backend to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type")]
    pub provider_type: String,

    /// Google Gemini configuration
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Azure OpenAI configuration
    #[serde(default)]
    pub azure: AzureConfig,

    /// Configuration for talking to a running `cliexpert serve` instance
    #[serde(default)]
    pub proxy: ProxyConfig,
}

impl ProviderConfig {
    /// Model identifier a new session starts with for the configured provider
    pub fn default_model(&self) -> String {
        match self.provider_type.as_str() {
            "azure" => self.azure.deployment.clone(),
            "proxy" => self.proxy.model.clone(),
            _ => self.gemini.model.clone(),
        }
    }
}

/// Google Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key for the Generative Language API
    #[serde(default)]
    pub api_key: Option<String>,

    /// Default model for command lookups
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Model used for follow-up suggestions
    #[serde(default = "default_gemini_suggestion_model")]
    pub suggestion_model: String,

    /// Optional API base URL (useful for tests and local mocks)
    #[serde(default)]
    pub api_base: Option<String>,
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_gemini_suggestion_model() -> String {
    "gemini-3-flash-preview".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            suggestion_model: default_gemini_suggestion_model(),
            api_base: None,
        }
    }
}

/// Azure OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    #[serde(default)]
    pub endpoint: Option<String>,

    /// API key sent in the `api-key` header
    #[serde(default)]
    pub api_key: Option<String>,

    /// Deployment name used when a request does not name one
    #[serde(default = "default_azure_deployment")]
    pub deployment: String,

    /// REST API version query parameter
    #[serde(default = "default_azure_api_version")]
    pub api_version: String,

    /// Azure Speech settings for text-to-speech
    #[serde(default)]
    pub speech: SpeechConfig,
}

fn default_azure_deployment() -> String {
    "gpt-4o-mini".to_string()
}

fn default_azure_api_version() -> String {
    "2024-02-01".to_string()
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            deployment: default_azure_deployment(),
            api_version: default_azure_api_version(),
            speech: SpeechConfig::default(),
        }
    }
}

/// Azure Speech configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Subscription key
    #[serde(default)]
    pub key: Option<String>,

    /// Region, e.g. `westeurope`
    #[serde(default)]
    pub region: Option<String>,

    /// Neural voice name
    #[serde(default = "default_speech_voice")]
    pub voice: String,

    /// Endpoint override; derived from the region when unset
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_speech_voice() -> String {
    "en-US-JennyNeural".to_string()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            key: None,
            region: None,
            voice: default_speech_voice(),
            endpoint: None,
        }
    }
}

/// Proxy client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Base URL of the proxy server
    #[serde(default = "default_proxy_url")]
    pub base_url: String,

    /// Model identifier forwarded with each request
    #[serde(default = "default_azure_deployment")]
    pub model: String,
}

fn default_proxy_url() -> String {
    "http://localhost:4173".to_string()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            base_url: default_proxy_url(),
            model: default_azure_deployment(),
        }
    }
}

/// Session manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory of the session database; platform data dir when unset
    #[serde(default)]
    pub store_path: Option<String>,

    /// Quiescence window before suggestions refresh (milliseconds)
    #[serde(default = "default_debounce_ms")]
    pub suggestion_debounce_ms: u64,

    /// Window in which a second clear confirms the reset (milliseconds)
    #[serde(default = "default_clear_confirm_ms")]
    pub clear_confirm_ms: u64,

    /// Number of recent user queries sent for suggestions
    #[serde(default = "default_suggestion_window")]
    pub suggestion_window: usize,

    /// Maximum accepted query length in characters
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,

    /// Model to start with; provider default when unset
    #[serde(default)]
    pub model: Option<String>,
}

fn default_debounce_ms() -> u64 {
    1500
}

fn default_clear_confirm_ms() -> u64 {
    3000
}

fn default_suggestion_window() -> usize {
    5
}

fn default_max_query_length() -> usize {
    1000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            suggestion_debounce_ms: default_debounce_ms(),
            clear_confirm_ms: default_clear_confirm_ms(),
            suggestion_window: default_suggestion_window(),
            max_query_length: default_max_query_length(),
            model: None,
        }
    }
}

/// Proxy server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Maximum accepted request body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    4173
}

fn default_body_limit() -> usize {
    2 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default_config()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn default_config() -> Self {
        Self {
            provider: ProviderConfig {
                provider_type: "gemini".to_string(),
                gemini: GeminiConfig::default(),
                azure: AzureConfig::default(),
                proxy: ProxyConfig::default(),
            },
            session: SessionConfig::default(),
            server: ServerConfig::default(),
        }
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CliExpertError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| CliExpertError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(provider_type) = std::env::var("CLIEXPERT_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        if let Ok(model) = std::env::var("CLIEXPERT_MODEL") {
            self.session.model = Some(model);
        }

        // GEMINI_API_KEY wins over the generic API_KEY the web build used
        if let Ok(key) = std::env::var("GEMINI_API_KEY").or_else(|_| std::env::var("API_KEY")) {
            self.provider.gemini.api_key = Some(key);
        }

        if let Ok(endpoint) = std::env::var("AZURE_OPENAI_ENDPOINT") {
            self.provider.azure.endpoint = Some(endpoint);
        }

        if let Ok(key) = std::env::var("AZURE_OPENAI_API_KEY") {
            self.provider.azure.api_key = Some(key);
        }

        if let Ok(deployment) = std::env::var("AZURE_OPENAI_DEPLOYMENT") {
            self.provider.azure.deployment = deployment;
        }

        if let Ok(key) = std::env::var("AZURE_SPEECH_KEY") {
            self.provider.azure.speech.key = Some(key);
        }

        if let Ok(region) = std::env::var("AZURE_SPEECH_REGION") {
            self.provider.azure.speech.region = Some(region);
        }

        if let Ok(voice) = std::env::var("AZURE_SPEECH_VOICE") {
            self.provider.azure.speech.voice = voice;
        }

        if let Ok(url) = std::env::var("CLIEXPERT_PROXY_URL") {
            self.provider.proxy.base_url = url;
        }

        if let Ok(path) = std::env::var("CLIEXPERT_STORE_PATH") {
            self.session.store_path = Some(path);
        }

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(value) = port.parse() {
                self.server.port = value;
            } else {
                tracing::warn!("Invalid PORT: {}", port);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(path) = &cli.store_path {
            tracing::debug!("Using session store override from CLI: {}", path);
            self.session.store_path = Some(path.clone());
        }
    }

    /// Model identifier a new session starts with
    pub fn initial_model(&self) -> String {
        self.session
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Validate the configuration
    ///
    /// Ensures timing values are usable and the provider type is known.
    /// Credentials are checked lazily by each provider so that commands
    /// which never reach the network (e.g. `history`) work unconfigured.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.provider.provider_type.is_empty() {
            return Err(CliExpertError::Config("Provider type cannot be empty".to_string()).into());
        }

        if !VALID_PROVIDERS.contains(&self.provider.provider_type.as_str()) {
            return Err(CliExpertError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                VALID_PROVIDERS.join(", ")
            ))
            .into());
        }

        if self.session.suggestion_debounce_ms == 0 {
            return Err(CliExpertError::Config(
                "session.suggestion_debounce_ms must be greater than 0".to_string(),
            )
            .into());
        }

        if self.session.clear_confirm_ms == 0 {
            return Err(CliExpertError::Config(
                "session.clear_confirm_ms must be greater than 0".to_string(),
            )
            .into());
        }

        if self.session.suggestion_window == 0 {
            return Err(CliExpertError::Config(
                "session.suggestion_window must be greater than 0".to_string(),
            )
            .into());
        }

        if self.session.max_query_length == 0 {
            return Err(CliExpertError::Config(
                "session.max_query_length must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
