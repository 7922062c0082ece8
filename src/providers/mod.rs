//! Provider module for Cisco CLI Expert
//!
//! This module contains the completion provider abstraction and its
//! implementations for Google Gemini, Azure OpenAI, and the HTTP proxy.

pub mod azure;
pub mod base;
pub mod gemini;
pub mod proxy;

pub use azure::{escape_xml, AzureOpenAiProvider};
pub use base::{
    parse_suggestions, split_data_url, CompletionRequest, DeviceCategory, ModelInfo, Provider,
    QueryResult, Source,
};
pub use gemini::{gemini_models, GeminiProvider};
pub use proxy::{ProxyProvider, ProxyRequest, SuggestionsResponse};

use crate::config::ProviderConfig;
use crate::error::{CliExpertError, Result};

/// Create a provider instance based on configuration
///
/// # Arguments
///
/// * `provider_type` - Type of provider ("gemini", "azure" or "proxy")
/// * `config` - Provider configuration
///
/// # Returns
///
/// Returns a boxed provider instance
///
/// # Errors
///
/// Returns error if provider type is invalid or initialization fails
pub fn create_provider(provider_type: &str, config: &ProviderConfig) -> Result<Box<dyn Provider>> {
    match provider_type {
        "gemini" => Ok(Box::new(GeminiProvider::new(config.gemini.clone())?)),
        "azure" => Ok(Box::new(AzureOpenAiProvider::new(config.azure.clone())?)),
        "proxy" => Ok(Box::new(ProxyProvider::new(config.proxy.clone())?)),
        _ => Err(CliExpertError::Provider(format!(
            "Unknown provider type: {}",
            provider_type
        ))
        .into()),
    }
}

/// Create a provider instance with optional command-line overrides
///
/// The model override replaces the provider's default model (the Gemini
/// model, the Azure deployment, or the model the proxy is asked for).
///
/// # Errors
///
/// Returns error if the provider type is invalid or initialization fails
///
/// # Examples
///
/// ```
/// use cliexpert::config::Config;
/// use cliexpert::providers::create_provider_with_override;
///
/// let config = Config::default();
/// let provider = create_provider_with_override(&config.provider, Some("proxy"), None).unwrap();
/// assert_eq!(provider.name(), "proxy");
/// ```
pub fn create_provider_with_override(
    config: &ProviderConfig,
    provider_override: Option<&str>,
    model_override: Option<&str>,
) -> Result<Box<dyn Provider>> {
    let provider_type = provider_override.unwrap_or(&config.provider_type);

    let mut config = config.clone();
    if let Some(model) = model_override {
        match provider_type {
            "gemini" => config.gemini.model = model.to_string(),
            "azure" => config.azure.deployment = model.to_string(),
            "proxy" => config.proxy.model = model.to_string(),
            _ => {}
        }
    }

    tracing::debug!(
        "Creating provider: type={}, model_override={:?}",
        provider_type,
        model_override
    );

    create_provider(provider_type, &config)
}
