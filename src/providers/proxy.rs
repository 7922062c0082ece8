//! Client for a running `cliexpert serve` proxy
//!
//! The proxy exposes a single POST endpoint whose `action` field selects
//! between a completion (default), follow-up suggestions, and text-to-speech.
//! The request and response shapes here are shared with the server.

use crate::audio::SpeechPayload;
use crate::config::ProxyConfig;
use crate::error::{CliExpertError, Result};
use crate::prompts;
use crate::providers::base::upstream_error;
use crate::providers::{CompletionRequest, ModelInfo, Provider, QueryResult};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Path of the proxy endpoint
pub const COMPLETION_PATH: &str = "/api/completion";

/// Action requesting follow-up suggestions
pub const ACTION_SUGGESTIONS: &str = "suggestions";

/// Action requesting text-to-speech
pub const ACTION_TTS: &str = "tts";

/// Body accepted by the proxy endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxyRequest {
    /// `suggestions`, `tts`, or absent for a completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Query text for completions, or a free-form suggestion prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Optional image for completions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    /// Model identifier; server default when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Ask for a grounded deep search
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub force_search: bool,
    /// Recent user queries for suggestions, oldest first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<String>>,
    /// Text to speak
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ProxyRequest {
    /// Completion request body
    pub fn completion(request: &CompletionRequest) -> Self {
        Self {
            query: Some(request.query.clone()),
            image_base64: request.image_base64.clone(),
            model: (!request.model.is_empty()).then(|| request.model.clone()),
            force_search: request.force_search,
            ..Default::default()
        }
    }

    /// Suggestion request body
    ///
    /// Carries the history list and the same history folded into `query`,
    /// so servers that only read `query` still see the recent topics.
    pub fn suggestions(history: &[String]) -> Self {
        Self {
            action: Some(ACTION_SUGGESTIONS.to_string()),
            query: Some(prompts::suggestion_prompt(history)),
            history: Some(history.to_vec()),
            ..Default::default()
        }
    }

    /// Text-to-speech request body
    pub fn tts(text: &str) -> Self {
        Self {
            action: Some(ACTION_TTS.to_string()),
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    /// The completion this body describes, if it carries a query
    pub fn to_completion(&self, default_model: &str) -> Option<CompletionRequest> {
        let query = self.query.as_deref().unwrap_or_default().trim();
        if query.is_empty() {
            return None;
        }
        let model = self
            .model
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| default_model.to_string());

        let mut request = CompletionRequest::new(query, model).with_force_search(self.force_search);
        request.image_base64 = self.image_base64.clone().filter(|i| !i.is_empty());
        Some(request)
    }
}

/// Response body of the suggestions action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    /// Suggested topics
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Provider that forwards every operation to a proxy server
pub struct ProxyProvider {
    client: Client,
    config: ProxyConfig,
}

impl ProxyProvider {
    /// Create a new proxy client
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: ProxyConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(concat!("cliexpert/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CliExpertError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized proxy provider: base_url={}", config.base_url);

        Ok(Self { client, config })
    }

    async fn post<T: DeserializeOwned>(&self, body: &ProxyRequest) -> Result<T> {
        let url = format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            COMPLETION_PATH
        );

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Proxy request failed: {}", e);
                CliExpertError::Provider(format!("Proxy request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(upstream_error("Proxy", response).await);
        }

        response.json().await.map_err(|e| {
            CliExpertError::Provider(format!("Failed to parse proxy response: {}", e)).into()
        })
    }
}

#[async_trait]
impl Provider for ProxyProvider {
    fn name(&self) -> &str {
        "proxy"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<QueryResult> {
        let mut body = ProxyRequest::completion(request);
        if body.model.is_none() {
            body.model = Some(self.config.model.clone());
        }
        self.post(&body).await
    }

    async fn suggest(&self, history: &[String]) -> Result<Vec<String>> {
        let response: SuggestionsResponse = self.post(&ProxyRequest::suggestions(history)).await?;
        Ok(response.suggestions)
    }

    async fn synthesize_speech(&self, text: &str) -> Result<SpeechPayload> {
        self.post(&ProxyRequest::tts(text)).await
    }

    fn models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo::new(
            self.config.model.clone(),
            self.config.model.clone(),
            "Served by proxy",
        )]
    }
}
