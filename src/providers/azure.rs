//! Azure OpenAI provider implementation
//!
//! Calls the chat completions endpoint of an Azure OpenAI deployment and
//! synthesizes speech through the Azure Speech REST API.

use crate::audio::SpeechPayload;
use crate::config::AzureConfig;
use crate::error::{CliExpertError, Result};
use crate::prompts;
use crate::providers::base::upstream_error;
use crate::providers::{parse_suggestions, CompletionRequest, ModelInfo, Provider, QueryResult};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const COMPLETION_MAX_TOKENS: u32 = 1200;
const SUGGESTION_MAX_TOKENS: u32 = 256;
const TEMPERATURE: f32 = 0.2;
const SPEECH_OUTPUT_FORMAT: &str = "raw-24khz-16bit-mono-pcm";

/// Azure OpenAI provider
///
/// Completions require `endpoint` and `api_key`; speech additionally needs
/// the speech key and region. Missing values surface as
/// `CliExpertError::MissingCredentials` when the operation is attempted.
pub struct AzureOpenAiProvider {
    client: Client,
    config: AzureConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: ChatContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ChatContent {
    Text(String),
    Parts(Vec<ChatPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChatPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Escape the five XML special characters for SSML
///
/// # Examples
///
/// ```
/// use cliexpert::providers::escape_xml;
///
/// assert_eq!(escape_xml("a < b & 'c'"), "a &lt; b &amp; &apos;c&apos;");
/// ```
pub fn escape_xml(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn ssml(voice: &str, text: &str) -> String {
    format!(
        r#"<speak version="1.0" xml:lang="en-US"><voice name="{}">{}</voice></speak>"#,
        escape_xml(voice),
        escape_xml(text)
    )
}

impl AzureOpenAiProvider {
    /// Create a new Azure OpenAI provider
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: AzureConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(concat!("cliexpert/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CliExpertError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized Azure OpenAI provider: deployment={}",
            config.deployment
        );

        Ok(Self { client, config })
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (self.config.endpoint.as_deref(), self.config.api_key.as_deref()) {
            (Some(endpoint), Some(key)) if !endpoint.is_empty() && !key.is_empty() => {
                Ok((endpoint.trim_end_matches('/'), key))
            }
            _ => Err(CliExpertError::MissingCredentials(
                "azure (AZURE_OPENAI_ENDPOINT and AZURE_OPENAI_API_KEY must be set)".to_string(),
            )
            .into()),
        }
    }

    fn deployment<'a>(&'a self, requested: &'a str) -> &'a str {
        if requested.is_empty() {
            &self.config.deployment
        } else {
            requested
        }
    }

    async fn chat(&self, deployment: &str, body: &ChatRequest) -> Result<String> {
        let (endpoint, key) = self.credentials()?;
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint, deployment, self.config.api_version
        );

        tracing::debug!(
            "Sending Azure OpenAI request: deployment={}, max_tokens={}",
            deployment,
            body.max_tokens
        );

        let response = self
            .client
            .post(&url)
            .header("api-key", key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Azure OpenAI request failed: {}", e);
                CliExpertError::Provider(format!("Azure OpenAI request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(upstream_error("Azure OpenAI", response).await);
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            CliExpertError::Provider(format!("Failed to parse Azure OpenAI response: {}", e))
        })?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default())
    }

    fn completion_body(&self, request: &CompletionRequest) -> ChatRequest {
        let prompt = prompts::user_prompt(&request.query, request.force_search);

        let user_content = match request.image_parts() {
            Some((mime_type, data)) => ChatContent::Parts(vec![
                ChatPart::Text { text: prompt },
                ChatPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:{};base64,{}", mime_type, data),
                    },
                },
            ]),
            None => ChatContent::Text(prompt),
        };

        ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: ChatContent::Text(prompts::SYSTEM_INSTRUCTION.to_string()),
                },
                ChatMessage {
                    role: "user",
                    content: user_content,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: COMPLETION_MAX_TOKENS,
        }
    }

    fn suggestion_body(history: &[String]) -> ChatRequest {
        ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: ChatContent::Text(prompts::SUGGESTION_INSTRUCTION.to_string()),
                },
                ChatMessage {
                    role: "user",
                    content: ChatContent::Text(prompts::suggestion_prompt(history)),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: SUGGESTION_MAX_TOKENS,
        }
    }

    fn speech_endpoint(&self) -> Result<String> {
        if let Some(endpoint) = &self.config.speech.endpoint {
            return Ok(endpoint.clone());
        }
        match self.config.speech.region.as_deref() {
            Some(region) if !region.is_empty() => Ok(format!(
                "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
                region
            )),
            _ => Err(CliExpertError::MissingCredentials(
                "azure speech (AZURE_SPEECH_KEY and AZURE_SPEECH_REGION must be set for TTS)"
                    .to_string(),
            )
            .into()),
        }
    }
}

#[async_trait]
impl Provider for AzureOpenAiProvider {
    fn name(&self) -> &str {
        "azure"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<QueryResult> {
        let deployment = self.deployment(&request.model).to_string();
        let text = self.chat(&deployment, &self.completion_body(request)).await?;

        if text.is_empty() {
            return Err(
                CliExpertError::Provider("Empty response from Azure OpenAI".to_string()).into(),
            );
        }

        Ok(QueryResult::from_model_text(&text))
    }

    async fn suggest(&self, history: &[String]) -> Result<Vec<String>> {
        let text = self
            .chat(&self.config.deployment, &Self::suggestion_body(history))
            .await?;
        Ok(parse_suggestions(&text))
    }

    async fn synthesize_speech(&self, text: &str) -> Result<SpeechPayload> {
        if text.trim().is_empty() {
            return Err(CliExpertError::Validation("Text is required for TTS".to_string()).into());
        }

        let speech = &self.config.speech;
        let key = speech
            .key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                CliExpertError::MissingCredentials(
                    "azure speech (AZURE_SPEECH_KEY and AZURE_SPEECH_REGION must be set for TTS)"
                        .to_string(),
                )
            })?;
        let endpoint = self.speech_endpoint()?;

        let mut builder = self
            .client
            .post(&endpoint)
            .header("Ocp-Apim-Subscription-Key", key)
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", SPEECH_OUTPUT_FORMAT);
        if let Some(region) = speech.region.as_deref() {
            builder = builder.header("Ocp-Apim-Subscription-Region", region);
        }

        tracing::debug!("Requesting speech: voice={}, chars={}", speech.voice, text.len());

        let response = builder
            .body(ssml(&speech.voice, text))
            .send()
            .await
            .map_err(|e| CliExpertError::Provider(format!("Azure Speech request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(upstream_error("Azure Speech", response).await);
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| CliExpertError::Provider(format!("Failed to read speech audio: {}", e)))?;

        Ok(SpeechPayload::from_pcm_bytes(&audio))
    }

    fn models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo::new(
            self.config.deployment.clone(),
            self.config.deployment.clone(),
            "Azure OpenAI deployment",
        )]
    }
}
