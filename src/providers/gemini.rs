//! Google Gemini provider implementation
//!
//! Talks to the Generative Language REST API (`generateContent`). Lookups run
//! in JSON response mode with a response schema so the model returns a
//! `QueryResult`; pro models and force-search requests get the Google Search
//! tool and any grounding chunks are surfaced as sources.

use crate::config::GeminiConfig;
use crate::error::{CliExpertError, Result};
use crate::prompts;
use crate::providers::base::upstream_error;
use crate::providers::{CompletionRequest, ModelInfo, Provider, QueryResult, Source};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Gemini API provider
///
/// # Examples
///
/// ```no_run
/// use cliexpert::config::GeminiConfig;
/// use cliexpert::providers::{CompletionRequest, GeminiProvider, Provider};
///
/// # async fn example() -> cliexpert::error::Result<()> {
/// let config = GeminiConfig {
///     api_key: Some("key".to_string()),
///     ..Default::default()
/// };
/// let provider = GeminiProvider::new(config)?;
/// let request = CompletionRequest::new("show vlan brief", "gemini-2.5-flash-lite");
/// let result = provider.complete(&request).await?;
/// println!("{}", result.syntax);
/// # Ok(())
/// # }
/// ```
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GroundingMetadata {
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WebChunk {
    title: String,
    uri: String,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    /// Web grounding chunks of the first candidate, `None` when absent
    fn sources(&self) -> Option<Vec<Source>> {
        let metadata = self.candidates.first()?.grounding_metadata.as_ref()?;
        Some(
            metadata
                .grounding_chunks
                .iter()
                .filter_map(|chunk| chunk.web.as_ref())
                .map(|web| Source {
                    title: web.title.clone(),
                    uri: web.uri.clone(),
                })
                .collect(),
        )
    }
}

/// Models offered by the Gemini provider
pub fn gemini_models() -> Vec<ModelInfo> {
    vec![
        ModelInfo::new(
            "gemini-2.5-flash-lite",
            "Gemini 2.5 Flash Lite",
            "Ultra-Low Latency",
        ),
        ModelInfo::new(
            "gemini-3-flash-preview",
            "Gemini 3 Flash",
            "Speed Synthesis",
        ),
        ModelInfo::new(
            "gemini-3-pro-preview",
            "Gemini 3 Pro",
            "Complex Reasoning",
        ),
    ]
}

fn result_schema() -> serde_json::Value {
    let string = json!({ "type": "STRING" });
    json!({
        "type": "OBJECT",
        "properties": {
            "reasoning": string,
            "deviceCategory": string,
            "commandMode": string,
            "syntax": string,
            "description": string,
            "usageContext": string,
            "options": string,
            "notes": string,
            "examples": string,
            "correction": string,
            "checklist": string,
            "security": string,
            "troubleshooting": string,
            "isOutOfScope": { "type": "BOOLEAN" }
        },
        "required": [
            "reasoning", "deviceCategory", "commandMode", "syntax", "description",
            "usageContext", "options", "notes", "examples"
        ]
    })
}

impl GeminiProvider {
    /// Create a new Gemini provider
    ///
    /// # Errors
    ///
    /// Returns `CliExpertError::MissingCredentials` when no API key is set
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                CliExpertError::MissingCredentials(
                    "gemini (set GEMINI_API_KEY or provider.gemini.api_key)".to_string(),
                )
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(concat!("cliexpert/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CliExpertError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized Gemini provider: model={}", config.model);

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn api_base(&self) -> &str {
        self.config
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
    }

    fn build_completion_request(&self, request: &CompletionRequest) -> GenerateContentRequest {
        let model = self.resolve_model(&request.model);

        let mut parts = vec![Part::Text {
            text: prompts::user_prompt(&request.query, request.force_search),
        }];
        if let Some((mime_type, data)) = request.image_parts() {
            parts.push(Part::InlineData {
                inline_data: InlineData { mime_type, data },
            });
        }

        let tools = if model.contains("pro") || request.force_search {
            vec![json!({ "googleSearch": {} })]
        } else {
            Vec::new()
        };

        let thinks = model.contains("pro") || model.contains("flash");
        let thinking_config = (thinks && prompts::is_complex_query(&request.query)).then_some(
            ThinkingConfig {
                thinking_budget: prompts::THINKING_BUDGET,
            },
        );

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::Text {
                    text: prompts::SYSTEM_INSTRUCTION.to_string(),
                }],
            }),
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: result_schema(),
                thinking_config,
            },
            tools,
        }
    }

    fn build_suggestion_request(&self, history: &[String]) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::Text {
                    text: prompts::suggestion_prompt(history),
                }],
            }],
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::Text {
                    text: prompts::SUGGESTION_INSTRUCTION.to_string(),
                }],
            }),
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: json!({ "type": "ARRAY", "items": { "type": "STRING" } }),
                thinking_config: None,
            },
            tools: Vec::new(),
        }
    }

    fn resolve_model<'a>(&'a self, requested: &'a str) -> &'a str {
        if requested.is_empty() {
            &self.config.model
        } else {
            requested
        }
    }

    async fn generate(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.api_base(), model);
        tracing::debug!("Sending Gemini request: model={}", model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Gemini request failed: {}", e);
                CliExpertError::Provider(format!("Gemini request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(upstream_error("Gemini", response).await);
        }

        response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}", e);
            CliExpertError::Provider(format!("Failed to parse Gemini response: {}", e)).into()
        })
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<QueryResult> {
        let model = self.resolve_model(&request.model).to_string();
        let body = self.build_completion_request(request);
        let response = self.generate(&model, &body).await?;

        let text = response.text();
        if text.trim().is_empty() {
            return Err(CliExpertError::Provider("Empty response from Gemini".to_string()).into());
        }

        let mut result = QueryResult::from_model_text(&text);
        if let Some(sources) = response.sources() {
            result.sources = Some(sources);
        }
        Ok(result)
    }

    async fn suggest(&self, history: &[String]) -> Result<Vec<String>> {
        let body = self.build_suggestion_request(history);
        let response = self.generate(&self.config.suggestion_model, &body).await?;
        Ok(crate::providers::parse_suggestions(&response.text()))
    }

    fn models(&self) -> Vec<ModelInfo> {
        gemini_models()
    }
}
