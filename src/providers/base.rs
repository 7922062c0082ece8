//! Base provider trait and common types
//!
//! This module defines the Provider trait that every completion backend
//! implements, along with the structured documentation payload returned by
//! the model and the request shape sent to it.

use crate::audio::SpeechPayload;
use crate::error::{CliExpertError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A web source the provider grounded its answer on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Page title
    pub title: String,
    /// Page URL
    pub uri: String,
}

/// Structured Cisco command documentation returned by the model
///
/// Every string section defaults to empty on decode so partially filled
/// provider JSON still produces a usable card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryResult {
    /// The model's explanation of how it interpreted the query
    pub reasoning: String,
    /// `Switch`, `Router`, or `Universal`
    pub device_category: String,
    /// CLI mode, e.g. `Global Config` or `Privileged EXEC`
    pub command_mode: String,
    /// Command syntax with standard CLI prompts
    pub syntax: String,
    /// What the command does
    pub description: String,
    /// When to use it
    pub usage_context: String,
    /// Bulleted list of options and keywords
    pub options: String,
    /// Additional notes
    pub notes: String,
    /// Worked examples
    pub examples: String,
    /// Corrected command when the query contained a typo
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction: Option<String>,
    /// Prerequisites and verification steps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checklist: Option<String>,
    /// Security and hardening notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
    /// Common errors plus show/debug commands
    #[serde(skip_serializing_if = "Option::is_none")]
    pub troubleshooting: Option<String>,
    /// Grounding sources, in the order the provider reported them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    /// Set when the query is unrelated to Cisco networking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_out_of_scope: Option<bool>,
}

/// Device family a result applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCategory {
    /// Layer 2/3 switching platforms
    Switch,
    /// Routing platforms
    Router,
    /// Applies across platforms
    Universal,
}

impl std::fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Switch => write!(f, "Switch"),
            Self::Router => write!(f, "Router"),
            Self::Universal => write!(f, "Universal"),
        }
    }
}

impl QueryResult {
    /// Decode model output into a result
    ///
    /// Accepts bare JSON or JSON wrapped in a markdown code fence. Anything
    /// that does not decode becomes a result whose `reasoning` carries the
    /// raw text, so a malformed answer is still shown to the user.
    ///
    /// # Examples
    ///
    /// ```
    /// use cliexpert::providers::QueryResult;
    ///
    /// let parsed = QueryResult::from_model_text(r#"{"syntax":"show vlan brief"}"#);
    /// assert_eq!(parsed.syntax, "show vlan brief");
    ///
    /// let fallback = QueryResult::from_model_text("not json at all");
    /// assert_eq!(fallback.reasoning, "not json at all");
    /// ```
    pub fn from_model_text(text: &str) -> Self {
        let trimmed = text.trim();
        let candidate = strip_code_fence(trimmed);

        match serde_json::from_str::<QueryResult>(candidate) {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!("Model output is not a result object ({}), using raw text", e);
                Self {
                    reasoning: trimmed.to_string(),
                    ..Default::default()
                }
            }
        }
    }

    /// Classify `device_category`; unknown values are `Universal`
    pub fn device_category_kind(&self) -> DeviceCategory {
        match self.device_category.trim().to_ascii_lowercase().as_str() {
            "switch" => DeviceCategory::Switch,
            "router" => DeviceCategory::Router,
            _ => DeviceCategory::Universal,
        }
    }

    /// Whether the command mode is a configuration mode
    pub fn is_config_mode(&self) -> bool {
        self.command_mode.to_ascii_lowercase().contains("config")
    }

    /// Whether the provider flagged the query as unrelated to Cisco
    pub fn out_of_scope(&self) -> bool {
        self.is_out_of_scope.unwrap_or(false)
    }
}

/// Decode a suggestion list from model output
///
/// Accepts a JSON array of strings or an object with a `suggestions`
/// array. Any other non-empty text becomes a single suggestion.
///
/// # Examples
///
/// ```
/// use cliexpert::providers::parse_suggestions;
///
/// let list = parse_suggestions(r#"["a", "b", "c", "d"]"#);
/// assert_eq!(list.len(), 4);
/// assert_eq!(parse_suggestions("plain text"), vec!["plain text".to_string()]);
/// assert!(parse_suggestions("   ").is_empty());
/// ```
pub fn parse_suggestions(text: &str) -> Vec<String> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SuggestionShape {
        List(Vec<String>),
        Wrapped { suggestions: Vec<String> },
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<SuggestionShape>(strip_code_fence(trimmed)) {
        Ok(SuggestionShape::List(list)) | Ok(SuggestionShape::Wrapped { suggestions: list }) => {
            list
        }
        Err(_) => vec![trimmed.to_string()],
    }
}

/// Remove a surrounding ```json fence if present
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Convert a non-success upstream response into `CliExpertError::Upstream`
///
/// Understands the `{"error": {"message": ..}}` shape used by Google and
/// Azure as well as the proxy's `{"error": .., "message": ..}`. Anything
/// else is passed through as raw text.
pub(crate) async fn upstream_error(service: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = upstream_message(&body).unwrap_or_else(|| {
        if body.trim().is_empty() {
            format!("{} request failed with status {}", service, status)
        } else {
            body.trim().to_string()
        }
    });

    tracing::error!("{} returned error {}: {}", service, status, message);
    CliExpertError::Upstream { status, message }.into()
}

fn upstream_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
        if !message.is_empty() {
            return Some(message.to_string());
        }
    }
    match value.get("error")? {
        serde_json::Value::String(error) => Some(error.clone()),
        serde_json::Value::Object(error) => error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string),
        _ => None,
    }
}

/// One completion request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    /// User query text
    pub query: String,
    /// Optional image, base64 or a `data:` URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    /// Model identifier
    #[serde(default)]
    pub model: String,
    /// Ask for a grounded deep search
    #[serde(default)]
    pub force_search: bool,
}

impl CompletionRequest {
    /// Create a text-only request for `model`
    pub fn new(query: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            image_base64: None,
            model: model.into(),
            force_search: false,
        }
    }

    /// Attach an image
    pub fn with_image(mut self, image_base64: impl Into<String>) -> Self {
        self.image_base64 = Some(image_base64.into());
        self
    }

    /// Set the force-search flag
    pub fn with_force_search(mut self, force_search: bool) -> Self {
        self.force_search = force_search;
        self
    }

    /// The image as `(mime_type, base64_data)`, if any
    pub fn image_parts(&self) -> Option<(String, String)> {
        self.image_base64.as_deref().map(split_data_url)
    }
}

/// Split a `data:<mime>;base64,<data>` URL into its parts
///
/// Bare base64 is assumed to be JPEG.
///
/// # Examples
///
/// ```
/// use cliexpert::providers::split_data_url;
///
/// let (mime, data) = split_data_url("data:image/png;base64,AAAA");
/// assert_eq!(mime, "image/png");
/// assert_eq!(data, "AAAA");
///
/// let (mime, data) = split_data_url("BBBB");
/// assert_eq!(mime, "image/jpeg");
/// assert_eq!(data, "BBBB");
/// ```
pub fn split_data_url(value: &str) -> (String, String) {
    if let Some(rest) = value.strip_prefix("data:") {
        if let Some((header, data)) = rest.split_once(',') {
            let mime = header.split(';').next().unwrap_or_default();
            let mime = if mime.is_empty() { "image/jpeg" } else { mime };
            return (mime.to_string(), data.to_string());
        }
    }
    ("image/jpeg".to_string(), value.to_string())
}

/// A selectable model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Identifier sent to the provider
    pub id: String,
    /// Display name
    pub name: String,
    /// Short description of the trade-off
    pub description: String,
}

impl ModelInfo {
    /// Create a new ModelInfo
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Provider trait for completion backends
///
/// The session manager depends only on this interface, so Gemini, Azure
/// OpenAI and the proxy client are interchangeable.
///
/// # Examples
///
/// ```no_run
/// use cliexpert::providers::{CompletionRequest, Provider, QueryResult};
/// use cliexpert::error::Result;
/// use async_trait::async_trait;
///
/// struct CannedProvider;
///
/// #[async_trait]
/// impl Provider for CannedProvider {
///     fn name(&self) -> &str {
///         "canned"
///     }
///
///     async fn complete(&self, _request: &CompletionRequest) -> Result<QueryResult> {
///         Ok(QueryResult::default())
///     }
///
///     async fn suggest(&self, _history: &[String]) -> Result<Vec<String>> {
///         Ok(vec![])
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short provider name for logs and status output
    fn name(&self) -> &str;

    /// Fetch structured documentation for a query
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, non-success status, or a
    /// response without any content
    async fn complete(&self, request: &CompletionRequest) -> Result<QueryResult>;

    /// Suggest follow-up topics from recent user queries
    ///
    /// `history` holds the most recent queries, oldest first.
    async fn suggest(&self, history: &[String]) -> Result<Vec<String>>;

    /// Synthesize speech for `text`
    ///
    /// The default implementation reports that speech is unsupported.
    async fn synthesize_speech(&self, _text: &str) -> Result<SpeechPayload> {
        Err(CliExpertError::Unsupported(format!(
            "text-to-speech is not available with the {} provider",
            self.name()
        ))
        .into())
    }

    /// Models offered for selection
    ///
    /// The default implementation offers none.
    fn models(&self) -> Vec<ModelInfo> {
        Vec::new()
    }
}
