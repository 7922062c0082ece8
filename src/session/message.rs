//! Chat messages and the persisted history codec

use crate::error::Result;
use crate::providers::QueryResult;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Content recorded for a submission that carries only an image
pub const IMAGE_PLACEHOLDER: &str = "Image analysis request";

/// Content of the assistant reply when the provider call fails
pub const FALLBACK_REPLY: &str = "I apologize, but I encountered an error. Please try again.";

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking
    User,
    /// The provider's answer
    Assistant,
}

/// One entry in the chat log
///
/// Messages are immutable once appended. Ids are ULIDs, so they sort by
/// creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique identifier
    pub id: String,
    /// Author
    pub role: Role,
    /// Display text
    pub content: String,
    /// Creation time in epoch milliseconds
    pub timestamp: i64,
    /// Attached image, base64 or a `data:` URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Structured answer, present only on successful assistant replies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<QueryResult>,
}

impl Message {
    fn new(role: Role, content: String) -> Self {
        Self {
            id: Ulid::new().to_string(),
            role,
            content,
            timestamp: Utc::now().timestamp_millis(),
            image: None,
            metadata: None,
        }
    }

    /// A user message; image-only submissions get the placeholder content
    ///
    /// # Examples
    ///
    /// ```
    /// use cliexpert::session::{Message, Role, IMAGE_PLACEHOLDER};
    ///
    /// let msg = Message::user("", Some("QUJD".to_string()));
    /// assert_eq!(msg.role, Role::User);
    /// assert_eq!(msg.content, IMAGE_PLACEHOLDER);
    /// ```
    pub fn user(text: &str, image: Option<String>) -> Self {
        let content = if text.is_empty() && image.is_some() {
            IMAGE_PLACEHOLDER.to_string()
        } else {
            text.to_string()
        };
        Self {
            image,
            ..Self::new(Role::User, content)
        }
    }

    /// Successful assistant reply for `query`
    pub fn answer(query: &str, result: QueryResult) -> Self {
        Self {
            metadata: Some(result),
            ..Self::new(Role::Assistant, format!("Details for: {}", query))
        }
    }

    /// Assistant reply used when the provider call fails
    pub fn fallback() -> Self {
        Self::new(Role::Assistant, FALLBACK_REPLY.to_string())
    }

    /// Whether this is a user message that can seed suggestions
    pub fn is_suggestion_seed(&self) -> bool {
        self.role == Role::User && self.content != IMAGE_PLACEHOLDER && !self.content.is_empty()
    }
}

/// Serialize a message log for the store
pub fn encode_history(messages: &[Message]) -> Result<String> {
    Ok(serde_json::to_string(messages)?)
}

/// Decode a stored message log
///
/// Absent or malformed data yields an empty log; the failure is logged and
/// never surfaced.
pub fn decode_history(raw: Option<&str>) -> Vec<Message> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str(raw) {
        Ok(messages) => messages,
        Err(e) => {
            tracing::warn!("Discarding unreadable chat history: {}", e);
            Vec::new()
        }
    }
}
