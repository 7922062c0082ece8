//! Suggestion defaults and derivation helpers

use crate::session::message::Message;

/// Suggestions shown before any history exists
pub const DEFAULT_SUGGESTIONS: [&str; 4] = [
    "BGP neighbor configuration",
    "OSPF areas on IOS XR",
    "VLAN interface setup",
    "Show spanning-tree details",
];

/// The default suggestion list as owned strings
pub fn default_suggestions() -> Vec<String> {
    DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
}

/// Whether `suggestions` differ from the default list (order-sensitive)
///
/// # Examples
///
/// ```
/// use cliexpert::session::{default_suggestions, is_predictive};
///
/// let mut list = default_suggestions();
/// assert!(!is_predictive(&list));
/// list.swap(0, 1);
/// assert!(is_predictive(&list));
/// ```
pub fn is_predictive(suggestions: &[String]) -> bool {
    suggestions.len() != DEFAULT_SUGGESTIONS.len()
        || suggestions
            .iter()
            .zip(DEFAULT_SUGGESTIONS.iter())
            .any(|(a, b)| a != b)
}

/// The most recent `window` user queries eligible for suggestions, oldest first
pub fn recent_queries(messages: &[Message], window: usize) -> Vec<String> {
    let eligible: Vec<&Message> = messages.iter().filter(|m| m.is_suggestion_seed()).collect();
    let skip = eligible.len().saturating_sub(window);
    eligible
        .into_iter()
        .skip(skip)
        .map(|m| m.content.clone())
        .collect()
}

/// Decode a cached suggestion list
///
/// Accepts the same lists a live refresh applies: any non-empty JSON array
/// of strings. Anything else falls back to the defaults.
pub fn decode_suggestions(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return default_suggestions();
    };
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(list) if !list.is_empty() => list,
        Ok(_) => {
            tracing::warn!("Cached suggestion list is empty, using defaults");
            default_suggestions()
        }
        Err(e) => {
            tracing::warn!("Discarding unreadable suggestion cache: {}", e);
            default_suggestions()
        }
    }
}
