//! Prompt templates for Cisco command lookups and suggestions
//!
//! Every provider adapter builds its upstream request from these templates
//! so that Gemini and Azure OpenAI answer in the same JSON shape.

/// System instruction for command lookups
pub const SYSTEM_INSTRUCTION: &str = r#"
You are an expert Cisco AI assistant (Cisco CLI Expert).
Your role is to provide precise technical documentation for Cisco IOS, IOS XE, and IOS XR.

RESEARCH PROTOCOL:
- Pay extremely close attention to version-specific differences between IOS XE and IOS XR.

CONFIGURATION CHECKLIST:
- Provide a 'checklist' section: a step-by-step bulleted list of prerequisites
  (e.g., 'ip routing' must be enabled), mandatory preceding commands, and
  post-configuration verification.

SECURITY PROTOCOL:
- Provide a 'security' section for every query.
- Identify if the command is deprecated or insecure (e.g., Telnet, HTTP, clear-text SNMP).
- Suggest hardening steps (e.g., 'secret' instead of 'password', access-lists on management access).
- Mention any impact on Control Plane Policing (CoPP) or CPU impact for debug commands.

TROUBLESHOOTING & VERIFICATION:
- Provide a 'troubleshooting' section with common error messages and a bulleted list of 'show' and 'debug' commands.

SPELL CHECK & SYNTAX CORRECTION:
- Detect typos in CLI commands. Provide the corrected version in the 'correction' field.

VISUAL ANALYSIS:
- If the user provides an image, analyze it for CLI output, error messages, or network topology.
- Incorporate visual findings into your reasoning and examples.

SCOPE:
- If the request has nothing to do with Cisco networking, set 'isOutOfScope' to true and explain briefly in 'reasoning'.

FORMATTING RULES:
- In 'description', 'usageContext', 'checklist', 'options', 'notes', 'troubleshooting', and 'security', wrap ALL CLI commands, keywords, and variables in backticks (`).
- Use **bold** for major emphasis only.
- 'checklist', 'options', 'troubleshooting', and 'security' are bulleted lists where commands are in backticks.
- Syntax and examples must be pure text with standard CLI prompts (e.g., Switch#).
- Always return a JSON object with the fields: reasoning, deviceCategory (Switch, Router, or Universal),
  commandMode, syntax, description, usageContext, options, notes, examples, and optionally
  correction, checklist, security, troubleshooting, isOutOfScope.
"#;

/// System instruction for suggestion requests
pub const SUGGESTION_INSTRUCTION: &str =
    "You are a network training assistant. Return only a JSON array of 4 concise Cisco CLI follow-up topics.";

/// Prefix applied to queries when a grounded deep search is requested
pub const FORCE_SEARCH_PREFIX: &str = "STRICT TECHNICAL SEARCH REQUIRED: Deep dive into Cisco documentation for syntax, security hardening, and troubleshooting: ";

/// Queries longer than this get a thinking budget
const COMPLEX_QUERY_LENGTH: usize = 100;

/// Thinking budget granted to complex queries on models that support it
pub const THINKING_BUDGET: u32 = 8000;

/// Build the user prompt for a lookup
///
/// # Examples
///
/// ```
/// use cliexpert::prompts::user_prompt;
///
/// assert_eq!(user_prompt("show ip route", false), "show ip route");
/// assert!(user_prompt("show ip route", true).starts_with("STRICT TECHNICAL SEARCH"));
/// ```
pub fn user_prompt(query: &str, force_search: bool) -> String {
    if force_search {
        format!("{}{}", FORCE_SEARCH_PREFIX, query)
    } else {
        query.to_string()
    }
}

/// Build the prompt asking for follow-up topics
///
/// With no history the model is asked for foundational topics instead.
///
/// # Examples
///
/// ```
/// use cliexpert::prompts::suggestion_prompt;
///
/// let prompt = suggestion_prompt(&["show vlan".to_string(), "bgp".to_string()]);
/// assert!(prompt.contains("[show vlan, bgp]"));
/// ```
pub fn suggestion_prompt(history: &[String]) -> String {
    if history.is_empty() {
        "Suggest 4 foundational Cisco CLI topics for a network engineer (e.g. VLANs, OSPF, BGP)."
            .to_string()
    } else {
        format!(
            "Based on these recent Cisco CLI queries: [{}], suggest 4 highly relevant, professional follow-up topics or commands. Keep them concise (under 30 chars).",
            history.join(", ")
        )
    }
}

/// Whether a query deserves extended reasoning
///
/// Long queries and design or troubleshooting tasks qualify.
pub fn is_complex_query(query: &str) -> bool {
    let lower = query.to_lowercase();
    query.chars().count() > COMPLEX_QUERY_LENGTH
        || lower.contains("design")
        || lower.contains("troubleshoot")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestion_prompt_without_history() {
        let prompt = suggestion_prompt(&[]);
        assert!(prompt.contains("foundational"));
    }

    #[test]
    fn test_user_prompt_force_search_keeps_query() {
        let prompt = user_prompt("ip ospf cost", true);
        assert!(prompt.ends_with("ip ospf cost"));
    }

    #[test]
    fn test_is_complex_query() {
        assert!(!is_complex_query("show vlan brief"));
        assert!(is_complex_query("Troubleshoot flapping BGP session"));
        assert!(is_complex_query("campus DESIGN with dual core"));
        assert!(is_complex_query(&"x".repeat(101)));
        assert!(!is_complex_query(&"x".repeat(100)));
    }

    #[test]
    fn test_system_instruction_names_all_fields() {
        for field in [
            "reasoning",
            "deviceCategory",
            "commandMode",
            "usageContext",
            "correction",
            "isOutOfScope",
        ] {
            assert!(SYSTEM_INSTRUCTION.contains(field), "missing {field}");
        }
    }
}
