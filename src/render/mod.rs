//! Terminal rendering for result cards, the message log, and the home screen
//!
//! Provider text uses a small markdown subset: `**bold**`, `*italic*`,
//! `` `code` `` and bullet lines starting with `- ` or `* `. Syntax and
//! examples are printed verbatim as code blocks.

use crate::providers::{DeviceCategory, QueryResult};
use crate::session::{Message, Role, SessionSnapshot, ViewMode};
use colored::Colorize;
use regex::Regex;
use std::sync::OnceLock;

/// Rendering switches
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Expand the model's reasoning section
    pub show_reasoning: bool,
}

fn inline_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\*\*.*?\*\*|\*.*?\*|`.*?`").ok())
        .as_ref()
}

/// Render inline markdown spans
///
/// # Examples
///
/// ```
/// use cliexpert::render::render_inline;
///
/// colored::control::set_override(false);
/// assert_eq!(render_inline("use **`ip routing`** first"), "use `ip routing` first");
/// assert_eq!(render_inline("run `show run`"), "run show run");
/// ```
pub fn render_inline(text: &str) -> String {
    let Some(pattern) = inline_pattern() else {
        return text.to_string();
    };
    pattern
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let token = &caps[0];
            if token.len() >= 4 && token.starts_with("**") && token.ends_with("**") {
                token[2..token.len() - 2].bold().to_string()
            } else if token.starts_with('`') {
                token[1..token.len() - 1].cyan().to_string()
            } else {
                token[1..token.len() - 1].italic().dimmed().to_string()
            }
        })
        .into_owned()
}

/// Render a multi-line text block with bullets
pub fn render_block(text: &str, indent: &str) -> String {
    let mut out = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            out.push(format!("{}{} {}", indent, "•".blue(), render_inline(item)));
        } else if trimmed.is_empty() {
            out.push(String::new());
        } else {
            out.push(format!("{}{}", indent, render_inline(line)));
        }
    }
    out.join("\n")
}

/// Render text verbatim as a code block
pub fn render_code(text: &str, indent: &str) -> String {
    text.lines()
        .map(|line| format!("{}{} {}", indent, "│".dimmed(), line.green()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Badge for the device family
pub fn category_badge(category: DeviceCategory) -> String {
    let label = format!("[{}]", category.to_string().to_uppercase());
    match category {
        DeviceCategory::Switch => label.blue().bold().to_string(),
        DeviceCategory::Router => label.purple().bold().to_string(),
        DeviceCategory::Universal => label.green().bold().to_string(),
    }
}

/// Badge for the CLI mode; configuration modes stand out in red
pub fn mode_badge(result: &QueryResult) -> String {
    let mode = if result.command_mode.trim().is_empty() {
        "Unknown mode".to_string()
    } else {
        result.command_mode.trim().to_string()
    };
    let label = format!("[{}]", mode.to_uppercase());
    let lower = mode.to_lowercase();
    if result.is_config_mode() {
        label.red().bold().to_string()
    } else if lower.contains("exec") {
        label.cyan().bold().to_string()
    } else {
        label.white().to_string()
    }
}

fn section(out: &mut Vec<String>, title: &str, body: Option<&str>, code: bool) {
    let Some(body) = body.map(str::trim).filter(|b| !b.is_empty()) else {
        return;
    };
    out.push(String::new());
    out.push(format!("  {}", title.to_uppercase().bold().underline()));
    if code {
        out.push(render_code(body, "  "));
    } else {
        out.push(render_block(body, "  "));
    }
}

/// Render a full result card
pub fn render_result(result: &QueryResult, options: RenderOptions) -> String {
    let mut out = Vec::new();

    if result.out_of_scope() {
        out.push(format!(
            "  {} {}",
            "⚠".yellow(),
            "This request is outside the scope of Cisco networking.".yellow()
        ));
        if !result.reasoning.trim().is_empty() {
            out.push(render_block(&result.reasoning, "  "));
        }
        return out.join("\n");
    }

    if let Some(correction) = result.correction.as_deref().filter(|c| !c.trim().is_empty()) {
        out.push(format!(
            "  {} {}",
            "Syntactic Auto-Correction:".yellow(),
            correction.yellow().bold()
        ));
    }

    out.push(format!(
        "  {} {}",
        category_badge(result.device_category_kind()),
        mode_badge(result)
    ));

    if options.show_reasoning {
        section(&mut out, "AI Logic", Some(&result.reasoning), false);
    } else if !result.reasoning.trim().is_empty() {
        out.push(format!("  {}", "(reasoning hidden, toggle with /reasoning)".dimmed()));
    }

    section(&mut out, "Syntax", Some(&result.syntax), true);
    section(&mut out, "Description", Some(&result.description), false);
    section(&mut out, "Context", Some(&result.usage_context), false);
    section(&mut out, "Checklist", result.checklist.as_deref(), false);
    section(&mut out, "Options", Some(&result.options), false);
    section(&mut out, "Security", result.security.as_deref(), false);
    section(&mut out, "Troubleshooting", result.troubleshooting.as_deref(), false);
    section(&mut out, "Notes", Some(&result.notes), false);
    section(&mut out, "Examples", Some(&result.examples), true);

    if let Some(sources) = result.sources.as_ref().filter(|s| !s.is_empty()) {
        out.push(String::new());
        out.push(format!("  {}", "SOURCES".bold().underline()));
        for (i, source) in sources.iter().enumerate() {
            out.push(format!(
                "  {}. {} {}",
                i + 1,
                source.title,
                source.uri.dimmed()
            ));
        }
    }

    out.join("\n")
}

/// Render one message of the log
pub fn render_message(message: &Message, options: RenderOptions) -> String {
    match message.role {
        Role::User => {
            let mut line = format!("{} {}", "›".blue().bold(), message.content.bold());
            if message.image.is_some() {
                line.push_str(&format!(" {}", "[image attached]".dimmed()));
            }
            line
        }
        Role::Assistant => match &message.metadata {
            Some(result) => format!(
                "{}\n{}",
                message.content.dimmed(),
                render_result(result, options)
            ),
            None => message.content.red().to_string(),
        },
    }
}

/// Render the home screen with numbered suggestions
pub fn render_home(snapshot: &SessionSnapshot) -> String {
    let mut out = vec![
        format!("{}", "Cisco CLI Expert".bold().cyan()),
        format!(
            "{}",
            "IOS, IOS XE and IOS XR commands, explained.".dimmed()
        ),
        String::new(),
    ];

    let heading = if snapshot.is_predictive {
        "Predicted for you"
    } else {
        "Suggested topics"
    };
    out.push(heading.bold().to_string());
    for (i, suggestion) in snapshot.suggestions.iter().enumerate() {
        out.push(format!("  {} {}", format!("#{}", i + 1).yellow(), suggestion));
    }
    out.push(String::new());
    out.push(render_status(snapshot));
    out.join("\n")
}

/// Render the whole message log
pub fn render_log(snapshot: &SessionSnapshot, options: RenderOptions) -> String {
    if snapshot.messages.is_empty() {
        return "No messages yet.".dimmed().to_string();
    }
    snapshot
        .messages
        .iter()
        .map(|m| render_message(m, options))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render the current view
pub fn render_view(snapshot: &SessionSnapshot, options: RenderOptions) -> String {
    match snapshot.view_mode {
        ViewMode::Home => render_home(snapshot),
        ViewMode::Chat => render_log(snapshot, options),
    }
}

/// One-line status: model, search flag, pending clear
pub fn render_status(snapshot: &SessionSnapshot) -> String {
    let search = if snapshot.force_search {
        "search: on".green()
    } else {
        "search: off".dimmed()
    };
    let mut line = format!("{} {} | {}", "model:".dimmed(), snapshot.model, search);
    if snapshot.has_staged_image {
        line.push_str(&format!(" | {}", "image staged".yellow()));
    }
    if snapshot.clear_armed {
        line.push_str(&format!(
            " | {}",
            "press /clear again to confirm".red().bold()
        ));
    }
    line
}
