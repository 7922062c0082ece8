//! History command handler
//!
//! Lists or clears the persisted chat history without starting a session.
//! Clearing removes both the history and the cached suggestions.

use crate::cli::HistoryCommand;
use crate::config::Config;
use crate::error::Result;
use crate::session::{decode_history, Message, Role};
use crate::storage::{KeyValueStore, SledStore, HISTORY_KEY, SUGGESTIONS_KEY};
use chrono::{TimeZone, Utc};
use colored::Colorize;
use rustyline::DefaultEditor;

/// Handle history commands
pub fn handle_history(config: &Config, command: HistoryCommand) -> Result<()> {
    let store = SledStore::open_default(config.session.store_path.as_deref())?;

    match command {
        HistoryCommand::List { json } => {
            let messages = load_messages(&store)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&messages)?);
                return Ok(());
            }

            if messages.is_empty() {
                println!("{}", "No conversation history found.".yellow());
                return Ok(());
            }

            println!("\nConversation History ({}):", store.path().display());
            for message in &messages {
                println!("{}", format_row(message));
            }
            println!();
            println!("Use {} to continue the session.", "cliexpert chat".cyan());
            println!();
        }
        HistoryCommand::Clear { yes } => {
            let count = load_messages(&store)?.len();
            if !yes && !confirm(count)? {
                println!("Aborted.");
                return Ok(());
            }
            clear_store(&store)?;
            println!("{}", format!("Deleted {} messages", count).green());
        }
    }

    Ok(())
}

fn load_messages(store: &dyn KeyValueStore) -> Result<Vec<Message>> {
    Ok(decode_history(store.get(HISTORY_KEY)?.as_deref()))
}

/// Remove the history and the suggestion cache
pub fn clear_store(store: &dyn KeyValueStore) -> Result<()> {
    store.remove(HISTORY_KEY)?;
    store.remove(SUGGESTIONS_KEY)?;
    tracing::info!("Removed persisted history and suggestions");
    Ok(())
}

fn confirm(count: usize) -> Result<bool> {
    let mut rl = DefaultEditor::new()?;
    let answer = rl.readline(&format!("Delete {} messages? [y/N] ", count))?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// One line of the history listing
pub fn format_row(message: &Message) -> String {
    let when = Utc
        .timestamp_millis_opt(message.timestamp)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());

    let role = match message.role {
        Role::User => "user".cyan(),
        Role::Assistant => "assistant".green(),
    };

    let content: String = if message.content.chars().count() > 60 {
        let head: String = message.content.chars().take(57).collect();
        format!("{}...", head)
    } else {
        message.content.clone()
    };

    let mut row = format!("{}  {:<9}  {}", when.dimmed(), role, content);
    if message.image.is_some() {
        row.push_str(&format!(" {}", "[image]".dimmed()));
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_format_row_truncates_long_content() {
        colored::control::set_override(false);
        let mut message = Message::user(&"x".repeat(80), None);
        message.timestamp = 0;

        let row = format_row(&message);
        assert!(row.starts_with("1970-01-01 00:00  user"));
        assert!(row.ends_with(&format!("{}...", "x".repeat(57))));
    }

    #[test]
    fn test_format_row_marks_images() {
        colored::control::set_override(false);
        let row = format_row(&Message::user("", Some("AA".to_string())));
        assert!(row.ends_with("Image analysis request [image]"));
    }

    #[test]
    fn test_clear_store_removes_both_keys() {
        let store = MemoryStore::with_entries([(HISTORY_KEY, "[]"), (SUGGESTIONS_KEY, "[]")]);
        clear_store(&store).unwrap();
        assert!(!store.contains(HISTORY_KEY));
        assert!(!store.contains(SUGGESTIONS_KEY));
    }

    #[test]
    fn test_load_messages_tolerates_garbage() {
        let store = MemoryStore::with_entries([(HISTORY_KEY, "garbage")]);
        assert!(load_messages(&store).unwrap().is_empty());
    }
}
