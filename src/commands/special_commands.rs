//! Special commands parser for the interactive chat session
//!
//! Special commands drive the session without sending a query:
//! - Switch between the home screen and the message log
//! - Clear history (two-step confirmation)
//! - Pick a model, toggle deep search, attach an image
//! - Submit a suggested topic by number (`#1` .. `#4`)
//!
//! Commands are prefixed with `/` and are case-insensitive; their arguments
//! keep their original case.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Show the home screen with suggestions
    Home,

    /// Show the message log
    Chat,

    /// Arm or confirm clearing the history
    Clear,

    /// Refresh suggestions from recent queries now
    Suggest,

    /// Select the model for subsequent queries
    SwitchModel(String),

    /// List models offered by the provider
    ListModels,

    /// Turn deep search on or off
    ForceSearch(bool),

    /// Stage an image file for the next query
    AttachImage(PathBuf),

    /// Drop the staged image
    DetachImage,

    /// Read the latest answer aloud, optionally saving the PCM audio
    Speak(Option<PathBuf>),

    /// Toggle the reasoning section on result cards
    ToggleReasoning,

    /// Show model, search flag and staged input
    ShowStatus,

    /// Submit suggestion N (1-based)
    Suggestion(usize),

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input should be submitted as a query.
    None,
}

fn missing(command: &str, usage: &str) -> CommandError {
    CommandError::MissingArgument {
        command: command.to_string(),
        usage: usage.to_string(),
    }
}

fn unsupported(command: &str, arg: &str) -> CommandError {
    CommandError::UnsupportedArgument {
        command: command.to_string(),
        arg: arg.to_string(),
    }
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` for unrecognized `/` commands,
/// `CommandError::MissingArgument` when a required argument is absent, and
/// `CommandError::UnsupportedArgument` for invalid arguments.
///
/// # Examples
///
/// ```
/// use cliexpert::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/search on").unwrap(), SpecialCommand::ForceSearch(true));
/// assert_eq!(parse_special_command("#2").unwrap(), SpecialCommand::Suggestion(2));
/// assert_eq!(parse_special_command("show vlan brief").unwrap(), SpecialCommand::None);
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if lower == "exit" || lower == "quit" {
        return Ok(SpecialCommand::Exit);
    }

    if let Some(number) = trimmed.strip_prefix('#') {
        return match number.trim().parse::<usize>() {
            Ok(n) if n >= 1 => Ok(SpecialCommand::Suggestion(n)),
            _ => Err(unsupported("#N", number)),
        };
    }

    if !trimmed.starts_with('/') {
        return Ok(SpecialCommand::None);
    }

    let (command, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command.to_lowercase(), rest.trim()),
        None => (lower.clone(), ""),
    };

    match command.as_str() {
        "/home" => Ok(SpecialCommand::Home),
        "/chat" | "/log" => Ok(SpecialCommand::Chat),
        "/clear" => Ok(SpecialCommand::Clear),
        "/suggest" => Ok(SpecialCommand::Suggest),
        "/models" => Ok(SpecialCommand::ListModels),
        "/model" if rest.is_empty() => Err(missing("/model", "/model <model_id>")),
        "/model" => Ok(SpecialCommand::SwitchModel(rest.to_string())),
        "/search" => match rest.to_lowercase().as_str() {
            "on" => Ok(SpecialCommand::ForceSearch(true)),
            "off" => Ok(SpecialCommand::ForceSearch(false)),
            "" => Err(missing("/search", "/search <on|off>")),
            arg => Err(unsupported("/search", arg)),
        },
        "/image" if rest.is_empty() => Err(missing("/image", "/image <path> | /image off")),
        "/image" if rest.eq_ignore_ascii_case("off") => Ok(SpecialCommand::DetachImage),
        "/image" => Ok(SpecialCommand::AttachImage(PathBuf::from(rest))),
        "/speak" if rest.is_empty() => Ok(SpecialCommand::Speak(None)),
        "/speak" => Ok(SpecialCommand::Speak(Some(PathBuf::from(rest)))),
        "/reasoning" => Ok(SpecialCommand::ToggleReasoning),
        "/status" => Ok(SpecialCommand::ShowStatus),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(command)),
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

NAVIGATION:
  /home           - Show the home screen with suggested topics
  /chat           - Show the message log
  #N              - Submit suggested topic N from the home screen

QUERIES:
  /model <id>     - Use a different model for the next queries
  /models         - List models offered by the provider
  /search on|off  - Ask for a grounded deep search
  /image <path>   - Attach an image (PNG, JPEG, GIF, WEBP) to the next query
  /image off      - Drop the attached image
  /reasoning      - Show or hide the model's reasoning on result cards

SESSION:
  /suggest        - Refresh suggestions from recent queries now
  /clear          - Clear history (run twice within 3 seconds to confirm)
  /speak [file]   - Read the latest answer aloud (optionally save raw PCM)
  /status         - Show model, search flag and staged image
  /help           - Show this help message
  /exit           - Exit (also: exit, quit)

NOTES:
  - Commands are case-insensitive
  - Anything else is sent as a query, e.g. `show vlan brif` or `configure OSPF area 0`
  - Queries longer than 1000 characters are rejected
"#
    );
}
