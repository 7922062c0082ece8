//! Command-line interface definition for Cisco CLI Expert
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, one-shot lookups, the proxy
//! server, history management, and speech synthesis.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cisco CLI Expert - structured Cisco command documentation from LLMs
///
/// Ask about IOS, IOS XE, and IOS XR commands and get syntax, options,
/// security notes, and troubleshooting steps rendered as cards.
#[derive(Parser, Debug, Clone)]
#[command(name = "cliexpert")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override the session database directory
    #[arg(long, env = "CLIEXPERT_STORE_PATH")]
    pub store_path: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the interactive chat session
    Chat {
        /// Override the provider from config (gemini, azure, proxy)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model identifier to start with
        #[arg(short, long)]
        model: Option<String>,

        /// Keep history in memory only for this run
        #[arg(long)]
        ephemeral: bool,
    },

    /// Look up a single command and print the result card
    Ask {
        /// Query text (command, typo, or task description)
        query: Option<String>,

        /// Attach an image (CLI screenshot, topology diagram)
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Override the provider from config (gemini, azure, proxy)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model identifier
        #[arg(short, long)]
        model: Option<String>,

        /// Ask the provider for a grounded deep search
        #[arg(long)]
        force_search: bool,

        /// Print the raw result as JSON instead of a card
        #[arg(long)]
        json: bool,
    },

    /// Run the HTTP proxy in front of the provider
    Serve {
        /// Upstream provider (gemini, azure)
        #[arg(short, long)]
        provider: Option<String>,

        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Listen port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Inspect or reset the persisted session
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Synthesize speech for a piece of text
    Speak {
        /// Text to read aloud
        text: String,

        /// Override the provider from config (azure, proxy)
        #[arg(short, long)]
        provider: Option<String>,

        /// Write the raw 16-bit PCM to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// History management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List persisted messages
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove the persisted history and suggestion cache
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            store_path: None,
            command: Commands::History {
                command: HistoryCommand::List { json: false },
            },
        }
    }
}
