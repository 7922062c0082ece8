//! Cisco CLI Expert library
//!
//! This library answers questions about Cisco IOS, IOS XE and IOS XR
//! commands with structured documentation cards produced by hosted LLMs,
//! keeps a persistent chat session with predictive follow-up suggestions,
//! and can run as an HTTP proxy in front of the provider.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Chat log, persistence, debounced suggestions, clear confirmation
//! - `providers`: Provider abstraction and implementations (Gemini, Azure OpenAI, proxy)
//! - `prompts`: System instruction and prompt builders
//! - `storage`: Key-value persistence (sled on disk, in-memory for tests)
//! - `render`: Terminal rendering of result cards and the home screen
//! - `server`: HTTP proxy (axum)
//! - `audio`: PCM decoding for text-to-speech payloads
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use cliexpert::providers::create_provider;
//! use cliexpert::session::{SessionManager, SessionSettings};
//! use cliexpert::storage::MemoryStore;
//! use cliexpert::Config;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let provider = create_provider(&config.provider.provider_type, &config.provider)?;
//!     let session = SessionManager::load(
//!         Arc::from(provider),
//!         Arc::new(MemoryStore::new()),
//!         SessionSettings::from_config(&config),
//!     );
//!     let outcome = session.submit_query("show vlan brief", None).await;
//!     println!("{:?}", outcome.reply());
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod prompts;
pub mod providers;
pub mod render;
pub mod server;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{CliExpertError, Result};
pub use session::{SessionManager, SessionSettings};

#[cfg(test)]
pub mod test_utils;
