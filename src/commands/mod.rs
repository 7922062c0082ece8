/*!
Command handlers for the CLI

This module provides the handlers invoked by the CLI entrypoint:

- `chat`   : Interactive session with history and suggestions
- `ask`    : One-shot lookup printed as a card or JSON
- `serve`  : HTTP proxy in front of the configured provider
- `history`: Inspect or reset the persisted session
- `speak`  : Text-to-speech to a PCM file

The handlers are thin wrappers over the session manager, the providers,
and the renderer.
*/

use crate::config::Config;
use crate::error::{CliExpertError, Result};
use crate::providers::{create_provider_with_override, Provider};
use crate::storage::{KeyValueStore, MemoryStore, SledStore};
use base64::prelude::*;
use std::path::Path;
use std::sync::Arc;

// Special commands parser for the chat session
pub mod special_commands;

// Persisted history inspection
pub mod history;

/// MIME type for a supported image file, judged by extension
pub fn image_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Read an image file into a `data:` URL
///
/// # Errors
///
/// Returns a validation error for unsupported extensions or unreadable files
pub fn encode_image_file(path: &Path) -> Result<String> {
    let mime = image_mime_type(path).ok_or_else(|| {
        CliExpertError::Validation(format!(
            "Unsupported image type: {} (expected png, jpg, gif or webp)",
            path.display()
        ))
    })?;

    let bytes = std::fs::read(path).map_err(|e| {
        CliExpertError::Validation(format!("Failed to read image {}: {}", path.display(), e))
    })?;

    tracing::debug!("Encoded image {} ({} bytes)", path.display(), bytes.len());
    Ok(format!("data:{};base64,{}", mime, BASE64_STANDARD.encode(bytes)))
}

fn open_store(config: &Config, ephemeral: bool) -> Result<Arc<dyn KeyValueStore>> {
    if ephemeral {
        tracing::info!("Using in-memory session store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = SledStore::open_default(config.session.store_path.as_deref())?;
    tracing::info!("Using session store at {}", store.path().display());
    Ok(Arc::new(store))
}

/// Point `config` at the provider named on the command line
///
/// The default model is derived from the provider type, so the override
/// has to land in the config before any model id is resolved.
fn apply_provider_override(config: &mut Config, provider: Option<String>) {
    if let Some(provider) = provider {
        config.provider.provider_type = provider;
    }
}

fn build_provider(
    config: &Config,
    provider: Option<&str>,
    model: Option<&str>,
) -> Result<Arc<dyn Provider>> {
    Ok(Arc::from(create_provider_with_override(
        &config.provider,
        provider,
        model,
    )?))
}

/// Synthesize `text`, optionally writing the PCM bytes to `output`
///
/// Returns a one-line summary of the decoded audio.
async fn synthesize(
    provider: &dyn Provider,
    text: &str,
    output: Option<&Path>,
) -> Result<String> {
    let payload = provider.synthesize_speech(text).await?;
    let audio = payload.decode()?;

    let mut summary = format!(
        "{:.1}s of audio ({} Hz, {} channel{})",
        audio.duration().as_secs_f32(),
        audio.sample_rate,
        audio.channels.len(),
        if audio.channels.len() == 1 { "" } else { "s" }
    );

    if let Some(path) = output {
        std::fs::write(path, payload.pcm_bytes()?)?;
        summary.push_str(&format!(", raw PCM written to {}", path.display()));
    }
    Ok(summary)
}

// Chat command handler
pub mod chat {
    //! Interactive chat session.
    //!
    //! Loads the persisted session, renders the current view, and runs a
    //! readline loop. Plain input is submitted as a query; `/` commands and
    //! `#N` drive the session.

    use super::*;
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use crate::render::{render_home, render_log, render_message, render_status, RenderOptions};
    use crate::session::{ClearOutcome, Role, SessionManager, SessionSettings, SubmitOutcome};
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use std::path::PathBuf;
    use std::time::Duration;

    /// Build the session the REPL drives, with any overrides applied
    pub(crate) fn open_session(
        mut config: Config,
        provider_name: Option<String>,
        model: Option<String>,
        ephemeral: bool,
    ) -> Result<SessionManager> {
        apply_provider_override(&mut config, provider_name);
        let provider = build_provider(&config, None, model.as_deref())?;
        let store = open_store(&config, ephemeral)?;

        let mut settings = SessionSettings::from_config(&config);
        if let Some(model) = model {
            settings.initial_model = model;
        }
        Ok(SessionManager::load(provider, store, settings))
    }

    /// What the loop should do after a special command
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ReplAction {
        /// Print text and read the next line
        Print(String),
        /// Submit this text as a query
        Submit(String),
        /// Synthesize the latest answer
        Speak(Option<PathBuf>),
        /// Leave the loop
        Exit,
    }

    /// Start the interactive session
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `provider_name` - Optional override for the configured provider
    /// * `model` - Optional model to start with
    /// * `ephemeral` - Keep history in memory only
    pub async fn run_chat(
        config: Config,
        provider_name: Option<String>,
        model: Option<String>,
        ephemeral: bool,
    ) -> Result<()> {
        tracing::info!("Starting interactive chat session");

        let session = open_session(config, provider_name, model, ephemeral)?;
        let mut rl = DefaultEditor::new()?;
        let mut options = RenderOptions::default();

        print_welcome_banner(&session);

        loop {
            let prompt = format!("{} ", "cisco>".cyan().bold());
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(trimmed)?;

                    let action = match parse_special_command(trimmed) {
                        Ok(SpecialCommand::None) => ReplAction::Submit(trimmed.to_string()),
                        Ok(command) => apply_special_command(&session, &mut options, command),
                        Err(e) => ReplAction::Print(e.to_string().red().to_string()),
                    };

                    match action {
                        ReplAction::Print(text) => println!("{}\n", text),
                        ReplAction::Submit(query) => {
                            println!("{}", "Consulting Cisco documentation...".dimmed());
                            let outcome = session
                                .submit_query(&query, session.staged_image())
                                .await;
                            println!("{}\n", describe_outcome(&outcome, options));
                        }
                        ReplAction::Speak(output) => {
                            println!("{}\n", speak_latest(&session, output.as_deref()).await);
                        }
                        ReplAction::Exit => break,
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Apply a parsed special command to the session
    pub fn apply_special_command(
        session: &SessionManager,
        options: &mut RenderOptions,
        command: SpecialCommand,
    ) -> ReplAction {
        match command {
            SpecialCommand::Home => {
                session.navigate_home();
                ReplAction::Print(render_home(&session.snapshot()))
            }
            SpecialCommand::Chat => {
                session.navigate_to_chat();
                ReplAction::Print(render_log(&session.snapshot(), *options))
            }
            SpecialCommand::Clear => match session.clear_history() {
                ClearOutcome::Armed => ReplAction::Print(
                    format!(
                        "Run /clear again within {} to delete the history.",
                        format_window(session.clear_confirm_window())
                    )
                    .yellow()
                    .to_string(),
                ),
                ClearOutcome::Cleared => ReplAction::Print(format!(
                    "{}\n\n{}",
                    "History cleared.".green(),
                    render_home(&session.snapshot())
                )),
            },
            SpecialCommand::Suggest => {
                session.request_suggestion_refresh();
                ReplAction::Print("Refreshing suggestions from recent queries.".to_string())
            }
            SpecialCommand::SwitchModel(model) => {
                let known = session.models();
                session.select_model(&model);
                let mut text = format!("Model set to {}", model.cyan());
                if !known.is_empty() && !known.iter().any(|m| m.id == model) {
                    text.push_str(&format!(
                        "\n{}",
                        "Not in the provider's catalog; the request may be rejected.".yellow()
                    ));
                }
                ReplAction::Print(text)
            }
            SpecialCommand::ListModels => {
                let current = session.model();
                let models = session.models();
                if models.is_empty() {
                    return ReplAction::Print(format!("Current model: {}", current.cyan()));
                }
                let lines: Vec<String> = models
                    .iter()
                    .map(|m| {
                        let marker = if m.id == current { "*" } else { " " };
                        format!("{} {:<28} {}", marker.green(), m.id.cyan(), m.description)
                    })
                    .collect();
                ReplAction::Print(lines.join("\n"))
            }
            SpecialCommand::ForceSearch(enabled) => {
                session.set_force_search(enabled);
                ReplAction::Print(format!(
                    "Deep search {}",
                    if enabled { "enabled" } else { "disabled" }
                ))
            }
            SpecialCommand::AttachImage(path) => match encode_image_file(&path) {
                Ok(image) => {
                    session.stage_image(Some(image));
                    ReplAction::Print(format!(
                        "Attached {}; it will be sent with the next query.",
                        path.display()
                    ))
                }
                Err(e) => ReplAction::Print(e.to_string().red().to_string()),
            },
            SpecialCommand::DetachImage => {
                session.stage_image(None);
                ReplAction::Print("Image removed.".to_string())
            }
            SpecialCommand::Speak(output) => ReplAction::Speak(output),
            SpecialCommand::ToggleReasoning => {
                options.show_reasoning = !options.show_reasoning;
                ReplAction::Print(format!(
                    "Reasoning {}",
                    if options.show_reasoning {
                        "shown"
                    } else {
                        "hidden"
                    }
                ))
            }
            SpecialCommand::ShowStatus => ReplAction::Print(render_status(&session.snapshot())),
            SpecialCommand::Suggestion(n) => {
                let suggestions = session.suggestions();
                match n.checked_sub(1).and_then(|i| suggestions.get(i)) {
                    Some(topic) => ReplAction::Submit(topic.clone()),
                    None => ReplAction::Print(
                        format!("No suggestion #{}; pick 1-{}", n, suggestions.len())
                            .red()
                            .to_string(),
                    ),
                }
            }
            SpecialCommand::Help => {
                print_help();
                ReplAction::Print(String::new())
            }
            SpecialCommand::Exit => ReplAction::Exit,
            SpecialCommand::None => ReplAction::Print(String::new()),
        }
    }

    /// Human form of the clear confirmation window
    pub(crate) fn format_window(window: Duration) -> String {
        let millis = window.as_millis();
        match millis {
            1000 => "1 second".to_string(),
            m if m % 1000 == 0 => format!("{} seconds", m / 1000),
            m => format!("{} ms", m),
        }
    }

    /// Text shown after a submission
    pub fn describe_outcome(outcome: &SubmitOutcome, options: RenderOptions) -> String {
        match outcome {
            SubmitOutcome::Empty => String::new(),
            SubmitOutcome::Busy => "A query is already in flight.".yellow().to_string(),
            SubmitOutcome::TooLong { length, max } => {
                format!("Query is {} characters; the limit is {}.", length, max)
                    .red()
                    .to_string()
            }
            SubmitOutcome::Answered(message) | SubmitOutcome::Failed(message) => {
                render_message(message, options)
            }
        }
    }

    async fn speak_latest(session: &SessionManager, output: Option<&Path>) -> String {
        let latest = session
            .messages()
            .into_iter()
            .rev()
            .filter(|m| m.role == Role::Assistant)
            .find_map(|m| m.metadata);

        let Some(result) = latest else {
            return "Nothing to read yet.".yellow().to_string();
        };
        let text = if result.description.trim().is_empty() {
            result.syntax
        } else {
            result.description
        };

        let provider = session.provider();
        match synthesize(provider.as_ref(), &text, output).await {
            Ok(summary) => format!("Synthesized {}", summary),
            Err(e) => format!("Speech failed: {:#}", e).red().to_string(),
        }
    }

    fn print_welcome_banner(session: &SessionManager) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║              Cisco CLI Expert - Interactive Session          ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        let snapshot = session.snapshot();
        if snapshot.messages.is_empty() {
            println!("{}\n", render_home(&snapshot));
        } else {
            println!(
                "{}\n",
                format!("Restored {} messages. /chat shows the log.", snapshot.messages.len())
                    .dimmed()
            );
            println!("{}\n", render_status(&snapshot));
        }
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }
}

// One-shot lookup
pub mod ask {
    //! Single query without touching the persisted session.

    use super::*;
    use crate::providers::{CompletionRequest, QueryResult};
    use crate::render::{render_result, RenderOptions};
    use crate::session::IMAGE_PLACEHOLDER;
    use std::path::PathBuf;

    /// Options for `run_ask`
    #[derive(Debug, Clone, Default)]
    pub struct AskArgs {
        /// Query text
        pub query: Option<String>,
        /// Image to attach
        pub image: Option<PathBuf>,
        /// Provider override
        pub provider: Option<String>,
        /// Model override
        pub model: Option<String>,
        /// Ask for deep search
        pub force_search: bool,
        /// Print JSON instead of a card
        pub json: bool,
    }

    /// Build the completion request for a one-shot query
    ///
    /// # Errors
    ///
    /// Returns a validation error when neither text nor image is given, or
    /// when the text exceeds `max_query_length` characters
    pub fn build_request(
        query: Option<&str>,
        image: Option<String>,
        model: &str,
        force_search: bool,
        max_query_length: usize,
    ) -> Result<CompletionRequest> {
        let text = query.unwrap_or_default().trim();
        if text.is_empty() && image.is_none() {
            return Err(CliExpertError::Validation("Query is required".to_string()).into());
        }
        let length = text.chars().count();
        if length > max_query_length {
            return Err(CliExpertError::Validation(format!(
                "Query is {} characters; the limit is {}",
                length, max_query_length
            ))
            .into());
        }

        let text = if text.is_empty() { IMAGE_PLACEHOLDER } else { text };
        let mut request = CompletionRequest::new(text, model).with_force_search(force_search);
        request.image_base64 = image;
        Ok(request)
    }

    /// Resolve the provider and model for `args` and run the query
    pub(crate) async fn lookup(mut config: Config, args: &AskArgs) -> Result<QueryResult> {
        apply_provider_override(&mut config, args.provider.clone());

        let image = args
            .image
            .as_deref()
            .map(encode_image_file)
            .transpose()?;

        let model = args.model.clone().unwrap_or_else(|| config.initial_model());
        let request = build_request(
            args.query.as_deref(),
            image,
            &model,
            args.force_search,
            config.session.max_query_length,
        )?;

        let provider = build_provider(&config, None, args.model.as_deref())?;
        provider.complete(&request).await
    }

    /// Run a single lookup and print the result
    pub async fn run_ask(config: Config, args: AskArgs) -> Result<()> {
        let result = lookup(config, &args).await?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!(
                "{}",
                render_result(&result, RenderOptions { show_reasoning: true })
            );
        }
        Ok(())
    }
}

// Proxy server
pub mod serve {
    //! Run the HTTP proxy.

    use super::*;

    /// Start the proxy server
    ///
    /// # Errors
    ///
    /// Returns error if the provider is `proxy` (the server needs a real
    /// upstream), if the provider cannot be created, or if binding fails
    pub async fn run_serve(
        mut config: Config,
        provider_name: Option<String>,
        host: Option<String>,
        port: Option<u16>,
    ) -> Result<()> {
        if let Some(host) = host {
            config.server.host = host;
        }
        if let Some(port) = port {
            config.server.port = port;
        }
        apply_provider_override(&mut config, provider_name);

        if config.provider.provider_type == "proxy" {
            return Err(CliExpertError::Config(
                "serve needs an upstream provider (gemini or azure), not proxy".to_string(),
            )
            .into());
        }

        let provider = build_provider(&config, None, None)?;
        crate::server::serve(&config, provider).await
    }
}

// Speech synthesis
pub mod speak {
    //! Text-to-speech from the command line.

    use super::*;
    use std::path::PathBuf;

    /// Synthesize `text` and report (or save) the audio
    pub async fn run_speak(
        mut config: Config,
        text: String,
        provider_name: Option<String>,
        output: Option<PathBuf>,
    ) -> Result<()> {
        if text.trim().is_empty() {
            return Err(CliExpertError::Validation("Text is required for TTS".to_string()).into());
        }
        apply_provider_override(&mut config, provider_name);
        let provider = build_provider(&config, None, None)?;
        let summary = synthesize(provider.as_ref(), &text, output.as_deref()).await?;
        println!("Synthesized {}", summary);
        Ok(())
    }
}
