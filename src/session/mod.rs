//! Conversation session state
//!
//! `SessionManager` owns the chat log, the view mode, and the suggestion
//! list, and is the only writer of the `history` and `suggestions` store
//! keys. It is a cheaply clonable handle; clones share the same session.
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! `.await`. Completions are serialized by an in-flight flag. Suggestion
//! refreshes are debounced: every append schedules a task that sleeps for
//! the debounce window and then asks the provider for follow-up topics, but
//! only if no newer refresh has been scheduled in the meantime. The same
//! generation check runs again when the provider answers, so a slow stale
//! reply can never overwrite newer suggestions.

mod message;
mod suggestions;

pub use message::{
    decode_history, encode_history, Message, Role, FALLBACK_REPLY, IMAGE_PLACEHOLDER,
};
pub use suggestions::{
    decode_suggestions, default_suggestions, is_predictive, recent_queries, DEFAULT_SUGGESTIONS,
};

use crate::config::Config;
use crate::providers::{CompletionRequest, ModelInfo, Provider};
use crate::storage::{KeyValueStore, HISTORY_KEY, SUGGESTIONS_KEY};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Which surface the presentation layer shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Landing screen with suggestions
    Home,
    /// Message log
    Chat,
}

/// Timing and limits for a session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Quiet period after the last append before suggestions refresh
    pub suggestion_debounce: Duration,
    /// Window in which a second clear confirms the reset
    pub clear_confirm_window: Duration,
    /// Number of recent user queries sent for suggestions
    pub suggestion_window: usize,
    /// Maximum query length in characters
    pub max_query_length: usize,
    /// Model a new session starts with
    pub initial_model: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            suggestion_debounce: Duration::from_millis(1500),
            clear_confirm_window: Duration::from_millis(3000),
            suggestion_window: 5,
            max_query_length: 1000,
            initial_model: "gemini-2.5-flash-lite".to_string(),
        }
    }
}

impl SessionSettings {
    /// Settings derived from the loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            suggestion_debounce: Duration::from_millis(config.session.suggestion_debounce_ms),
            clear_confirm_window: Duration::from_millis(config.session.clear_confirm_ms),
            suggestion_window: config.session.suggestion_window,
            max_query_length: config.session.max_query_length,
            initial_model: config.initial_model(),
        }
    }
}

/// Result of `submit_query`
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Nothing to send; the log is untouched
    Empty,
    /// Another completion is still in flight; the log is untouched
    Busy,
    /// The query exceeds the length limit; the log is untouched
    TooLong {
        /// Query length in characters
        length: usize,
        /// Configured limit
        max: usize,
    },
    /// The provider answered; carries the appended assistant message
    Answered(Message),
    /// The provider failed; carries the appended fallback message
    Failed(Message),
}

impl SubmitOutcome {
    /// The assistant message appended by this submission, if any
    pub fn reply(&self) -> Option<&Message> {
        match self {
            Self::Answered(message) | Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Result of `clear_history`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    /// First call; a second call within the window confirms
    Armed,
    /// Confirmed; history and suggestions were reset
    Cleared,
}

/// Read-only view of the session for rendering
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Message log in chronological order
    pub messages: Vec<Message>,
    /// Current view
    pub view_mode: ViewMode,
    /// Current suggestions
    pub suggestions: Vec<String>,
    /// Whether the suggestions were derived from history
    pub is_predictive: bool,
    /// Whether a completion is outstanding
    pub in_flight: bool,
    /// Whether a clear is waiting for confirmation
    pub clear_armed: bool,
    /// Selected model identifier
    pub model: String,
    /// Whether grounded deep search is requested
    pub force_search: bool,
    /// Text staged for the next submission
    pub staged_input: String,
    /// Whether an image is staged for the next submission
    pub has_staged_image: bool,
}

struct SessionState {
    messages: Vec<Message>,
    view_mode: ViewMode,
    suggestions: Vec<String>,
    in_flight: bool,
    clear_armed_at: Option<Instant>,
    refresh_generation: u64,
    model: String,
    force_search: bool,
    staged_input: String,
    staged_image: Option<String>,
}

struct Inner {
    provider: Arc<dyn Provider>,
    store: Arc<dyn KeyValueStore>,
    settings: SessionSettings,
    state: Mutex<SessionState>,
}

/// Owner of the chat log, view mode, and suggestions
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use cliexpert::config::Config;
/// use cliexpert::providers::create_provider;
/// use cliexpert::session::{SessionManager, SessionSettings};
/// use cliexpert::storage::MemoryStore;
///
/// # async fn example() -> cliexpert::error::Result<()> {
/// let config = Config::default();
/// let provider = create_provider("gemini", &config.provider)?;
/// let session = SessionManager::load(
///     Arc::from(provider),
///     Arc::new(MemoryStore::new()),
///     SessionSettings::from_config(&config),
/// );
/// let outcome = session.submit_query("show vlan brief", None).await;
/// println!("{:?}", outcome.reply().map(|m| &m.content));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Restore a session from `store`
    ///
    /// Unreadable history starts an empty log and unreadable suggestions
    /// start from the defaults. Neither failure is surfaced.
    pub fn load(
        provider: Arc<dyn Provider>,
        store: Arc<dyn KeyValueStore>,
        settings: SessionSettings,
    ) -> Self {
        let messages = match store.get(HISTORY_KEY) {
            Ok(raw) => decode_history(raw.as_deref()),
            Err(e) => {
                tracing::warn!("Failed to read chat history: {:#}", e);
                Vec::new()
            }
        };

        let suggestions = match store.get(SUGGESTIONS_KEY) {
            Ok(raw) => decode_suggestions(raw.as_deref()),
            Err(e) => {
                tracing::warn!("Failed to read suggestion cache: {:#}", e);
                default_suggestions()
            }
        };

        let view_mode = if messages.is_empty() {
            ViewMode::Home
        } else {
            ViewMode::Chat
        };

        tracing::info!(
            "Loaded session: {} messages, provider={}",
            messages.len(),
            provider.name()
        );

        let state = SessionState {
            messages,
            view_mode,
            suggestions,
            in_flight: false,
            clear_armed_at: None,
            refresh_generation: 0,
            model: settings.initial_model.clone(),
            force_search: false,
            staged_input: String::new(),
            staged_image: None,
        };

        Self {
            inner: Arc::new(Inner {
                provider,
                store,
                settings,
                state: Mutex::new(state),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Submit a query, optionally with an image
    ///
    /// The user message is appended before the provider is called, so the
    /// log grows by one immediately and by one more when the call resolves.
    /// Provider failures append a fallback reply instead of propagating.
    pub async fn submit_query(&self, text: &str, image: Option<String>) -> SubmitOutcome {
        let query = text.trim();
        let image = image.filter(|i| !i.trim().is_empty());

        let request = {
            let mut state = self.state();

            if query.is_empty() && image.is_none() {
                return SubmitOutcome::Empty;
            }
            if state.in_flight {
                tracing::debug!("Ignoring submit while a completion is in flight");
                return SubmitOutcome::Busy;
            }
            let length = query.chars().count();
            let max = self.inner.settings.max_query_length;
            if length > max {
                tracing::warn!("Rejecting query of {} characters (limit {})", length, max);
                return SubmitOutcome::TooLong { length, max };
            }

            let user = Message::user(query, image.clone());
            let mut request = CompletionRequest::new(user.content.clone(), state.model.clone())
                .with_force_search(state.force_search);
            request.image_base64 = image;

            state.messages.push(user);
            state.staged_input.clear();
            state.staged_image = None;
            state.view_mode = ViewMode::Chat;
            state.in_flight = true;
            self.persist_history(&state);
            self.schedule_refresh(&mut state);
            request
        };

        tracing::info!(
            "Submitting query: model={}, force_search={}, image={}",
            request.model,
            request.force_search,
            request.image_base64.is_some()
        );

        let reply = match self.inner.provider.complete(&request).await {
            Ok(result) => Message::answer(&request.query, result),
            Err(e) => {
                tracing::warn!("Completion failed: {:#}", e);
                Message::fallback()
            }
        };

        {
            let mut state = self.state();
            state.messages.push(reply.clone());
            state.in_flight = false;
            self.persist_history(&state);
            self.schedule_refresh(&mut state);
        }

        if reply.metadata.is_some() {
            SubmitOutcome::Answered(reply)
        } else {
            SubmitOutcome::Failed(reply)
        }
    }

    /// Two-phase history reset
    ///
    /// The first call arms a confirmation window; a second call inside the
    /// window empties the log, drops both store keys, restores the default
    /// suggestions, and returns to the home view. Once the window lapses the
    /// next call arms again.
    pub fn clear_history(&self) -> ClearOutcome {
        let mut state = self.state();
        let now = Instant::now();
        let window = self.inner.settings.clear_confirm_window;

        let armed_at = state.clear_armed_at;
        match armed_at {
            Some(armed_at) if now.duration_since(armed_at) < window => {
                state.messages.clear();
                state.suggestions = default_suggestions();
                state.view_mode = ViewMode::Home;
                state.clear_armed_at = None;
                // Invalidate any pending or running refresh
                state.refresh_generation += 1;

                for key in [HISTORY_KEY, SUGGESTIONS_KEY] {
                    if let Err(e) = self.inner.store.remove(key) {
                        tracing::warn!("Failed to remove {} from store: {:#}", key, e);
                    }
                }

                tracing::info!("Session history cleared");
                ClearOutcome::Cleared
            }
            _ => {
                state.clear_armed_at = Some(now);
                tracing::debug!("Clear armed for {:?}", window);
                ClearOutcome::Armed
            }
        }
    }

    /// How long an armed clear waits for its confirmation
    pub fn clear_confirm_window(&self) -> Duration {
        self.inner.settings.clear_confirm_window
    }

    /// Whether a clear is waiting for confirmation
    pub fn is_clear_armed(&self) -> bool {
        let state = self.state();
        self.armed(&state)
    }

    fn armed(&self, state: &SessionState) -> bool {
        state
            .clear_armed_at
            .is_some_and(|at| at.elapsed() < self.inner.settings.clear_confirm_window)
    }

    /// Schedule a debounced suggestion refresh
    ///
    /// Must be called from within a tokio runtime.
    pub fn request_suggestion_refresh(&self) {
        let mut state = self.state();
        self.schedule_refresh(&mut state);
    }

    fn schedule_refresh(&self, state: &mut SessionState) {
        state.refresh_generation += 1;
        let generation = state.refresh_generation;
        let delay = self.inner.settings.suggestion_debounce;
        let manager = self.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            manager.refresh_suggestions(generation).await;
        });
    }

    async fn refresh_suggestions(&self, generation: u64) {
        let history = {
            let mut state = self.state();
            if state.refresh_generation != generation {
                return;
            }

            let history = recent_queries(&state.messages, self.inner.settings.suggestion_window);
            if history.is_empty() {
                state.suggestions = default_suggestions();
                if let Err(e) = self.inner.store.remove(SUGGESTIONS_KEY) {
                    tracing::warn!("Failed to remove suggestion cache: {:#}", e);
                }
                return;
            }
            history
        };

        tracing::debug!("Refreshing suggestions from {} queries", history.len());

        match self.inner.provider.suggest(&history).await {
            Ok(list) if list.is_empty() => {
                tracing::warn!("Provider returned no suggestions, keeping current list");
            }
            Ok(list) => {
                let mut state = self.state();
                if state.refresh_generation != generation {
                    tracing::debug!(
                        "Discarding stale suggestions (generation {} superseded by {})",
                        generation,
                        state.refresh_generation
                    );
                    return;
                }
                match serde_json::to_string(&list) {
                    Ok(encoded) => {
                        if let Err(e) = self.inner.store.set(SUGGESTIONS_KEY, &encoded) {
                            tracing::warn!("Failed to persist suggestions: {:#}", e);
                        }
                    }
                    Err(e) => tracing::warn!("Failed to encode suggestions: {}", e),
                }
                state.suggestions = list;
            }
            Err(e) => {
                tracing::warn!("Suggestion refresh failed, keeping current list: {:#}", e);
            }
        }
    }

    fn persist_history(&self, state: &SessionState) {
        let result = encode_history(&state.messages)
            .and_then(|encoded| self.inner.store.set(HISTORY_KEY, &encoded));
        if let Err(e) = result {
            tracing::warn!("Failed to persist chat history: {:#}", e);
        }
    }

    /// Show the home screen
    pub fn navigate_home(&self) {
        self.state().view_mode = ViewMode::Home;
    }

    /// Show the message log
    pub fn navigate_to_chat(&self) {
        self.state().view_mode = ViewMode::Chat;
    }

    /// Select the model used for subsequent queries
    pub fn select_model(&self, model: &str) {
        let model = model.trim();
        if model.is_empty() {
            return;
        }
        tracing::info!("Selected model {}", model);
        self.state().model = model.to_string();
    }

    /// Request grounded deep search on subsequent queries
    pub fn set_force_search(&self, enabled: bool) {
        self.state().force_search = enabled;
    }

    /// Stage text for the next submission
    pub fn stage_input(&self, text: &str) {
        self.state().staged_input = text.to_string();
    }

    /// Stage an image for the next submission
    pub fn stage_image(&self, image: Option<String>) {
        self.state().staged_image = image;
    }

    /// Currently staged text
    pub fn staged_input(&self) -> String {
        self.state().staged_input.clone()
    }

    /// Currently staged image
    pub fn staged_image(&self) -> Option<String> {
        self.state().staged_image.clone()
    }

    /// The message log
    pub fn messages(&self) -> Vec<Message> {
        self.state().messages.clone()
    }

    /// The current suggestions
    pub fn suggestions(&self) -> Vec<String> {
        self.state().suggestions.clone()
    }

    /// Whether the suggestions were derived from history
    pub fn is_predictive(&self) -> bool {
        is_predictive(&self.state().suggestions)
    }

    /// The current view
    pub fn view_mode(&self) -> ViewMode {
        self.state().view_mode
    }

    /// Whether a completion is outstanding
    pub fn is_in_flight(&self) -> bool {
        self.state().in_flight
    }

    /// Selected model identifier
    pub fn model(&self) -> String {
        self.state().model.clone()
    }

    /// Models the provider offers
    pub fn models(&self) -> Vec<ModelInfo> {
        self.inner.provider.models()
    }

    /// The provider backing this session
    pub fn provider(&self) -> Arc<dyn Provider> {
        Arc::clone(&self.inner.provider)
    }

    /// Read-only view for rendering
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        SessionSnapshot {
            messages: state.messages.clone(),
            view_mode: state.view_mode,
            suggestions: state.suggestions.clone(),
            is_predictive: is_predictive(&state.suggestions),
            in_flight: state.in_flight,
            clear_armed: self.armed(&state),
            model: state.model.clone(),
            force_search: state.force_search,
            staged_input: state.staged_input.clone(),
            has_staged_image: state.staged_image.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::QueryResult;
    use crate::storage::MemoryStore;
    use crate::test_utils::MockProvider;
    use tokio::sync::Notify;

    const DEBOUNCE: Duration = Duration::from_millis(1500);

    fn session_with(provider: MockProvider) -> (SessionManager, Arc<MockProvider>, Arc<MemoryStore>) {
        let provider = Arc::new(provider);
        let store = Arc::new(MemoryStore::new());
        let session = SessionManager::load(
            provider.clone(),
            store.clone(),
            SessionSettings::default(),
        );
        (session, provider, store)
    }

    /// Let spawned tasks run and advance the paused clock by `ms`
    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        tokio::task::yield_now().await;
    }

    fn four(prefix: &str) -> Vec<String> {
        (1..=4).map(|i| format!("{} {}", prefix, i)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_empty_store_starts_home_with_defaults() {
        let (session, _, _) = session_with(MockProvider::new());
        let snapshot = session.snapshot();
        assert!(snapshot.messages.is_empty());
        assert_eq!(snapshot.view_mode, ViewMode::Home);
        assert_eq!(snapshot.suggestions, default_suggestions());
        assert!(!snapshot.is_predictive);
        assert_eq!(snapshot.model, "gemini-2.5-flash-lite");
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_existing_history_starts_in_chat() {
        let messages = vec![Message::user("show clock", None), Message::fallback()];
        let store = Arc::new(MemoryStore::with_entries([
            (HISTORY_KEY, encode_history(&messages).unwrap()),
            (SUGGESTIONS_KEY, serde_json::to_string(&four("cached")).unwrap()),
        ]));
        let session = SessionManager::load(
            Arc::new(MockProvider::new()),
            store,
            SessionSettings::default(),
        );

        assert_eq!(session.messages(), messages);
        assert_eq!(session.view_mode(), ViewMode::Chat);
        assert_eq!(session.suggestions(), four("cached"));
        assert!(session.is_predictive());
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_malformed_store_falls_back() {
        let store = Arc::new(MemoryStore::with_entries([
            (HISTORY_KEY, "{broken"),
            (SUGGESTIONS_KEY, r#"{"not": "a list"}"#),
        ]));
        let session = SessionManager::load(
            Arc::new(MockProvider::new()),
            store,
            SessionSettings::default(),
        );
        assert!(session.messages().is_empty());
        assert_eq!(session.view_mode(), ViewMode::Home);
        assert_eq!(session.suggestions(), default_suggestions());
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_vlan_brief_success() {
        let (session, provider, store) = session_with(MockProvider::new());

        let outcome = session.submit_query("show vlan brief", None).await;

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "show vlan brief");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "Details for: show vlan brief");
        assert_eq!(
            messages[1].metadata.as_ref().map(|m| m.syntax.as_str()),
            Some("Switch# show vlan brief")
        );
        assert!(matches!(outcome, SubmitOutcome::Answered(_)));
        assert_eq!(session.view_mode(), ViewMode::Chat);
        assert!(!session.is_in_flight());

        let persisted = store.get(HISTORY_KEY).unwrap();
        assert_eq!(decode_history(persisted.as_deref()), messages);
        assert_eq!(provider.requests()[0].model, "gemini-2.5-flash-lite");
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_vlan_brief_transport_failure() {
        let (session, _, store) = session_with(MockProvider::new().failing());

        let outcome = session.submit_query("show vlan brief", None).await;

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, FALLBACK_REPLY);
        assert!(messages[1].metadata.is_none());
        assert!(matches!(outcome, SubmitOutcome::Failed(_)));
        assert!(!session.is_in_flight());
        assert_eq!(decode_history(store.get(HISTORY_KEY).unwrap().as_deref()).len(), 2);

        // The session stays usable after a failure
        let again = session.submit_query("show vlan", None).await;
        assert!(again.reply().is_some());
        assert_eq!(session.messages().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_appends_user_message_before_resolution() {
        let gate = Arc::new(Notify::new());
        let (session, provider, _) = session_with(MockProvider::new().with_gate(gate.clone()));

        let pending = tokio::spawn({
            let session = session.clone();
            async move { session.submit_query("show ip route", None).await }
        });
        while provider.requests().is_empty() {
            tokio::task::yield_now().await;
        }

        assert_eq!(session.messages().len(), 1);
        assert!(session.is_in_flight());

        // A second submit while in flight is a no-op and issues no request
        let busy = session.submit_query("show clock", None).await;
        assert_eq!(busy, SubmitOutcome::Busy);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(provider.requests().len(), 1);

        gate.notify_one();
        let outcome = pending.await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Answered(_)));
        assert_eq!(session.messages().len(), 2);
        assert!(!session.is_in_flight());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_empty_is_noop() {
        let (session, provider, _) = session_with(MockProvider::new());
        assert_eq!(session.submit_query("   ", None).await, SubmitOutcome::Empty);
        assert!(session.messages().is_empty());
        assert!(provider.requests().is_empty());
        assert_eq!(session.view_mode(), ViewMode::Home);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_too_long_is_rejected() {
        let (session, provider, _) = session_with(MockProvider::new());
        let query = "x".repeat(1001);
        assert_eq!(
            session.submit_query(&query, None).await,
            SubmitOutcome::TooLong {
                length: 1001,
                max: 1000
            }
        );
        assert!(session.messages().is_empty());
        assert!(provider.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_image_only_submit_uses_placeholder() {
        let (session, provider, _) = session_with(MockProvider::new());
        session
            .submit_query("", Some("data:image/png;base64,AAAA".to_string()))
            .await;

        let messages = session.messages();
        assert_eq!(messages[0].content, IMAGE_PLACEHOLDER);
        assert_eq!(messages[0].image.as_deref(), Some("data:image/png;base64,AAAA"));
        let request = &provider.requests()[0];
        assert_eq!(request.query, IMAGE_PLACEHOLDER);
        assert!(request.image_base64.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_clears_staging_and_carries_settings() {
        let (session, provider, _) = session_with(MockProvider::new());
        session.stage_input("show int");
        session.stage_image(Some("AAAA".to_string()));
        session.select_model("gemini-3-pro-preview");
        session.set_force_search(true);

        session.submit_query("show interfaces", None).await;

        assert!(session.staged_input().is_empty());
        assert!(session.staged_image().is_none());
        let request = &provider.requests()[0];
        assert_eq!(request.model, "gemini-3-pro-preview");
        assert!(request.force_search);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_requires_confirmation_within_window() {
        let (session, _, store) = session_with(MockProvider::new());
        session.submit_query("show vlan brief", None).await;
        advance(2000).await;
        assert!(store.contains(SUGGESTIONS_KEY));

        assert_eq!(session.clear_history(), ClearOutcome::Armed);
        assert!(session.is_clear_armed());
        assert_eq!(session.messages().len(), 2);

        advance(2999).await;
        assert_eq!(session.clear_history(), ClearOutcome::Cleared);

        let snapshot = session.snapshot();
        assert!(snapshot.messages.is_empty());
        assert_eq!(snapshot.view_mode, ViewMode::Home);
        assert_eq!(snapshot.suggestions, default_suggestions());
        assert!(!snapshot.clear_armed);
        assert!(!store.contains(HISTORY_KEY));
        assert!(!store.contains(SUGGESTIONS_KEY));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_expires_after_window() {
        let (session, _, store) = session_with(MockProvider::new());
        session.submit_query("show vlan brief", None).await;

        assert_eq!(session.clear_history(), ClearOutcome::Armed);
        advance(3000).await;
        assert!(!session.is_clear_armed());

        // Past the window the next call re-arms instead of clearing
        assert_eq!(session.clear_history(), ClearOutcome::Armed);
        assert_eq!(session.messages().len(), 2);
        assert!(store.contains(HISTORY_KEY));
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_never_touches_log() {
        let (session, _, _) = session_with(MockProvider::new());
        session.submit_query("show vlan brief", None).await;

        session.navigate_home();
        assert_eq!(session.view_mode(), ViewMode::Home);
        session.navigate_to_chat();
        assert_eq!(session.view_mode(), ViewMode::Chat);
        assert_eq!(session.messages().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_fires_after_debounce() {
        let (session, provider, store) = session_with(MockProvider::new());
        session.submit_query("show vlan brief", None).await;

        advance(1499).await;
        assert!(provider.suggest_calls().is_empty());
        assert!(!session.is_predictive());

        advance(2).await;
        let calls = provider.suggest_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].history, vec!["show vlan brief"]);
        assert!(session.is_predictive());
        assert_eq!(
            decode_suggestions(store.get(SUGGESTIONS_KEY).unwrap().as_deref()),
            session.suggestions()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_queries_refresh_each_time_with_last_five() {
        let (session, provider, _) = session_with(MockProvider::new());

        for i in 1..=6 {
            session.submit_query(&format!("query {}", i), None).await;
            advance(1600).await;
        }

        let calls = provider.suggest_calls();
        assert_eq!(calls.len(), 6);
        assert_eq!(calls[0].history, vec!["query 1"]);
        assert_eq!(
            calls[5].history,
            vec!["query 2", "query 3", "query 4", "query 5", "query 6"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_queries_refreshes_once() {
        let (session, provider, _) = session_with(MockProvider::new());
        let start = Instant::now();

        for i in 1..=6 {
            session.submit_query(&format!("burst {}", i), None).await;
            if i < 6 {
                advance(40).await;
            }
        }
        let last_submit = Instant::now();
        assert!(last_submit - start <= Duration::from_millis(200));

        advance(5000).await;

        let calls = provider.suggest_calls();
        assert_eq!(calls.len(), 1);
        let waited = calls[0].at - last_submit;
        assert!(waited >= DEBOUNCE && waited < DEBOUNCE + Duration::from_millis(5));
        assert_eq!(calls[0].history.len(), 5);
        assert_eq!(calls[0].history[4], "burst 6");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_suggestion_reply_is_discarded() {
        let (session, provider, _) = session_with(MockProvider::new());
        // First refresh answers slowly, second answers immediately
        provider.push_suggestion_reply(Duration::from_secs(10), four("stale"));
        provider.push_suggestion_reply(Duration::ZERO, four("fresh"));

        session.submit_query("show vlan brief", None).await;
        advance(1600).await;
        assert_eq!(provider.suggest_calls().len(), 1);

        session.submit_query("show spanning-tree", None).await;
        advance(1600).await;
        assert_eq!(provider.suggest_calls().len(), 2);
        assert_eq!(session.suggestions(), four("fresh"));

        // The slow reply lands after the fresh one and must not win
        advance(10_000).await;
        assert_eq!(session.suggestions(), four("fresh"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_failure_keeps_suggestions() {
        let (session, provider, _) = session_with(MockProvider::new().failing_suggestions());
        session.submit_query("show vlan brief", None).await;
        advance(2000).await;

        assert_eq!(provider.suggest_calls().len(), 1);
        assert_eq!(session.suggestions(), default_suggestions());
        assert!(!session.is_predictive());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_trusts_reply_count() {
        let provider = MockProvider::new().with_suggestions(vec!["one".into(), "two".into()]);
        let (session, _, _) = session_with(provider);
        session.submit_query("show vlan brief", None).await;
        advance(2000).await;
        assert_eq!(session.suggestions(), vec!["one", "two"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_without_eligible_queries_resets_defaults() {
        let store = Arc::new(MemoryStore::with_entries([(
            SUGGESTIONS_KEY,
            serde_json::to_string(&four("cached")).unwrap(),
        )]));
        let provider = Arc::new(MockProvider::new());
        let session =
            SessionManager::load(provider.clone(), store.clone(), SessionSettings::default());
        assert!(session.is_predictive());

        // Only an image-only submission: nothing eligible for suggestions
        session.submit_query("", Some("AAAA".to_string())).await;
        advance(2000).await;

        assert!(provider.suggest_calls().is_empty());
        assert_eq!(session.suggestions(), default_suggestions());
        assert!(!store.contains(SUGGESTIONS_KEY));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_invalidates_pending_refresh() {
        let (session, provider, _) = session_with(MockProvider::new());
        session.submit_query("show vlan brief", None).await;

        session.clear_history();
        assert_eq!(session.clear_history(), ClearOutcome::Cleared);
        advance(2000).await;

        assert!(provider.suggest_calls().is_empty());
        assert_eq!(session.suggestions(), default_suggestions());
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.session.suggestion_debounce_ms = 500;
        config.session.model = Some("gemini-3-pro-preview".to_string());
        let settings = SessionSettings::from_config(&config);
        assert_eq!(settings.suggestion_debounce, Duration::from_millis(500));
        assert_eq!(settings.initial_model, "gemini-3-pro-preview");
    }

    #[test]
    fn test_submit_outcome_reply() {
        assert!(SubmitOutcome::Busy.reply().is_none());
        let reply = Message::answer("q", QueryResult::default());
        assert_eq!(SubmitOutcome::Answered(reply.clone()).reply(), Some(&reply));
    }
}
