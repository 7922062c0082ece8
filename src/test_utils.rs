//! Test utilities for Cisco CLI Expert
//!
//! This module provides a scripted provider for exercising the session
//! manager and the proxy server without network access, plus helpers for
//! temporary stores.

use crate::error::{CliExpertError, Result};
use crate::providers::{CompletionRequest, ModelInfo, Provider, QueryResult};
use crate::storage::SledStore;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;
use tokio::time::Instant;

/// One recorded `suggest` call
#[derive(Debug, Clone)]
pub struct SuggestCall {
    /// When the call was made (tokio clock, so paused-time aware)
    pub at: Instant,
    /// History the manager sent
    pub history: Vec<String>,
}

/// Scripted provider
///
/// Completions return a fixed result (or fail); suggestion replies are taken
/// from a queue, each with an optional delay, and otherwise fall back to a
/// fixed list.
pub struct MockProvider {
    result: QueryResult,
    fail_complete: AtomicBool,
    fail_suggest: AtomicBool,
    suggestions: Vec<String>,
    scripted: Mutex<VecDeque<(Duration, Vec<String>)>>,
    gate: Option<Arc<Notify>>,
    requests: Mutex<Vec<CompletionRequest>>,
    suggest_calls: Mutex<Vec<SuggestCall>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// A provider that answers every query and suggests four fixed topics
    pub fn new() -> Self {
        let mut result = QueryResult::default();
        result.syntax = "Switch# show vlan brief".to_string();
        result.device_category = "Switch".to_string();
        result.command_mode = "Privileged EXEC".to_string();

        Self {
            result,
            fail_complete: AtomicBool::new(false),
            fail_suggest: AtomicBool::new(false),
            suggestions: vec![
                "VTP modes".to_string(),
                "Trunk allowed VLANs".to_string(),
                "Private VLANs".to_string(),
                "VLAN ACLs".to_string(),
            ],
            scripted: Mutex::new(VecDeque::new()),
            gate: None,
            requests: Mutex::new(Vec::new()),
            suggest_calls: Mutex::new(Vec::new()),
        }
    }

    /// Make every completion fail with a transport error
    pub fn failing(self) -> Self {
        self.fail_complete.store(true, Ordering::SeqCst);
        self
    }

    /// Make every suggestion request fail
    pub fn failing_suggestions(self) -> Self {
        self.fail_suggest.store(true, Ordering::SeqCst);
        self
    }

    /// Fixed suggestion reply
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// Block completions until `gate` is notified
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Queue a suggestion reply delivered after `delay`
    pub fn push_suggestion_reply(&self, delay: Duration, suggestions: Vec<String>) {
        self.scripted
            .lock()
            .expect("scripted lock")
            .push_back((delay, suggestions));
    }

    /// Completion requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// Suggestion calls received so far
    pub fn suggest_calls(&self) -> Vec<SuggestCall> {
        self.suggest_calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<QueryResult> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        if self.fail_complete.load(Ordering::SeqCst) {
            return Err(CliExpertError::Provider("connection refused".to_string()).into());
        }
        Ok(self.result.clone())
    }

    async fn suggest(&self, history: &[String]) -> Result<Vec<String>> {
        self.suggest_calls
            .lock()
            .expect("calls lock")
            .push(SuggestCall {
                at: Instant::now(),
                history: history.to_vec(),
            });

        let scripted = self.scripted.lock().expect("scripted lock").pop_front();
        if let Some((delay, reply)) = scripted {
            tokio::time::sleep(delay).await;
            return Ok(reply);
        }

        if self.fail_suggest.load(Ordering::SeqCst) {
            return Err(CliExpertError::Upstream {
                status: 503,
                message: "overloaded".to_string(),
            }
            .into());
        }
        Ok(self.suggestions.clone())
    }

    fn models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo::new("mock-fast", "Mock Fast", "Instant"),
            ModelInfo::new("mock-pro", "Mock Pro", "Thorough"),
        ]
    }
}

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Open a sled store inside a fresh temporary directory
///
/// Keep the returned `TempDir` alive for as long as the store is used.
pub fn temp_store() -> (SledStore, TempDir) {
    let dir = temp_dir();
    let store = SledStore::open(dir.path().join("session.db")).expect("Failed to open store");
    (store, dir)
}

/// Assert that an error contains the expected message
pub fn assert_error_contains<T: std::fmt::Debug>(result: Result<T>, expected: &str) {
    match result {
        Ok(value) => panic!("Expected error containing '{}', got Ok({:?})", expected, value),
        Err(e) => assert!(
            e.to_string().contains(expected),
            "Expected error containing '{}', got '{}'",
            expected,
            e
        ),
    }
}
