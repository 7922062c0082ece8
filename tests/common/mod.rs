use async_trait::async_trait;
use cliexpert::providers::{CompletionRequest, Provider, QueryResult};
use cliexpert::storage::SledStore;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

#[allow(dead_code)]
pub fn create_temp_store() -> (SledStore, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let store = SledStore::open(tmp.path().join("session.db")).expect("failed to open sled store");
    (store, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Provider that answers every query with the same card and echoes history
/// back as suggestions
#[allow(dead_code)]
pub struct EchoProvider {
    pub fail: bool,
    pub suggestion_count: usize,
    pub suggest_calls: Mutex<Vec<Vec<String>>>,
}

#[allow(dead_code)]
impl EchoProvider {
    pub fn new() -> Self {
        Self {
            fail: false,
            suggestion_count: 4,
            suggest_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_suggestion_count(self, suggestion_count: usize) -> Self {
        Self {
            suggestion_count,
            ..self
        }
    }

    pub fn suggest_calls(&self) -> Vec<Vec<String>> {
        self.suggest_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: &CompletionRequest) -> cliexpert::Result<QueryResult> {
        if self.fail {
            anyhow::bail!("connection reset");
        }
        Ok(QueryResult {
            syntax: format!("Switch# {}", request.query),
            device_category: "Switch".to_string(),
            command_mode: "Privileged EXEC".to_string(),
            ..Default::default()
        })
    }

    async fn suggest(&self, history: &[String]) -> cliexpert::Result<Vec<String>> {
        self.suggest_calls.lock().unwrap().push(history.to_vec());
        Ok(history
            .iter()
            .rev()
            .map(|q| format!("More on {}", q))
            .chain(std::iter::repeat("VTP modes".to_string()))
            .take(self.suggestion_count)
            .collect())
    }
}
