//! End-to-end tests for the proxy
//!
//! A `ProxyProvider` talks to a live proxy server bound on a random port,
//! which in turn talks to a mocked upstream (Gemini or Azure Speech).

use std::sync::Arc;

use cliexpert::config::{AzureConfig, GeminiConfig, ProxyConfig, SpeechConfig};
use cliexpert::providers::{
    AzureOpenAiProvider, CompletionRequest, GeminiProvider, Provider, ProxyProvider,
};
use cliexpert::server::{router, AppState};
use serde_json::json;
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn spawn_proxy(upstream: Arc<dyn Provider>, default_model: &str) -> ProxyProvider {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(AppState::new(upstream, default_model), 2 * 1024 * 1024);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    ProxyProvider::new(ProxyConfig {
        base_url: format!("http://{}", addr),
        model: default_model.to_string(),
    })
    .unwrap()
}

fn gemini_for(server: &MockServer) -> Arc<dyn Provider> {
    Arc::new(
        GeminiProvider::new(GeminiConfig {
            api_key: Some("test-key".to_string()),
            api_base: Some(server.uri()),
            ..GeminiConfig::default()
        })
        .unwrap(),
    )
}

fn gemini_text(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
    })
}

#[tokio::test]
async fn test_completion_through_proxy() {
    let upstream = MockServer::start().await;
    let card = json!({
        "deviceCategory": "Router",
        "commandMode": "Global Config",
        "syntax": "Router(config)# router ospf 1",
        "description": "Starts an OSPF process"
    });
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-lite:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_text(&card.to_string())))
        .expect(1)
        .mount(&upstream)
        .await;

    let client = spawn_proxy(gemini_for(&upstream), "gemini-2.5-flash-lite").await;
    let result = client
        .complete(&CompletionRequest::new("router ospf 1", ""))
        .await
        .unwrap();

    assert_eq!(result.syntax, "Router(config)# router ospf 1");
    assert!(result.is_config_mode());
}

#[tokio::test]
async fn test_suggestions_through_proxy() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-3-flash-preview:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_text(
            r#"["OSPF cost", "OSPF stub areas", "OSPF timers", "OSPF authentication"]"#,
        )))
        .expect(1)
        .mount(&upstream)
        .await;

    let client = spawn_proxy(gemini_for(&upstream), "gemini-2.5-flash-lite").await;
    let suggestions = client
        .suggest(&["router ospf 1".to_string()])
        .await
        .unwrap();
    assert_eq!(suggestions.len(), 4);
    assert_eq!(suggestions[1], "OSPF stub areas");
}

#[tokio::test]
async fn test_upstream_status_reaches_client() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": 429, "message": "Resource has been exhausted" }
        })))
        .mount(&upstream)
        .await;

    let client = spawn_proxy(gemini_for(&upstream), "gemini-2.5-flash-lite").await;
    let err = client
        .complete(&CompletionRequest::new("show clock", ""))
        .await
        .unwrap_err();

    match err.downcast_ref::<cliexpert::CliExpertError>() {
        Some(cliexpert::CliExpertError::Upstream { status, message }) => {
            assert_eq!(*status, 429);
            assert!(message.contains("Resource has been exhausted"));
        }
        other => panic!("Expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_speech_through_proxy() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cognitiveservices/v1"))
        .and(header("Ocp-Apim-Subscription-Key", "speech-key"))
        .and(header("X-Microsoft-OutputFormat", "raw-24khz-16bit-mono-pcm"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8, 0x40, 0x00, 0xC0]))
        .expect(1)
        .mount(&upstream)
        .await;

    let azure = AzureOpenAiProvider::new(AzureConfig {
        speech: SpeechConfig {
            key: Some("speech-key".to_string()),
            region: Some("westeurope".to_string()),
            endpoint: Some(format!("{}/cognitiveservices/v1", upstream.uri())),
            ..SpeechConfig::default()
        },
        ..AzureConfig::default()
    })
    .unwrap();

    let client = spawn_proxy(Arc::new(azure), "gpt-4o-mini").await;
    let payload = client.synthesize_speech("show vlan brief").await.unwrap();
    let audio = payload.decode().unwrap();

    assert_eq!(audio.sample_rate, 24_000);
    assert_eq!(audio.channels.len(), 1);
    assert_eq!(audio.channels[0], vec![0.5, -0.5]);
}
