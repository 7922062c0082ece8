//! HTTP proxy server
//!
//! Exposes the provider behind a single POST endpoint so browsers and other
//! `cliexpert` processes can share one set of credentials. The `action`
//! field selects text-to-speech, suggestions, or (by default) a completion.

use crate::config::Config;
use crate::error::{CliExpertError, Result};
use crate::providers::proxy::{ACTION_SUGGESTIONS, ACTION_TTS, COMPLETION_PATH};
use crate::providers::{Provider, ProxyRequest, SuggestionsResponse};

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Alias path kept for clients of the serverless deployment
pub const AZURE_ALIAS_PATH: &str = "/api/azure-openai";

/// Topic used when a suggestion request carries neither history nor query
const GENERAL_TOPIC: &str = "general Cisco networking";

const ALLOW_METHODS: &str = "GET,OPTIONS,PATCH,DELETE,POST,PUT";
const ALLOW_HEADERS: &str = "X-CSRF-Token, X-Requested-With, Accept, Accept-Version, \
Content-Length, Content-MD5, Content-Type, Date, X-Api-Version";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    provider: Arc<dyn Provider>,
    default_model: String,
}

impl AppState {
    /// State serving `provider`, filling absent models with `default_model`
    pub fn new(provider: Arc<dyn Provider>, default_model: impl Into<String>) -> Self {
        Self {
            provider,
            default_model: default_model.into(),
        }
    }
}

/// Build the proxy router
pub fn router(state: AppState, body_limit_bytes: usize) -> Router {
    let endpoint = post(handle_completion)
        .options(preflight)
        .fallback(method_not_allowed);

    Router::new()
        .route(COMPLETION_PATH, endpoint.clone())
        .route(AZURE_ALIAS_PATH, endpoint)
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(middleware::map_response(with_cors))
        .with_state(state)
}

/// Bind and serve until Ctrl-C
///
/// # Errors
///
/// Returns error if the listener cannot be bound or the server fails
pub async fn serve(config: &Config, provider: Arc<dyn Provider>) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| CliExpertError::Config(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!(
        "Proxy listening on http://{} (provider={})",
        addr,
        provider.name()
    );

    let app = router(
        AppState::new(provider, config.initial_model()),
        config.server.body_limit_bytes,
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down proxy");
        })
        .await?;

    Ok(())
}

async fn with_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
        .into_response()
}

async fn health(State(state): State<AppState>) -> Response {
    Json(json!({ "status": "ok", "provider": state.provider.name() })).into_response()
}

fn bad_request(error: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": error }))).into_response()
}

/// Map a provider failure to a response
///
/// Upstream statuses pass through unchanged; other errors use
/// [`CliExpertError::http_status`].
fn error_response(err: anyhow::Error) -> Response {
    let (status, error) = match err.downcast_ref::<CliExpertError>() {
        Some(CliExpertError::Upstream { status, .. }) => {
            (*status, "Upstream request failed".to_string())
        }
        Some(e) => (e.http_status(), e.to_string()),
        None => (500, "Internal server error".to_string()),
    };
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let message = match err.downcast_ref::<CliExpertError>() {
        Some(CliExpertError::Upstream { message, .. }) => message.clone(),
        _ => format!("{:#}", err),
    };

    tracing::error!("Proxy request failed with {}: {}", status, message);
    (status, Json(json!({ "error": error, "message": message }))).into_response()
}

async fn handle_completion(State(state): State<AppState>, body: Bytes) -> Response {
    let request: ProxyRequest = if body.is_empty() {
        ProxyRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!("Rejecting malformed body: {}", e);
                return bad_request("Invalid JSON body");
            }
        }
    };

    match request.action.as_deref() {
        Some(ACTION_TTS) => speak(&state, &request).await,
        Some(ACTION_SUGGESTIONS) => suggest(&state, &request).await,
        _ => complete(&state, &request).await,
    }
}

async fn complete(state: &AppState, request: &ProxyRequest) -> Response {
    let Some(completion) = request.to_completion(&state.default_model) else {
        return bad_request("Query is required");
    };

    tracing::debug!(
        "Completion: model={}, force_search={}, image={}",
        completion.model,
        completion.force_search,
        completion.image_base64.is_some()
    );

    match state.provider.complete(&completion).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => error_response(e),
    }
}

async fn suggest(state: &AppState, request: &ProxyRequest) -> Response {
    let history = match (&request.history, request.query.as_deref()) {
        (Some(history), _) if !history.is_empty() => history.clone(),
        (_, Some(query)) if !query.trim().is_empty() => vec![query.trim().to_string()],
        _ => vec![GENERAL_TOPIC.to_string()],
    };

    match state.provider.suggest(&history).await {
        Ok(suggestions) => Json(SuggestionsResponse { suggestions }).into_response(),
        Err(e) => error_response(e),
    }
}

async fn speak(state: &AppState, request: &ProxyRequest) -> Response {
    let text = request.text.as_deref().unwrap_or_default();
    if text.trim().is_empty() {
        return bad_request("Text is required for TTS");
    }

    match state.provider.synthesize_speech(text).await {
        Ok(payload) => Json(payload).into_response(),
        Err(e) => error_response(e),
    }
}
