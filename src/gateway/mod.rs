//! Axum-based HTTP gateway: the webhook ingestion pipeline.
//!
//! Each inbound delivery runs on its own tokio task with no ordering
//! relative to other deliveries. Per request the pipeline is
//! authenticate → parse → admit → route → orchestrate; the only shared
//! mutable resource is the event registry, and every access to it goes
//! through its atomic admit operation. Request body size and total request
//! time are bounded at the router layer.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::auth::RequestAuthenticator;
use crate::channels::{Messenger, SlackClient};
use crate::config::Config;
use crate::dedup::{Admission, EventRegistry};
use crate::orchestrator::Orchestrator;
use crate::providers::{CompletionProvider, OpenAiProvider};
use crate::router::{self, AckReason, Envelope, Route};

/// Maximum request body size (64KB) — events are small; anything larger is
/// hostile.
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout — generous enough for the completion round-trip.
pub const REQUEST_TIMEOUT_SECS: u64 = 120;
/// How often the background sweep evicts expired dedup entries.
const REGISTRY_SWEEP_INTERVAL_SECS: u64 = 300;

/// Signature header set by the platform.
const SIGNATURE_HEADER: &str = "x-slack-signature";
/// Timestamp header covered by the signature.
const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
/// Retry-attempt marker set on redeliveries.
const RETRY_HEADER: &str = "x-slack-retry-num";

/// Shared state for all axum handlers — explicitly constructed and
/// injected so the authenticator, registry, and orchestrator stay
/// independently testable.
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<RequestAuthenticator>,
    pub registry: Arc<EventRegistry>,
    pub orchestrator: Arc<Orchestrator>,
    /// The bot's own user id, for self-reply suppression.
    pub bot_user_id: Arc<str>,
}

/// Build the HTTP router with body-size and request-timeout limits.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/slack/events", post(handle_slack_events))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

/// Run the gateway until shutdown.
pub async fn run_gateway(config: &Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let http_timeout = Duration::from_secs(config.http_timeout_secs);
    let slack = Arc::new(SlackClient::new(&config.slack_bot_token, http_timeout)?);

    // Self-identity: configured, or resolved through the read-only
    // identity query at startup.
    let bot_user_id = match config.slack_bot_user_id.clone() {
        Some(id) => id,
        None => {
            let identity = slack.bot_identity().await?;
            tracing::info!(
                "resolved bot identity via auth.test: {} ({})",
                identity.user_id,
                identity.name
            );
            identity.user_id
        }
    };

    let provider: Arc<dyn CompletionProvider> = Arc::new(OpenAiProvider::with_api_base(
        &config.openai_api_key,
        &config.openai_api_base,
        &config.openai_model,
        http_timeout,
    )?);

    let registry = Arc::new(EventRegistry::new(Duration::from_secs(config.event_ttl_secs)));

    // Periodic registry sweep so idle periods still bound memory.
    let registry_for_sweep = Arc::clone(&registry);
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(REGISTRY_SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            let removed = registry_for_sweep.sweep_expired();
            if removed > 0 {
                tracing::debug!("swept {removed} expired event entries");
            }
        }
    });

    let state = AppState {
        authenticator: Arc::new(RequestAuthenticator::new(&config.slack_signing_secret)),
        registry,
        orchestrator: Arc::new(Orchestrator::new(
            slack as Arc<dyn Messenger>,
            provider,
            config.completion_max_tokens,
        )),
        bot_user_id: Arc::from(bot_user_id.as_str()),
    };

    let app = build_router(state);

    println!("🤖 relaybot gateway listening on http://{addr}");
    println!("  POST /slack/events — Slack Events API endpoint");
    println!("  GET  /health       — health check");
    println!("  Press Ctrl+C to stop.\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
}

/// GET /health — always public, nothing secret in the body.
async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /slack/events — the ingestion pipeline.
async fn handle_slack_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    // ── Authenticate on the exact raw bytes, before any parsing ──
    let timestamp = header_str(&headers, TIMESTAMP_HEADER);
    let signature = header_str(&headers, SIGNATURE_HEADER);
    if let Err(e) = state.authenticator.verify(timestamp, signature, &body) {
        tracing::warn!("rejected event delivery: {e}");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": e.to_string()})),
        );
    }

    // ── Parse the envelope ──
    let envelope: Envelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!("malformed event payload: {e}");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": format!("malformed event payload: {e}")})),
            );
        }
    };

    // ── At-most-once admission ──
    let retry_delivery = headers.contains_key(RETRY_HEADER);
    if let Some(ref event_id) = envelope.event_id {
        if state.registry.admit(retry_delivery, event_id) == Admission::AlreadyHandled {
            tracing::info!("short-circuited redelivery of {event_id} (retry: {retry_delivery})");
            return (
                StatusCode::OK,
                Json(serde_json::json!({"status": "already_handled"})),
            );
        }
    } else if retry_delivery {
        // Handshake-style envelopes carry no event id, but a retry marker
        // still means the platform already saw our answer.
        return (
            StatusCode::OK,
            Json(serde_json::json!({"status": "already_handled"})),
        );
    }

    // ── Route ──
    match router::route(&envelope, &state.bot_user_id) {
        Route::Challenge(challenge) => {
            tracing::info!("answered url_verification handshake");
            (StatusCode::OK, Json(serde_json::json!({"challenge": challenge})))
        }
        Route::Ack(AckReason::SelfAuthored) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "ignored_self"})),
        ),
        Route::Ack(AckReason::Unhandled) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "ignored"})),
        ),
        Route::Dispatch(message) => {
            let orchestrator = Arc::clone(&state.orchestrator);
            // Detached task: an aborted inbound connection must not cancel
            // the sequence mid-flight — the admission ledger has already
            // recorded this event, so it will never be redelivered to us.
            let outcome = tokio::spawn(async move {
                let result = orchestrator.respond(&message).await;
                if let Err(ref e) = result {
                    tracing::error!("orchestration failed for {}: {e}", message.channel);
                    orchestrator.report_failure(Some(&message.channel), e).await;
                }
                result
            })
            .await;

            match outcome {
                Ok(Ok(())) => (
                    StatusCode::OK,
                    Json(serde_json::json!({"status": "processed"})),
                ),
                Ok(Err(e)) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"error": e.to_string()})),
                ),
                Err(e) => {
                    tracing::error!("orchestration task failed: {e}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(serde_json::json!({"error": "orchestration task failed"})),
                    )
                }
            }
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
