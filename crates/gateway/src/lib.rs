//! HTTP gateway for Ferrobot.
//!
//! One Axum server exposes the local surface: `/chat` for direct agent
//! invocations, `/health` and `/ready` probes, and the `/api/v1`
//! timeline and settings endpoints backed by the SQLite timeline.
//!
//! Every route sits behind the same middleware chain, outermost first:
//! panic recovery, request body limit, per-client rate limiting.

pub mod rate_limit;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::{DefaultBodyLimit, Query, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{error, info, warn};

use ferrobot_agent::AgentLoop;
use ferrobot_config::GatewayConfig;
use ferrobot_timeline::{EventFilter, TimelineService};

pub use rate_limit::RateLimiter;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Failed to bind {addr}: {source}")]
    Bind { addr: String, source: std::io::Error },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Shared state behind every gateway route.
pub struct GatewayState {
    pub agent: Arc<AgentLoop>,
    pub timeline: Arc<TimelineService>,
    pub cancel: CancellationToken,
    ready: AtomicBool,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(
        agent: Arc<AgentLoop>,
        timeline: Arc<TimelineService>,
        cancel: CancellationToken,
    ) -> Self {
        Self { agent, timeline, cancel, ready: AtomicBool::new(false) }
    }

    /// Flip `/ready` to 200. Called once the channels are up.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }
}

/// All gateway routes, without middleware.
pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/chat", axum::routing::post(chat_handler))
        .route("/api/v1/timeline", get(timeline_handler))
        .route("/api/v1/settings", get(get_settings_handler).post(update_setting_handler))
        .with_state(state)
}

/// Wrap a router in the standard chain. Layer order matters: the panic
/// recoverer is outermost so it also covers the other middleware, and
/// the body limit runs before any handler reads the body.
pub fn apply_middleware(
    router: Router,
    config: &GatewayConfig,
    limiter: Arc<RateLimiter>,
) -> Router {
    router
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Build the complete router: routes plus the standard middleware chain.
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Router {
    let limiter = Arc::new(RateLimiter::new(config.rate_limit_rps, config.rate_limit_burst));
    apply_middleware(routes(state), config, limiter)
}

/// Serve until `cancel` fires, then drain in-flight requests for at
/// most the configured shutdown timeout.
pub async fn serve(
    config: GatewayConfig,
    state: SharedState,
    cancel: CancellationToken,
) -> Result<(), GatewayError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| GatewayError::Bind { addr: addr.clone(), source })?;
    info!(addr = %addr, "Gateway listening");

    let router = build_router(state, &config);
    let shutdown = cancel.clone();
    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await });

    let mut handle = tokio::spawn(std::future::IntoFuture::into_future(server));
    tokio::select! {
        result = &mut handle => {
            return match result {
                Ok(result) => result.map_err(GatewayError::Serve),
                Err(e) => {
                    error!(error = %e, "Gateway task failed");
                    Ok(())
                }
            };
        }
        _ = cancel.cancelled() => {}
    }

    // Graceful drain is bounded; past the deadline open connections are dropped.
    match tokio::time::timeout(config.shutdown_timeout(), &mut handle).await {
        Ok(Ok(result)) => result.map_err(GatewayError::Serve),
        Ok(Err(e)) => {
            error!(error = %e, "Gateway task failed during drain");
            Ok(())
        }
        Err(_) => {
            warn!("Drain deadline reached, aborting open connections");
            handle.abort();
            Ok(())
        }
    }
}

fn handle_panic(panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %detail, "HTTP handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
}

async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = rate_limit::client_key(&request);
    if !limiter.allow(&key) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "1")],
            "rate limit exceeded",
        )
            .into_response();
    }
    next.run(request).await
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn ready_handler(State(state): State<SharedState>) -> Response {
    if state.ready.load(Ordering::SeqCst) {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
    }
}

#[derive(Deserialize)]
struct ChatParams {
    message: Option<String>,
    session: Option<String>,
}

async fn chat_handler(
    State(state): State<SharedState>,
    Query(params): Query<ChatParams>,
) -> Response {
    let Some(message) = params.message.filter(|m| !m.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "missing message parameter").into_response();
    };
    let session = params
        .session
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "local:default".to_string());

    info!(session = %session, "Local network request");
    match state.agent.process_direct(&state.cancel, &message, &session).await {
        Ok(reply) => reply.into_response(),
        Err(e) => {
            // Never leak internals to clients.
            error!(error = %e, "/chat failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
        }
    }
}

#[derive(Deserialize)]
struct TimelineParams {
    limit: Option<i64>,
    offset: Option<i64>,
    sender: Option<String>,
}

async fn timeline_handler(
    State(state): State<SharedState>,
    Query(params): Query<TimelineParams>,
) -> Response {
    let filter = EventFilter {
        sender_id: params.sender.filter(|s| !s.is_empty()),
        limit: Some(params.limit.unwrap_or(100)),
        offset: params.offset,
        ..Default::default()
    };
    match state.timeline.events(&filter).await {
        Ok(events) => Json(events).into_response(),
        Err(e) => {
            error!(error = %e, "/api/v1/timeline failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
        }
    }
}

#[derive(Deserialize)]
struct SettingsParams {
    key: Option<String>,
}

async fn get_settings_handler(
    State(state): State<SharedState>,
    Query(params): Query<SettingsParams>,
) -> Response {
    if let Some(key) = params.key.filter(|k| !k.is_empty()) {
        let value = state.timeline.get_setting(&key).await.unwrap_or(None).unwrap_or_default();
        return Json(json!({ "key": key, "value": value })).into_response();
    }
    Json(json!({ "silent_mode": state.timeline.is_silent_mode().await })).into_response()
}

#[derive(Deserialize)]
struct SettingUpdate {
    key: String,
    value: String,
}

async fn update_setting_handler(
    State(state): State<SharedState>,
    Json(body): Json<SettingUpdate>,
) -> Response {
    match state.timeline.set_setting(&body.key, &body.value).await {
        Ok(()) => {
            info!(key = %body.key, value = %body.value, "Setting changed");
            Json(json!({ "status": "ok" })).into_response()
        }
        Err(e) => {
            error!(error = %e, "/api/v1/settings update failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use async_trait::async_trait;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use ferrobot_agent::AgentLoopOptions;
    use ferrobot_bus::MessageBus;
    use ferrobot_core::{ChatRequest, ChatResponse, Provider, ProviderError, ToolRegistry};
    use ferrobot_session::SessionStore;

    struct EchoProvider;

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(ChatResponse {
                content: format!("echo: {last}"),
                tool_calls: Vec::new(),
                finish_reason: "stop".into(),
                usage: None,
            })
        }
    }

    async fn test_state(workspace: &Path) -> SharedState {
        let agent = Arc::new(AgentLoop::new(AgentLoopOptions {
            bus: Arc::new(MessageBus::new()),
            provider: Arc::new(EchoProvider),
            registry: Arc::new(ToolRegistry::new()),
            sessions: Arc::new(SessionStore::new(workspace)),
            workspace: workspace.to_path_buf(),
            model: "test-model".into(),
            max_tokens: 256,
            temperature: 0.0,
            max_iterations: 5,
        }));
        let timeline = Arc::new(TimelineService::new(":memory:").await.unwrap());
        Arc::new(GatewayState::new(agent, timeline, CancellationToken::new()))
    }

    fn test_config() -> GatewayConfig {
        GatewayConfig::default()
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_is_always_ok() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()).await, &test_config());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");
    }

    #[tokio::test]
    async fn ready_flips_after_mark_ready() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        let app = build_router(state.clone(), &test_config());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.mark_ready();
        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ready");
    }

    #[tokio::test]
    async fn chat_round_trips_through_the_agent() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()).await, &test_config());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat?message=hello")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "echo: hello");
    }

    #[tokio::test]
    async fn chat_without_message_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()).await, &test_config());

        let response = app
            .oneshot(
                Request::builder().method("POST").uri("/chat").body(Body::empty()).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn panicking_handler_yields_500_and_service_survives() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        let config = test_config();
        let limiter = Arc::new(RateLimiter::new(config.rate_limit_rps, config.rate_limit_burst));
        async fn boom() {
            panic!("kaboom")
        }
        let app = apply_middleware(
            routes(state).route("/boom", get(boom)),
            &config,
            limiter,
        );

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.max_body_bytes = 64;
        let state = test_state(dir.path()).await;
        let limiter = Arc::new(RateLimiter::new(config.rate_limit_rps, config.rate_limit_burst));
        let app = apply_middleware(routes(state), &config, limiter);

        let huge = format!("{{\"key\": \"k\", \"value\": \"{}\"}}", "x".repeat(1024));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/settings")
                    .header("content-type", "application/json")
                    .body(Body::from(huge))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn rate_limit_returns_429_past_the_burst() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.rate_limit_burst = 2;
        let app = build_router(test_state(dir.path()).await, &config);

        let mut statuses = Vec::new();
        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri("/health")
                        .header("X-Forwarded-For", "203.0.113.7")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            statuses.push(response.status());
        }
        assert_eq!(statuses, [StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]);

        // A different client still gets through.
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("X-Forwarded-For", "198.51.100.2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn settings_roundtrip_over_http() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()).await, &test_config());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/settings")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"key":"silent_mode","value":"false"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/settings?key=silent_mode")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["value"], "false");

        // Default view reports the silent-mode flag.
        let response = app
            .oneshot(Request::builder().uri("/api/v1/settings").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["silent_mode"], false);
    }

    #[tokio::test]
    async fn timeline_query_honours_filters() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        for i in 0..3 {
            state
                .timeline
                .add_event(&ferrobot_timeline::TimelineEvent {
                    id: 0,
                    event_id: format!("e{i}"),
                    timestamp: chrono::Utc::now(),
                    sender_id: if i == 0 { "alice".into() } else { "bob".into() },
                    sender_name: "Tester".into(),
                    event_type: "TEXT".into(),
                    content_text: "hi".into(),
                    media_path: String::new(),
                    authorized: true,
                })
                .await
                .unwrap();
        }
        let app = build_router(state, &test_config());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/timeline?sender=bob")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let events: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(events.as_array().unwrap().len(), 2);

        let response = app
            .oneshot(
                Request::builder().uri("/api/v1/timeline?limit=1").body(Body::empty()).unwrap(),
            )
            .await
            .unwrap();
        let events: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(events.as_array().unwrap().len(), 1);
    }
}
