// HTTP server for quota checks, admin dashboard and Prometheus metrics
//
// Routes:
// - POST   /v1/quota/{action}/check        consume one unit, 429 + Retry-After when exhausted
// - GET    /v1/quota/{action}/usage        read-only view of both windows
// - GET    /admin/quota                    dashboard snapshot
// - DELETE /admin/quota/users/{user_id}    forget one user's counters
// - GET    /metrics, /health
//
// The caller identity arrives in the `x-user-id` header, set by the
// authenticating layer in front of this service.

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::QuotaError;
use crate::metrics;
use crate::quota::{Clock, DashboardBuilder, QuotaDecision, QuotaPolicy};

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the remaining allowance
pub const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub policy: QuotaPolicy,
    pub admin_enabled: bool,
    pub metrics_enabled: bool,
}

impl AppState {
    pub fn new(policy: QuotaPolicy, config: &Config) -> Self {
        Self {
            policy,
            admin_enabled: config.server.admin_enabled,
            metrics_enabled: config.metrics.enabled,
        }
    }
}

/// HTTP-facing errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No caller identity on the request
    #[error("missing x-user-id header")]
    MissingUser,

    /// Quota exhausted for this window
    #[error("quota exceeded, retry after {retry_after_secs}s")]
    QuotaExceeded { retry_after_secs: u64 },

    #[error(transparent)]
    Quota(#[from] QuotaError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            ApiError::QuotaExceeded { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                [
                    (header::RETRY_AFTER, retry_after_secs.to_string()),
                    (REMAINING_HEADER, "0".to_string()),
                ],
                Json(json!({
                    "error": "quota_exceeded",
                    "retryAfterSeconds": retry_after_secs,
                })),
            )
                .into_response(),
            ApiError::MissingUser | ApiError::Quota(QuotaError::EmptyUserId) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "missing_user", "detail": message })),
            )
                .into_response(),
            ApiError::Quota(QuotaError::UnknownAction(_)) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "unknown_action", "detail": message })),
            )
                .into_response(),
            ApiError::Quota(
                QuotaError::InvalidLimits { .. }
                | QuotaError::InvalidActionLimits { .. }
                | QuotaError::ZeroSweepThreshold,
            )
            | ApiError::Internal(_) => {
                error!(%message, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal_error", "detail": message })),
                )
                    .into_response()
            }
        }
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/quota/{action}/check", post(check_handler))
        .route("/v1/quota/{action}/usage", get(usage_handler));

    if state.metrics_enabled {
        app = app.route("/metrics", get(metrics_handler));
    }
    if state.admin_enabled {
        app = app
            .route("/admin/quota", get(dashboard_handler))
            .route("/admin/quota/users/{user_id}", delete(reset_user_handler));
    }

    app.with_state(state)
}

/// Start the quota HTTP server
pub async fn serve(config: Config) -> Result<()> {
    if config.metrics.enabled {
        if let Err(e) = metrics::init() {
            warn!("Metrics registry already initialized: {}", e);
        }
    }

    let policy = QuotaPolicy::new(config.quota.clone());
    if config.quota.sweep_interval_secs > 0 {
        spawn_sweeper(
            policy.clone(),
            Duration::from_secs(config.quota.sweep_interval_secs),
        );
    }

    let state = AppState::new(policy, &config);
    let app = router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind quota server")?;

    info!(
        %addr,
        enabled = config.quota.enabled,
        actions = config.quota.actions.len(),
        "Quota server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Quota server error")?;

    info!("Quota server stopped");
    Ok(())
}

/// Periodically drop expired counters, independent of the size threshold
pub fn spawn_sweeper<C: Clock + 'static>(
    policy: QuotaPolicy<C>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // first tick fires immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = policy.sweep_expired();
            if removed > 0 {
                info!(removed, "Swept expired quota counters");
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

fn caller_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::MissingUser)
}

async fn check_handler(
    State(state): State<AppState>,
    Path(action): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user_id = caller_id(&headers)?;
    let decision: QuotaDecision = state.policy.check(&user_id, &action)?;

    if !decision.allowed {
        return Err(ApiError::QuotaExceeded {
            retry_after_secs: decision.retry_after_secs,
        });
    }

    Ok((
        [(REMAINING_HEADER, decision.remaining.to_string())],
        Json(decision),
    )
        .into_response())
}

async fn usage_handler(
    State(state): State<AppState>,
    Path(action): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user_id = caller_id(&headers)?;
    let usage = state.policy.usage(&user_id, &action)?;
    Ok(Json(usage).into_response())
}

async fn dashboard_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(DashboardBuilder::new(state.policy.clone()).build())
}

async fn reset_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let removed = state.policy.reset_user(&user_id);
    Json(json!({ "removed": removed }))
}

/// Metrics endpoint handler
async fn metrics_handler() -> Result<Response, ApiError> {
    let text = metrics::gather_metrics().map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((StatusCode::OK, text).into_response())
}

/// Health check endpoint
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
