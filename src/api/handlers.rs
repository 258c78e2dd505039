use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::state::AppState;
use utoipa::ToSchema;

#[allow(unused_imports)]
use serde_json::json; // Used in utoipa::path examples

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Maximum nesting of wrapped links followed per conversion
    pub max_unwrap_depth: usize,
    /// Short-link expansion mode (`static` or `http`)
    pub short_links: String,
    pub dependencies: HealthDependencies,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthDependencies {
    pub redis: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Health check passed", body = HealthResponse)
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    // Redis only backs the optional expansion cache; conversion never depends on it.
    let redis_status = if state.cache_enabled {
        "enabled"
    } else {
        "disabled"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: VERSION.to_string(),
        max_unwrap_depth: state.converter.max_depth(),
        short_links: state.short_link_mode.as_str().to_string(),
        dependencies: HealthDependencies {
            redis: redis_status.to_string(),
        },
    })
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "system",
    responses(
        (status = 200, description = "Prometheus metrics", content_type = "text/plain"),
        (status = 503, description = "Metrics recorder not installed")
    )
)]
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RateLimitResponse {
    pub resources: RateLimitResources,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RateLimitResources {
    /// Outbound short-link expansion budget
    pub short_links: RateLimitInfo,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    pub reset: i64,
    pub used: u32,
}

/// Get short-link expansion rate limit status.
///
/// Only the HTTP expander consumes this budget; in static mode it stays full.
#[utoipa::path(
    get,
    path = "/rate-limit",
    tag = "system",
    responses(
        (status = 200, description = "Rate limit status retrieved successfully", body = RateLimitResponse,
            example = json!({
                "resources": {
                    "short_links": {
                        "limit": 600,
                        "remaining": 588,
                        "reset": 1735678800,
                        "used": 12
                    }
                }
            })
        )
    )
)]
#[instrument(skip(state))]
pub async fn rate_limit_handler(State(state): State<AppState>) -> Json<RateLimitResponse> {
    let stats = state.rate_limiter.get_stats().await;

    Json(RateLimitResponse {
        resources: RateLimitResources {
            short_links: RateLimitInfo {
                limit: stats.limit,
                remaining: stats.remaining,
                reset: stats.reset,
                used: stats.used,
            },
        },
    })
}
