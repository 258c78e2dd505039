use crate::api::convert_handlers::{
    agents_handler, convert_batch_handler, convert_get_handler, convert_handler, normalize_handler,
    platforms_handler,
};
use crate::api::doc::ApiDoc;
use crate::api::graphql::{create_schema, graphql_handler, graphql_playground};
use crate::api::handlers::{health_handler, metrics_handler, rate_limit_handler};
use crate::api::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

use axum::http::HeaderValue;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Overall budget for one HTTP request; batch conversions with slow short
/// links are the long pole.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn cors_layer(allowed_origins: &str) -> CorsLayer {
    if allowed_origins == "*" {
        return CorsLayer::permissive();
    }

    // Parse comma-separated origins, filter out invalid ones
    let origin_values: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    match origin_values.len() {
        0 => {
            tracing::warn!("No valid CORS origins found, falling back to permissive CORS");
            CorsLayer::permissive()
        }
        1 => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin_values[0].clone()))
            .allow_methods(Any)
            .allow_headers(Any),
        _ => CorsLayer::new()
            .allow_origin(AllowOrigin::list(origin_values))
            .allow_methods(Any)
            .allow_headers(Any),
    }
}

pub fn create_router(state: AppState, allowed_origins: String) -> Router {
    let schema = create_schema(state.clone());
    let cors = cors_layer(&allowed_origins);

    // Create middleware stack with security headers and observability
    let middleware = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::span!(
                        Level::INFO,
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path()
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: Duration,
                     _span: &tracing::Span| {
                        let status = response.status().as_u16();
                        metrics::counter!(
                            "http_requests_total",
                            "status" => status.to_string(),
                            "status_class" => format!("{}xx", status / 100)
                        )
                        .increment(1);
                        metrics::histogram!("http_request_duration_seconds", "status" => status.to_string())
                            .record(latency.as_secs_f64());

                        if latency.as_millis() > 1000 {
                            tracing::warn!("Slow HTTP request: {}ms", latency.as_millis());
                        }
                    },
                )
                .on_failure(
                    |_error: tower_http::classify::ServerErrorsFailureClass,
                     _latency: Duration,
                     _span: &tracing::Span| {
                        metrics::counter!("http_requests_total", "status" => "error", "status_class" => "5xx")
                            .increment(1);
                    },
                ),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(cors);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // System endpoints (no versioning)
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/rate-limit", get(rate_limit_handler))
        // OpenAPI spec (downloadable)
        .route("/v1/openapi.json", get(|| async { axum::Json(ApiDoc::openapi()) }))
        // Conversion
        .route("/v1/api/convert", get(convert_get_handler).post(convert_handler))
        .route("/v1/api/convert/batch", post(convert_batch_handler))
        // Catalogue
        .route("/v1/api/platforms", get(platforms_handler))
        .route("/v1/api/platforms/normalize", get(normalize_handler))
        .route("/v1/api/agents", get(agents_handler))
        // GraphQL endpoint (schema passed via extension layer)
        .route("/graphql", get(graphql_playground).post(graphql_handler))
        .layer(axum::Extension(schema))
        .layer(middleware)
        .with_state(state)
}
