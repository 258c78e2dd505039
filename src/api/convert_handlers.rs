//! HTTP handlers for link conversion and the platform catalogue.

use crate::api::state::AppState;
use crate::application::{LinkComposer, PatternRegistry};
use crate::domain::{ConversionError, ConversionResult, Platform};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[allow(unused_imports)]
use serde_json::json; // Used in utoipa::path examples

/// Longest link accepted by the API.
pub const MAX_LINK_LENGTH: usize = 4096;

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for the GET conversion endpoint
#[derive(Debug, Clone, Deserialize, IntoParams, Validate)]
pub struct ConvertQuery {
    /// Marketplace, agent, or short link, or a bare numeric id
    #[param(example = "https://item.taobao.com/item.htm?id=123456789012")]
    #[validate(length(min = 1, max = 4096))]
    pub link: String,
}

/// Body of the POST conversion endpoint
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct ConvertRequest {
    #[schema(example = "https://www.pandabuy.com/product?url=https%3A%2F%2Fitem.taobao.com%2Fitem.htm%3Fid%3D123456789012")]
    #[validate(length(min = 1, max = 4096))]
    pub link: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct BatchConvertRequest {
    /// Links to convert (1-50)
    #[validate(length(min = 1, max = 50))]
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, IntoParams, Validate)]
pub struct NormalizeQuery {
    /// Short code or long platform name, case-insensitive
    #[param(example = "wd")]
    #[validate(length(max = 64))]
    pub token: String,
}

// ============================================================================
// Response Types
// ============================================================================

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable conversion error kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Marketplace or agent recognized before conversion failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl ErrorResponse {
    fn validation(details: impl ToString) -> Self {
        Self {
            error: "Invalid parameters".to_string(),
            kind: None,
            details: Some(details.to_string()),
            platform: None,
        }
    }
}

impl From<&ConversionError> for ErrorResponse {
    fn from(err: &ConversionError) -> Self {
        Self {
            error: "Link could not be converted".to_string(),
            kind: Some(err.kind().to_string()),
            details: Some(err.to_string()),
            platform: err.detected().map(|d| d.name().to_string()),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(details: impl ToString) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::validation(details)),
    )
}

fn unprocessable(err: &ConversionError) -> ApiError {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(err.into()))
}

/// One entry of a batch response, in input order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchItem {
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ConversionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchConvertResponse {
    pub results: Vec<BatchItem>,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlatformInfo {
    /// Short internal code
    pub code: String,
    /// Long display name
    pub name: String,
    /// Canonical link template with an `{id}` placeholder
    pub template: String,
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlatformsResponse {
    pub platforms: Vec<PlatformInfo>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentInfo {
    pub name: String,
    pub host: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentsResponse {
    pub agents: Vec<AgentInfo>,
    pub count: usize,
    /// Output dialect all target links are written in
    pub target_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NormalizeResponse {
    pub token: String,
    pub platform: Platform,
    pub code: String,
    /// True when the token was not recognized and Taobao was assumed
    pub defaulted: bool,
}

impl PlatformInfo {
    pub fn from_platform(platform: Platform) -> Self {
        Self {
            code: platform.code().to_string(),
            name: platform.long_name().to_string(),
            template: LinkComposer::original_template(platform),
            hosts: platform.hosts().iter().map(|h| h.to_string()).collect(),
        }
    }
}

// ============================================================================
// Conversion Handlers
// ============================================================================

async fn convert_link(state: &AppState, link: &str) -> Result<Json<ConversionResult>, ApiError> {
    metrics::counter!("api_requests_total", "endpoint" => "convert").increment(1);
    state
        .converter
        .convert(link)
        .await
        .map(Json)
        .map_err(|e| unprocessable(&e))
}

/// Convert a link given as a query parameter
#[utoipa::path(
    get,
    path = "/v1/api/convert",
    params(ConvertQuery),
    tag = "conversion",
    responses(
        (status = 200, description = "Link converted", body = ConversionResult),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 422, description = "Link could not be converted", body = ErrorResponse,
            example = json!({
                "error": "Link could not be converted",
                "kind": "unsupported_link_shape",
                "details": "unsupported link shape for Hoobuy",
                "platform": "Hoobuy"
            })
        )
    )
)]
#[instrument(skip_all)]
pub async fn convert_get_handler(
    State(state): State<AppState>,
    Query(query): Query<ConvertQuery>,
) -> Result<Json<ConversionResult>, ApiError> {
    query.validate().map_err(bad_request)?;
    convert_link(&state, &query.link).await
}

/// Convert a link given in the request body
#[utoipa::path(
    post,
    path = "/v1/api/convert",
    request_body = ConvertRequest,
    tag = "conversion",
    responses(
        (status = 200, description = "Link converted", body = ConversionResult),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 422, description = "Link could not be converted", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn convert_handler(
    State(state): State<AppState>,
    Json(request): Json<ConvertRequest>,
) -> Result<Json<ConversionResult>, ApiError> {
    request.validate().map_err(bad_request)?;
    convert_link(&state, &request.link).await
}

/// Convert up to 50 links; each entry succeeds or fails on its own
#[utoipa::path(
    post,
    path = "/v1/api/convert/batch",
    request_body = BatchConvertRequest,
    tag = "conversion",
    responses(
        (status = 200, description = "Per-link results in input order", body = BatchConvertResponse),
        (status = 400, description = "Invalid parameters", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn convert_batch_handler(
    State(state): State<AppState>,
    Json(request): Json<BatchConvertRequest>,
) -> Result<Json<BatchConvertResponse>, ApiError> {
    request.validate().map_err(bad_request)?;
    if let Some(pos) = request
        .links
        .iter()
        .position(|l| l.is_empty() || l.len() > MAX_LINK_LENGTH)
    {
        return Err(bad_request(format!(
            "links[{}] must be 1-{} characters",
            pos, MAX_LINK_LENGTH
        )));
    }

    metrics::counter!("api_requests_total", "endpoint" => "convert_batch").increment(1);
    let outcomes = state.converter.convert_many(request.links.clone()).await;

    let results: Vec<BatchItem> = request
        .links
        .into_iter()
        .zip(outcomes)
        .map(|(input, outcome)| match outcome {
            Ok(result) => BatchItem {
                input,
                result: Some(result),
                error: None,
            },
            Err(e) => BatchItem {
                input,
                result: None,
                error: Some((&e).into()),
            },
        })
        .collect();
    let succeeded = results.iter().filter(|r| r.result.is_some()).count();
    let failed = results.len() - succeeded;

    Ok(Json(BatchConvertResponse {
        results,
        succeeded,
        failed,
    }))
}

// ============================================================================
// Catalogue Handlers
// ============================================================================

/// List supported marketplaces
#[utoipa::path(
    get,
    path = "/v1/api/platforms",
    tag = "catalogue",
    responses(
        (status = 200, description = "Supported marketplaces", body = PlatformsResponse)
    )
)]
pub async fn platforms_handler() -> Json<PlatformsResponse> {
    let platforms: Vec<PlatformInfo> = PatternRegistry::global()
        .supported_platforms()
        .into_iter()
        .map(PlatformInfo::from_platform)
        .collect();
    let count = platforms.len();
    Json(PlatformsResponse { platforms, count })
}

/// List supported shopping agents
#[utoipa::path(
    get,
    path = "/v1/api/agents",
    tag = "catalogue",
    responses(
        (status = 200, description = "Supported agents", body = AgentsResponse)
    )
)]
pub async fn agents_handler() -> Json<AgentsResponse> {
    let agents: Vec<AgentInfo> = PatternRegistry::global()
        .supported_agents()
        .into_iter()
        .map(|agent| AgentInfo {
            name: agent.name().to_string(),
            host: agent.host().to_string(),
        })
        .collect();
    let count = agents.len();
    Json(AgentsResponse {
        agents,
        count,
        target_base_url: crate::application::composer::TARGET_BASE_URL.to_string(),
    })
}

/// Resolve a platform token the way agent links are interpreted
#[utoipa::path(
    get,
    path = "/v1/api/platforms/normalize",
    params(NormalizeQuery),
    tag = "catalogue",
    responses(
        (status = 200, description = "Normalized platform", body = NormalizeResponse,
            example = json!({"token": "foo", "platform": "TAOBAO", "code": "TB", "defaulted": true})
        ),
        (status = 400, description = "Invalid parameters", body = ErrorResponse)
    )
)]
pub async fn normalize_handler(
    Query(query): Query<NormalizeQuery>,
) -> Result<Json<NormalizeResponse>, ApiError> {
    query.validate().map_err(bad_request)?;
    let resolution = Platform::resolve(&query.token);
    Ok(Json(NormalizeResponse {
        token: query.token,
        platform: resolution.platform,
        code: resolution.platform.code().to_string(),
        defaulted: resolution.defaulted,
    }))
}
