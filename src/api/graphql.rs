//! GraphQL schema and handlers for link conversion queries.

use crate::api::state::AppState;
use crate::application::{LinkComposer, PatternRegistry};
use crate::domain::{Agent, ConversionError, ConversionResult, Platform};
use async_graphql::{
    Context, EmptyMutation, EmptySubscription, ErrorExtensions, Object, Result as GraphQLResult,
    Schema, ServerError,
};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::extract::Extension;
use uuid::Uuid;

pub type LinkSchema = Schema<Query, EmptyMutation, EmptySubscription>;

/// Maximum allowed GraphQL query size (50KB)
const MAX_QUERY_SIZE: usize = 50 * 1024;

/// Build a GraphQL error carrying the conversion error kind as its code.
fn conversion_error(err: &ConversionError) -> async_graphql::Error {
    let kind = err.kind().to_ascii_uppercase();
    let detected = err.detected().map(|d| d.name());
    async_graphql::Error::new(err.to_string()).extend_with(|_, e| {
        e.set("code", kind);
        e.set("timestamp", chrono::Utc::now().to_rfc3339());
        e.set("request_id", Uuid::new_v4().to_string());
        e.set("operation", "convert");
        if let Some(name) = detected {
            e.set("platform", name.to_string());
        }
    })
}

/// GraphQL root query type.
pub struct Query;

#[Object]
impl Query {
    /// Convert a marketplace, agent, or short link (or a bare numeric id)
    /// into its canonical marketplace link and affiliate target link.
    async fn convert(&self, ctx: &Context<'_>, link: String) -> GraphQLResult<Conversion> {
        if link.is_empty() || link.len() > crate::api::convert_handlers::MAX_LINK_LENGTH {
            return Err(async_graphql::Error::new("link must be 1-4096 characters")
                .extend_with(|_, e| e.set("code", "INVALID_LINK")));
        }
        let state = ctx.data::<AppState>()?;
        state
            .converter
            .convert(&link)
            .await
            .map(Conversion::from)
            .map_err(|e| conversion_error(&e))
    }

    /// Supported marketplaces.
    async fn platforms(&self) -> Vec<PlatformEntry> {
        PatternRegistry::global()
            .supported_platforms()
            .into_iter()
            .map(PlatformEntry)
            .collect()
    }

    /// Supported shopping agents.
    async fn agents(&self) -> Vec<AgentEntry> {
        PatternRegistry::global()
            .supported_agents()
            .into_iter()
            .map(AgentEntry)
            .collect()
    }

    /// Resolve a platform token; unknown tokens default to Taobao.
    async fn normalize_platform(&self, token: String) -> NormalizedPlatform {
        let resolution = Platform::resolve(&token);
        NormalizedPlatform {
            token,
            platform: resolution.platform,
            defaulted: resolution.defaulted,
        }
    }
}

/// A converted link.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub original_url: String,
    pub target_url: String,
    pub item_id: String,
    pub platform: Platform,
    pub platform_defaulted: bool,
}

#[Object]
impl Conversion {
    async fn original_url(&self) -> &str {
        &self.original_url
    }
    async fn target_url(&self) -> &str {
        &self.target_url
    }
    async fn item_id(&self) -> &str {
        &self.item_id
    }
    /// Long platform name, e.g. `TAOBAO`
    async fn platform(&self) -> &str {
        self.platform.long_name()
    }
    async fn platform_code(&self) -> &str {
        self.platform.code()
    }
    async fn platform_defaulted(&self) -> bool {
        self.platform_defaulted
    }
}

impl From<ConversionResult> for Conversion {
    fn from(result: ConversionResult) -> Self {
        Self {
            original_url: result.original_url,
            target_url: result.target_url,
            item_id: result.item_id,
            platform: result.platform,
            platform_defaulted: result.platform_defaulted,
        }
    }
}

/// A supported marketplace.
pub struct PlatformEntry(Platform);

#[Object]
impl PlatformEntry {
    async fn code(&self) -> &str {
        self.0.code()
    }
    async fn name(&self) -> &str {
        self.0.long_name()
    }
    /// Canonical link template with an `{id}` placeholder
    async fn template(&self) -> String {
        LinkComposer::original_template(self.0)
    }
    async fn hosts(&self) -> Vec<&str> {
        self.0.hosts().to_vec()
    }
}

/// A supported shopping agent.
pub struct AgentEntry(Agent);

#[Object]
impl AgentEntry {
    async fn name(&self) -> &str {
        self.0.name()
    }
    async fn host(&self) -> &str {
        self.0.host()
    }
}

pub struct NormalizedPlatform {
    token: String,
    platform: Platform,
    defaulted: bool,
}

#[Object]
impl NormalizedPlatform {
    async fn token(&self) -> &str {
        &self.token
    }
    async fn platform(&self) -> &str {
        self.platform.long_name()
    }
    async fn code(&self) -> &str {
        self.platform.code()
    }
    async fn defaulted(&self) -> bool {
        self.defaulted
    }
}

/// Create the GraphQL schema with security and performance features.
pub fn create_schema(state: AppState) -> LinkSchema {
    Schema::build(Query, EmptyMutation, EmptySubscription)
        .data(state)
        .limit_depth(10) // Maximum query depth
        .limit_complexity(1000) // Maximum query complexity
        .finish()
}

/// GraphQL POST endpoint handler with validation, logging and metrics.
pub async fn graphql_handler(
    Extension(schema): Extension<LinkSchema>,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let request = req.into_inner();
    let operation = request
        .operation_name
        .clone()
        .unwrap_or_else(|| "unknown".to_string());

    if request.query.len() > MAX_QUERY_SIZE {
        tracing::warn!(
            "GraphQL query too large: {} bytes (max: {})",
            request.query.len(),
            MAX_QUERY_SIZE
        );
        metrics::counter!("graphql_queries_total", "operation" => operation, "status" => "validation_error")
            .increment(1);
        return rejected(
            format!(
                "Query too large: {} bytes. Maximum allowed size is {} bytes.",
                request.query.len(),
                MAX_QUERY_SIZE
            ),
            "QUERY_TOO_LARGE",
        );
    }

    if request.query.trim().is_empty() {
        metrics::counter!("graphql_queries_total", "operation" => operation, "status" => "validation_error")
            .increment(1);
        return rejected("Query cannot be empty".to_string(), "EMPTY_QUERY");
    }

    tracing::debug!(
        "GraphQL query: {} bytes, operation: {}",
        request.query.len(),
        operation
    );

    let start = std::time::Instant::now();
    let response = schema.execute(request).await;
    let duration = start.elapsed();

    let status = if response.errors.is_empty() {
        "success"
    } else {
        "error"
    };
    metrics::counter!("graphql_queries_total", "operation" => operation.clone(), "status" => status)
        .increment(1);
    metrics::histogram!("graphql_query_duration_ms", "operation" => operation.clone())
        .record(duration.as_millis() as f64);

    if let Some(error) = response.errors.first() {
        tracing::debug!("GraphQL error: {} (operation: {})", error.message, operation);
    }

    response.into()
}

fn rejected(message: String, code: &str) -> GraphQLResponse {
    let mut response = async_graphql::Response::default();
    let mut error = ServerError::new(message, None);
    let mut extensions = async_graphql::ErrorExtensionValues::default();
    extensions.set("code", code);
    error.extensions = Some(extensions);
    response.errors.push(error);
    response.into()
}

/// GraphQL GET endpoint handler (for GraphiQL/Playground).
pub async fn graphql_playground() -> impl axum::response::IntoResponse {
    axum::response::Html(async_graphql::http::playground_source(
        async_graphql::http::GraphQLPlaygroundConfig::new("/graphql"),
    ))
}
