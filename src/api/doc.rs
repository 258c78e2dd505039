use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        // System Handlers
        crate::api::handlers::health_handler,
        crate::api::handlers::metrics_handler,
        crate::api::handlers::rate_limit_handler,
        // Conversion Handlers
        crate::api::convert_handlers::convert_get_handler,
        crate::api::convert_handlers::convert_handler,
        crate::api::convert_handlers::convert_batch_handler,
        // Catalogue Handlers
        crate::api::convert_handlers::platforms_handler,
        crate::api::convert_handlers::agents_handler,
        crate::api::convert_handlers::normalize_handler
    ),
    components(
        schemas(
            crate::api::handlers::HealthResponse,
            crate::api::handlers::HealthDependencies,
            crate::api::handlers::RateLimitResponse,
            crate::api::handlers::RateLimitResources,
            crate::api::handlers::RateLimitInfo,
            crate::api::convert_handlers::ConvertRequest,
            crate::api::convert_handlers::BatchConvertRequest,
            crate::api::convert_handlers::BatchConvertResponse,
            crate::api::convert_handlers::BatchItem,
            crate::api::convert_handlers::ErrorResponse,
            crate::api::convert_handlers::PlatformInfo,
            crate::api::convert_handlers::PlatformsResponse,
            crate::api::convert_handlers::AgentInfo,
            crate::api::convert_handlers::AgentsResponse,
            crate::api::convert_handlers::NormalizeResponse,
            crate::domain::ConversionResult,
            crate::domain::Platform
        )
    ),
    tags(
        (name = "system", description = "System endpoints for health checks and metrics"),
        (name = "conversion", description = "Convert marketplace, agent, and short links"),
        (name = "catalogue", description = "Supported marketplaces, agents, and platform tokens")
    ),
    info(
        title = "AgentLink Gateway API",
        version = "0.1.0",
        description = "Resolves marketplace, shopping-agent, and short links to a canonical marketplace link and an affiliate-tagged agent link."
    )
)]
pub struct ApiDoc;
