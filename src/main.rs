//! AgentLink Gateway
//!
//! REST/GraphQL gateway that turns marketplace, shopping-agent and short
//! links into a canonical marketplace link plus an affiliate-tagged agent
//! link.
//!
//! # Architecture
//!
//! The API follows clean/onion architecture with clear separation of concerns:
//! - **Domain**: Platforms, agents, results, errors and boundary traits
//! - **Application**: The conversion engine (registry, unwrapper, decoder, composer)
//! - **Infrastructure**: Short-link expanders, Redis cache, rate limiter
//! - **API**: HTTP handlers, GraphQL, routing, and middleware
//!
//! # Configuration
//!
//! The API is configured via `config.yaml` (or `CONFIG_PATH`) and environment variables:
//! - `PORT`: Listen port override
//! - `AFFILIATE_CODE`: Referral code for target links
//! - `SHORT_LINK_MODE`: `static` (canned table) or `http` (follow redirects)
//! - `REDIS_URL`: Enables caching of short-link expansions
//! - `RUST_LOG` / `LOG_FORMAT`: Logging level and `text`/`json` output
//!
//! # Quick Start
//!
//! ```bash
//! cargo run --release
//!
//! curl http://localhost:3010/health
//! curl "http://localhost:3010/v1/api/convert?link=https://item.jd.com/100012043978.html"
//! ```

use agentlink_gateway::api::{create_router, AppState};
use agentlink_gateway::bootstrap::{init_tracing, Services};
use agentlink_gateway::config::Config;
use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(false);

    let config = Config::from_env()?;

    // Metrics recorder must exist before any counter is touched.
    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    let services = Services::from_config(&config)?;
    tracing::info!(
        "Converter ready: affiliate code {}, max unwrap depth {}",
        config.converter.affiliate_code,
        config.converter.max_unwrap_depth
    );

    let state = AppState {
        converter: services.converter,
        rate_limiter: services.rate_limiter,
        metrics: Some(metrics),
        short_link_mode: config.short_links.mode,
        cache_enabled: services.cache_enabled,
    };

    let app = create_router(state, config.server.allowed_origins.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", addr))?;
    tracing::info!("AgentLink gateway running at http://{}", addr);

    // Graceful shutdown handling
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error during operation")?;

    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C) to initiate graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
