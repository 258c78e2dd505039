//! Wiring shared by the HTTP gateway and the MCP server binaries.

use crate::application::{LinkComposer, LinkConverter};
use crate::config::{Config, ShortLinkMode};
use crate::domain::ShortLinkExpander;
use crate::infrastructure::{
    CachedShortLinkExpander, HttpShortLinkExpander, RateLimiter, RedisRepository,
    StaticShortLinkExpander,
};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Engine and its collaborators, built from configuration.
pub struct Services {
    pub converter: Arc<LinkConverter>,
    pub rate_limiter: Arc<RateLimiter>,
    pub cache_enabled: bool,
}

impl Services {
    pub fn from_config(config: &Config) -> Result<Self> {
        let short_links = &config.short_links;
        let rate_limiter = Arc::new(RateLimiter::new(short_links.requests_per_minute));

        let base: Arc<dyn ShortLinkExpander> = match short_links.mode {
            ShortLinkMode::Static => {
                tracing::info!("Short links expanded from the static table");
                Arc::new(StaticShortLinkExpander::new())
            }
            ShortLinkMode::Http => {
                tracing::info!(
                    "Short links expanded over HTTP: timeout {}ms, {} requests/minute",
                    short_links.timeout_ms,
                    short_links.requests_per_minute
                );
                Arc::new(HttpShortLinkExpander::new(
                    Duration::from_millis(short_links.timeout_ms),
                    rate_limiter.clone(),
                )?)
            }
        };

        let redis = RedisRepository::new(config.redis_url.clone());
        let cache_enabled = redis.is_enabled();
        let expander: Arc<dyn ShortLinkExpander> = if cache_enabled {
            tracing::info!(
                "Short-link expansions cached in Redis for {}s",
                short_links.cache_ttl_secs
            );
            Arc::new(CachedShortLinkExpander::new(
                base,
                Arc::new(redis),
                short_links.cache_ttl_secs,
            ))
        } else {
            base
        };

        let composer = LinkComposer::new(config.converter.affiliate_code.clone());
        let converter = LinkConverter::new(expander, composer)
            .with_max_depth(config.converter.max_unwrap_depth);

        Ok(Self {
            converter: Arc::new(converter),
            rate_limiter,
            cache_enabled,
        })
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` sets the filter (default `info`); `LOG_FORMAT=json` switches to
/// JSON lines. Output goes to stderr when `to_stderr` is set, so stdout stays
/// free for protocol traffic.
pub fn init_tracing(to_stderr: bool) {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));

    let registry = tracing_subscriber::registry().with(env_filter);
    match (log_format.eq_ignore_ascii_case("json"), to_stderr) {
        (true, true) => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        (true, false) => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        (false, true) => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        (false, false) => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
