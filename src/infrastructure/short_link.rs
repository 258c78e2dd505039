//! Short-link expanders.
//!
//! Three implementations of [`ShortLinkExpander`]:
//! - [`StaticShortLinkExpander`]: canned destinations for known short-link
//!   hosts, no I/O. Used in tests and as the default mode.
//! - [`HttpShortLinkExpander`]: follows real redirects with a timeout.
//! - [`CachedShortLinkExpander`]: caches another expander's results.

use crate::domain::{host_matches, host_of, CacheRepository, ExpansionError, ShortLinkExpander};
use crate::infrastructure::rate_limiter::RateLimiter;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{redirect, Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Hosts whose links are redirects to the real destination.
pub const SHORT_LINK_HOSTS: &[&str] = &[
    "m.tb.cn",
    "e.tb.cn",
    "k.youshop10.com",
    "qr.1688.com",
    "3.cn",
    "u.jd.com",
    "pandabuy.page.link",
    "bit.ly",
    "t.cn",
];

/// Default per-request timeout for the HTTP expander.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Maximum redirects followed for one short link.
const MAX_REDIRECTS: usize = 10;

/// Cache key prefix for expanded short links.
const CACHE_KEY_PREFIX: &str = "v1:short:";

fn is_short_link_host(host: &str, hosts: &[String]) -> bool {
    hosts.iter().any(|domain| host_matches(host, domain))
}

// ============================================================================
// Static expander
// ============================================================================

/// Canned destination templates; `{token}` is the short link's last path
/// segment without its `h.` prefix.
const STATIC_DESTINATIONS: &[(&str, &str)] = &[
    ("m.tb.cn", "https://item.taobao.com/item.htm?id={token}"),
    ("e.tb.cn", "https://item.taobao.com/item.htm?id={token}"),
    ("k.youshop10.com", "https://weidian.com/item.html?itemID={token}"),
    ("qr.1688.com", "https://detail.1688.com/offer/{token}.html"),
    ("3.cn", "https://item.m.jd.com/product/{token}.html"),
    (
        "pandabuy.page.link",
        "https://www.pandabuy.com/product?url=https%3A%2F%2Fitem.taobao.com%2Fitem.htm%3Fid%3D{token}",
    ),
];

/// Deterministic expander over a fixed table of short-link hosts.
#[derive(Debug, Clone, Default)]
pub struct StaticShortLinkExpander;

impl StaticShortLinkExpander {
    pub fn new() -> Self {
        Self
    }

    fn token(url: &str) -> Option<String> {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let segment = path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.contains('.') || s.starts_with("h."))?;
        let token = segment.strip_prefix("h.").unwrap_or(segment);
        if !token.is_empty() && token.chars().all(|c| c.is_ascii_alphanumeric()) {
            Some(token.to_string())
        } else {
            None
        }
    }
}

#[async_trait]
impl ShortLinkExpander for StaticShortLinkExpander {
    async fn expand(&self, url: &str) -> Result<String, ExpansionError> {
        let Some(host) = host_of(url) else {
            return Ok(url.to_string());
        };
        let Some((_, template)) = STATIC_DESTINATIONS.iter().find(|(h, _)| host == *h) else {
            return Ok(url.to_string());
        };

        match Self::token(url) {
            Some(token) => {
                metrics::counter!("short_link_expansions_total", "outcome" => "static").increment(1);
                Ok(template.replace("{token}", &token))
            }
            None => Err(ExpansionError::Failed {
                url: url.to_string(),
                reason: "short link carries no token".to_string(),
            }),
        }
    }
}

// ============================================================================
// HTTP expander
// ============================================================================

/// Follows a short link's redirects and returns the final URL.
pub struct HttpShortLinkExpander {
    client: Client,
    hosts: Vec<String>,
    rate_limiter: Arc<RateLimiter>,
}

impl HttpShortLinkExpander {
    pub fn new(timeout: Duration, rate_limiter: Arc<RateLimiter>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent("AgentLinkGateway/1.0")
            .build()
            .context("Failed to create HTTP client for short-link expansion")?;

        Ok(Self {
            client,
            hosts: SHORT_LINK_HOSTS.iter().map(|h| h.to_string()).collect(),
            rate_limiter,
        })
    }

    /// Replace the set of hosts treated as short links.
    pub fn with_hosts(mut self, hosts: Vec<String>) -> Self {
        self.hosts = hosts;
        self
    }

    fn map_error(url: &str, err: reqwest::Error) -> ExpansionError {
        if err.is_timeout() {
            metrics::counter!("short_link_expansions_total", "outcome" => "timeout").increment(1);
            ExpansionError::Timeout {
                url: url.to_string(),
            }
        } else {
            metrics::counter!("short_link_expansions_total", "outcome" => "failed").increment(1);
            ExpansionError::Failed {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl ShortLinkExpander for HttpShortLinkExpander {
    async fn expand(&self, url: &str) -> Result<String, ExpansionError> {
        let is_short = host_of(url).is_some_and(|host| is_short_link_host(&host, &self.hosts));
        if !is_short {
            return Ok(url.to_string());
        }

        if !self.rate_limiter.try_acquire().await {
            metrics::counter!("short_link_expansions_total", "outcome" => "rate_limited")
                .increment(1);
            return Err(ExpansionError::Failed {
                url: url.to_string(),
                reason: "outbound rate limit exceeded".to_string(),
            });
        }

        let request_url = if url.contains("://") {
            url.to_string()
        } else {
            format!("https://{}", url.trim_start_matches('/'))
        };
        debug!("Expanding short link {}", request_url);

        let mut response = self
            .client
            .head(&request_url)
            .send()
            .await
            .map_err(|e| Self::map_error(url, e))?;

        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            debug!("HEAD not allowed for {}, retrying with GET", request_url);
            response = self
                .client
                .get(&request_url)
                .send()
                .await
                .map_err(|e| Self::map_error(url, e))?;
        }

        let destination = response.url().to_string();
        info!("Short link {} expanded to {}", url, destination);
        metrics::counter!("short_link_expansions_total", "outcome" => "expanded").increment(1);
        Ok(destination)
    }
}

// ============================================================================
// Cache decorator
// ============================================================================

/// Caches successful expansions of another expander.
///
/// Links on other hosts pass through untouched without a cache lookup. Only
/// links that actually expanded are stored. Cache failures count as misses.
pub struct CachedShortLinkExpander {
    inner: Arc<dyn ShortLinkExpander>,
    cache: Arc<dyn CacheRepository>,
    hosts: Vec<String>,
    ttl_seconds: u64,
}

impl CachedShortLinkExpander {
    pub fn new(
        inner: Arc<dyn ShortLinkExpander>,
        cache: Arc<dyn CacheRepository>,
        ttl_seconds: u64,
    ) -> Self {
        Self {
            inner,
            cache,
            hosts: SHORT_LINK_HOSTS.iter().map(|h| h.to_string()).collect(),
            ttl_seconds,
        }
    }

    /// Replace the set of hosts whose expansions are cached.
    pub fn with_hosts(mut self, hosts: Vec<String>) -> Self {
        self.hosts = hosts;
        self
    }

    fn cache_key(url: &str) -> String {
        format!("{}{}", CACHE_KEY_PREFIX, url)
    }
}

#[async_trait]
impl ShortLinkExpander for CachedShortLinkExpander {
    async fn expand(&self, url: &str) -> Result<String, ExpansionError> {
        let is_short = host_of(url).is_some_and(|host| is_short_link_host(&host, &self.hosts));
        if !is_short {
            return Ok(url.to_string());
        }

        let key = Self::cache_key(url);
        match self.cache.get(&key).await {
            Ok(Some(destination)) => {
                debug!("Short link cache hit for {}", url);
                metrics::counter!("short_link_expansions_total", "outcome" => "cache_hit")
                    .increment(1);
                return Ok(destination);
            }
            Ok(None) => {}
            Err(e) => warn!("Short link cache read failed for {}: {}", url, e),
        }

        let destination = self.inner.expand(url).await?;
        if destination != url {
            if let Err(e) = self.cache.set(&key, &destination, self.ttl_seconds).await {
                warn!("Short link cache write failed for {}: {}", url, e);
            }
        }
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockCacheRepository, MockShortLinkExpander};
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_static_expands_known_hosts() {
        let expander = StaticShortLinkExpander::new();
        assert_eq!(
            expander.expand("https://m.tb.cn/h.6543210").await.unwrap(),
            "https://item.taobao.com/item.htm?id=6543210"
        );
        assert_eq!(
            expander.expand("https://3.cn/100200").await.unwrap(),
            "https://item.m.jd.com/product/100200.html"
        );
        assert_eq!(
            expander
                .expand("https://k.youshop10.com/h.55?from=share")
                .await
                .unwrap(),
            "https://weidian.com/item.html?itemID=55"
        );
    }

    #[tokio::test]
    async fn test_static_is_identity_for_other_hosts() {
        let expander = StaticShortLinkExpander::new();
        let url = "https://item.jd.com/1.html";
        assert_eq!(expander.expand(url).await.unwrap(), url);
        assert_eq!(expander.expand("not a url").await.unwrap(), "not a url");
    }

    #[tokio::test]
    async fn test_static_rejects_missing_token() {
        let expander = StaticShortLinkExpander::new();
        let err = expander.expand("https://m.tb.cn/").await.unwrap_err();
        assert!(matches!(err, ExpansionError::Failed { .. }));
    }

    #[tokio::test]
    async fn test_http_skips_non_short_hosts() {
        let limiter = Arc::new(RateLimiter::new(0));
        let expander =
            HttpShortLinkExpander::new(Duration::from_millis(100), limiter.clone()).unwrap();
        let url = "https://item.taobao.com/item.htm?id=1";
        assert_eq!(expander.expand(url).await.unwrap(), url);
        assert_eq!(limiter.get_stats().await.used, 0);
    }

    #[tokio::test]
    async fn test_http_rate_limited_fails_without_request() {
        let expander =
            HttpShortLinkExpander::new(Duration::from_millis(100), Arc::new(RateLimiter::new(0)))
                .unwrap();
        let err = expander.expand("https://m.tb.cn/h.abc").await.unwrap_err();
        assert_eq!(
            err,
            ExpansionError::Failed {
                url: "https://m.tb.cn/h.abc".to_string(),
                reason: "outbound rate limit exceeded".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_cache_hit_skips_inner() {
        let mut inner = MockShortLinkExpander::new();
        inner.expect_expand().times(0);
        let mut cache = MockCacheRepository::new();
        cache
            .expect_get()
            .with(eq("v1:short:https://m.tb.cn/h.1"))
            .returning(|_| Ok(Some("https://item.taobao.com/item.htm?id=1".to_string())));

        let expander = CachedShortLinkExpander::new(Arc::new(inner), Arc::new(cache), 60);
        assert_eq!(
            expander.expand("https://m.tb.cn/h.1").await.unwrap(),
            "https://item.taobao.com/item.htm?id=1"
        );
    }

    #[tokio::test]
    async fn test_cache_miss_stores_expansion() {
        let mut cache = MockCacheRepository::new();
        cache.expect_get().returning(|_| Ok(None));
        cache
            .expect_set()
            .with(
                eq("v1:short:https://m.tb.cn/h.1"),
                eq("https://item.taobao.com/item.htm?id=1"),
                eq(3600u64),
            )
            .times(1)
            .returning(|_, _, _| Ok(()));

        let expander = CachedShortLinkExpander::new(
            Arc::new(StaticShortLinkExpander::new()),
            Arc::new(cache),
            3600,
        );
        expander.expand("https://m.tb.cn/h.1").await.unwrap();
    }

    #[tokio::test]
    async fn test_cache_skipped_for_non_short_hosts() {
        let mut cache = MockCacheRepository::new();
        cache.expect_get().times(0);
        cache.expect_set().times(0);

        let expander = CachedShortLinkExpander::new(
            Arc::new(StaticShortLinkExpander::new()),
            Arc::new(cache),
            3600,
        );
        for url in ["https://item.jd.com/1.html", "not a url"] {
            assert_eq!(expander.expand(url).await.unwrap(), url);
        }
    }

    #[tokio::test]
    async fn test_cache_errors_fall_back_to_inner() {
        let mut cache = MockCacheRepository::new();
        cache
            .expect_get()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("connection refused")));
        cache
            .expect_set()
            .times(1)
            .returning(|_, _, _| Err(anyhow::anyhow!("connection refused")));

        let expander = CachedShortLinkExpander::new(
            Arc::new(StaticShortLinkExpander::new()),
            Arc::new(cache),
            3600,
        );
        assert_eq!(
            expander.expand("https://3.cn/77").await.unwrap(),
            "https://item.m.jd.com/product/77.html"
        );
    }

    #[tokio::test]
    async fn test_cache_does_not_store_identity() {
        let mut inner = MockShortLinkExpander::new();
        inner.expect_expand().returning(|url| Ok(url.to_string()));
        let mut cache = MockCacheRepository::new();
        cache.expect_get().times(1).returning(|_| Ok(None));
        cache.expect_set().times(0);

        let expander = CachedShortLinkExpander::new(Arc::new(inner), Arc::new(cache), 3600);
        assert_eq!(
            expander.expand("https://bit.ly/abc").await.unwrap(),
            "https://bit.ly/abc"
        );
    }

    // ------------------------------------------------------------------------
    // HTTP expander against a local server
    // ------------------------------------------------------------------------

    async fn spawn_server(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn local_expander(timeout: Duration) -> HttpShortLinkExpander {
        HttpShortLinkExpander::new(timeout, Arc::new(RateLimiter::new(60)))
            .unwrap()
            .with_hosts(vec!["127.0.0.1".to_string()])
    }

    #[tokio::test]
    async fn test_http_follows_redirect_to_destination() {
        use axum::response::Redirect;
        use axum::routing::get;

        let app = axum::Router::new()
            .route("/s/abc", get(|| async { Redirect::to("/item.htm?id=5") }))
            .route("/item.htm", get(|| async { "item" }));
        let base = spawn_server(app).await;

        let expander = local_expander(Duration::from_secs(2));
        let destination = expander.expand(&format!("{}/s/abc", base)).await.unwrap();
        assert_eq!(destination, format!("{}/item.htm?id=5", base));
    }

    #[tokio::test]
    async fn test_http_retries_with_get_when_head_is_rejected() {
        use axum::http::{Method, StatusCode as AxumStatus};
        use axum::response::{IntoResponse, Redirect};
        use axum::routing::any;

        let app = axum::Router::new()
            .route(
                "/s/get-only",
                any(|method: Method| async move {
                    if method == Method::HEAD {
                        AxumStatus::METHOD_NOT_ALLOWED.into_response()
                    } else {
                        Redirect::to("/item.htm?id=9").into_response()
                    }
                }),
            )
            .route("/item.htm", any(|| async { "item" }));
        let base = spawn_server(app).await;

        let expander = local_expander(Duration::from_secs(2));
        let destination = expander
            .expand(&format!("{}/s/get-only", base))
            .await
            .unwrap();
        assert_eq!(destination, format!("{}/item.htm?id=9", base));
    }

    #[tokio::test]
    async fn test_http_timeout_is_reported() {
        use axum::routing::any;

        let app = axum::Router::new().route(
            "/s/slow",
            any(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "late"
            }),
        );
        let base = spawn_server(app).await;

        let url = format!("{}/s/slow", base);
        let expander = local_expander(Duration::from_millis(50));
        let err = expander.expand(&url).await.unwrap_err();
        assert_eq!(err, ExpansionError::Timeout { url });
    }
}
