use crate::application::LinkConverter;
use crate::config::ShortLinkMode;
use crate::infrastructure::RateLimiter;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub converter: Arc<LinkConverter>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Prometheus handle; `None` when no recorder was installed (tests)
    pub metrics: Option<PrometheusHandle>,
    pub short_link_mode: ShortLinkMode,
    pub cache_enabled: bool,
}
