pub mod rate_limiter;
pub mod redis;
pub mod short_link;

pub use rate_limiter::{RateLimitStats, RateLimiter};
pub use redis::RedisRepository;
pub use short_link::{
    CachedShortLinkExpander, HttpShortLinkExpander, StaticShortLinkExpander, SHORT_LINK_HOSTS,
};
