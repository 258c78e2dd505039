//! Domain layer - Core link conversion types and boundary traits.
//!
//! This module defines the domain model for the link conversion gateway,
//! following clean architecture principles. It contains:
//! - Closed enumerations for marketplaces and agent sites
//! - Value objects produced by the conversion engine
//! - Typed conversion errors
//! - Traits for the pluggable boundaries (short-link expansion, caching)

pub mod link_models;
pub use link_models::*;

use async_trait::async_trait;

/// Boundary for resolving short links to their destination.
///
/// Implementations must return the input unchanged when it is not on a
/// recognized short-link domain. Failures are reported as
/// [`ExpansionError`] and the caller decides how to degrade.
///
/// # Implementations
///
/// See `infrastructure::short_link` for the canned-table, HTTP, and caching
/// implementations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShortLinkExpander: Send + Sync {
    /// Expand `url` if it is a known short link.
    ///
    /// # Errors
    ///
    /// - `ExpansionError::Timeout` if the destination could not be reached in time
    /// - `ExpansionError::Failed` for any other transport or policy failure
    async fn expand(&self, url: &str) -> Result<String, ExpansionError>;
}

/// Repository trait for caching operations.
///
/// Used to remember short-link destinations so repeated conversions of the
/// same short link do not hit the network.
///
/// # Implementations
///
/// See `infrastructure::redis::RedisRepository` for the Redis implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheRepository: Send + Sync {
    /// Retrieve a cached value by key.
    ///
    /// Returns `Ok(None)` on a miss; never errors on a miss.
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Store a value in the cache with a TTL.
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> anyhow::Result<()>;
}
