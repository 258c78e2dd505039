//! Link conversion domain model.
//!
//! Marketplaces, agent sites, and the values and errors that flow through the
//! conversion engine. Everything here is created per call and never mutated.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::warn;
use utoipa::ToSchema;

// ============================================================================
// Marketplaces
// ============================================================================

/// A marketplace the engine can parse natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Platform {
    #[serde(rename = "TAOBAO")]
    Taobao,
    #[serde(rename = "WEIDIAN")]
    Weidian,
    #[serde(rename = "1688")]
    OneSixEightEight,
    #[serde(rename = "JD")]
    Jd,
    #[serde(rename = "XIANYU")]
    Xianyu,
}

/// Outcome of normalizing a platform token.
///
/// `defaulted` is set when the token was not recognized and the platform is
/// the documented Taobao fallback rather than a real match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlatformResolution {
    pub platform: Platform,
    pub defaulted: bool,
}

impl Platform {
    /// Extraction order: earlier platforms win when several could match.
    pub const ALL: [Platform; 5] = [
        Platform::Taobao,
        Platform::Weidian,
        Platform::OneSixEightEight,
        Platform::Jd,
        Platform::Xianyu,
    ];

    /// Short internal code (`TB`, `WD`, ...).
    pub fn code(&self) -> &'static str {
        match self {
            Platform::Taobao => "TB",
            Platform::Weidian => "WD",
            Platform::OneSixEightEight => "1688",
            Platform::Jd => "JD",
            Platform::Xianyu => "XY",
        }
    }

    /// Long display name, as used in agent query strings.
    pub fn long_name(&self) -> &'static str {
        match self {
            Platform::Taobao => "TAOBAO",
            Platform::Weidian => "WEIDIAN",
            Platform::OneSixEightEight => "1688",
            Platform::Jd => "JD",
            Platform::Xianyu => "XIANYU",
        }
    }

    /// Strict lookup by short code or long name, ignoring ASCII case.
    ///
    /// ```
    /// use agentlink_gateway::domain::Platform;
    ///
    /// assert_eq!(Platform::from_token("wd"), Some(Platform::Weidian));
    /// assert_eq!(Platform::from_token("Xianyu"), Some(Platform::Xianyu));
    /// assert_eq!(Platform::from_token("amazon"), None);
    /// ```
    pub fn from_token(token: &str) -> Option<Platform> {
        let token = token.trim();
        Self::ALL.into_iter().find(|p| {
            p.code().eq_ignore_ascii_case(token) || p.long_name().eq_ignore_ascii_case(token)
        })
    }

    /// Normalize a token, falling back to Taobao for anything unrecognized.
    ///
    /// The fallback is logged and counted in `platform_fallback_total` so
    /// taxonomy gaps stay visible.
    pub fn resolve(token: &str) -> PlatformResolution {
        match Self::from_token(token) {
            Some(platform) => PlatformResolution {
                platform,
                defaulted: false,
            },
            None => {
                warn!("Unrecognized platform token '{}', defaulting to TAOBAO", token);
                metrics::counter!("platform_fallback_total").increment(1);
                PlatformResolution {
                    platform: Platform::Taobao,
                    defaulted: true,
                }
            }
        }
    }

    /// Total normalization: never fails, unknown tokens yield `Taobao`.
    pub fn normalize(token: &str) -> Platform {
        Self::resolve(token).platform
    }

    /// Hosts (and their subdomains) that belong to this marketplace.
    pub fn hosts(&self) -> &'static [&'static str] {
        match self {
            Platform::Taobao => &["taobao.com", "tmall.com", "tb.cn"],
            Platform::Weidian => &["weidian.com", "youshop10.com"],
            Platform::OneSixEightEight => &["1688.com"],
            Platform::Jd => &["jd.com", "3.cn"],
            Platform::Xianyu => &["goofish.com", "2.taobao.com", "market.m.taobao.com"],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.long_name())
    }
}

// ============================================================================
// Agent / proxy sites
// ============================================================================

/// A shopping-agent or forwarding site whose links wrap a marketplace item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Agent {
    Pandabuy,
    Wegobuy,
    Superbuy,
    Sugargoo,
    Cssbuy,
    Hagobuy,
    Kakobuy,
    Cnfans,
    Mulebuy,
    Allchinabuy,
    Joyabuy,
    Hoobuy,
    Basetao,
    Oopbuy,
    Lovegobuy,
    Orientdig,
    Acbuy,
    Itaobuy,
    Hubbuycn,
    Litbuy,
    Loongbuy,
    Sifubuy,
    Eastmallbuy,
    Ezbuycn,
    Blikbuy,
    Usfans,
    Fishgoo,
}

impl Agent {
    pub const ALL: [Agent; 27] = [
        Agent::Pandabuy,
        Agent::Wegobuy,
        Agent::Superbuy,
        Agent::Sugargoo,
        Agent::Cssbuy,
        Agent::Hagobuy,
        Agent::Kakobuy,
        Agent::Cnfans,
        Agent::Mulebuy,
        Agent::Allchinabuy,
        Agent::Joyabuy,
        Agent::Hoobuy,
        Agent::Basetao,
        Agent::Oopbuy,
        Agent::Lovegobuy,
        Agent::Orientdig,
        Agent::Acbuy,
        Agent::Itaobuy,
        Agent::Hubbuycn,
        Agent::Litbuy,
        Agent::Loongbuy,
        Agent::Sifubuy,
        Agent::Eastmallbuy,
        Agent::Ezbuycn,
        Agent::Blikbuy,
        Agent::Usfans,
        Agent::Fishgoo,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Agent::Pandabuy => "Pandabuy",
            Agent::Wegobuy => "Wegobuy",
            Agent::Superbuy => "Superbuy",
            Agent::Sugargoo => "Sugargoo",
            Agent::Cssbuy => "CSSBuy",
            Agent::Hagobuy => "Hagobuy",
            Agent::Kakobuy => "Kakobuy",
            Agent::Cnfans => "CNFans",
            Agent::Mulebuy => "Mulebuy",
            Agent::Allchinabuy => "AllChinaBuy",
            Agent::Joyabuy => "Joyabuy",
            Agent::Hoobuy => "Hoobuy",
            Agent::Basetao => "Basetao",
            Agent::Oopbuy => "Oopbuy",
            Agent::Lovegobuy => "Lovegobuy",
            Agent::Orientdig => "Orientdig",
            Agent::Acbuy => "ACBuy",
            Agent::Itaobuy => "Itaobuy",
            Agent::Hubbuycn => "Hubbuycn",
            Agent::Litbuy => "Litbuy",
            Agent::Loongbuy => "Loongbuy",
            Agent::Sifubuy => "Sifubuy",
            Agent::Eastmallbuy => "Eastmallbuy",
            Agent::Ezbuycn => "Ezbuycn",
            Agent::Blikbuy => "Blikbuy",
            Agent::Usfans => "USFans",
            Agent::Fishgoo => "Fishgoo",
        }
    }

    /// Registrable domain of the agent site.
    pub fn host(&self) -> &'static str {
        match self {
            Agent::Pandabuy => "pandabuy.com",
            Agent::Wegobuy => "wegobuy.com",
            Agent::Superbuy => "superbuy.com",
            Agent::Sugargoo => "sugargoo.com",
            Agent::Cssbuy => "cssbuy.com",
            Agent::Hagobuy => "hagobuy.com",
            Agent::Kakobuy => "kakobuy.com",
            Agent::Cnfans => "cnfans.com",
            Agent::Mulebuy => "mulebuy.com",
            Agent::Allchinabuy => "allchinabuy.com",
            Agent::Joyabuy => "joyabuy.com",
            Agent::Hoobuy => "hoobuy.com",
            Agent::Basetao => "basetao.com",
            Agent::Oopbuy => "oopbuy.com",
            Agent::Lovegobuy => "lovegobuy.com",
            Agent::Orientdig => "orientdig.com",
            Agent::Acbuy => "acbuy.com",
            Agent::Itaobuy => "itaobuy.com",
            Agent::Hubbuycn => "hubbuycn.com",
            Agent::Litbuy => "litbuy.com",
            Agent::Loongbuy => "loongbuy.com",
            Agent::Sifubuy => "sifubuy.com",
            Agent::Eastmallbuy => "eastmallbuy.com",
            Agent::Ezbuycn => "ezbuycn.com",
            Agent::Blikbuy => "blikbuy.com",
            Agent::Usfans => "usfans.com",
            Agent::Fishgoo => "fishgoo.com",
        }
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Source detection
// ============================================================================

/// Which marketplace or agent a raw link appears to come from, independent of
/// whether an item id can be extracted from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum DetectedSource {
    Marketplace(Platform),
    Agent(Agent),
}

impl DetectedSource {
    /// Classify a link by its host.
    ///
    /// Strings that do not parse as URLs (even with an `https://` prefix) are
    /// scanned for known domains instead.
    pub fn detect(raw: &str) -> Option<DetectedSource> {
        match host_of(raw) {
            Some(host) => Self::from_host(&host),
            None => Self::scan(&raw.to_ascii_lowercase()),
        }
    }

    fn from_host(host: &str) -> Option<DetectedSource> {
        if let Some(agent) = Agent::ALL.into_iter().find(|a| host_matches(host, a.host())) {
            return Some(DetectedSource::Agent(agent));
        }
        // Xianyu lives on Taobao subdomains, so it is checked first.
        let marketplaces = [
            Platform::Xianyu,
            Platform::Taobao,
            Platform::Weidian,
            Platform::OneSixEightEight,
            Platform::Jd,
        ];
        marketplaces
            .into_iter()
            .find(|p| p.hosts().iter().any(|h| host_matches(host, h)))
            .map(DetectedSource::Marketplace)
    }

    fn scan(lowered: &str) -> Option<DetectedSource> {
        if let Some(agent) = Agent::ALL.into_iter().find(|a| lowered.contains(a.host())) {
            return Some(DetectedSource::Agent(agent));
        }
        Platform::ALL
            .into_iter()
            .find(|p| p.hosts().iter().any(|h| h.contains('.') && lowered.contains(h)))
            .map(DetectedSource::Marketplace)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DetectedSource::Marketplace(p) => p.long_name(),
            DetectedSource::Agent(a) => a.name(),
        }
    }
}

impl fmt::Display for DetectedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<DetectedSource> for String {
    fn from(source: DetectedSource) -> Self {
        source.name().to_string()
    }
}

/// Lowercased host of a link, tolerating a missing scheme.
pub fn host_of(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw)
        .ok()
        .filter(|u| u.host_str().is_some())
        .or_else(|| url::Url::parse(&format!("https://{}", raw.trim_start_matches('/'))).ok())?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    if host.contains('.') {
        Some(host)
    } else {
        None
    }
}

/// Whether `host` is `domain` itself or one of its subdomains.
pub fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

// ============================================================================
// Results and errors
// ============================================================================

/// An item id captured from a link, with the marketplace it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub id: String,
    pub platform: Platform,
}

impl ExtractionResult {
    pub fn new(id: impl Into<String>, platform: Platform) -> Self {
        Self {
            id: id.into(),
            platform,
        }
    }
}

/// A successful conversion.
///
/// `original_url` is the canonical marketplace link rebuilt from the id, not
/// an echo of the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    /// Canonical marketplace link
    #[schema(example = "https://item.taobao.com/item.htm?id=123456789012")]
    pub original_url: String,
    /// Affiliate-tagged agent link
    #[schema(example = "https://www.cnfans.com/product?id=123456789012&platform=TAOBAO&ref=AGL8K2")]
    pub target_url: String,
    /// Marketplace item id
    pub item_id: String,
    /// Marketplace the item belongs to
    pub platform: Platform,
    /// Set when the platform came from the Taobao fallback for an unknown token
    pub platform_defaulted: bool,
}

/// Why a link could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionError {
    /// The host was recognized but none of its rules matched this shape.
    #[error("unsupported link shape for {detected}")]
    UnsupportedLinkShape { detected: DetectedSource },

    #[error("unrecognized link")]
    UnrecognizedLink,

    /// A raw encoded fragment decoded to something that is not a link.
    #[error("malformed encoding: decoded value is not a link")]
    MalformedEncoding,

    #[error("short link expansion timed out for {url}")]
    ExpansionTimeout { url: String },

    #[error("short link expansion failed for {url}: {reason}")]
    ExpansionFailed { url: String, reason: String },

    /// Wrapped links nested deeper than the configured bound.
    #[error("link unwrapping exceeded maximum depth of {depth}")]
    UnwrapDepthExceeded { depth: usize },
}

impl ConversionError {
    /// Stable machine-readable kind, also used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            ConversionError::UnsupportedLinkShape { .. } => "unsupported_link_shape",
            ConversionError::UnrecognizedLink => "unrecognized_link",
            ConversionError::MalformedEncoding => "malformed_encoding",
            ConversionError::ExpansionTimeout { .. } => "expansion_timeout",
            ConversionError::ExpansionFailed { .. } => "expansion_failed",
            ConversionError::UnwrapDepthExceeded { .. } => "unwrap_depth_exceeded",
        }
    }

    /// The marketplace or agent detected before extraction failed, if any.
    pub fn detected(&self) -> Option<DetectedSource> {
        match self {
            ConversionError::UnsupportedLinkShape { detected } => Some(*detected),
            _ => None,
        }
    }
}

/// Failure at the short-link expansion boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpansionError {
    #[error("expansion of {url} timed out")]
    Timeout { url: String },
    #[error("expansion of {url} failed: {reason}")]
    Failed { url: String, reason: String },
}

impl From<ExpansionError> for ConversionError {
    fn from(err: ExpansionError) -> Self {
        match err {
            ExpansionError::Timeout { url } => ConversionError::ExpansionTimeout { url },
            ExpansionError::Failed { url, reason } => ConversionError::ExpansionFailed { url, reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_and_name_round_trip() {
        for platform in Platform::ALL {
            assert_eq!(Platform::from_token(platform.code()), Some(platform));
            assert_eq!(Platform::from_token(platform.long_name()), Some(platform));
        }
    }

    #[test]
    fn test_normalize_is_case_insensitive() {
        assert_eq!(Platform::normalize("taobao"), Platform::Taobao);
        assert_eq!(Platform::normalize("Weidian"), Platform::Weidian);
        assert_eq!(Platform::normalize("xy"), Platform::Xianyu);
        assert_eq!(Platform::normalize(" jd "), Platform::Jd);
    }

    #[test]
    fn test_normalize_unknown_defaults_to_taobao() {
        for token in ["", "amazon", "ALI_1688", "??", "999"] {
            let resolution = Platform::resolve(token);
            assert_eq!(resolution.platform, Platform::Taobao);
            assert!(resolution.defaulted, "token {:?} should be flagged", token);
        }
        assert!(!Platform::resolve("TB").defaulted);
    }

    #[test]
    fn test_detect_marketplace_hosts() {
        assert_eq!(
            DetectedSource::detect("https://item.taobao.com/item.htm?id=1"),
            Some(DetectedSource::Marketplace(Platform::Taobao))
        );
        assert_eq!(
            DetectedSource::detect("https://2.taobao.com/item.htm?id=1"),
            Some(DetectedSource::Marketplace(Platform::Xianyu))
        );
        assert_eq!(
            DetectedSource::detect("detail.1688.com/offer/1.html"),
            Some(DetectedSource::Marketplace(Platform::OneSixEightEight))
        );
    }

    #[test]
    fn test_detect_agent_before_wrapped_marketplace() {
        let link = "https://www.pandabuy.com/product?url=https://item.taobao.com/item.htm?id=1";
        assert_eq!(
            DetectedSource::detect(link),
            Some(DetectedSource::Agent(Agent::Pandabuy))
        );
    }

    #[test]
    fn test_detect_rejects_lookalike_hosts() {
        assert_eq!(DetectedSource::detect("https://notjd.com/item"), None);
        assert_eq!(DetectedSource::detect("not a url at all"), None);
    }

    #[test]
    fn test_error_kind_and_detected() {
        let err = ConversionError::UnsupportedLinkShape {
            detected: DetectedSource::Agent(Agent::Hoobuy),
        };
        assert_eq!(err.kind(), "unsupported_link_shape");
        assert_eq!(err.to_string(), "unsupported link shape for Hoobuy");
        assert_eq!(err.detected(), Some(DetectedSource::Agent(Agent::Hoobuy)));
        assert_eq!(ConversionError::UnrecognizedLink.detected(), None);
    }

    #[test]
    fn test_error_serializes_with_kind_tag() {
        let err = ConversionError::UnsupportedLinkShape {
            detected: DetectedSource::Marketplace(Platform::Jd),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "unsupported_link_shape");
        assert_eq!(json["detected"], "JD");
    }
}
