//! Agent/proxy link unwrapping.
//!
//! Three tiers are tried in order:
//! 1. bespoke agent rules that embed the item id (and a platform code) directly,
//! 2. generic agent rules carrying a wrapped link or an `id` + platform name,
//! 3. a catch-all for any link with a `url=` parameter.

use crate::application::decoder::decode_layers;
use crate::application::registry::{lookup_code, Capture, PatternRegistry, PatternRule};
use crate::domain::{Agent, ExtractionResult, Platform, PlatformResolution};
use tracing::{debug, warn};

/// What an agent link resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unwrapped {
    /// A wrapped link that still needs to be converted itself.
    EmbeddedUrl { agent: Option<Agent>, url: String },
    /// The agent link named the item directly.
    Item {
        agent: Agent,
        item: ExtractionResult,
        platform_defaulted: bool,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct AgentUnwrapper {
    registry: &'static PatternRegistry,
}

impl Default for AgentUnwrapper {
    fn default() -> Self {
        Self::new(PatternRegistry::global())
    }
}

impl AgentUnwrapper {
    pub fn new(registry: &'static PatternRegistry) -> Self {
        Self { registry }
    }

    /// Resolve an agent link, or `None` when no agent rule applies.
    pub fn unwrap(&self, url: &str) -> Option<Unwrapped> {
        self.apply_tier(url, true)
            .or_else(|| self.apply_tier(url, false))
            .or_else(|| {
                let wrapped = self.registry.catch_all().captures(url)?.name("url")?.as_str();
                debug!("Catch-all url= parameter matched");
                embedded(None, wrapped)
            })
    }

    fn apply_tier(&self, url: &str, bespoke: bool) -> Option<Unwrapped> {
        self.registry.agents().iter().find_map(|(agent, rules)| {
            rules
                .iter()
                .filter(|rule| rule.capture.is_bespoke() == bespoke)
                .find_map(|rule| apply_rule(*agent, rule, url))
        })
    }
}

fn apply_rule(agent: Agent, rule: &PatternRule, url: &str) -> Option<Unwrapped> {
    let caps = rule.captures(url)?;
    let item = |platform: PlatformResolution| {
        let id = caps.name("id")?.as_str();
        if id.is_empty() {
            return None;
        }
        debug!("{} rule matched item {} on {}", agent, id, platform.platform);
        Some(Unwrapped::Item {
            agent,
            item: ExtractionResult::new(id, platform.platform),
            platform_defaulted: platform.defaulted,
        })
    };

    match rule.capture {
        Capture::Id(platform) => item(PlatformResolution {
            platform,
            defaulted: false,
        }),
        Capture::IdWithCode(table) => {
            let token = caps.name("platform")?.as_str();
            let resolution = match lookup_code(table, token) {
                Some(platform) => PlatformResolution {
                    platform,
                    defaulted: false,
                },
                None => {
                    warn!("{} uses unknown platform code '{}', defaulting to TAOBAO", agent, token);
                    metrics::counter!("platform_fallback_total").increment(1);
                    PlatformResolution {
                        platform: Platform::Taobao,
                        defaulted: true,
                    }
                }
            };
            item(resolution)
        }
        Capture::IdWithPlatformName => {
            let token = caps.name("platform")?.as_str();
            item(Platform::resolve(token))
        }
        Capture::EmbeddedUrl => embedded(Some(agent), caps.name("url")?.as_str()),
    }
}

fn embedded(agent: Option<Agent>, fragment: &str) -> Option<Unwrapped> {
    let url = decode_layers(fragment);
    if url.is_empty() {
        return None;
    }
    Some(Unwrapped::EmbeddedUrl { agent, url })
}
