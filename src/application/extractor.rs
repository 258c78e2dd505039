//! Item id extraction from direct marketplace links.

use crate::application::registry::{Capture, PatternRegistry};
use crate::domain::ExtractionResult;

/// Applies the marketplace rules to a link that is not an agent wrapper.
#[derive(Debug, Clone, Copy)]
pub struct IdentifierExtractor {
    registry: &'static PatternRegistry,
}

impl Default for IdentifierExtractor {
    fn default() -> Self {
        Self::new(PatternRegistry::global())
    }
}

impl IdentifierExtractor {
    pub fn new(registry: &'static PatternRegistry) -> Self {
        Self { registry }
    }

    /// First match across platforms in extraction order, then rule order.
    ///
    /// Returns `None` when nothing matches so the caller can try other
    /// strategies.
    pub fn extract(&self, url: &str) -> Option<ExtractionResult> {
        self.registry
            .marketplaces()
            .iter()
            .flat_map(|(_, rules)| rules.iter())
            .find_map(|rule| {
                let caps = rule.captures(url)?;
                let id = caps.name("id")?.as_str();
                match rule.capture {
                    Capture::Id(platform) if !id.is_empty() => {
                        Some(ExtractionResult::new(id, platform))
                    }
                    _ => None,
                }
            })
    }
}
