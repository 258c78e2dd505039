//! Link conversion orchestration.
//!
//! Ties the engine together: short-link expansion, agent unwrapping with a
//! bounded number of nested follows, direct id extraction, and composition.
//!
//! Nesting is handled iteratively: every wrapped link that has to be
//! converted in turn costs one level, and the loop stops with
//! `UnwrapDepthExceeded` once the bound is passed.

use crate::application::composer::LinkComposer;
use crate::application::decoder::{decode_layers, looks_like_url};
use crate::application::extractor::IdentifierExtractor;
use crate::application::unwrapper::{AgentUnwrapper, Unwrapped};
use crate::domain::{
    ConversionError, ConversionResult, DetectedSource, ExpansionError, ExtractionResult, Platform,
    ShortLinkExpander,
};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Default bound on nested wrapped links.
pub const MAX_UNWRAP_DEPTH: usize = 5;

/// Maximum number of conversions running at once in [`LinkConverter::convert_many`].
const BATCH_CONCURRENCY: usize = 8;

/// Converts free-form links into canonical and affiliate links.
pub struct LinkConverter {
    expander: Arc<dyn ShortLinkExpander>,
    unwrapper: AgentUnwrapper,
    extractor: IdentifierExtractor,
    composer: LinkComposer,
    max_depth: usize,
}

/// Next action after examining one link in the chain.
enum Step {
    Resolved(ExtractionResult, bool),
    Follow(String),
}

/// Facts gathered along the chain that shape the final error.
#[derive(Default)]
struct Trail {
    expansion_error: Option<ExpansionError>,
    decoded_fragment: bool,
}

impl LinkConverter {
    pub fn new(expander: Arc<dyn ShortLinkExpander>, composer: LinkComposer) -> Self {
        Self {
            expander,
            unwrapper: AgentUnwrapper::default(),
            extractor: IdentifierExtractor::default(),
            composer,
            max_depth: MAX_UNWRAP_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn composer(&self) -> &LinkComposer {
        &self.composer
    }

    /// Convert one input string.
    ///
    /// Whitespace anywhere in the input is ignored.
    #[instrument(skip(self), fields(input_len = input.len()))]
    pub async fn convert(&self, input: &str) -> Result<ConversionResult, ConversionError> {
        let result = self.run(input).await;
        match &result {
            Ok(converted) => {
                debug!("Converted to {} item {}", converted.platform, converted.item_id);
                metrics::counter!("conversions_total", "outcome" => "ok").increment(1);
            }
            Err(e) => {
                debug!("Conversion failed: {}", e);
                metrics::counter!("conversions_total", "outcome" => e.kind()).increment(1);
            }
        }
        result
    }

    /// Convert several inputs with bounded concurrency, keeping input order.
    pub async fn convert_many(
        &self,
        inputs: Vec<String>,
    ) -> Vec<Result<ConversionResult, ConversionError>> {
        futures::stream::iter(inputs)
            .map(|input| async move { self.convert(&input).await })
            .buffered(BATCH_CONCURRENCY)
            .collect()
            .await
    }

    async fn run(&self, input: &str) -> Result<ConversionResult, ConversionError> {
        let mut current: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        let mut trail = Trail::default();
        let mut depth = 0;

        loop {
            match self.step(&current, &mut trail).await? {
                Step::Resolved(item, defaulted) => {
                    return Ok(self.composer.compose(&item, defaulted));
                }
                Step::Follow(next) => {
                    depth += 1;
                    if depth > self.max_depth {
                        warn!("Wrapped link nesting exceeded {} levels", self.max_depth);
                        return Err(ConversionError::UnwrapDepthExceeded {
                            depth: self.max_depth,
                        });
                    }
                    debug!(depth, "Following wrapped link");
                    current = next;
                }
            }
        }
    }

    async fn step(&self, input: &str, trail: &mut Trail) -> Result<Step, ConversionError> {
        if is_bare_id(input) {
            return Ok(Step::Resolved(
                ExtractionResult::new(input, Platform::Taobao),
                false,
            ));
        }

        // A raw encoded fragment rather than a full link.
        let mut current = input.to_string();
        if current.contains('%') && !current.contains("//") {
            let decoded = decode_layers(&current);
            if looks_like_url(&decoded) {
                return Ok(Step::Follow(decoded));
            }
            if decoded != current {
                trail.decoded_fragment = true;
                current = decoded;
            }
        }

        let expanded = match self.expander.expand(&current).await {
            Ok(expanded) => {
                if expanded != current {
                    debug!("Short link expanded to {}", expanded);
                }
                expanded
            }
            Err(e) => {
                warn!("Short link expansion failed, continuing unexpanded: {}", e);
                trail.expansion_error = Some(e);
                current.clone()
            }
        };

        match self.unwrapper.unwrap(&expanded) {
            Some(Unwrapped::EmbeddedUrl { agent, url }) => {
                debug!(agent = ?agent, "Agent link wraps {}", url);
                return Ok(Step::Follow(url));
            }
            Some(Unwrapped::Item {
                agent,
                item,
                platform_defaulted,
            }) => {
                debug!("{} link names item {} directly", agent, item.id);
                return Ok(Step::Resolved(item, platform_defaulted));
            }
            None => {}
        }

        if let Some(item) = self.extractor.extract(&expanded) {
            return Ok(Step::Resolved(item, false));
        }

        Err(failure(&expanded, trail))
    }
}

/// Pick the most informative error for a link nothing could resolve.
///
/// A failed expansion explains any later failure, so it takes precedence.
fn failure(link: &str, trail: &mut Trail) -> ConversionError {
    if let Some(e) = trail.expansion_error.take() {
        return e.into();
    }
    if let Some(detected) = DetectedSource::detect(link) {
        return ConversionError::UnsupportedLinkShape { detected };
    }
    if trail.decoded_fragment {
        return ConversionError::MalformedEncoding;
    }
    ConversionError::UnrecognizedLink
}

fn is_bare_id(input: &str) -> bool {
    !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit())
}
