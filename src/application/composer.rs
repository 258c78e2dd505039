//! Canonical and affiliate link composition.

use crate::domain::{ConversionResult, ExtractionResult, Platform};

/// Referral code appended to every target link unless configured otherwise.
pub const DEFAULT_AFFILIATE_CODE: &str = "AGL8K2";

/// Base of the output dialect.
pub const TARGET_BASE_URL: &str = "https://www.cnfans.com/product";

/// Builds the canonical marketplace link and the affiliate-tagged target link.
#[derive(Debug, Clone)]
pub struct LinkComposer {
    affiliate_code: String,
}

impl Default for LinkComposer {
    fn default() -> Self {
        Self::new(DEFAULT_AFFILIATE_CODE)
    }
}

impl LinkComposer {
    pub fn new(affiliate_code: impl Into<String>) -> Self {
        Self {
            affiliate_code: affiliate_code.into(),
        }
    }

    pub fn affiliate_code(&self) -> &str {
        &self.affiliate_code
    }

    /// Canonical marketplace link; one fixed template per platform.
    pub fn original_url(id: &str, platform: Platform) -> String {
        match platform {
            Platform::Taobao => format!("https://item.taobao.com/item.htm?id={}", id),
            Platform::Weidian => format!("https://weidian.com/item.html?itemID={}", id),
            Platform::OneSixEightEight => format!("https://detail.1688.com/offer/{}.html", id),
            Platform::Jd => format!("https://item.jd.com/{}.html", id),
            Platform::Xianyu => format!("https://www.goofish.com/item?id={}", id),
        }
    }

    /// Template string shown in the platform catalogue.
    pub fn original_template(platform: Platform) -> String {
        Self::original_url("{id}", platform)
    }

    pub fn target_url(&self, id: &str, platform: Platform) -> String {
        format!(
            "{}?id={}&platform={}&ref={}",
            TARGET_BASE_URL,
            id,
            platform.long_name(),
            self.affiliate_code
        )
    }

    pub fn compose(&self, item: &ExtractionResult, platform_defaulted: bool) -> ConversionResult {
        ConversionResult {
            original_url: Self::original_url(&item.id, item.platform),
            target_url: self.target_url(&item.id, item.platform),
            item_id: item.id.clone(),
            platform: item.platform,
            platform_defaulted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::extractor::IdentifierExtractor;

    #[test]
    fn test_round_trip_through_extractor() {
        let extractor = IdentifierExtractor::default();
        for platform in Platform::ALL {
            let original = LinkComposer::original_url("123456789012", platform);
            assert_eq!(
                extractor.extract(&original),
                Some(ExtractionResult::new("123456789012", platform)),
                "{}",
                original
            );
        }
    }

    #[test]
    fn test_target_url_carries_long_name_and_code() {
        let composer = LinkComposer::new("REF1");
        assert_eq!(
            composer.target_url("55", Platform::OneSixEightEight),
            "https://www.cnfans.com/product?id=55&platform=1688&ref=REF1"
        );
    }

    #[test]
    fn test_compose() {
        let result = LinkComposer::default()
            .compose(&ExtractionResult::new("9", Platform::Xianyu), false);
        assert_eq!(result.original_url, "https://www.goofish.com/item?id=9");
        assert!(result.target_url.ends_with("platform=XIANYU&ref=AGL8K2"));
        assert_eq!(result.item_id, "9");
        assert!(!result.platform_defaulted);
    }
}
