//! End-to-end conversion behaviour of the engine, using the static
//! short-link table so no network is touched.
//!
//! Run with: `cargo test --test conversion_test`

use agentlink_gateway::application::decoder::decode_layers;
use agentlink_gateway::application::{IdentifierExtractor, LinkComposer, LinkConverter};
use agentlink_gateway::domain::{
    Agent, ConversionError, DetectedSource, ExtractionResult, Platform,
};
use agentlink_gateway::infrastructure::StaticShortLinkExpander;
use std::sync::Arc;

const ID: &str = "123456789012";

fn converter() -> LinkConverter {
    LinkConverter::new(
        Arc::new(StaticShortLinkExpander::new()),
        LinkComposer::default(),
    )
}

fn encode(link: &str) -> String {
    urlencoding::encode(link).into_owned()
}

#[test]
fn test_decoding_is_idempotent_within_two_layers() {
    let samples = [
        "plain text",
        "https%3A%2F%2Fitem.jd.com%2F1.html",
        "https%253A%252F%252Fitem.jd.com%252F1.html",
        "100%",
        "bad%zzescape",
    ];
    for sample in samples {
        let once = decode_layers(sample);
        assert_eq!(decode_layers(&once), once, "{}", sample);
    }
}

#[test]
fn test_round_trip_for_every_platform() {
    let extractor = IdentifierExtractor::default();
    let composer = LinkComposer::default();
    for platform in Platform::ALL {
        let result = composer.compose(&ExtractionResult::new(ID, platform), false);
        assert_eq!(
            extractor.extract(&result.original_url),
            Some(ExtractionResult::new(ID, platform)),
            "{}",
            result.original_url
        );
    }
}

#[tokio::test]
async fn test_bare_numeric_id() {
    let result = converter().convert(ID).await.unwrap();
    assert_eq!(result.platform, Platform::Taobao);
    assert!(result.original_url.ends_with(&format!("id={}", ID)));
}

#[tokio::test]
async fn test_agent_pass_through_matches_direct_conversion() {
    let converter = converter();
    let marketplace_links = [
        format!("https://item.taobao.com/item.htm?id={}", ID),
        format!("https://weidian.com/item.html?itemID={}", ID),
        format!("https://detail.1688.com/offer/{}.html", ID),
        format!("https://item.jd.com/{}.html", ID),
        format!("https://www.goofish.com/item?id={}", ID),
    ];
    let agents = [
        "https://www.pandabuy.com/product?url=",
        "https://www.wegobuy.com/en/page/buy?from=search-input&url=",
        "https://www.sugargoo.com/index/item/index?productlink=",
        "https://www.kakobuy.com/item/details?url=",
        "https://www.hubbuycn.com/product/item?url=",
    ];

    for link in &marketplace_links {
        let direct = converter.convert(link).await.unwrap();
        for agent in agents {
            let wrapped = format!("{}{}", agent, encode(link));
            assert_eq!(converter.convert(&wrapped).await.unwrap(), direct, "{}", wrapped);
        }
    }
}

#[tokio::test]
async fn test_double_wrapped_agent_link() {
    let inner = format!("https://item.taobao.com/item.htm?id={}", ID);
    let pandabuy = format!("https://www.pandabuy.com/product?url={}", encode(&inner));
    let superbuy = format!(
        "https://www.superbuy.com/en/page/buy?url={}",
        encode(&pandabuy)
    );

    let result = converter().convert(&superbuy).await.unwrap();
    assert_eq!(result.item_id, ID);
    assert_eq!(result.platform, Platform::Taobao);
}

#[tokio::test]
async fn test_nesting_beyond_bound_is_rejected() {
    let mut link = format!("https://item.jd.com/{}.html", ID);
    for _ in 0..3 {
        link = format!("https://www.kakobuy.com/item/details?url={}", encode(&link));
    }
    let converter = LinkConverter::new(
        Arc::new(StaticShortLinkExpander::new()),
        LinkComposer::default(),
    )
    .with_max_depth(1);

    let err = converter.convert(&link).await.unwrap_err();
    assert_eq!(err, ConversionError::UnwrapDepthExceeded { depth: 1 });
}

#[tokio::test]
async fn test_not_a_url_is_unrecognized() {
    let err = converter().convert("not a url at all").await.unwrap_err();
    assert_eq!(err, ConversionError::UnrecognizedLink);
}

#[tokio::test]
async fn test_known_domain_with_unknown_shape() {
    let converter = converter();

    let err = converter
        .convert("https://www.sugargoo.com/index/item/index?id=1")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ConversionError::UnsupportedLinkShape {
            detected: DetectedSource::Agent(Agent::Sugargoo)
        }
    );

    let err = converter
        .convert("https://weidian.com/shop/12345")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ConversionError::UnsupportedLinkShape {
            detected: DetectedSource::Marketplace(Platform::Weidian)
        }
    );
}

#[test]
fn test_normalizer_is_total() {
    let tokens = ["", " ", "TB", "tb", "Taobao", "1688", "xy", "\u{1F600}", "%%%", "amazon"];
    for token in tokens {
        let _ = Platform::normalize(token);
    }
    assert_eq!(Platform::normalize("amazon"), Platform::Taobao);
    assert_eq!(Platform::normalize(""), Platform::Taobao);
    assert_eq!(Platform::normalize(" jd "), Platform::Jd);
    assert!(Platform::resolve("amazon").defaulted);
}

#[tokio::test]
async fn test_bespoke_agent_shapes() {
    let converter = converter();
    let cases = [
        ("https://www.cssbuy.com/item-micro-7788.html", "7788", Platform::Weidian),
        ("https://www.cssbuy.com/item-7788.html", "7788", Platform::Taobao),
        ("https://hoobuy.com/product/0/556677", "556677", Platform::OneSixEightEight),
        ("https://www.basetao.com/best-taobao-agent-service/agent/weidian/4455.html", "4455", Platform::Weidian),
        ("https://www.acbuy.com/product?id=99&source=AL", "99", Platform::OneSixEightEight),
        ("https://www.usfans.com/product/2/3210", "3210", Platform::Taobao),
        ("https://www.sifubuy.com/detail?id=654&type=3", "654", Platform::Weidian),
        ("https://www.mulebuy.com/product/?shop_type=jd&id=1001", "1001", Platform::Jd),
        ("https://www.litbuy.com/products/details?id=42&channel=xianyu", "42", Platform::Xianyu),
    ];

    for (link, id, platform) in cases {
        let result = converter.convert(link).await.unwrap();
        assert_eq!(result.item_id, id, "{}", link);
        assert_eq!(result.platform, platform, "{}", link);
        assert!(!result.platform_defaulted, "{}", link);
    }
}

#[tokio::test]
async fn test_unknown_agent_platform_name_is_flagged() {
    let result = converter()
        .convert("https://cnfans.com/product?id=55&platform=AMAZON")
        .await
        .unwrap();
    assert_eq!(result.platform, Platform::Taobao);
    assert!(result.platform_defaulted);
}

#[tokio::test]
async fn test_target_link_converts_to_itself() {
    let converter = converter();
    for platform in Platform::ALL {
        let first = converter
            .convert(&LinkComposer::original_url(ID, platform))
            .await
            .unwrap();
        let again = converter.convert(&first.target_url).await.unwrap();
        assert_eq!(again, first, "{}", first.target_url);
    }
}

#[tokio::test]
async fn test_static_short_links() {
    let converter = converter();

    let result = converter.convert("https://m.tb.cn/h.998877").await.unwrap();
    assert_eq!(result.platform, Platform::Taobao);
    assert_eq!(result.item_id, "998877");

    let result = converter
        .convert("https://pandabuy.page.link/4433")
        .await
        .unwrap();
    assert_eq!(result.platform, Platform::Taobao);
    assert_eq!(result.item_id, "4433");
}

#[tokio::test]
async fn test_affiliate_code_is_configurable() {
    let converter = LinkConverter::new(
        Arc::new(StaticShortLinkExpander::new()),
        LinkComposer::new("PARTNER7"),
    );
    let result = converter.convert("https://item.jd.com/5.html").await.unwrap();
    assert_eq!(
        result.target_url,
        "https://www.cnfans.com/product?id=5&platform=JD&ref=PARTNER7"
    );
}
