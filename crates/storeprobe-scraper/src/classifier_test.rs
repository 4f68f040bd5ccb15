use std::sync::Arc;

use storeprobe_core::{ConfidenceLevel, SignalCatalog};

use super::*;

fn builtin() -> PlatformClassifier {
    PlatformClassifier::new(Arc::new(SignalCatalog::builtin().unwrap()))
}

const TIE_CATALOG: &str = r#"
version: 1
platforms:
  - id: alpha
    confidence_threshold: 5
    listing_paths: ["/a"]
    signals:
      - { pattern: "shared-marker", weight: 10, description: "alpha marker" }
  - id: beta
    confidence_threshold: 5
    listing_paths: ["/b"]
    signals:
      - { pattern: "shared-marker", weight: 5, description: "beta marker one" }
      - { pattern: "beta-only", weight: 5, description: "beta marker two" }
  - id: gamma
    confidence_threshold: 5
    listing_paths: ["/c"]
    signals:
      - { pattern: "shared-marker", weight: 10, description: "gamma marker" }
  - id: generic
    confidence_threshold: 0
    listing_paths: ["/shop"]
"#;

fn tie_classifier() -> PlatformClassifier {
    PlatformClassifier::new(Arc::new(SignalCatalog::from_yaml_str(TIE_CATALOG).unwrap()))
}

#[test]
fn shopify_markers_classify_as_shopify_with_at_least_medium_confidence() {
    let markup = r#"<html><head>
        <link rel="stylesheet" href="https://cdn.shopify.com/s/files/theme.css">
        <script>Shopify.shop = "demo.myshopify.com";</script>
        </head><body></body></html>"#;

    let result = builtin().classify(markup);

    assert_eq!(result.platform_id.as_deref(), Some("shopify"));
    assert!(result.confidence >= ConfidenceLevel::Medium);
    assert!(result.score >= 20);
    assert!(result
        .matched_signals
        .iter()
        .any(|s| s.description == "Shopify CDN asset"));
}

#[test]
fn woocommerce_store_is_detected() {
    let markup = r#"<html><body class="archive woocommerce-page">
        <link href="/wp-content/plugins/woocommerce/assets/css/woocommerce.css" rel="stylesheet">
        <a class="button add_to_cart_button">Add</a></body></html>"#;

    let result = builtin().classify(markup);

    assert_eq!(result.platform_id.as_deref(), Some("woocommerce"));
    assert_eq!(result.confidence, ConfidenceLevel::High);
}

#[test]
fn empty_and_non_html_input_yield_none() {
    let classifier = builtin();
    for input in ["", "   ", "{\"json\": true}", "plain text mentioning cdn.shopify.com"] {
        let result = classifier.classify(input);
        assert_eq!(result, DetectionResult::none(), "input: {input:?}");
    }
}

#[test]
fn byte_order_mark_does_not_hide_a_store() {
    let markup = "\u{feff}<!DOCTYPE html><html><head>\
        <link rel=\"stylesheet\" href=\"https://cdn.shopify.com/s/files/theme.css\">\
        <script>Shopify.shop = \"demo.myshopify.com\";</script></head></html>";

    let result = builtin().classify(markup);

    assert_eq!(result.platform_id.as_deref(), Some("shopify"));
}

#[test]
fn markup_below_every_threshold_yields_none() {
    let result = builtin().classify("<html><body><p>hello</p></body></html>");
    assert!(result.platform_id.is_none());
    assert_eq!(result.score, 0);
    assert_eq!(result.confidence, ConfidenceLevel::None);
}

#[test]
fn classification_is_deterministic() {
    let classifier = builtin();
    let markup = r#"<html><script src="https://cdn.shopify.com/x.js"></script>
        <div class="shopify-section woocommerce"></div></html>"#;
    let first = classifier.classify(markup);
    for _ in 0..5 {
        assert_eq!(classifier.classify(markup), first);
    }
}

#[test]
fn ties_break_on_matched_count_then_declaration_order() {
    let classifier = tie_classifier();

    // alpha and gamma both score 10 with one match; alpha is declared first
    let result = classifier.classify("<div>shared-marker</div>");
    assert_eq!(result.platform_id.as_deref(), Some("alpha"));

    // beta also scores 10 but with two matched signals
    let result = classifier.classify("<div>shared-marker beta-only</div>");
    assert_eq!(result.platform_id.as_deref(), Some("beta"));
    assert_eq!(result.matched_signals.len(), 2);
}

#[test]
fn generic_never_wins_and_is_the_fallback_profile() {
    let classifier = builtin();
    let result = classifier.classify("<html></html>");
    assert!(result.platform_id.is_none());
    assert_eq!(classifier.profile_for(&result).id, "generic");
}

#[test]
fn substring_signals_are_case_insensitive() {
    let result = builtin().classify("<html><script src='//CDN.SHOPIFY.COM/a.js'></script><script>SHOPIFY.SHOP='x'</script></html>");
    assert_eq!(result.platform_id.as_deref(), Some("shopify"));
}
