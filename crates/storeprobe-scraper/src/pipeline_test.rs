use std::time::Duration;

use storeprobe_core::SignalCatalog;

use super::*;
use crate::backlog::MemoryBacklog;
use crate::fetch::FetchedPage;
use crate::knowledge::KnowledgePolicy;
use crate::test_support::{
    detail_markup, listing_markup, permissive_guard, test_config, ScriptedFetcher,
};

const SHOPIFY_HOME: &str = r#"<html><head>
    <link rel="stylesheet" href="https://cdn.shopify.com/s/files/theme.css">
    <script>Shopify.shop = "demo.myshopify.com";</script>
    </head><body><a href="/collections/all">All products</a></body></html>"#;

fn analyzer<F: PageFetcher>(fetcher: F) -> Analyzer<F> {
    let catalog = Arc::new(SignalCatalog::builtin().unwrap());
    Analyzer::new(
        fetcher,
        catalog,
        permissive_guard(),
        Arc::new(KnowledgeBase::in_memory(KnowledgePolicy::default())),
        Arc::new(MemoryBacklog::new()),
    )
}

fn shopify_store() -> ScriptedFetcher {
    ScriptedFetcher::new()
        .with_page("https://shop.example/", SHOPIFY_HOME)
        .with_page("https://shop.example/collections/all", &listing_markup(6))
        .with_page("https://shop.example/products/item-0", &detail_markup("Mug"))
        .with_page("https://shop.example/products/item-1", &detail_markup("Kettle"))
        .with_page("https://shop.example/products/item-2", &detail_markup("Teapot"))
}

#[tokio::test]
async fn full_analysis_extracts_products_from_detected_store() {
    let analyzer = analyzer(shopify_store());

    let outcome = analyzer.analyze_domain("shop.example").await;

    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.domain, "shop.example");
    assert_eq!(outcome.platform_id.as_deref(), Some("shopify"));
    assert_eq!(
        outcome.listing_url.as_deref(),
        Some("https://shop.example/collections/all")
    );
    assert_eq!(outcome.products.len(), 3);
    assert_eq!(outcome.products[0].title, "Mug");
    assert!(outcome.failure.is_none());
    assert!(outcome.warnings.is_empty());

    let record = analyzer.knowledge().lookup("shop.example").await;
    assert_eq!(
        record.confirmed_listing_pattern.as_deref(),
        Some("https://shop.example/collections/all")
    );
    assert!(record.confirmed_detail_pattern.is_some());
}

#[tokio::test]
async fn detail_pages_are_capped_by_settings() {
    let analyzer = analyzer(shopify_store()).with_settings(AnalyzerSettings {
        max_detail_pages: 1,
        ..AnalyzerSettings::default()
    });

    let outcome = analyzer.analyze_domain("shop.example").await;

    assert!(outcome.success);
    assert_eq!(outcome.products.len(), 1);
}

#[tokio::test]
async fn unreachable_home_without_listing_is_a_fetch_failure() {
    let analyzer = analyzer(ScriptedFetcher::new().with_status("https://gone.example/", 503));

    let outcome = analyzer.analyze_domain("gone.example").await;

    assert!(!outcome.success);
    assert!(matches!(
        outcome.failure,
        Some(AnalysisFailure::FetchFailure { ref url, .. }) if url == "https://gone.example/"
    ));
    assert!(outcome.error.unwrap().contains("503"));
    assert!(!outcome.attempted_paths.is_empty());
}

#[tokio::test]
async fn reachable_store_without_listing_reports_attempts() {
    let analyzer = analyzer(
        ScriptedFetcher::new()
            .with_page("https://plain.example/", "<html><body><p>Hello</p></body></html>"),
    );

    let outcome = analyzer.analyze_domain("plain.example").await;

    assert!(!outcome.success);
    match outcome.failure {
        Some(AnalysisFailure::NoValidListingPage { attempted }) => {
            assert_eq!(attempted, outcome.attempted_paths.len());
            assert!(attempted > 0);
        }
        other => panic!("unexpected failure {other:?}"),
    }
    assert_eq!(outcome.warnings, vec![AnalysisFailure::NoPlatformDetected]);
}

#[tokio::test]
async fn listing_without_detail_pages_resets_the_record() {
    let analyzer = analyzer(
        ScriptedFetcher::new()
            .with_page("https://shop.example/", SHOPIFY_HOME)
            .with_page("https://shop.example/collections/all", &listing_markup(6)),
    );

    let outcome = analyzer.analyze_domain("shop.example").await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.failure,
        Some(AnalysisFailure::NoValidDetailPages {
            listing_url: "https://shop.example/collections/all".to_string()
        })
    );
    assert_eq!(
        outcome.listing_url.as_deref(),
        Some("https://shop.example/collections/all")
    );

    let record = analyzer.knowledge().lookup("shop.example").await;
    assert!(record.confirmed_listing_pattern.is_none());
    assert!(record.confirmed_detail_pattern.is_none());
    assert_eq!(
        record.recent_attempts.last().map(|a| a.outcome),
        Some(crate::knowledge::AttemptOutcome::Reset)
    );
}

#[tokio::test]
async fn validated_page_with_nothing_to_extract_is_a_warning() {
    let bare_detail = r#"<html><body><span class="price">$9.00</span>
        <form action="/cart/add"><button>Add to cart</button></form></body></html>"#;
    let analyzer = analyzer(
        ScriptedFetcher::new()
            .with_page("https://shop.example/", SHOPIFY_HOME)
            .with_page("https://shop.example/collections/all", &listing_markup(4))
            .with_page("https://shop.example/products/item-0", bare_detail),
    )
    .with_settings(AnalyzerSettings {
        max_detail_pages: 1,
        ..AnalyzerSettings::default()
    });

    let outcome = analyzer.analyze_domain("shop.example").await;

    assert!(outcome.success);
    assert_eq!(
        outcome.warnings,
        vec![AnalysisFailure::ExtractionEmpty {
            url: "https://shop.example/products/item-0".to_string()
        }]
    );
}

#[tokio::test]
async fn invalid_domain_is_reported_not_raised() {
    let analyzer = analyzer(ScriptedFetcher::new());

    let outcome = analyzer.analyze_domain("").await;

    assert!(!outcome.success);
    assert!(matches!(outcome.failure, Some(AnalysisFailure::FetchFailure { .. })));
}

/// Never answers within any reasonable test timeout.
struct StalledFetcher;

impl PageFetcher for StalledFetcher {
    async fn fetch_page(&self, _url: &str) -> Result<FetchedPage, ScraperError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(ScraperError::InvalidUrl {
            url: "unreachable".to_string(),
            reason: "stalled".to_string(),
        })
    }
}

#[tokio::test]
async fn timeout_penalizes_the_role_in_progress() {
    let analyzer = analyzer(StalledFetcher).with_settings(AnalyzerSettings {
        domain_timeout: Duration::from_millis(50),
        ..AnalyzerSettings::default()
    });

    let outcome = analyzer.analyze_domain("slow.example").await;

    assert!(!outcome.success);
    assert_eq!(outcome.failure, Some(AnalysisFailure::Timeout { secs: 0 }));
    let record = analyzer.knowledge().lookup("slow.example").await;
    assert_eq!(record.listing_failure_streak, 1);
    assert_eq!(record.failure_count, 1);
    assert_eq!(
        record.recent_attempts.last().map(|a| a.attempted_paths.clone()),
        Some(vec!["timeout".to_string()])
    );
}

#[tokio::test]
async fn batch_analysis_reports_every_domain() {
    let fetcher = shopify_store().with_page(
        "https://plain.example/",
        "<html><body><p>Hello</p></body></html>",
    );
    let analyzer = analyzer(fetcher).with_settings(AnalyzerSettings {
        max_concurrent_domains: 2,
        ..AnalyzerSettings::default()
    });

    let mut outcomes = analyzer
        .analyze_many(&["shop.example".to_string(), "plain.example".to_string()])
        .await;
    outcomes.sort_by(|a, b| a.domain.cmp(&b.domain));

    assert_eq!(outcomes.len(), 2);
    assert!(!outcomes[0].success);
    assert!(outcomes[1].success);
}

#[tokio::test]
async fn classify_page_reports_platform_or_status() {
    let analyzer = analyzer(
        ScriptedFetcher::new()
            .with_page("https://shop.example/", SHOPIFY_HOME)
            .with_status("https://shop.example/gone", 410),
    );

    let detection = analyzer.classify_page("https://shop.example/").await.unwrap();
    assert_eq!(detection.platform_id.as_deref(), Some("shopify"));

    let err = analyzer
        .classify_page("https://shop.example/gone")
        .await
        .unwrap_err();
    assert!(matches!(err, ScraperError::UnexpectedStatus { status: 410, .. }));
}

#[test]
fn outcome_serializes_failure_kind() {
    let outcome = AnalysisOutcome::failed(
        "shop.example",
        AnalysisFailure::NoValidListingPage { attempted: 4 },
    );
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["failure"]["kind"], "no_valid_listing_page");
    assert_eq!(json["failure"]["attempted"], 4);
}

#[test]
fn settings_follow_config() {
    let settings = AnalyzerSettings::from(&test_config());
    assert_eq!(settings, AnalyzerSettings::default());
}
