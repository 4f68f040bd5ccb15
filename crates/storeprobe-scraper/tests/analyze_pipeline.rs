//! End-to-end analysis against a local `wiremock` storefront.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use storeprobe_core::SignalCatalog;
use storeprobe_scraper::{
    AnalysisFailure, Analyzer, CrawlGuard, GuardPolicy, HttpFetcher, JsonFileBacklog,
    KnowledgeBase, KnowledgePolicy, ManualClock,
};

const HOME: &str = r#"<html><head>
<link rel="stylesheet" href="https://cdn.shopify.com/s/files/1/theme.css">
<script>window.Shopify = {}; Shopify.shop = "demo.myshopify.com";</script>
</head><body><nav><a href="/collections/all">Shop</a></nav></body></html>"#;

fn listing() -> String {
    let cards: String = (0..5)
        .map(|i| {
            format!(
                r#"<div class="product-card"><a href="/products/tea-{i}">Tea {i}</a><span class="price">$1{i}.00</span></div>"#
            )
        })
        .collect();
    format!("<html><body><main>{cards}</main></body></html>")
}

fn detail(name: &str) -> String {
    format!(
        r#"<html><head><title>{name}</title>
<script type="application/ld+json">{{"@type":"Product","name":"{name}","description":"Loose leaf {name} from a single estate."}}</script>
</head><body><main><h1>{name}</h1><span class="price">$12.00</span>
<form action="/cart/add"><button>Add to cart</button></form>
<table class="product-attributes"><tr><th>Origin</th><td>Assam</td></tr></table>
</main></body></html>"#
    )
}

fn quiet_guard() -> CrawlGuard {
    CrawlGuard::new(
        GuardPolicy {
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            requests_per_window: 100,
            window: Duration::from_secs(60),
            respect_robots: true,
            user_agent: "storeprobe-test".to_string(),
        },
        Arc::new(ManualClock::new()),
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn analyzes_store_and_remembers_the_listing() {
    let server = MockServer::start().await;
    mount_page(&server, "/", HOME.to_string()).await;
    mount_page(&server, "/collections/all", listing()).await;
    for i in 0..5 {
        mount_page(&server, &format!("/products/tea-{i}"), detail(&format!("Tea {i}"))).await;
    }

    let dir = tempfile::tempdir().expect("tempdir");
    let knowledge = Arc::new(
        KnowledgeBase::open(dir.path().join("knowledge.json"), KnowledgePolicy::default())
            .expect("open knowledge base"),
    );
    let backlog = Arc::new(JsonFileBacklog::new(dir.path().join("backlog.json")));
    let analyzer = Analyzer::new(
        HttpFetcher::new(5, "storeprobe-test/0.1", 0, 0).expect("fetcher"),
        Arc::new(SignalCatalog::builtin().expect("builtin catalog")),
        quiet_guard(),
        Arc::clone(&knowledge),
        backlog,
    );

    let outcome = analyzer.analyze_domain(&server.uri()).await;

    assert!(outcome.success, "analysis failed: {:?}", outcome.error);
    assert_eq!(outcome.platform_id.as_deref(), Some("shopify"));
    assert_eq!(outcome.products.len(), 3);
    assert_eq!(outcome.products[0].title, "Tea 0");
    assert_eq!(
        outcome.products[0].specifications.get("Origin").map(String::as_str),
        Some("Assam")
    );

    let record = knowledge
        .get(&outcome.domain)
        .await
        .expect("read record")
        .expect("record stored");
    assert_eq!(
        record.confirmed_listing_pattern,
        Some(format!("{}/collections/all", server.uri()))
    );
    assert!(dir.path().join("knowledge.json").exists());

    // a second run goes straight to the remembered listing page
    let again = analyzer.analyze_domain(&server.uri()).await;
    assert!(again.success);
    assert_eq!(again.listing_url, outcome.listing_url);
}

#[tokio::test]
async fn store_without_listing_reports_failure() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        "<html><body><p>Coming soon</p></body></html>".to_string(),
    )
    .await;

    let analyzer = Analyzer::new(
        HttpFetcher::new(5, "storeprobe-test/0.1", 0, 0).expect("fetcher"),
        Arc::new(SignalCatalog::builtin().expect("builtin catalog")),
        quiet_guard(),
        Arc::new(KnowledgeBase::in_memory(KnowledgePolicy::default())),
        Arc::new(storeprobe_scraper::MemoryBacklog::new()),
    );

    let outcome = analyzer.analyze_domain(&server.uri()).await;

    assert!(!outcome.success);
    assert!(matches!(
        outcome.failure,
        Some(AnalysisFailure::NoValidListingPage { .. })
    ));
    assert!(outcome.attempted_paths.contains(&"/collections/all".to_string()));
}
