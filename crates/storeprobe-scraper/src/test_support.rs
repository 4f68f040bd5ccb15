//! In-memory fetcher and fixtures shared by unit tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use storeprobe_core::{AppConfig, Environment};

use crate::error::ScraperError;
use crate::fetch::{FetchedPage, PageFetcher};
use crate::guard::{CrawlGuard, GuardPolicy, ManualClock};

/// Serves canned pages by exact URL; anything else is a 404.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    pages: Mutex<HashMap<String, FetchedPage>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_page(self, url: &str, markup: &str) -> Self {
        self.insert(
            url,
            FetchedPage {
                success: true,
                final_url: url.to_string(),
                status_code: 200,
                markup: markup.to_string(),
            },
        );
        self
    }

    pub(crate) fn with_status(self, url: &str, status: u16) -> Self {
        self.insert(
            url,
            FetchedPage {
                success: false,
                final_url: url.to_string(),
                status_code: status,
                markup: String::new(),
            },
        );
        self
    }

    pub(crate) fn with_redirect(self, url: &str, target: &str) -> Self {
        self.insert(
            url,
            FetchedPage {
                success: false,
                final_url: target.to_string(),
                status_code: 301,
                markup: String::new(),
            },
        );
        self
    }

    fn insert(&self, url: &str, page: FetchedPage) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), page);
    }

    /// Every URL requested, in order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Requested URLs excluding robots.txt lookups.
    pub(crate) fn page_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|u| !u.ends_with("/robots.txt"))
            .collect()
    }
}

impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(&self, url: &str) -> Result<FetchedPage, ScraperError> {
        self.calls.lock().unwrap().push(url.to_string());
        let page = self.pages.lock().unwrap().get(url).cloned();
        Ok(page.unwrap_or_else(|| FetchedPage {
            success: false,
            final_url: url.to_string(),
            status_code: 404,
            markup: String::new(),
        }))
    }
}

/// A guard with no delays, no robots lookups and a generous quota.
pub(crate) fn permissive_guard() -> CrawlGuard {
    CrawlGuard::new(
        GuardPolicy {
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            requests_per_window: 1_000,
            window: Duration::from_secs(60),
            respect_robots: false,
            user_agent: "storeprobe-test".to_string(),
        },
        Arc::new(ManualClock::new()),
    )
}

/// Listing markup with `count` product cards linking to `/products/item-N`.
pub(crate) fn listing_markup(count: usize) -> String {
    let mut html = String::from("<html><body><main><div class=\"collection\">");
    for i in 0..count {
        html.push_str(&format!(
            "<div class=\"product-card\"><a href=\"/products/item-{i}\">Item {i}</a><span class=\"price\">$1{i}.00</span></div>"
        ));
    }
    html.push_str("</div></main></body></html>");
    html
}

/// A single-product page with JSON-LD, price and an add-to-cart form.
pub(crate) fn detail_markup(name: &str) -> String {
    format!(
        r#"<html><head><title>{name} | Store</title>
<script type="application/ld+json">{{"@context":"https://schema.org","@type":"Product","name":"{name}","description":"A very good {name} for everyday use.","sku":"SKU-1"}}</script>
</head><body><main>
<h1 class="product__title">{name}</h1>
<span class="price">$24.00</span>
<form action="/cart/add" method="post"><button type="submit" name="add">Add to cart</button></form>
<div class="product__description"><p>A very good {name} for everyday use.</p></div>
</main></body></html>"#
    )
}

/// Configuration with the documented defaults, independent of the process env.
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        env: Environment::Test,
        log_level: "debug".to_string(),
        knowledge_path: PathBuf::from("./data/knowledge.json"),
        backlog_path: PathBuf::from("./data/backlog.json"),
        catalog_path: None,
        request_timeout_secs: 30,
        user_agent: "storeprobe/0.1 (+platform-discovery)".to_string(),
        max_retries: 2,
        retry_backoff_base_secs: 2,
        min_delay_ms: 1000,
        max_delay_ms: 3000,
        requests_per_window: 30,
        quota_window_secs: 60,
        respect_robots: true,
        domain_timeout_secs: 180,
        failure_threshold: 3,
        history_limit: 10,
        max_detail_pages: 3,
        max_concurrent_domains: 1,
        listing_min_confidence: 40,
        listing_min_links: 3,
        listing_override_links: 10,
        listing_homepage_links: 20,
        detail_min_confidence: 40,
    }
}
