use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::test_support::ScriptedFetcher;

fn policy(delay_ms: u64, quota: usize, window_secs: u64, robots: bool) -> GuardPolicy {
    GuardPolicy {
        min_delay: Duration::from_millis(delay_ms),
        max_delay: Duration::from_millis(delay_ms),
        requests_per_window: quota,
        window: Duration::from_secs(window_secs),
        respect_robots: robots,
        user_agent: "storeprobe/0.1".to_string(),
    }
}

#[tokio::test]
async fn first_request_is_not_delayed_and_second_waits_the_gap() {
    let clock = Arc::new(ManualClock::new());
    let guard = CrawlGuard::new(policy(250, 100, 60, false), clock.clone());
    let fetcher = ScriptedFetcher::new()
        .with_page("https://example.com/a", "a")
        .with_page("https://example.com/b", "b");

    guard.fetch(&fetcher, "https://example.com/a").await.unwrap();
    assert!(clock.sleeps().is_empty());

    guard.fetch(&fetcher, "https://example.com/b").await.unwrap();
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(250)]);
}

#[tokio::test]
async fn elapsed_time_counts_toward_the_gap() {
    let clock = Arc::new(ManualClock::new());
    let guard = CrawlGuard::new(policy(1000, 100, 60, false), clock.clone());
    let fetcher = ScriptedFetcher::new();

    guard.fetch(&fetcher, "https://example.com/a").await.unwrap();
    clock.advance(Duration::from_millis(600));
    guard.fetch(&fetcher, "https://example.com/b").await.unwrap();

    assert_eq!(clock.sleeps(), vec![Duration::from_millis(400)]);
}

#[tokio::test]
async fn exhausted_quota_waits_for_the_window_to_roll() {
    let clock = Arc::new(ManualClock::new());
    let guard = CrawlGuard::new(policy(0, 2, 10, false), clock.clone());
    let fetcher = ScriptedFetcher::new();

    for path in ["a", "b", "c"] {
        guard
            .fetch(&fetcher, &format!("https://example.com/{path}"))
            .await
            .unwrap();
    }

    assert_eq!(clock.sleeps(), vec![Duration::from_secs(10)]);
    assert_eq!(fetcher.calls().len(), 3);
}

#[tokio::test]
async fn hosts_have_independent_budgets() {
    let clock = Arc::new(ManualClock::new());
    let guard = CrawlGuard::new(policy(500, 1, 60, false), clock.clone());
    let fetcher = ScriptedFetcher::new();

    guard.fetch(&fetcher, "https://one.example/").await.unwrap();
    guard.fetch(&fetcher, "https://two.example/").await.unwrap();

    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn robots_disallow_blocks_fetch_without_requesting_page() {
    let clock = Arc::new(ManualClock::new());
    let guard = CrawlGuard::new(policy(0, 100, 60, true), clock);
    let fetcher = ScriptedFetcher::new().with_page(
        "https://example.com/robots.txt",
        "User-agent: *\nDisallow: /collections\n",
    );

    let err = guard
        .fetch(&fetcher, "https://example.com/collections/all")
        .await
        .unwrap_err();
    assert!(matches!(err, ScraperError::DisallowedByRobots { .. }));
    assert_eq!(fetcher.calls(), vec!["https://example.com/robots.txt"]);

    guard
        .fetch(&fetcher, "https://example.com/products/mug")
        .await
        .unwrap();
    // robots.txt is cached: only one lookup for the host
    assert_eq!(
        fetcher.calls(),
        vec![
            "https://example.com/robots.txt",
            "https://example.com/products/mug"
        ]
    );
}

#[tokio::test]
async fn missing_robots_allows_everything() {
    let guard = CrawlGuard::new(policy(0, 100, 60, true), Arc::new(ManualClock::new()));
    let fetcher = ScriptedFetcher::new().with_page("https://example.com/shop", "ok");

    let page = guard.fetch(&fetcher, "https://example.com/shop").await.unwrap();
    assert!(page.success);
}

#[tokio::test]
async fn crawl_delay_raises_minimum_gap() {
    let clock = Arc::new(ManualClock::new());
    let guard = CrawlGuard::new(policy(100, 100, 60, true), clock.clone());
    let fetcher = ScriptedFetcher::new()
        .with_page("https://example.com/robots.txt", "User-agent: *\nCrawl-delay: 2\n");

    guard.fetch(&fetcher, "https://example.com/a").await.unwrap();

    // robots.txt went first, so the page request waits out the crawl delay
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
}

#[tokio::test]
async fn absurd_crawl_delay_is_capped_instead_of_failing() {
    let clock = Arc::new(ManualClock::new());
    let guard = CrawlGuard::new(policy(100, 100, 60, true), clock.clone());
    let fetcher = ScriptedFetcher::new()
        .with_page("https://example.com/robots.txt", "User-agent: *\nCrawl-delay: 1e300\n")
        .with_page("https://example.com/a", "<html></html>");

    let page = guard.fetch(&fetcher, "https://example.com/a").await.unwrap();

    assert!(page.success);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(60)]);
}

#[tokio::test]
async fn invalid_url_is_rejected() {
    let guard = CrawlGuard::new(policy(0, 100, 60, false), Arc::new(ManualClock::new()));
    let fetcher = ScriptedFetcher::new();
    let err = guard.fetch(&fetcher, "not a url").await.unwrap_err();
    assert!(matches!(err, ScraperError::InvalidUrl { .. }));
    assert!(fetcher.calls().is_empty());
}
