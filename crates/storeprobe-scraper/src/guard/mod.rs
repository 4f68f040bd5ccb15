//! Ethical crawl guard.
//!
//! Every network read the engine performs goes through [`CrawlGuard::fetch`],
//! which enforces, per host:
//! - robots.txt compliance (fetched once, cached for the guard's lifetime);
//! - a request quota over a rolling time window (waits when exhausted);
//! - a randomised minimum gap between consecutive requests.
//!
//! Requests to one host are serialised behind an async mutex; different hosts
//! proceed independently.

mod clock;
mod robots;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use reqwest::Url;

use crate::error::ScraperError;
use crate::fetch::{FetchedPage, PageFetcher};
use crate::site::normalize_domain;

pub use clock::{Clock, ManualClock, TokioClock};
pub(crate) use robots::RobotsRules;

/// Crawl budget applied to every host.
#[derive(Debug, Clone)]
pub struct GuardPolicy {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub requests_per_window: usize,
    pub window: Duration,
    pub respect_robots: bool,
    /// Agent name matched against robots.txt `User-agent` groups.
    pub user_agent: String,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(3000),
            requests_per_window: 30,
            window: Duration::from_secs(60),
            respect_robots: true,
            user_agent: "storeprobe".to_string(),
        }
    }
}

impl From<&storeprobe_core::AppConfig> for GuardPolicy {
    fn from(config: &storeprobe_core::AppConfig) -> Self {
        Self {
            min_delay: Duration::from_millis(config.min_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            requests_per_window: config.requests_per_window,
            window: Duration::from_secs(config.quota_window_secs),
            respect_robots: config.respect_robots,
            user_agent: config.user_agent.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct HostState {
    robots: Option<RobotsRules>,
    recent: VecDeque<Instant>,
    last_request: Option<Instant>,
}

pub struct CrawlGuard {
    policy: GuardPolicy,
    clock: Arc<dyn Clock>,
    hosts: Mutex<HashMap<String, Arc<tokio::sync::Mutex<HostState>>>>,
}

impl CrawlGuard {
    #[must_use]
    pub fn new(policy: GuardPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &GuardPolicy {
        &self.policy
    }

    /// Fetches `url` through `fetcher` once robots, quota and delay allow it.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::InvalidUrl`] if `url` does not parse.
    /// - [`ScraperError::DisallowedByRobots`] if robots.txt forbids the path.
    /// - Any transport error returned by the fetcher.
    pub async fn fetch<F: PageFetcher>(
        &self,
        fetcher: &F,
        url: &str,
    ) -> Result<FetchedPage, ScraperError> {
        let parsed = Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let host = normalize_domain(url);
        let slot = self.host_slot(&host);
        let mut state = slot.lock().await;

        if self.policy.respect_robots {
            if state.robots.is_none() {
                let rules = self.load_robots(fetcher, &parsed, &mut state).await;
                state.robots = Some(rules);
            }
            let allowed = state
                .robots
                .as_ref()
                .is_none_or(|rules| rules.is_allowed(parsed.as_str()));
            if !allowed {
                tracing::warn!(url, host, "robots.txt disallows fetch");
                return Err(ScraperError::DisallowedByRobots {
                    url: url.to_string(),
                });
            }
        }

        self.throttle(&host, &mut state).await;
        tracing::debug!(url, host, "guarded fetch");
        fetcher.fetch_page(url).await
    }

    fn host_slot(&self, host: &str) -> Arc<tokio::sync::Mutex<HostState>> {
        let mut hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(hosts.entry(host.to_string()).or_default())
    }

    async fn load_robots<F: PageFetcher>(
        &self,
        fetcher: &F,
        url: &Url,
        state: &mut HostState,
    ) -> RobotsRules {
        let Ok(robots_url) = url.join("/robots.txt") else {
            return RobotsRules::allow_all();
        };
        let host = normalize_domain(url.as_str());
        self.throttle(&host, state).await;

        match fetcher.fetch_page(robots_url.as_str()).await {
            Ok(page) if page.success => {
                let rules = RobotsRules::parse(&page.markup, &self.policy.user_agent);
                tracing::debug!(host, crawl_delay = ?rules.crawl_delay(), "loaded robots.txt");
                rules
            }
            Ok(page) => {
                tracing::debug!(host, status = page.status_code, "no robots.txt, allowing all");
                RobotsRules::allow_all()
            }
            Err(err) => {
                tracing::debug!(host, error = %err, "robots.txt unreachable, allowing all");
                RobotsRules::allow_all()
            }
        }
    }

    /// Waits for quota and the inter-request gap, then stamps the request.
    async fn throttle(&self, host: &str, state: &mut HostState) {
        let window = self.policy.window;
        let quota = self.policy.requests_per_window.max(1);

        let now = self.clock.now();
        prune(&mut state.recent, now, window);
        if state.recent.len() >= quota {
            if let Some(oldest) = state.recent.front().copied() {
                let wait = (oldest + window).saturating_duration_since(now);
                tracing::warn!(host, quota, wait_ms = wait.as_millis(), "request quota exhausted, waiting");
                self.clock.sleep(wait).await;
            }
            let now = self.clock.now();
            prune(&mut state.recent, now, window);
        }

        if let Some(last) = state.last_request {
            let gap = self.next_gap(state.robots.as_ref());
            let elapsed = self.clock.now().saturating_duration_since(last);
            if elapsed < gap {
                self.clock.sleep(gap - elapsed).await;
            }
        }

        let stamp = self.clock.now();
        state.recent.push_back(stamp);
        state.last_request = Some(stamp);
    }

    fn next_gap(&self, robots: Option<&RobotsRules>) -> Duration {
        let mut min = self.policy.min_delay;
        let mut max = self.policy.max_delay.max(min);
        if let Some(crawl_delay) = robots.and_then(RobotsRules::crawl_delay) {
            if crawl_delay > min {
                min = crawl_delay;
                max = max.max(min);
            }
        }
        let spread = max - min;
        min + spread.mul_f64(rand::random::<f64>())
    }
}

fn prune(recent: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while recent
        .front()
        .is_some_and(|t| now.saturating_duration_since(*t) >= window)
    {
        recent.pop_front();
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
