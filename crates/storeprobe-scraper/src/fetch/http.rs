//! `reqwest`-backed [`PageFetcher`].

use std::time::Duration;

use reqwest::redirect::{Attempt, Policy};
use reqwest::{Client, StatusCode, Url};

use super::retry::retry_with_backoff;
use super::{FetchedPage, PageFetcher};
use crate::error::ScraperError;
use crate::site::normalize_domain;

const MAX_REDIRECTS: usize = 10;

/// HTTP fetcher with a configured timeout, `User-Agent`, and retry policy.
///
/// Same-host redirects are followed transparently. A redirect to another
/// host is *not* followed: the 3xx is returned with `final_url` pointing at
/// the target so the caller decides whether to re-fetch there.
///
/// Transient errors (429, network failures) are retried with exponential
/// backoff up to `max_retries` additional attempts.
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .redirect(Policy::custom(same_host_redirects))
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_secs,
        })
    }

    /// Builds a fetcher from the request settings in `config`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`].
    pub fn from_config(config: &storeprobe_core::AppConfig) -> Result<Self, ScraperError> {
        Self::new(
            config.request_timeout_secs,
            &config.user_agent,
            config.max_retries,
            config.retry_backoff_base_secs,
        )
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchedPage, ScraperError> {
        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ScraperError::RateLimited {
                domain: normalize_domain(url),
                retry_after_secs,
            });
        }

        let response_url = response.url().clone();

        if status.is_redirection() {
            let target = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|location| response_url.join(location).ok())
                .unwrap_or_else(|| response_url.clone());
            tracing::debug!(url, target = %target, status = status.as_u16(), "redirect not followed");
            return Ok(FetchedPage {
                success: false,
                final_url: target.to_string(),
                status_code: status.as_u16(),
                markup: String::new(),
            });
        }

        let markup = response.text().await?;
        Ok(FetchedPage {
            success: status.is_success(),
            final_url: response_url.to_string(),
            status_code: status.as_u16(),
            markup,
        })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> Result<FetchedPage, ScraperError> {
        Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || self.fetch_once(url))
            .await
    }
}

fn same_host_redirects(attempt: Attempt<'_>) -> reqwest::redirect::Action {
    if attempt.previous().len() >= MAX_REDIRECTS {
        return attempt.error("too many redirects");
    }
    let crosses_host = attempt
        .previous()
        .first()
        .is_some_and(|first| normalize_domain(first.as_str()) != normalize_domain(attempt.url().as_str()));
    if crosses_host {
        attempt.stop()
    } else {
        attempt.follow()
    }
}
