//! The fetch collaborator: the single seam through which the engine reads
//! the network.

mod http;
mod retry;

use std::future::Future;

use crate::error::ScraperError;

pub use http::HttpFetcher;

/// Result of one page fetch.
///
/// Non-2xx responses are data, not errors: `success` is `false` and
/// `status_code` carries the status. A redirect the fetcher chose not to
/// follow (cross-host) is reported with its 3xx status and `final_url` set to
/// the redirect target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub success: bool,
    pub final_url: String,
    pub status_code: u16,
    pub markup: String,
}

impl FetchedPage {
    /// Whether this is an unfollowed redirect to a different host than `requested_url`.
    #[must_use]
    pub fn is_cross_host_redirect(&self, requested_url: &str) -> bool {
        (300..400).contains(&self.status_code)
            && crate::site::normalize_domain(&self.final_url)
                != crate::site::normalize_domain(requested_url)
    }
}

/// Reads one page. Implementations must surface the final URL after
/// redirects and must not return `Err` for non-2xx statuses.
pub trait PageFetcher: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ScraperError`] only for transport-level failures (DNS, TLS,
    /// timeouts, exhausted 429 retries).
    fn fetch_page(&self, url: &str)
        -> impl Future<Output = Result<FetchedPage, ScraperError>> + Send;
}
