use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Runtime settings for the detection-and-extraction engine.
///
/// Every threshold the engine applies (validator cut-offs, the repeat-failure
/// threshold, crawl budgets) lives here so it can be tuned without a rebuild.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub knowledge_path: PathBuf,
    pub backlog_path: PathBuf,
    /// `None` means the built-in catalog compiled into the binary.
    pub catalog_path: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub requests_per_window: usize,
    pub quota_window_secs: u64,
    pub respect_robots: bool,
    pub domain_timeout_secs: u64,
    pub failure_threshold: u32,
    pub history_limit: usize,
    pub max_detail_pages: usize,
    pub max_concurrent_domains: usize,
    pub listing_min_confidence: u8,
    pub listing_min_links: usize,
    pub listing_override_links: usize,
    /// Item links above which a home page counts as a listing.
    pub listing_homepage_links: usize,
    pub detail_min_confidence: u8,
}
