//! The caller-facing pipeline: listing discovery, detail discovery and
//! extraction for one domain, under a wall-clock limit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use storeprobe_core::{AppConfig, SignalCatalog};
use thiserror::Error;

use crate::backlog::Backlog;
use crate::classifier::{DetectionResult, PlatformClassifier};
use crate::discover::{Discoverer, DiscoveryOutcome, SiteContext};
use crate::error::ScraperError;
use crate::extract::{ContentExtractor, ExtractedProduct};
use crate::fetch::PageFetcher;
use crate::guard::CrawlGuard;
use crate::knowledge::KnowledgeBase;
use crate::site::SiteOrigin;
use crate::types::PageRole;
use crate::validator::{PageValidator, ValidationThresholds};

/// Why an analysis failed, or a non-fatal condition worth reporting.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisFailure {
    #[error("could not fetch {url}: {reason}")]
    FetchFailure { url: String, reason: String },

    #[error("no platform detected; generic candidates used")]
    NoPlatformDetected,

    #[error("no valid listing page found ({attempted} candidates tried)")]
    NoValidListingPage { attempted: usize },

    #[error("listing page {listing_url} has no valid detail pages")]
    NoValidDetailPages { listing_url: String },

    #[error("page {url} validated but no product field could be extracted")]
    ExtractionEmpty { url: String },

    #[error("analysis timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Everything the caller learns about one domain. `success` is explicit;
/// on failure `error` is a human-readable reason and `failure` its kind.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub success: bool,
    pub domain: String,
    pub platform_id: Option<String>,
    pub listing_url: Option<String>,
    pub products: Vec<ExtractedProduct>,
    pub error: Option<String>,
    pub failure: Option<AnalysisFailure>,
    /// Non-fatal conditions (no platform detected, empty extractions).
    pub warnings: Vec<AnalysisFailure>,
    pub attempted_paths: Vec<String>,
    pub detection: Option<DetectionResult>,
}

impl AnalysisOutcome {
    fn failed(domain: &str, failure: AnalysisFailure) -> Self {
        Self {
            success: false,
            domain: domain.to_string(),
            platform_id: None,
            listing_url: None,
            products: Vec::new(),
            error: Some(failure.to_string()),
            failure: Some(failure),
            warnings: Vec::new(),
            attempted_paths: Vec::new(),
            detection: None,
        }
    }

    fn with_context(mut self, ctx: &SiteContext) -> Self {
        self.platform_id = ctx.platform_id().map(str::to_string);
        self.detection = ctx.detection().cloned();
        if ctx.detection().is_some_and(|d| d.platform_id.is_none()) {
            self.warnings.insert(0, AnalysisFailure::NoPlatformDetected);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerSettings {
    /// Wall-clock limit for one `analyze_domain` call.
    pub domain_timeout: Duration,
    pub max_detail_pages: usize,
    /// Concurrency of `analyze_many`.
    pub max_concurrent_domains: usize,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            domain_timeout: Duration::from_secs(180),
            max_detail_pages: 3,
            max_concurrent_domains: 1,
        }
    }
}

impl From<&AppConfig> for AnalyzerSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            domain_timeout: Duration::from_secs(config.domain_timeout_secs),
            max_detail_pages: config.max_detail_pages,
            max_concurrent_domains: config.max_concurrent_domains,
        }
    }
}

/// Owns the engine's components and runs the end-to-end analysis.
pub struct Analyzer<F> {
    fetcher: F,
    catalog: Arc<SignalCatalog>,
    guard: CrawlGuard,
    classifier: PlatformClassifier,
    validator: PageValidator,
    extractor: ContentExtractor,
    knowledge: Arc<KnowledgeBase>,
    backlog: Arc<dyn Backlog>,
    settings: AnalyzerSettings,
}

impl<F: PageFetcher> Analyzer<F> {
    #[must_use]
    pub fn new(
        fetcher: F,
        catalog: Arc<SignalCatalog>,
        guard: CrawlGuard,
        knowledge: Arc<KnowledgeBase>,
        backlog: Arc<dyn Backlog>,
    ) -> Self {
        Self {
            fetcher,
            guard,
            classifier: PlatformClassifier::new(Arc::clone(&catalog)),
            validator: PageValidator::new(Arc::clone(&catalog), ValidationThresholds::default()),
            extractor: ContentExtractor::new(Arc::clone(&catalog)),
            catalog,
            knowledge,
            backlog,
            settings: AnalyzerSettings::default(),
        }
    }

    #[must_use]
    pub fn with_thresholds(mut self, thresholds: ValidationThresholds) -> Self {
        self.validator = PageValidator::new(Arc::clone(&self.catalog), thresholds);
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: AnalyzerSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    #[must_use]
    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    #[must_use]
    pub fn classifier(&self) -> &PlatformClassifier {
        &self.classifier
    }

    #[must_use]
    pub fn discoverer(&self) -> Discoverer<'_, F> {
        Discoverer::new(
            &self.fetcher,
            &self.guard,
            &self.classifier,
            &self.validator,
            &self.knowledge,
            self.backlog.as_ref(),
        )
    }

    /// Fetches one page through the crawl guard and classifies it.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::UnexpectedStatus`] for a non-2xx page, or the
    /// guard's error (robots denial, transport failure).
    pub async fn classify_page(&self, url: &str) -> Result<DetectionResult, ScraperError> {
        let page = self.guard.fetch(&self.fetcher, url).await?;
        if !page.success {
            return Err(ScraperError::UnexpectedStatus {
                status: page.status_code,
                url: url.to_string(),
            });
        }
        Ok(self.classifier.classify(&page.markup))
    }

    /// Analyzes one domain. Never fails: every problem is reported in the
    /// returned outcome.
    pub async fn analyze_domain(&self, domain: &str) -> AnalysisOutcome {
        let origin = match SiteOrigin::parse(domain) {
            Ok(origin) => origin,
            Err(err) => {
                tracing::warn!(domain, error = %err, "invalid domain");
                return AnalysisOutcome::failed(
                    domain,
                    AnalysisFailure::FetchFailure {
                        url: domain.to_string(),
                        reason: err.to_string(),
                    },
                );
            }
        };
        let key = origin.domain().to_string();
        let mut ctx = SiteContext::new(origin);
        let listing_confirmed = AtomicBool::new(false);
        let limit = self.settings.domain_timeout;

        tracing::info!(domain = %key, "analysis started");
        let result = tokio::time::timeout(limit, self.run(&mut ctx, &listing_confirmed)).await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(_) => {
                let role = if listing_confirmed.load(Ordering::SeqCst) {
                    PageRole::Detail
                } else {
                    PageRole::Listing
                };
                tracing::warn!(domain = %key, %role, secs = limit.as_secs(), "analysis timed out");
                if let Err(err) = self
                    .knowledge
                    .penalize(&key, role, &["timeout".to_string()])
                    .await
                {
                    tracing::warn!(domain = %key, error = %err, "could not record timeout");
                }
                let mut outcome = AnalysisOutcome::failed(
                    &key,
                    AnalysisFailure::Timeout {
                        secs: limit.as_secs(),
                    },
                )
                .with_context(&ctx);
                outcome.listing_url = ctx.listing().map(|l| l.url.clone());
                outcome
            }
        };

        tracing::info!(
            domain = %key,
            success = outcome.success,
            products = outcome.products.len(),
            platform = outcome.platform_id.as_deref().unwrap_or("-"),
            "analysis finished"
        );
        outcome
    }

    /// Analyzes a batch with bounded concurrency. Outcomes arrive in
    /// completion order, not input order.
    pub async fn analyze_many(&self, domains: &[String]) -> Vec<AnalysisOutcome> {
        let concurrency = self.settings.max_concurrent_domains.max(1);
        stream::iter(domains)
            .map(|domain| self.analyze_domain(domain))
            .buffer_unordered(concurrency)
            .collect()
            .await
    }

    async fn run(&self, ctx: &mut SiteContext, listing_confirmed: &AtomicBool) -> AnalysisOutcome {
        let discoverer = self.discoverer();
        let domain = ctx.domain().to_string();

        let listing = match discoverer.discover_listing(ctx).await {
            DiscoveryOutcome::Found(listing) => listing,
            DiscoveryOutcome::NotFound { attempted_paths, .. } => {
                let failure = if ctx.home_loaded && ctx.home_markup().is_none() {
                    AnalysisFailure::FetchFailure {
                        url: ctx.origin().home_url(),
                        reason: home_failure_reason(ctx),
                    }
                } else {
                    AnalysisFailure::NoValidListingPage {
                        attempted: attempted_paths.len(),
                    }
                };
                let mut outcome = AnalysisOutcome::failed(&domain, failure).with_context(ctx);
                outcome.attempted_paths = attempted_paths;
                return outcome;
            }
        };
        listing_confirmed.store(true, Ordering::SeqCst);

        let details = discoverer
            .discover_details(ctx, &listing, self.settings.max_detail_pages)
            .await;

        if details.pages.is_empty() {
            // a listing without reachable products is not worth remembering
            if let Err(err) = self.knowledge.cleanup(&domain).await {
                tracing::warn!(domain = %domain, error = %err, "could not reset knowledge record");
            }
            let mut outcome = AnalysisOutcome::failed(
                &domain,
                AnalysisFailure::NoValidDetailPages {
                    listing_url: listing.url.clone(),
                },
            )
            .with_context(ctx);
            outcome.listing_url = Some(listing.url);
            outcome.attempted_paths = details.attempted_paths;
            return outcome;
        }

        let mut warnings = Vec::new();
        let products: Vec<ExtractedProduct> = details
            .pages
            .iter()
            .map(|page| {
                let product = self
                    .extractor
                    .extract_for(ctx.platform_id(), &page.markup, &page.url);
                if product.is_empty() {
                    warnings.push(AnalysisFailure::ExtractionEmpty {
                        url: page.url.clone(),
                    });
                }
                product
            })
            .collect();

        AnalysisOutcome {
            success: true,
            domain,
            platform_id: None,
            listing_url: Some(listing.url),
            products,
            error: None,
            failure: None,
            warnings,
            attempted_paths: details.attempted_paths,
            detection: None,
        }
        .with_context(ctx)
    }
}

fn home_failure_reason(ctx: &SiteContext) -> String {
    match &ctx.home {
        Some(page) => format!("home page returned status {}", page.status_code),
        None => "home page unreachable".to_string(),
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
