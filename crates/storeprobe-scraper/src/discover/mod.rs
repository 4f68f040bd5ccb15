//! Candidate Page Discoverer.
//!
//! Finds a valid listing page, then valid detail pages, for one site. The
//! search order is: the knowledge base's confirmed pattern, the classified
//! platform's candidate paths (generic paths appended), the home page
//! itself, and finally one category link harvested from the home page.
//! Every fetch goes through the [`CrawlGuard`]; the discoverer holds no
//! network code of its own.

mod harvest;
mod types;

use std::collections::HashSet;

use storeprobe_core::PlatformProfile;

use crate::backlog::{Backlog, BacklogEntry, DetectionSnapshot};
use crate::classifier::{DetectionResult, PlatformClassifier};
use crate::error::ScraperError;
use crate::fetch::PageFetcher;
use crate::guard::CrawlGuard;
use crate::knowledge::{DomainRecord, KnowledgeBase};
use crate::site::{url_path, SiteOrigin};
use crate::types::{CandidatePage, PageRole};
use crate::validator::PageValidator;

pub use types::{CandidateMatch, CandidateSource, DetailDiscovery, DiscoveryOutcome, SiteContext};

/// Borrowed view of the engine's components for one discovery run.
pub struct Discoverer<'a, F> {
    fetcher: &'a F,
    guard: &'a CrawlGuard,
    classifier: &'a PlatformClassifier,
    validator: &'a PageValidator,
    knowledge: &'a KnowledgeBase,
    backlog: &'a dyn Backlog,
}

impl<'a, F: PageFetcher> Discoverer<'a, F> {
    #[must_use]
    pub fn new(
        fetcher: &'a F,
        guard: &'a CrawlGuard,
        classifier: &'a PlatformClassifier,
        validator: &'a PageValidator,
        knowledge: &'a KnowledgeBase,
        backlog: &'a dyn Backlog,
    ) -> Self {
        Self {
            fetcher,
            guard,
            classifier,
            validator,
            knowledge,
            backlog,
        }
    }

    /// Finds a page of `role` for `domain`. A detail search first confirms a
    /// listing page; if that fails the listing outcome is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if `domain` cannot be turned into
    /// an origin. Fetch and validation failures are outcomes, not errors.
    pub async fn discover(&self, domain: &str, role: PageRole) -> Result<DiscoveryOutcome, ScraperError> {
        let mut ctx = SiteContext::new(SiteOrigin::parse(domain)?);
        Ok(self.discover_in(&mut ctx, role).await)
    }

    /// As [`Self::discover`], reusing (and filling) an existing site context.
    pub async fn discover_in(&self, ctx: &mut SiteContext, role: PageRole) -> DiscoveryOutcome {
        match role {
            PageRole::Listing => self.discover_listing(ctx).await,
            PageRole::Detail => {
                let listing = match ctx.listing.clone() {
                    Some(listing) => listing,
                    None => match self.discover_listing(ctx).await {
                        DiscoveryOutcome::Found(listing) => listing,
                        not_found @ DiscoveryOutcome::NotFound { .. } => return not_found,
                    },
                };
                let details = self.discover_details(ctx, &listing, 1).await;
                match details.pages.into_iter().next() {
                    Some(page) => DiscoveryOutcome::Found(page),
                    None => DiscoveryOutcome::NotFound {
                        role: PageRole::Detail,
                        attempted_paths: details.attempted_paths,
                        detection: ctx.detection.clone(),
                    },
                }
            }
        }
    }

    /// Runs the listing search and records the outcome in the knowledge base
    /// (and the backlog when a confidently detected platform still failed).
    pub async fn discover_listing(&self, ctx: &mut SiteContext) -> DiscoveryOutcome {
        let domain = ctx.domain().to_string();
        let record = self.knowledge.lookup(&domain).await;
        if ctx.platform_id.is_none() {
            ctx.platform_id.clone_from(&record.platform_id);
        }

        let mut attempted = Vec::new();
        let mut tried = HashSet::new();

        // 1. confirmed pattern from an earlier run
        if let Some(url) = record.usable_pattern(PageRole::Listing) {
            let profile = self.profile_for(ctx.platform_id());
            tracing::debug!(domain = %domain, url, "trying confirmed listing pattern");
            if let Some(found) = self
                .try_candidate(
                    url,
                    PageRole::Listing,
                    CandidateSource::KnowledgeBase,
                    profile,
                    &mut attempted,
                    &mut tried,
                )
                .await
            {
                return self.confirm_listing(ctx, found).await;
            }
        } else if record.needs_reanalysis {
            tracing::debug!(domain = %domain, "record flagged for re-analysis, skipping shortcut");
        }

        // 2. classify the home page and walk the platform's paths
        self.ensure_home(ctx).await;
        let detection = self.ensure_detection(ctx);
        let profile = self.classifier.profile_for(&detection);
        if detection.platform_id.is_none() {
            tracing::debug!(domain = %domain, "no platform detected, using generic candidates");
        }

        for path in self.listing_paths(profile) {
            let Some(url) = ctx.origin().resolve(&path) else {
                continue;
            };
            if tried.contains(&url) {
                continue;
            }
            if let Some(found) = self
                .try_candidate(
                    &url,
                    PageRole::Listing,
                    CandidateSource::PlatformPath,
                    profile,
                    &mut attempted,
                    &mut tried,
                )
                .await
            {
                return self.confirm_listing(ctx, found).await;
            }
        }

        // 3. the home page itself, then one harvested category link
        if let Some(home_markup) = ctx.home_markup().map(str::to_string) {
            let home_url = ctx.origin().home_url();
            let validation = self
                .validator
                .validate_for(profile, &home_markup, &home_url, PageRole::Listing);
            if validation.is_valid {
                let page = CandidatePage {
                    url: home_url,
                    role: PageRole::Listing,
                    markup: home_markup,
                    validation,
                };
                return self
                    .confirm_listing(ctx, CandidateMatch::from_page(page, CandidateSource::Homepage))
                    .await;
            }

            let harvested =
                harvest::category_candidate(&home_markup, ctx.origin(), self.validator, profile, &tried);
            if let Some(url) = harvested {
                tracing::debug!(domain = %domain, url = %url, "trying harvested category link");
                if let Some(found) = self
                    .try_candidate(
                        &url,
                        PageRole::Listing,
                        CandidateSource::HarvestedLink,
                        profile,
                        &mut attempted,
                        &mut tried,
                    )
                    .await
                {
                    return self.confirm_listing(ctx, found).await;
                }
            }
        }

        self.listing_not_found(ctx, &domain, attempted, detection).await
    }

    /// Validates detail pages linked from `listing` until `limit` pass.
    ///
    /// A confirmed detail URL from the knowledge base is tried first; links
    /// sharing its path shape are preferred. At most `limit * 3` candidates
    /// are fetched. The first confirmed page reinforces the detail role;
    /// finding none penalizes it.
    pub async fn discover_details(
        &self,
        ctx: &mut SiteContext,
        listing: &CandidateMatch,
        limit: usize,
    ) -> DetailDiscovery {
        let domain = ctx.domain().to_string();
        let record = self.knowledge.lookup(&domain).await;
        let profile = self.profile_for(ctx.platform_id().or(record.platform_id.as_deref()));
        let limit = limit.max(1);
        let max_attempts = limit.saturating_mul(3);

        let mut result = DetailDiscovery::default();
        let mut tried = HashSet::new();

        if let Some(url) = record.usable_pattern(PageRole::Detail) {
            if let Some(found) = self
                .try_candidate(
                    url,
                    PageRole::Detail,
                    CandidateSource::KnowledgeBase,
                    profile,
                    &mut result.attempted_paths,
                    &mut tried,
                )
                .await
            {
                result.pages.push(found);
            }
        }

        let links = ordered_detail_links(
            self.validator.detail_links(profile, &listing.markup, &listing.url),
            &record,
        );
        tracing::debug!(domain = %domain, links = links.len(), "detail candidates harvested from listing");

        for link in links {
            if result.pages.len() >= limit || tried.len() >= max_attempts {
                break;
            }
            if tried.contains(&link) {
                continue;
            }
            if let Some(found) = self
                .try_candidate(
                    &link,
                    PageRole::Detail,
                    CandidateSource::ListingLink,
                    profile,
                    &mut result.attempted_paths,
                    &mut tried,
                )
                .await
            {
                result.pages.push(found);
            }
        }

        let platform = ctx.platform_id().map(str::to_string);
        if let Some(first) = result.pages.first() {
            if let Err(err) = self
                .knowledge
                .reinforce(&domain, PageRole::Detail, &first.url, platform.as_deref())
                .await
            {
                tracing::warn!(domain = %domain, error = %err, "could not record confirmed detail page");
            }
        } else {
            tracing::info!(domain = %domain, attempted = result.attempted_paths.len(), "no valid detail page found");
            if let Err(err) = self
                .knowledge
                .penalize(&domain, PageRole::Detail, &result.attempted_paths)
                .await
            {
                tracing::warn!(domain = %domain, error = %err, "could not record detail failure");
            }
        }
        result
    }

    fn profile_for(&self, platform_id: Option<&str>) -> &'a PlatformProfile {
        self.classifier.catalog().profile_or_generic(platform_id)
    }

    /// Profile paths in priority order, then generic paths not already listed.
    fn listing_paths(&self, profile: &PlatformProfile) -> Vec<String> {
        let mut seen = HashSet::new();
        profile
            .listing_paths
            .iter()
            .chain(self.classifier.catalog().generic().listing_paths.iter())
            .filter(|path| seen.insert(path.trim_end_matches('/').to_string()))
            .cloned()
            .collect()
    }

    async fn ensure_home(&self, ctx: &mut SiteContext) {
        if ctx.home_loaded {
            return;
        }
        ctx.home_loaded = true;
        let url = ctx.origin().home_url();
        match self.guard.fetch(self.fetcher, &url).await {
            Ok(page) if page.is_cross_host_redirect(&url) => {
                tracing::debug!(url = %url, target = %page.final_url, "home page redirects cross-host");
                ctx.home = self.guard.fetch(self.fetcher, &page.final_url).await.ok();
            }
            Ok(page) => ctx.home = Some(page),
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "home page fetch failed");
                ctx.home = None;
            }
        }
    }

    fn ensure_detection(&self, ctx: &mut SiteContext) -> DetectionResult {
        if let Some(detection) = &ctx.detection {
            return detection.clone();
        }
        let detection = ctx
            .home_markup()
            .map_or_else(DetectionResult::none, |markup| self.classifier.classify(markup));
        ctx.detection = Some(detection.clone());
        detection
    }

    /// Fetches and validates one candidate, following a cross-host redirect
    /// once. Records what was attempted either way.
    async fn try_candidate(
        &self,
        url: &str,
        role: PageRole,
        source: CandidateSource,
        profile: &PlatformProfile,
        attempted: &mut Vec<String>,
        tried: &mut HashSet<String>,
    ) -> Option<CandidateMatch> {
        tried.insert(url.to_string());
        attempted.push(attempt_label(url, role));

        let page = match self.guard.fetch(self.fetcher, url).await {
            Ok(page) => page,
            Err(err) => {
                tracing::debug!(url, %role, error = %err, "candidate fetch failed");
                return None;
            }
        };

        let (page, source) = if page.is_cross_host_redirect(url) {
            let target = page.final_url.clone();
            if !tried.insert(target.clone()) {
                return None;
            }
            tracing::debug!(url, target = %target, %role, "re-fetching at cross-host redirect target");
            attempted.push(target.clone());
            match self.guard.fetch(self.fetcher, &target).await {
                Ok(page) => (page, CandidateSource::CrossHostRedirect),
                Err(err) => {
                    tracing::debug!(url = %target, %role, error = %err, "redirect target fetch failed");
                    return None;
                }
            }
        } else {
            (page, source)
        };

        if !page.success {
            tracing::debug!(url, %role, status = page.status_code, "candidate not retrievable");
            return None;
        }

        let final_url = if page.final_url.is_empty() {
            url.to_string()
        } else {
            page.final_url
        };
        let validation = self
            .validator
            .validate_for(profile, &page.markup, &final_url, role);
        if !validation.is_valid {
            return None;
        }

        let candidate = CandidatePage {
            url: final_url,
            role,
            markup: page.markup,
            validation,
        };
        Some(CandidateMatch::from_page(candidate, source))
    }

    async fn confirm_listing(&self, ctx: &mut SiteContext, found: CandidateMatch) -> DiscoveryOutcome {
        let domain = ctx.domain().to_string();
        let platform = ctx.platform_id().map(str::to_string);
        tracing::info!(
            domain = %domain,
            url = %found.url,
            confidence = found.confidence,
            items = found.item_count,
            source = ?found.source,
            "listing page confirmed"
        );
        if let Err(err) = self
            .knowledge
            .reinforce(&domain, PageRole::Listing, &found.url, platform.as_deref())
            .await
        {
            tracing::warn!(domain = %domain, error = %err, "could not record confirmed listing page");
        }
        ctx.listing = Some(found.clone());
        DiscoveryOutcome::Found(found)
    }

    async fn listing_not_found(
        &self,
        ctx: &SiteContext,
        domain: &str,
        attempted: Vec<String>,
        detection: DetectionResult,
    ) -> DiscoveryOutcome {
        tracing::info!(domain = %domain, attempted = attempted.len(), "no valid listing page found");
        if let Err(err) = self
            .knowledge
            .penalize(domain, PageRole::Listing, &attempted)
            .await
        {
            tracing::warn!(domain = %domain, error = %err, "could not record listing failure");
        }

        if detection.is_confident() {
            let entry = BacklogEntry::new(
                domain,
                format!(
                    "{} detected with {} confidence but no listing page validated",
                    detection.platform_id.as_deref().unwrap_or("platform"),
                    detection.confidence
                ),
                DetectionSnapshot::from(&detection),
                attempted.clone(),
            );
            if let Err(err) = self.backlog.add(entry) {
                tracing::warn!(domain = %domain, error = %err, "could not add domain to backlog");
            }
        }

        DiscoveryOutcome::NotFound {
            role: PageRole::Listing,
            attempted_paths: attempted,
            detection: ctx.detection.clone(),
        }
    }
}

/// Listing candidates are recorded by path, detail candidates by full URL.
fn attempt_label(url: &str, role: PageRole) -> String {
    match role {
        PageRole::Listing => url_path(url).unwrap_or_else(|| url.to_string()),
        PageRole::Detail => url.to_string(),
    }
}

/// Moves links that share the confirmed detail URL's parent path to the front,
/// keeping document order otherwise.
fn ordered_detail_links(mut links: Vec<String>, record: &DomainRecord) -> Vec<String> {
    let Some(prefix) = record
        .confirmed_detail_pattern
        .as_deref()
        .and_then(url_path)
        .and_then(|path| {
            let trimmed = path.trim_end_matches('/');
            trimmed.rfind('/').map(|i| trimmed[..=i].to_string())
        })
        .filter(|prefix| prefix.len() > 1)
    else {
        return links;
    };
    links.sort_by_key(|link| !url_path(link).is_some_and(|path| path.starts_with(&prefix)));
    links
}

#[cfg(test)]
#[path = "discover_test.rs"]
mod tests;
