use serde::Serialize;

use crate::classifier::DetectionResult;
use crate::fetch::FetchedPage;
use crate::site::SiteOrigin;
use crate::types::{CandidatePage, PageRole};

/// Where a validated candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    KnowledgeBase,
    PlatformPath,
    CrossHostRedirect,
    Homepage,
    HarvestedLink,
    ListingLink,
}

/// A candidate that passed validation, with the markup it was validated on.
#[derive(Debug, Clone)]
pub struct CandidateMatch {
    pub url: String,
    pub role: PageRole,
    pub confidence: u8,
    pub item_count: usize,
    pub source: CandidateSource,
    pub markup: String,
}

impl CandidateMatch {
    pub(crate) fn from_page(page: CandidatePage, source: CandidateSource) -> Self {
        Self {
            url: page.url,
            role: page.role,
            confidence: page.validation.confidence,
            item_count: page.validation.item_count,
            source,
            markup: page.markup,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DiscoveryOutcome {
    Found(CandidateMatch),
    NotFound {
        role: PageRole,
        attempted_paths: Vec<String>,
        /// Present when the home page was classified during the search.
        detection: Option<DetectionResult>,
    },
}

impl DiscoveryOutcome {
    #[must_use]
    pub fn found(&self) -> Option<&CandidateMatch> {
        match self {
            DiscoveryOutcome::Found(candidate) => Some(candidate),
            DiscoveryOutcome::NotFound { .. } => None,
        }
    }
}

/// Result of a detail-page search.
#[derive(Debug, Clone, Default)]
pub struct DetailDiscovery {
    /// Validated detail pages in discovery order.
    pub pages: Vec<CandidateMatch>,
    pub attempted_paths: Vec<String>,
}

/// Per-analysis state for one site: the home page is fetched and classified
/// at most once, and the confirmed listing is remembered for detail search.
#[derive(Debug, Clone)]
pub struct SiteContext {
    origin: SiteOrigin,
    pub(crate) home: Option<FetchedPage>,
    pub(crate) home_loaded: bool,
    pub(crate) detection: Option<DetectionResult>,
    pub(crate) platform_id: Option<String>,
    pub(crate) listing: Option<CandidateMatch>,
}

impl SiteContext {
    #[must_use]
    pub fn new(origin: SiteOrigin) -> Self {
        Self {
            origin,
            home: None,
            home_loaded: false,
            detection: None,
            platform_id: None,
            listing: None,
        }
    }

    #[must_use]
    pub fn origin(&self) -> &SiteOrigin {
        &self.origin
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        self.origin.domain()
    }

    /// Classifier verdict on the home page, if it was classified.
    #[must_use]
    pub fn detection(&self) -> Option<&DetectionResult> {
        self.detection.as_ref()
    }

    /// Best known platform: detected this run, or remembered from earlier runs.
    #[must_use]
    pub fn platform_id(&self) -> Option<&str> {
        self.detection
            .as_ref()
            .and_then(|d| d.platform_id.as_deref())
            .or(self.platform_id.as_deref())
    }

    #[must_use]
    pub fn listing(&self) -> Option<&CandidateMatch> {
        self.listing.as_ref()
    }

    pub(crate) fn home_markup(&self) -> Option<&str> {
        self.home
            .as_ref()
            .filter(|page| page.success)
            .map(|page| page.markup.as_str())
    }
}
