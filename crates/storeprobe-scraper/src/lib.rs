//! Adaptive storefront discovery and product extraction.
//!
//! The engine classifies which commerce platform a domain runs on, finds a
//! valid listing page and product detail pages, extracts product content, and
//! records what worked in a per-domain knowledge base so later runs go
//! straight to the confirmed pages.

pub mod backlog;
pub mod classifier;
pub mod discover;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod guard;
mod html;
pub mod knowledge;
pub mod pipeline;
pub mod site;
pub mod types;
pub mod validator;

#[cfg(test)]
mod test_support;

pub use backlog::{Backlog, BacklogEntry, DetectionSnapshot, JsonFileBacklog, MemoryBacklog};
pub use classifier::{DetectionResult, MatchedSignal, PlatformClassifier};
pub use discover::{
    CandidateMatch, CandidateSource, DetailDiscovery, Discoverer, DiscoveryOutcome, SiteContext,
};
pub use error::{ScraperError, StoreError};
pub use extract::{ContentExtractor, ExtractedProduct, QualityScore};
pub use fetch::{FetchedPage, HttpFetcher, PageFetcher};
pub use guard::{Clock, CrawlGuard, GuardPolicy, ManualClock, TokioClock};
pub use knowledge::{
    Attempt, AttemptOutcome, DomainRecord, JsonFileStore, KnowledgeBase, KnowledgePolicy,
    MemoryStore, RecordStore,
};
pub use pipeline::{AnalysisFailure, AnalysisOutcome, Analyzer, AnalyzerSettings};
pub use site::{normalize_domain, SiteOrigin};
pub use types::{CandidatePage, PageRole, ValidationResult};
pub use validator::{PageValidator, ValidationThresholds};
