//! Content Extractor: turns a confirmed detail page into a product record.
//!
//! Title, description, specifications and features each run their own
//! strategy cascade (structured data, platform containers, generic
//! fallbacks). A generic section sweep then collects secondary prose, and
//! the share of the page's main content captured becomes the quality score.
//! Extraction never fails; missing fields are left empty.

mod coverage;
mod document;
mod sections;
mod strategies;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use storeprobe_core::{ExtractionSelectors, SignalCatalog};

use document::PageDocument;
use strategies::{
    first_match, ExtractionContext, DESCRIPTION_STRATEGIES, FEATURE_STRATEGIES,
    SPECIFICATION_STRATEGIES, TITLE_STRATEGIES,
};

pub use coverage::QualityScore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedProduct {
    pub url: String,
    pub title: String,
    pub description: String,
    pub features: Vec<String>,
    pub specifications: BTreeMap<String, String>,
    /// Text of the generic content sections found on the page.
    pub source_sections: Vec<String>,
    pub quality_score: QualityScore,
    pub coverage_ratio: f64,
}

impl ExtractedProduct {
    /// No field could be extracted at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.description.is_empty()
            && self.features.is_empty()
            && self.specifications.is_empty()
            && self.source_sections.is_empty()
    }

    fn extracted_chars(&self) -> usize {
        let count = |s: &str| s.chars().count();
        count(&self.title)
            + count(&self.description)
            + self.features.iter().map(|f| count(f)).sum::<usize>()
            + self
                .specifications
                .iter()
                .map(|(k, v)| count(k) + count(v))
                .sum::<usize>()
            + self.source_sections.iter().map(|s| count(s)).sum::<usize>()
    }
}

pub struct ContentExtractor {
    catalog: Arc<SignalCatalog>,
}

impl ContentExtractor {
    #[must_use]
    pub fn new(catalog: Arc<SignalCatalog>) -> Self {
        Self { catalog }
    }

    /// Extracts without a known platform: every profile's containers are
    /// tried in catalog order.
    #[must_use]
    pub fn extract(&self, markup: &str, url: &str) -> ExtractedProduct {
        self.extract_for(None, markup, url)
    }

    /// Extracts with `platform_id`'s containers tried before the others.
    #[must_use]
    pub fn extract_for(&self, platform_id: Option<&str>, markup: &str, url: &str) -> ExtractedProduct {
        let doc = PageDocument::parse(markup);
        let ctx = ExtractionContext {
            doc: &doc,
            selectors: self.selector_order(platform_id),
        };

        let title = first_match(&ctx, TITLE_STRATEGIES).unwrap_or_default();
        let description = first_match(&ctx, DESCRIPTION_STRATEGIES).unwrap_or_default();
        let specifications = first_match(&ctx, SPECIFICATION_STRATEGIES).unwrap_or_default();
        let features = first_match(&ctx, FEATURE_STRATEGIES).unwrap_or_default();

        let mut seen = HashSet::new();
        if !description.is_empty() {
            seen.insert(sections::fingerprint(&description));
        }
        let source_sections = sections::sweep_sections(&doc, &mut seen);

        let mut product = ExtractedProduct {
            url: url.to_string(),
            title,
            description,
            features,
            specifications,
            source_sections,
            quality_score: QualityScore::Poor,
            coverage_ratio: 0.0,
        };

        let estimated = coverage::estimated_content_chars(&doc);
        product.coverage_ratio = coverage::coverage_ratio(product.extracted_chars(), estimated);
        product.quality_score = QualityScore::from_coverage(product.coverage_ratio);

        if product.is_empty() {
            tracing::warn!(url, "extraction found no product fields");
        } else {
            tracing::debug!(
                url,
                quality = %product.quality_score,
                coverage = product.coverage_ratio,
                features = product.features.len(),
                specs = product.specifications.len(),
                "extracted product"
            );
        }
        product
    }

    /// `platform_id` first, then remaining detectable profiles, `generic` last.
    fn selector_order(&self, platform_id: Option<&str>) -> Vec<&ExtractionSelectors> {
        let preferred = platform_id.and_then(|id| self.catalog.profile(id));
        let mut order: Vec<&ExtractionSelectors> = preferred.map(|p| &p.selectors).into_iter().collect();
        order.extend(
            self.catalog
                .detectable()
                .filter(|p| Some(p.id.as_str()) != preferred.map(|pp| pp.id.as_str()))
                .map(|p| &p.selectors),
        );
        order.push(&self.catalog.generic().selectors);
        order
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
