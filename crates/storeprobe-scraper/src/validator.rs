//! Page Validator: role-specific scoring of a fetched candidate page.
//!
//! The same heuristic runs whether the candidate came from the knowledge
//! base, a classifier suggestion, or a harvested link.

use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;
use reqwest::Url;
use storeprobe_core::{AppConfig, PlatformProfile, SignalCatalog};

use crate::html::{
    count_class_markers, count_price_tokens, extract_hrefs, has_add_to_cart, has_og_product,
    has_product_json_ld, ITEM_CONTAINER_MARKERS,
};
use crate::site::normalize_domain;
use crate::types::{PageRole, ValidationResult};

/// Path segments that mark a page as a shop or category listing.
const LISTING_SEGMENTS: &[&str] = &[
    "shop",
    "store",
    "collections",
    "collection",
    "category",
    "categories",
    "product-category",
    "catalog",
    "products",
    "all-products",
    "shop-all",
];

const CONTAINER_WEIGHT_CAP: i32 = 25;
const LINK_WEIGHT_CAP: i32 = 45;
const LISTING_SEGMENT_WEIGHT: i32 = 15;
const LISTING_PRICE_WEIGHT: i32 = 10;
const LISTING_MIN_PRICES: usize = 3;
const HOMEPAGE_MIN_CONFIDENCE: u8 = 60;

const DETAIL_PRICE_WEIGHT: i32 = 30;
const DETAIL_CART_WEIGHT: i32 = 35;
const DETAIL_JSON_LD_WEIGHT: i32 = 25;
const DETAIL_OG_WEIGHT: i32 = 15;
const DETAIL_SHAPE_WEIGHT: i32 = 15;
const DETAIL_MULTI_ITEM_PENALTY: i32 = 30;
const DETAIL_MULTI_ITEM_CONTAINERS: usize = 4;

/// Named, tunable cut-offs for both roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationThresholds {
    pub listing_min_confidence: u8,
    /// Item links required (strictly more than) alongside the confidence cut-off.
    pub listing_min_links: usize,
    /// Item links (strictly more than) that pass a listing on their own.
    pub listing_override_links: usize,
    /// Item links above which the home page itself counts as a listing.
    pub homepage_links: usize,
    pub detail_min_confidence: u8,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            listing_min_confidence: 40,
            listing_min_links: 3,
            listing_override_links: 10,
            homepage_links: 20,
            detail_min_confidence: 40,
        }
    }
}

impl From<&AppConfig> for ValidationThresholds {
    fn from(config: &AppConfig) -> Self {
        Self {
            listing_min_confidence: config.listing_min_confidence,
            listing_min_links: config.listing_min_links,
            listing_override_links: config.listing_override_links,
            homepage_links: config.listing_homepage_links,
            detail_min_confidence: config.detail_min_confidence,
        }
    }
}

struct Shape {
    platform_id: String,
    regex: Regex,
}

pub struct PageValidator {
    catalog: Arc<SignalCatalog>,
    shapes: Vec<Shape>,
    thresholds: ValidationThresholds,
}

impl PageValidator {
    #[must_use]
    pub fn new(catalog: Arc<SignalCatalog>, thresholds: ValidationThresholds) -> Self {
        let shapes = catalog
            .platforms()
            .iter()
            .flat_map(|profile| {
                profile.detail_url_shapes.iter().filter_map(|pattern| {
                    Regex::new(pattern).ok().map(|regex| Shape {
                        platform_id: profile.id.clone(),
                        regex,
                    })
                })
            })
            .collect();
        Self {
            catalog,
            shapes,
            thresholds,
        }
    }

    #[must_use]
    pub fn thresholds(&self) -> &ValidationThresholds {
        &self.thresholds
    }

    /// Validates against the detail-URL shapes of every catalog profile.
    #[must_use]
    pub fn validate(&self, markup: &str, url: &str, role: PageRole) -> ValidationResult {
        let shapes: Vec<&Regex> = self.shapes.iter().map(|s| &s.regex).collect();
        self.score(markup, url, role, &shapes)
    }

    /// Validates using `profile`'s detail-URL shapes plus the generic ones.
    #[must_use]
    pub fn validate_for(
        &self,
        profile: &PlatformProfile,
        markup: &str,
        url: &str,
        role: PageRole,
    ) -> ValidationResult {
        let shapes = self.shapes_for(profile);
        self.score(markup, url, role, &shapes)
    }

    /// Distinct same-site links on the page that look like product detail
    /// pages for `profile`, resolved against `page_url`, in document order.
    #[must_use]
    pub fn detail_links(&self, profile: &PlatformProfile, markup: &str, page_url: &str) -> Vec<String> {
        let shapes = self.shapes_for(profile);
        item_links(markup, page_url, &shapes)
    }

    /// Whether `url`'s path has the detail shape of `profile` (or generic).
    #[must_use]
    pub fn is_detail_url(&self, profile: &PlatformProfile, url: &str) -> bool {
        let shapes = self.shapes_for(profile);
        Url::parse(url).is_ok_and(|u| matches_any(&shapes, u.path()))
    }

    fn shapes_for(&self, profile: &PlatformProfile) -> Vec<&Regex> {
        let generic = self.catalog.generic().id.as_str();
        self.shapes
            .iter()
            .filter(|s| s.platform_id == profile.id || s.platform_id == generic)
            .map(|s| &s.regex)
            .collect()
    }

    fn score(&self, markup: &str, url: &str, role: PageRole, shapes: &[&Regex]) -> ValidationResult {
        let result = match role {
            PageRole::Listing => self.score_listing(markup, url, shapes),
            PageRole::Detail => self.score_detail(markup, url, shapes),
        };
        tracing::debug!(
            url,
            %role,
            valid = result.is_valid,
            confidence = result.confidence,
            items = result.item_count,
            "validated candidate"
        );
        result
    }

    fn score_listing(&self, markup: &str, url: &str, shapes: &[&Regex]) -> ValidationResult {
        let links = item_links(markup, url, shapes).len();
        let containers = count_class_markers(markup, ITEM_CONTAINER_MARKERS);
        let path = Url::parse(url).map(|u| u.path().to_string()).unwrap_or_default();

        let mut confidence = 0i32;
        if containers >= 2 {
            confidence += capped(containers, 3, CONTAINER_WEIGHT_CAP);
        }
        confidence += capped(links, 3, LINK_WEIGHT_CAP);
        if has_listing_segment(&path) {
            confidence += LISTING_SEGMENT_WEIGHT;
        }
        if count_price_tokens(markup) >= LISTING_MIN_PRICES {
            confidence += LISTING_PRICE_WEIGHT;
        }
        let mut confidence = clamp_confidence(confidence);

        let t = &self.thresholds;
        let is_homepage = path.is_empty() || path == "/";
        if is_homepage && links > t.homepage_links {
            confidence = confidence.max(HOMEPAGE_MIN_CONFIDENCE);
        }

        let is_valid = (confidence >= t.listing_min_confidence && links > t.listing_min_links)
            || links > t.listing_override_links;

        ValidationResult {
            is_valid,
            confidence,
            item_count: links,
        }
    }

    fn score_detail(&self, markup: &str, url: &str, shapes: &[&Regex]) -> ValidationResult {
        let lowered = markup.to_lowercase();
        let containers = count_class_markers(markup, ITEM_CONTAINER_MARKERS);

        let mut confidence = 0i32;
        if count_price_tokens(markup) > 0 {
            confidence += DETAIL_PRICE_WEIGHT;
        }
        if has_add_to_cart(&lowered) {
            confidence += DETAIL_CART_WEIGHT;
        }
        if has_product_json_ld(markup) {
            confidence += DETAIL_JSON_LD_WEIGHT;
        }
        if has_og_product(markup) {
            confidence += DETAIL_OG_WEIGHT;
        }
        if Url::parse(url).is_ok_and(|u| matches_any(shapes, u.path())) {
            confidence += DETAIL_SHAPE_WEIGHT;
        }
        if containers >= DETAIL_MULTI_ITEM_CONTAINERS {
            confidence -= DETAIL_MULTI_ITEM_PENALTY;
        }
        let confidence = clamp_confidence(confidence);

        ValidationResult {
            is_valid: confidence >= self.thresholds.detail_min_confidence,
            confidence,
            item_count: containers,
        }
    }
}

fn item_links(markup: &str, page_url: &str, shapes: &[&Regex]) -> Vec<String> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };
    let site = normalize_domain(page_url);
    let mut seen = HashSet::new();

    extract_hrefs(markup)
        .into_iter()
        .filter_map(|href| base.join(&href).ok())
        .filter(|link| matches!(link.scheme(), "http" | "https"))
        .filter(|link| normalize_domain(link.as_str()) == site)
        .filter(|link| matches_any(shapes, link.path()))
        .filter_map(|mut link| {
            link.set_fragment(None);
            link.set_query(None);
            let key = link.path().trim_end_matches('/').to_string();
            seen.insert(key).then(|| link.to_string())
        })
        .collect()
}

fn matches_any(shapes: &[&Regex], path: &str) -> bool {
    shapes.iter().any(|re| re.is_match(path))
}

fn has_listing_segment(path: &str) -> bool {
    path.split('/')
        .filter(|s| !s.is_empty())
        .any(|segment| {
            let segment = segment.to_ascii_lowercase();
            let segment = segment.trim_end_matches(".html");
            LISTING_SEGMENTS.contains(&segment)
        })
}

fn capped(count: usize, per_item: i32, cap: i32) -> i32 {
    i32::try_from(count)
        .unwrap_or(i32::MAX)
        .saturating_mul(per_item)
        .min(cap)
}

fn clamp_confidence(value: i32) -> u8 {
    u8::try_from(value.clamp(0, 100)).unwrap_or(100)
}

#[cfg(test)]
#[path = "validator_test.rs"]
mod tests;
