//! Coverage estimate and quality banding.

use serde::{Deserialize, Serialize};

use super::document::{visible_text, PageDocument};

const MAIN_REGION_SELECTORS: &[&str] = &[
    "main",
    r#"[role="main"]"#,
    "#MainContent",
    "#main-content",
    "#main",
    "#content",
    ".main-content",
];

/// Share of whole-page text assumed to be main content when no main region
/// can be identified.
const BODY_CONTENT_FRACTION: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityScore {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityScore {
    #[must_use]
    pub fn from_coverage(ratio: f64) -> Self {
        if ratio >= 0.8 {
            QualityScore::Excellent
        } else if ratio >= 0.6 {
            QualityScore::Good
        } else if ratio >= 0.4 {
            QualityScore::Fair
        } else {
            QualityScore::Poor
        }
    }
}

impl std::fmt::Display for QualityScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityScore::Poor => write!(f, "poor"),
            QualityScore::Fair => write!(f, "fair"),
            QualityScore::Good => write!(f, "good"),
            QualityScore::Excellent => write!(f, "excellent"),
        }
    }
}

/// Estimated size, in characters, of the page's main content.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn estimated_content_chars(doc: &PageDocument) -> f64 {
    let main_region = MAIN_REGION_SELECTORS.iter().find_map(|selector| {
        doc.select_all(selector)
            .first()
            .map(|el| visible_text(el).chars().count())
            .filter(|len| *len > 0)
    });

    match main_region {
        Some(len) => len as f64,
        None => doc.body_text_len() as f64 * BODY_CONTENT_FRACTION,
    }
}

/// `extracted / estimated`, clamped to `0.0..=1.0`; zero when the page has no text.
pub(crate) fn coverage_ratio(extracted_chars: usize, estimated_total: f64) -> f64 {
    if estimated_total <= 0.0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = extracted_chars as f64 / estimated_total;
    ratio.clamp(0.0, 1.0)
}
