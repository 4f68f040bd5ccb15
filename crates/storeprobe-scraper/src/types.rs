//! Small value types shared across the discovery pipeline.

use serde::{Deserialize, Serialize};

/// Which kind of page a candidate is being evaluated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageRole {
    /// A page listing many products (PLP).
    Listing,
    /// A single-product page (PDP).
    Detail,
}

impl std::fmt::Display for PageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageRole::Listing => write!(f, "listing"),
            PageRole::Detail => write!(f, "detail"),
        }
    }
}

/// Verdict of the page validator for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// 0..=100.
    pub confidence: u8,
    /// Listing: distinct product links found. Detail: repeated item containers.
    pub item_count: usize,
}

/// A fetched page under evaluation. Produced and discarded per attempt.
#[derive(Debug, Clone)]
pub struct CandidatePage {
    pub url: String,
    pub role: PageRole,
    pub markup: String,
    pub validation: ValidationResult,
}
