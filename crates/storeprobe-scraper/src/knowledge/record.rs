//! Persisted per-domain knowledge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::PageRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    Success,
    Failure,
    /// The record was hard-reset by `cleanup`.
    Reset,
}

/// One entry in a record's bounded history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub at: DateTime<Utc>,
    /// `None` for record-wide events such as a reset.
    pub role: Option<PageRole>,
    pub outcome: AttemptOutcome,
    /// The confirmed URL on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempted_paths: Vec<String>,
}

/// Everything the engine remembers about one normalised domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub domain: String,
    pub platform_id: Option<String>,
    pub confirmed_listing_pattern: Option<String>,
    pub confirmed_detail_pattern: Option<String>,
    pub success_count: u64,
    /// Lifetime total across both roles.
    pub failure_count: u64,
    /// Consecutive listing failures since the last listing success.
    #[serde(default)]
    pub listing_failure_streak: u32,
    /// Consecutive detail failures since the last detail success.
    #[serde(default)]
    pub detail_failure_streak: u32,
    /// Oldest first; never longer than the knowledge base's history limit.
    #[serde(default)]
    pub recent_attempts: Vec<Attempt>,
    pub last_updated: DateTime<Utc>,
    /// While set, confirmed patterns must not be used as a shortcut.
    pub needs_reanalysis: bool,
}

impl DomainRecord {
    #[must_use]
    pub fn new(domain: &str, now: DateTime<Utc>) -> Self {
        Self {
            domain: domain.to_string(),
            platform_id: None,
            confirmed_listing_pattern: None,
            confirmed_detail_pattern: None,
            success_count: 0,
            failure_count: 0,
            listing_failure_streak: 0,
            detail_failure_streak: 0,
            recent_attempts: Vec::new(),
            last_updated: now,
            needs_reanalysis: false,
        }
    }

    #[must_use]
    pub fn confirmed_pattern(&self, role: PageRole) -> Option<&str> {
        match role {
            PageRole::Listing => self.confirmed_listing_pattern.as_deref(),
            PageRole::Detail => self.confirmed_detail_pattern.as_deref(),
        }
    }

    /// The confirmed pattern for `role`, unless the record is flagged for
    /// re-analysis.
    #[must_use]
    pub fn usable_pattern(&self, role: PageRole) -> Option<&str> {
        if self.needs_reanalysis {
            None
        } else {
            self.confirmed_pattern(role)
        }
    }

    pub(crate) fn set_confirmed_pattern(&mut self, role: PageRole, url: Option<String>) {
        match role {
            PageRole::Listing => self.confirmed_listing_pattern = url,
            PageRole::Detail => self.confirmed_detail_pattern = url,
        }
    }

    pub(crate) fn streak_mut(&mut self, role: PageRole) -> &mut u32 {
        match role {
            PageRole::Listing => &mut self.listing_failure_streak,
            PageRole::Detail => &mut self.detail_failure_streak,
        }
    }

    /// Appends to the history ring, evicting the oldest entries past `limit`.
    pub(crate) fn push_attempt(&mut self, attempt: Attempt, limit: usize) {
        self.recent_attempts.push(attempt);
        let limit = limit.max(1);
        if self.recent_attempts.len() > limit {
            let excess = self.recent_attempts.len() - limit;
            self.recent_attempts.drain(..excess);
        }
    }
}
