//! Platform Classifier: a pure fold of page markup over the signal catalog.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use storeprobe_core::{ConfidenceLevel, MatchKind, PlatformProfile, SignalCatalog};

use crate::html::looks_like_markup;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedSignal {
    pub description: String,
    pub weight: u32,
}

/// Outcome of one classification call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Winning platform, or `None` when no profile reached its threshold.
    pub platform_id: Option<String>,
    pub score: u32,
    pub confidence: ConfidenceLevel,
    /// Signals of the winning platform only.
    pub matched_signals: Vec<MatchedSignal>,
}

impl DetectionResult {
    #[must_use]
    pub fn none() -> Self {
        Self {
            platform_id: None,
            score: 0,
            confidence: ConfidenceLevel::None,
            matched_signals: Vec::new(),
        }
    }

    /// Medium or high confidence in a concrete platform.
    #[must_use]
    pub fn is_confident(&self) -> bool {
        self.platform_id.is_some() && self.confidence >= ConfidenceLevel::Medium
    }
}

enum CompiledMatcher {
    /// Lower-cased needle, compared against lower-cased markup.
    Contains(String),
    Regex(Regex),
}

struct CompiledSignal {
    matcher: CompiledMatcher,
    weight: u32,
    description: String,
}

struct CompiledProfile {
    id: String,
    threshold: u32,
    signals: Vec<CompiledSignal>,
}

struct Score {
    index: usize,
    total: u32,
    matched: Vec<MatchedSignal>,
}

/// Scores markup against every detectable profile in the catalog.
///
/// Matchers are compiled once at construction; [`Self::classify`] has no side
/// effects, so the same markup always produces the same result.
pub struct PlatformClassifier {
    catalog: Arc<SignalCatalog>,
    profiles: Vec<CompiledProfile>,
}

impl PlatformClassifier {
    #[must_use]
    pub fn new(catalog: Arc<SignalCatalog>) -> Self {
        let profiles = catalog.detectable().map(compile_profile).collect();
        Self { catalog, profiles }
    }

    #[must_use]
    pub fn catalog(&self) -> &SignalCatalog {
        &self.catalog
    }

    /// The profile to drive discovery for a detection: the winner, or `generic`.
    #[must_use]
    pub fn profile_for(&self, detection: &DetectionResult) -> &PlatformProfile {
        self.catalog
            .profile_or_generic(detection.platform_id.as_deref())
    }

    #[must_use]
    pub fn classify(&self, markup: &str) -> DetectionResult {
        if markup.trim().is_empty() || !looks_like_markup(markup) {
            return DetectionResult::none();
        }

        let lowered = markup.to_lowercase();
        let mut best: Option<Score> = None;

        for (index, profile) in self.profiles.iter().enumerate() {
            let mut total = 0u32;
            let mut matched = Vec::new();
            for signal in &profile.signals {
                let hit = match &signal.matcher {
                    CompiledMatcher::Contains(needle) => lowered.contains(needle.as_str()),
                    CompiledMatcher::Regex(re) => re.is_match(markup),
                };
                if hit {
                    total = total.saturating_add(signal.weight);
                    matched.push(MatchedSignal {
                        description: signal.description.clone(),
                        weight: signal.weight,
                    });
                }
            }

            if total < profile.threshold || total == 0 {
                continue;
            }

            let candidate = Score {
                index,
                total,
                matched,
            };
            // declaration order wins remaining ties: only replace when strictly better
            let better = best.as_ref().is_none_or(|current| {
                (candidate.total, candidate.matched.len()) > (current.total, current.matched.len())
            });
            if better {
                best = Some(candidate);
            }
        }

        let Some(winner) = best else {
            tracing::debug!("no platform reached its threshold");
            return DetectionResult::none();
        };

        let profile = &self.profiles[winner.index];
        let confidence = self.catalog.bands().band(winner.total);
        tracing::debug!(
            platform = %profile.id,
            score = winner.total,
            %confidence,
            "platform classified"
        );

        DetectionResult {
            platform_id: Some(profile.id.clone()),
            score: winner.total,
            confidence,
            matched_signals: winner.matched,
        }
    }
}

fn compile_profile(profile: &PlatformProfile) -> CompiledProfile {
    let signals = profile
        .signals
        .iter()
        .filter_map(|signal| {
            let matcher = match signal.kind {
                MatchKind::Contains => CompiledMatcher::Contains(signal.pattern.to_lowercase()),
                MatchKind::Regex => match Regex::new(&signal.pattern) {
                    Ok(re) => CompiledMatcher::Regex(re),
                    Err(err) => {
                        // the catalog validates patterns at load, so this only
                        // fires for hand-built catalogs
                        tracing::warn!(
                            platform = %profile.id,
                            pattern = %signal.pattern,
                            error = %err,
                            "skipping signal with invalid regex"
                        );
                        return None;
                    }
                },
            };
            Some(CompiledSignal {
                matcher,
                weight: signal.weight,
                description: signal.description.clone(),
            })
        })
        .collect();

    CompiledProfile {
        id: profile.id.clone(),
        threshold: profile.confidence_threshold,
        signals,
    }
}

#[cfg(test)]
#[path = "classifier_test.rs"]
mod tests;
