//! Signal Catalog: declarative, versioned platform detection tables.
//!
//! The catalog is pure data. It is parsed from YAML once (the built-in copy
//! ships as `config/platforms.yaml`), validated, and then only read.

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Id of the fallback profile. It never wins classification; it supplies
/// candidate paths, URL shapes and selectors when nothing was detected.
pub const GENERIC_PLATFORM_ID: &str = "generic";

const BUILTIN_CATALOG: &str = include_str!("../../../config/platforms.yaml");

/// Coarse bucket derived from a numeric detection score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    None,
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceLevel::None => write!(f, "none"),
            ConfidenceLevel::Low => write!(f, "low"),
            ConfidenceLevel::Medium => write!(f, "medium"),
            ConfidenceLevel::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Case-insensitive substring match.
    #[default]
    Contains,
    /// Regular expression evaluated against the raw markup.
    Regex,
}

/// A matchable marker of platform identity and its score contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSignal {
    pub pattern: String,
    #[serde(default)]
    pub kind: MatchKind,
    pub weight: u32,
    pub description: String,
}

/// Ordered CSS selector lists for the platform's named content containers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSelectors {
    #[serde(default)]
    pub title: Vec<String>,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub specifications: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub signals: Vec<PlatformSignal>,
    /// Listing page paths, highest priority first.
    pub listing_paths: Vec<String>,
    /// Regexes matched against a URL path to recognise product detail links.
    #[serde(default)]
    pub detail_url_shapes: Vec<String>,
    /// Minimum summed signal weight for this platform to be a candidate.
    #[serde(default)]
    pub confidence_threshold: u32,
    #[serde(default)]
    pub selectors: ExtractionSelectors,
}

impl PlatformProfile {
    #[must_use]
    pub fn is_generic(&self) -> bool {
        self.id == GENERIC_PLATFORM_ID
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

/// Fixed score-to-band lookup shared by every platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceBands {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

impl Default for ConfidenceBands {
    fn default() -> Self {
        Self {
            high: 20,
            medium: 10,
            low: 5,
        }
    }
}

impl ConfidenceBands {
    #[must_use]
    pub fn band(&self, score: u32) -> ConfidenceLevel {
        if score == 0 {
            ConfidenceLevel::None
        } else if score >= self.high {
            ConfidenceLevel::High
        } else if score >= self.medium {
            ConfidenceLevel::Medium
        } else if score >= self.low {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::None
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    version: u32,
    #[serde(default)]
    bands: ConfidenceBands,
    platforms: Vec<PlatformProfile>,
}

/// Validated, immutable set of platform profiles in declaration order.
#[derive(Debug, Clone)]
pub struct SignalCatalog {
    version: u32,
    bands: ConfidenceBands,
    platforms: Vec<PlatformProfile>,
    generic_index: usize,
}

impl SignalCatalog {
    /// The catalog compiled into the crate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` only if the embedded YAML is broken, which the
    /// crate's own tests guard against.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_yaml_str(BUILTIN_CATALOG)
    }

    /// Load and validate a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load from `path` when given, otherwise fall back to [`Self::builtin`].
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::load`] or [`Self::builtin`].
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    /// Parse and validate catalog YAML.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::CatalogParse` for malformed YAML and
    /// `ConfigError::Validation` for structurally invalid catalogs.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        let generic_index = validate_catalog(&file)?;
        Ok(Self {
            version: file.version,
            bands: file.bands,
            platforms: file.platforms,
            generic_index,
        })
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub fn bands(&self) -> &ConfidenceBands {
        &self.bands
    }

    /// All profiles in declaration order, `generic` included.
    #[must_use]
    pub fn platforms(&self) -> &[PlatformProfile] {
        &self.platforms
    }

    /// Profiles eligible to win classification, in declaration order.
    pub fn detectable(&self) -> impl Iterator<Item = &PlatformProfile> {
        self.platforms.iter().filter(|p| !p.is_generic())
    }

    #[must_use]
    pub fn profile(&self, id: &str) -> Option<&PlatformProfile> {
        self.platforms.iter().find(|p| p.id == id)
    }

    #[must_use]
    pub fn generic(&self) -> &PlatformProfile {
        &self.platforms[self.generic_index]
    }

    /// The profile for `id`, or `generic` when `id` is absent or unknown.
    #[must_use]
    pub fn profile_or_generic(&self, id: Option<&str>) -> &PlatformProfile {
        id.and_then(|id| self.profile(id))
            .unwrap_or_else(|| self.generic())
    }
}

/// Returns the index of the generic profile on success.
fn validate_catalog(file: &CatalogFile) -> Result<usize, ConfigError> {
    if file.platforms.is_empty() {
        return Err(ConfigError::Validation(
            "catalog must declare at least one platform".to_string(),
        ));
    }

    let bands = &file.bands;
    if !(bands.high > bands.medium && bands.medium > bands.low && bands.low > 0) {
        return Err(ConfigError::Validation(format!(
            "confidence bands must satisfy high > medium > low > 0 (got {}/{}/{})",
            bands.high, bands.medium, bands.low
        )));
    }

    let mut seen = HashSet::new();
    for profile in &file.platforms {
        if profile.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "platform id must be non-empty".to_string(),
            ));
        }
        if !seen.insert(profile.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate platform id: '{}'",
                profile.id
            )));
        }
        if profile.listing_paths.is_empty() {
            return Err(ConfigError::Validation(format!(
                "platform '{}' has no listing paths",
                profile.id
            )));
        }
        if let Some(bad) = profile.listing_paths.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::Validation(format!(
                "platform '{}' listing path '{bad}' must start with '/'",
                profile.id
            )));
        }
        if !profile.is_generic() && profile.signals.is_empty() {
            return Err(ConfigError::Validation(format!(
                "platform '{}' declares no signals",
                profile.id
            )));
        }

        for signal in &profile.signals {
            if signal.weight == 0 || signal.pattern.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "platform '{}' has an empty or zero-weight signal ('{}')",
                    profile.id, signal.description
                )));
            }
            if signal.kind == MatchKind::Regex {
                compile(&profile.id, &signal.pattern)?;
            }
        }
        for shape in &profile.detail_url_shapes {
            compile(&profile.id, shape)?;
        }
    }

    file.platforms
        .iter()
        .position(PlatformProfile::is_generic)
        .ok_or_else(|| {
            ConfigError::Validation(format!(
                "catalog must include a '{GENERIC_PLATFORM_ID}' fallback profile"
            ))
        })
}

fn compile(platform_id: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| {
        ConfigError::Validation(format!(
            "platform '{platform_id}' has an invalid pattern '{pattern}': {e}"
        ))
    })
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
