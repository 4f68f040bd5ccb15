//! Shared configuration and the platform signal catalog for storeprobe.

pub mod app_config;
pub mod catalog;
pub mod config;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use catalog::{
    ConfidenceBands, ConfidenceLevel, ExtractionSelectors, MatchKind, PlatformProfile,
    PlatformSignal, SignalCatalog, GENERIC_PLATFORM_ID,
};
pub use config::{load_app_config, load_app_config_from_env};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read signal catalog at {path}: {source}")]
    CatalogFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse signal catalog: {0}")]
    CatalogParse(#[from] serde_yaml::Error),

    #[error("signal catalog validation failed: {0}")]
    Validation(String),
}
