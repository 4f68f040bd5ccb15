use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;
    use std::str::FromStr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    fn parse_value<T>(var: &str, raw: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    }

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        parse_value(var, &or_default(var, default))
    };
    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        parse_value(var, &or_default(var, default))
    };
    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        parse_value(var, &or_default(var, default))
    };
    let parse_percent = |var: &str, default: &str| -> Result<u8, ConfigError> {
        let value: u8 = parse_value(var, &or_default(var, default))?;
        if value > 100 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("{value} is outside 0..=100"),
            });
        }
        Ok(value)
    };

    let env = parse_environment(&or_default("STOREPROBE_ENV", "development"))?;
    let log_level = or_default("STOREPROBE_LOG_LEVEL", "info");
    let knowledge_path = PathBuf::from(or_default(
        "STOREPROBE_KNOWLEDGE_PATH",
        "./data/knowledge.json",
    ));
    let backlog_path = PathBuf::from(or_default("STOREPROBE_BACKLOG_PATH", "./data/backlog.json"));
    let catalog_path = lookup("STOREPROBE_CATALOG_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);

    let request_timeout_secs = parse_u64("STOREPROBE_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default(
        "STOREPROBE_USER_AGENT",
        "storeprobe/0.1 (+platform-discovery)",
    );
    let max_retries = parse_u32("STOREPROBE_MAX_RETRIES", "2")?;
    let retry_backoff_base_secs = parse_u64("STOREPROBE_RETRY_BACKOFF_BASE_SECS", "2")?;

    let min_delay_ms = parse_u64("STOREPROBE_MIN_DELAY_MS", "1000")?;
    let max_delay_ms = parse_u64("STOREPROBE_MAX_DELAY_MS", "3000")?;
    if max_delay_ms < min_delay_ms {
        return Err(ConfigError::InvalidEnvVar {
            var: "STOREPROBE_MAX_DELAY_MS".to_string(),
            reason: format!("{max_delay_ms} is smaller than STOREPROBE_MIN_DELAY_MS ({min_delay_ms})"),
        });
    }
    let requests_per_window = parse_usize("STOREPROBE_REQUESTS_PER_WINDOW", "30")?;
    let quota_window_secs = parse_u64("STOREPROBE_QUOTA_WINDOW_SECS", "60")?;
    let respect_robots = parse_bool(
        "STOREPROBE_RESPECT_ROBOTS",
        &or_default("STOREPROBE_RESPECT_ROBOTS", "true"),
    )?;

    let domain_timeout_secs = parse_u64("STOREPROBE_DOMAIN_TIMEOUT_SECS", "180")?;
    let failure_threshold = parse_u32("STOREPROBE_FAILURE_THRESHOLD", "3")?;
    let history_limit = parse_usize("STOREPROBE_HISTORY_LIMIT", "10")?;
    let max_detail_pages = parse_usize("STOREPROBE_MAX_DETAIL_PAGES", "3")?;
    let max_concurrent_domains = parse_usize("STOREPROBE_MAX_CONCURRENT_DOMAINS", "1")?;

    let listing_min_confidence = parse_percent("STOREPROBE_LISTING_MIN_CONFIDENCE", "40")?;
    let listing_min_links = parse_usize("STOREPROBE_LISTING_MIN_LINKS", "3")?;
    let listing_override_links = parse_usize("STOREPROBE_LISTING_OVERRIDE_LINKS", "10")?;
    let listing_homepage_links = parse_usize("STOREPROBE_LISTING_HOMEPAGE_LINKS", "20")?;
    let detail_min_confidence = parse_percent("STOREPROBE_DETAIL_MIN_CONFIDENCE", "40")?;

    Ok(AppConfig {
        env,
        log_level,
        knowledge_path,
        backlog_path,
        catalog_path,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_secs,
        min_delay_ms,
        max_delay_ms,
        requests_per_window: requests_per_window.max(1),
        quota_window_secs,
        respect_robots,
        domain_timeout_secs,
        failure_threshold: failure_threshold.max(1),
        history_limit: history_limit.max(1),
        max_detail_pages: max_detail_pages.max(1),
        max_concurrent_domains: max_concurrent_domains.max(1),
        listing_min_confidence,
        listing_min_links,
        listing_override_links,
        listing_homepage_links,
        detail_min_confidence,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for unrecognised values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "STOREPROBE_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
