//! Domain normalisation and origin helpers.

use reqwest::Url;

use crate::error::ScraperError;

/// Normalises a domain, host, or URL into the knowledge-base key.
///
/// Lower-cases, drops the scheme, path, query, a leading `www.` and a
/// trailing dot, and keeps an explicit port (`127.0.0.1:8080`).
///
/// Given `"https://WWW.Example.com/collections/all"`, returns `"example.com"`.
#[must_use]
pub fn normalize_domain(input: &str) -> String {
    let trimmed = input.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches("//"))
    };

    let host = Url::parse(&candidate).ok().and_then(|u| {
        u.host_str().map(|h| match u.port() {
            Some(port) => format!("{h}:{port}"),
            None => h.to_string(),
        })
    });

    let host = host.unwrap_or_else(|| {
        // fallback: strip any scheme and take everything up to the first '/'
        let without_scheme = trimmed
            .split_once("://")
            .map_or(trimmed, |(_, rest)| rest);
        without_scheme
            .split(['/', '?', '#'])
            .next()
            .unwrap_or(without_scheme)
            .to_string()
    });

    let lowered = host.to_ascii_lowercase();
    let lowered = lowered.trim_end_matches('.');
    lowered.strip_prefix("www.").unwrap_or(lowered).to_string()
}

/// Returns the path of `url` (always starting with `/`), or `None` if the URL
/// cannot be parsed.
#[must_use]
pub fn url_path(url: &str) -> Option<String> {
    Url::parse(url).ok().map(|u| u.path().to_string())
}

/// The site being analysed: its knowledge-base key and the origin requests go to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteOrigin {
    domain: String,
    origin: Url,
}

impl SiteOrigin {
    /// Resolves caller input into an origin.
    ///
    /// Bare domains are served over `https://`. An explicit scheme is kept,
    /// which is how local test servers (`http://127.0.0.1:PORT`) are addressed.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if the input has no usable host or
    /// uses a scheme other than http(s).
    pub fn parse(input: &str) -> Result<Self, ScraperError> {
        let trimmed = input.trim();
        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };

        let url = Url::parse(&candidate).map_err(|e| ScraperError::InvalidUrl {
            url: input.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ScraperError::InvalidUrl {
                url: input.to_string(),
                reason: format!("unsupported scheme \"{}\"", url.scheme()),
            });
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(ScraperError::InvalidUrl {
                url: input.to_string(),
                reason: "missing host".to_string(),
            });
        }

        let origin = Url::parse(&url.origin().ascii_serialization()).map_err(|e| {
            ScraperError::InvalidUrl {
                url: input.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            domain: normalize_domain(&candidate),
            origin,
        })
    }

    /// Normalised knowledge-base key for this site.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The home page URL, e.g. `https://example.com/`.
    #[must_use]
    pub fn home_url(&self) -> String {
        self.origin.to_string()
    }

    /// Resolves a path or href against the origin. Absolute URLs are returned
    /// unchanged (minus any fragment).
    #[must_use]
    pub fn resolve(&self, href: &str) -> Option<String> {
        let mut url = self.origin.join(href.trim()).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        url.set_fragment(None);
        Some(url.to_string())
    }

    /// Whether `url` points at this site (ignoring scheme and `www.`).
    #[must_use]
    pub fn is_same_site(&self, url: &str) -> bool {
        Url::parse(url).is_ok() && normalize_domain(url) == self.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_domain_strips_scheme_www_and_path() {
        assert_eq!(
            normalize_domain("https://WWW.Example.com/collections/all"),
            "example.com"
        );
        assert_eq!(normalize_domain("example.com"), "example.com");
        assert_eq!(normalize_domain("  Shop.Example.COM.  "), "shop.example.com");
    }

    #[test]
    fn normalize_domain_keeps_explicit_port() {
        assert_eq!(normalize_domain("http://127.0.0.1:8080/x"), "127.0.0.1:8080");
    }

    #[test]
    fn site_origin_defaults_to_https() {
        let site = SiteOrigin::parse("www.example.com").unwrap();
        assert_eq!(site.domain(), "example.com");
        assert_eq!(site.home_url(), "https://www.example.com/");
    }

    #[test]
    fn site_origin_keeps_explicit_scheme_and_drops_path() {
        let site = SiteOrigin::parse("http://127.0.0.1:4000/some/path").unwrap();
        assert_eq!(site.home_url(), "http://127.0.0.1:4000/");
        assert_eq!(site.domain(), "127.0.0.1:4000");
    }

    #[test]
    fn site_origin_rejects_other_schemes() {
        let err = SiteOrigin::parse("ftp://example.com").unwrap_err();
        assert!(matches!(err, ScraperError::InvalidUrl { .. }));
    }

    #[test]
    fn resolve_handles_relative_and_absolute_hrefs() {
        let site = SiteOrigin::parse("example.com").unwrap();
        assert_eq!(
            site.resolve("/products/mug#reviews").as_deref(),
            Some("https://example.com/products/mug")
        );
        assert_eq!(
            site.resolve("https://cdn.example.net/a.js").as_deref(),
            Some("https://cdn.example.net/a.js")
        );
        assert_eq!(site.resolve("mailto:hi@example.com"), None);
    }

    #[test]
    fn same_site_ignores_www_and_scheme() {
        let site = SiteOrigin::parse("example.com").unwrap();
        assert!(site.is_same_site("http://www.example.com/shop"));
        assert!(!site.is_same_site("https://shop.other.com/"));
        assert!(!site.is_same_site("/relative"));
    }
}
