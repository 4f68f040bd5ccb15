//! Home-page link harvest: the last resort for finding a listing page.

use std::collections::{HashMap, HashSet};

use reqwest::Url;
use storeprobe_core::PlatformProfile;

use crate::html::extract_hrefs;
use crate::site::SiteOrigin;
use crate::validator::PageValidator;

/// Path segments that suggest a category or catalogue page.
const CATEGORY_SEGMENTS: &[&str] = &[
    "collections",
    "collection",
    "category",
    "categories",
    "product-category",
    "shop",
    "catalog",
    "catalogue",
    "store",
    "departments",
    "c",
];

/// The most frequently linked category-like path on the home page, resolved
/// to a URL. Links already `tried`, detail-shaped links and off-site links
/// are ignored. Ties go to the first path seen.
pub(crate) fn category_candidate(
    home_markup: &str,
    origin: &SiteOrigin,
    validator: &PageValidator,
    profile: &PlatformProfile,
    tried: &HashSet<String>,
) -> Option<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();

    for (position, href) in extract_hrefs(home_markup).iter().enumerate() {
        let Some(resolved) = origin.resolve(href) else {
            continue;
        };
        if !origin.is_same_site(&resolved) || validator.is_detail_url(profile, &resolved) {
            continue;
        }
        let Ok(mut url) = Url::parse(&resolved) else {
            continue;
        };
        url.set_query(None);
        if !is_category_path(url.path()) {
            continue;
        }
        let key = url.as_str().trim_end_matches('/').to_string();
        if tried.contains(&key) || tried.contains(&format!("{key}/")) {
            continue;
        }
        let entry = counts.entry(key).or_insert((0, position));
        entry.0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(url, _)| url)
}

fn is_category_path(path: &str) -> bool {
    path.split('/')
        .filter(|s| !s.is_empty())
        .any(|segment| {
            let segment = segment.to_ascii_lowercase();
            CATEGORY_SEGMENTS.contains(&segment.trim_end_matches(".html"))
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use storeprobe_core::SignalCatalog;

    use super::*;
    use crate::validator::ValidationThresholds;

    fn fixture() -> (SiteOrigin, PageValidator, Arc<SignalCatalog>) {
        let catalog = Arc::new(SignalCatalog::builtin().unwrap());
        let validator = PageValidator::new(Arc::clone(&catalog), ValidationThresholds::default());
        (SiteOrigin::parse("example.com").unwrap(), validator, catalog)
    }

    #[test]
    fn picks_the_most_linked_category_path() {
        let (origin, validator, catalog) = fixture();
        let home = r#"
            <a href="/pages/about">About</a>
            <a href="/category/lamps">Lamps</a>
            <a href="/category/chairs">Chairs</a>
            <a href="/category/chairs?sort=price">Chairs by price</a>
            <a href="/products/oak-chair">Oak chair</a>
            <a href="https://elsewhere.example/category/x">x</a>"#;

        let pick = category_candidate(home, &origin, &validator, catalog.generic(), &HashSet::new());

        assert_eq!(pick.as_deref(), Some("https://example.com/category/chairs"));
    }

    #[test]
    fn skips_already_tried_paths_and_breaks_ties_by_position() {
        let (origin, validator, catalog) = fixture();
        let home = r#"<a href="/shop">Shop</a><a href="/collections/sale">Sale</a><a href="/catalog/new">New</a>"#;
        let tried: HashSet<String> = ["https://example.com/shop".to_string()].into();

        let pick = category_candidate(home, &origin, &validator, catalog.generic(), &tried);

        assert_eq!(pick.as_deref(), Some("https://example.com/collections/sale"));
    }

    #[test]
    fn no_category_links_yields_none() {
        let (origin, validator, catalog) = fixture();
        let home = r#"<a href="/pages/contact">Contact</a><a href="/blogs/news">News</a>"#;
        assert!(category_candidate(home, &origin, &validator, catalog.generic(), &HashSet::new()).is_none());
    }
}
