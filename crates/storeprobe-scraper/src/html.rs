//! Regex scanners over raw markup.
//!
//! The classifier, validator and discoverer only need cheap signals (links,
//! class markers, price tokens), so they scan the text directly instead of
//! building a DOM.

use std::sync::LazyLock;

use regex::Regex;

static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)href\s*=\s*["']([^"']+)["']"#).expect("valid regex"));
static CLASS_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)class\s*=\s*["']([^"']*)["']"#).expect("valid regex"));
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[$€£¥]\s?\d{1,6}(?:[.,]\d{2})?|\b\d{1,6}[.,]\d{2}\s?(?:USD|EUR|GBP|CAD|AUD|kr|zł)\b)")
        .expect("valid regex")
});
static JSON_LD_PRODUCT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+application/ld\+json[^>]*>.*?"@type"\s*:\s*(?:\[[^\]]*)?"Product(?:Group)?""#)
        .expect("valid regex")
});
static DOCUMENT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(?:!doctype\s|(?:html|head|body|div|script|meta|link|main|section)[\s/>])")
        .expect("valid regex")
});
static OG_PRODUCT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta[^>]+property\s*=\s*["']og:type["'][^>]+content\s*=\s*["'](?:og:)?product"#)
        .expect("valid regex")
});

/// Markers of an add-to-cart control, matched against lower-cased markup.
const ADD_TO_CART_MARKERS: &[&str] = &[
    "add to cart",
    "add to bag",
    "add to basket",
    "add-to-cart",
    "add_to_cart",
    "addtocart",
    "/cart/add",
    "name=\"add\"",
    "single_add_to_cart_button",
];

/// Class tokens that mark a repeated product tile in a listing grid.
pub(crate) const ITEM_CONTAINER_MARKERS: &[&str] = &[
    "product-card",
    "product-item",
    "grid__item",
    "product-grid-item",
    "type-product",
    "productitem",
    "card-wrapper",
    "product-tile",
];

/// Every usable `href` in document order, trimmed. Fragments, `mailto:`,
/// `tel:` and `javascript:` links are dropped.
pub(crate) fn extract_hrefs(markup: &str) -> Vec<String> {
    HREF_RE
        .captures_iter(markup)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|href| {
            !href.is_empty()
                && !href.starts_with('#')
                && !href.starts_with("mailto:")
                && !href.starts_with("tel:")
                && !href.starts_with("javascript:")
        })
        .collect()
}

/// Number of elements whose class list contains one of `markers`, either as
/// a whole token or with a BEM modifier (`product-card--sale`). Child elements
/// such as `product-card__title` are not counted.
pub(crate) fn count_class_markers(markup: &str, markers: &[&str]) -> usize {
    CLASS_ATTR_RE
        .captures_iter(markup)
        .filter_map(|cap| cap.get(1))
        .filter(|classes| {
            let lowered = classes.as_str().to_ascii_lowercase();
            lowered.split_whitespace().any(|token| {
                markers
                    .iter()
                    .any(|m| token == *m || token.starts_with(&format!("{m}--")))
            })
        })
        .count()
}

pub(crate) fn count_price_tokens(markup: &str) -> usize {
    PRICE_RE.find_iter(markup).count()
}

pub(crate) fn has_add_to_cart(lowered: &str) -> bool {
    ADD_TO_CART_MARKERS.iter().any(|m| lowered.contains(m))
}

pub(crate) fn has_product_json_ld(markup: &str) -> bool {
    JSON_LD_PRODUCT_RE.is_match(markup)
}

pub(crate) fn has_og_product(markup: &str) -> bool {
    OG_PRODUCT_RE.is_match(markup)
}

/// How far into a body to look for a document tag.
const MARKUP_SNIFF_BYTES: usize = 4096;

/// Whether the text looks like an HTML document at all: it opens with a tag
/// (after any byte-order mark), or a document-level tag appears near the top.
pub(crate) fn looks_like_markup(text: &str) -> bool {
    let text = text.trim_start_matches('\u{feff}').trim_start();
    if text.starts_with('<') {
        return true;
    }
    let mut end = text.len().min(MARKUP_SNIFF_BYTES);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    DOCUMENT_TAG_RE.is_match(&text[..end])
}
