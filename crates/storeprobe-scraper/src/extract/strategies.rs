//! Per-field strategy cascades.
//!
//! Each field has its own ordered list of pure strategies; the first one that
//! yields a non-empty value wins. Fields do not share a fallback chain.

use std::collections::{BTreeMap, HashSet};

use scraper::ElementRef;
use serde_json::Value;
use storeprobe_core::ExtractionSelectors;

use super::document::{clean_text, fragment_text, visible_text, PageDocument};

/// What a strategy may look at: the parsed page and the selector lists to
/// try, most specific platform first and `generic` last.
pub(crate) struct ExtractionContext<'a> {
    pub(crate) doc: &'a PageDocument,
    pub(crate) selectors: Vec<&'a ExtractionSelectors>,
}

pub(crate) type Strategy<T> = fn(&ExtractionContext<'_>) -> Option<T>;

pub(crate) const TITLE_STRATEGIES: &[Strategy<String>] = &[
    title_from_json_ld,
    title_from_containers,
    title_from_og,
    title_from_h1,
    title_from_title_tag,
];

pub(crate) const DESCRIPTION_STRATEGIES: &[Strategy<String>] = &[
    description_from_json_ld,
    description_from_containers,
    description_from_meta,
];

pub(crate) const SPECIFICATION_STRATEGIES: &[Strategy<BTreeMap<String, String>>] = &[
    specifications_from_json_ld,
    specifications_from_containers,
];

pub(crate) const FEATURE_STRATEGIES: &[Strategy<Vec<String>>] = &[features_from_containers];

/// Runs `strategies` in order and returns the first non-empty value.
pub(crate) fn first_match<T: IsEmpty>(
    ctx: &ExtractionContext<'_>,
    strategies: &[Strategy<T>],
) -> Option<T> {
    strategies
        .iter()
        .filter_map(|strategy| strategy(ctx))
        .find(|value| !value.is_empty_value())
}

pub(crate) trait IsEmpty {
    fn is_empty_value(&self) -> bool;
}

impl IsEmpty for String {
    fn is_empty_value(&self) -> bool {
        self.trim().is_empty()
    }
}

impl<T> IsEmpty for Vec<T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> IsEmpty for BTreeMap<K, V> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

// title

fn title_from_json_ld(ctx: &ExtractionContext<'_>) -> Option<String> {
    ld_string(ctx.doc.product()?.get("name")?)
}

fn title_from_containers(ctx: &ExtractionContext<'_>) -> Option<String> {
    ctx.selectors
        .iter()
        .flat_map(|s| s.title.iter())
        .find_map(|selector| ctx.doc.first_text(selector))
}

fn title_from_og(ctx: &ExtractionContext<'_>) -> Option<String> {
    ctx.doc.meta("og:title")
}

fn title_from_h1(ctx: &ExtractionContext<'_>) -> Option<String> {
    ctx.doc.first_text("h1")
}

fn title_from_title_tag(ctx: &ExtractionContext<'_>) -> Option<String> {
    let title = ctx.doc.first_text("title")?;
    // "Product | Store" -> "Product"
    let head = title
        .split(['|', '–', '—'])
        .next()
        .map_or(title.as_str(), str::trim);
    Some(head.to_string())
}

// description

fn description_from_json_ld(ctx: &ExtractionContext<'_>) -> Option<String> {
    let raw = ctx.doc.product()?.get("description")?.as_str()?;
    Some(fragment_text(raw))
}

fn description_from_containers(ctx: &ExtractionContext<'_>) -> Option<String> {
    ctx.selectors
        .iter()
        .flat_map(|s| s.description.iter())
        .find_map(|selector| ctx.doc.first_text(selector))
}

fn description_from_meta(ctx: &ExtractionContext<'_>) -> Option<String> {
    ctx.doc
        .meta("description")
        .or_else(|| ctx.doc.meta("og:description"))
}

// specifications

/// Scalar Product properties worth reporting as specifications.
const LD_SPEC_KEYS: &[(&str, &str)] = &[
    ("sku", "SKU"),
    ("mpn", "MPN"),
    ("gtin", "GTIN"),
    ("gtin8", "GTIN"),
    ("gtin12", "GTIN"),
    ("gtin13", "GTIN"),
    ("gtin14", "GTIN"),
    ("brand", "Brand"),
    ("material", "Material"),
    ("color", "Color"),
    ("size", "Size"),
    ("weight", "Weight"),
];

fn specifications_from_json_ld(ctx: &ExtractionContext<'_>) -> Option<BTreeMap<String, String>> {
    let product = ctx.doc.product()?;
    let mut specs = BTreeMap::new();

    for (key, label) in LD_SPEC_KEYS {
        if let Some(value) = product.get(*key).and_then(ld_string) {
            specs.entry((*label).to_string()).or_insert(value);
        }
    }

    let properties = match product.get("additionalProperty") {
        Some(Value::Array(items)) => items.iter().collect::<Vec<_>>(),
        Some(item @ Value::Object(_)) => vec![item],
        _ => Vec::new(),
    };
    for property in properties {
        let name = property.get("name").and_then(ld_string);
        let value = property.get("value").and_then(ld_string);
        if let (Some(name), Some(value)) = (name, value) {
            specs.insert(name, value);
        }
    }

    Some(specs)
}

fn specifications_from_containers(ctx: &ExtractionContext<'_>) -> Option<BTreeMap<String, String>> {
    let mut specs = BTreeMap::new();
    for selector in ctx.selectors.iter().flat_map(|s| s.specifications.iter()) {
        for container in ctx.doc.select_all(selector) {
            collect_pairs(&container, &mut specs);
        }
        if !specs.is_empty() {
            break;
        }
    }
    Some(specs)
}

/// Key/value pairs from table rows, definition lists and `Key: value` items.
fn collect_pairs(container: &ElementRef<'_>, specs: &mut BTreeMap<String, String>) {
    for node in container.descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        match element.value().name() {
            "tr" => {
                let cells: Vec<String> = element
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|c| matches!(c.value().name(), "th" | "td"))
                    .map(|c| visible_text(&c))
                    .collect();
                if let [key, value, ..] = cells.as_slice() {
                    insert_pair(specs, key, value);
                }
            }
            "dt" => {
                let value = element
                    .next_siblings()
                    .filter_map(ElementRef::wrap)
                    .find(|sibling| matches!(sibling.value().name(), "dd" | "dt"))
                    .filter(|sibling| sibling.value().name() == "dd")
                    .map(|dd| visible_text(&dd));
                if let Some(value) = value {
                    insert_pair(specs, &visible_text(&element), &value);
                }
            }
            "li" => {
                let text = visible_text(&element);
                if let Some((key, value)) = text.split_once(':') {
                    if key.len() <= 40 {
                        insert_pair(specs, key, value);
                    }
                }
            }
            _ => {}
        }
    }
}

fn insert_pair(specs: &mut BTreeMap<String, String>, key: &str, value: &str) {
    let key = clean_text(key.trim_end_matches(':'));
    let value = clean_text(value);
    if !key.is_empty() && !value.is_empty() {
        specs.entry(key).or_insert(value);
    }
}

// features

fn features_from_containers(ctx: &ExtractionContext<'_>) -> Option<Vec<String>> {
    let mut seen = HashSet::new();
    let mut features = Vec::new();
    for selector in ctx.selectors.iter().flat_map(|s| s.features.iter()) {
        for container in ctx.doc.select_all(selector) {
            for node in container.descendants() {
                let Some(item) = ElementRef::wrap(node) else {
                    continue;
                };
                if item.value().name() != "li" {
                    continue;
                }
                let text = visible_text(&item);
                if !text.is_empty() && seen.insert(text.to_lowercase()) {
                    features.push(text);
                }
            }
        }
    }
    Some(features)
}

/// A JSON-LD value as display text: strings, numbers, or `{ "name": ... }`.
fn ld_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => clean_text(s),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => return map.get("name").and_then(ld_string),
        Value::Array(items) => return items.iter().find_map(ld_string),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
