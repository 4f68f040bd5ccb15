//! Parsed page plus the lookups every extraction strategy shares.

use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// A detail page parsed once per extraction call.
pub(crate) struct PageDocument {
    html: Html,
    product: Option<Value>,
}

impl PageDocument {
    pub(crate) fn parse(markup: &str) -> Self {
        let html = Html::parse_document(markup);
        let product = find_json_ld_product(&html);
        Self { html, product }
    }

    /// The first JSON-LD object typed `Product` or `ProductGroup`.
    pub(crate) fn product(&self) -> Option<&Value> {
        self.product.as_ref()
    }

    /// Elements matching `selector`; an unparseable selector matches nothing.
    pub(crate) fn select_all(&self, selector: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(selector) {
            Ok(sel) => self.html.select(&sel).collect(),
            Err(_) => {
                tracing::debug!(selector, "skipping unparseable selector");
                Vec::new()
            }
        }
    }

    /// Visible text of the first element matching `selector` that has any.
    pub(crate) fn first_text(&self, selector: &str) -> Option<String> {
        self.select_all(selector)
            .into_iter()
            .map(|el| visible_text(&el))
            .find(|text| !text.is_empty())
    }

    /// `content` of the first `<meta>` whose `name` or `property` is `key`.
    pub(crate) fn meta(&self, key: &str) -> Option<String> {
        let selector = format!(r#"meta[name="{key}"], meta[property="{key}"]"#);
        self.select_all(&selector)
            .into_iter()
            .filter_map(|el| el.value().attr("content"))
            .map(clean_text)
            .find(|text| !text.is_empty())
    }

    pub(crate) fn body_text_len(&self) -> usize {
        self.select_all("body")
            .first()
            .map_or(0, |body| visible_text(body).chars().count())
    }
}

/// Whitespace-normalised text under `element`, skipping script-like content.
pub(crate) fn visible_text(element: &ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in element.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            parts.push(&**text);
        }
    }
    clean_text(&parts.join(" "))
}

/// Collapses runs of whitespace and trims.
pub(crate) fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text content of an HTML fragment, for JSON-LD fields that embed markup.
pub(crate) fn fragment_text(markup: &str) -> String {
    if !markup.contains('<') {
        return clean_text(markup);
    }
    let fragment = Html::parse_fragment(markup);
    visible_text(&fragment.root_element())
}

fn find_json_ld_product(html: &Html) -> Option<Value> {
    let Ok(sel) = Selector::parse(r#"script[type="application/ld+json"]"#) else {
        return None;
    };
    html.select(&sel)
        .filter_map(|script| {
            let raw: String = script.text().collect();
            serde_json::from_str::<Value>(raw.trim()).ok()
        })
        .find_map(|value| find_product(&value).cloned())
}

fn find_product(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_product),
        Value::Object(map) => {
            if is_product_type(map.get("@type")) {
                return Some(value);
            }
            map.get("@graph").and_then(find_product)
        }
        _ => None,
    }
}

fn is_product_type(ld_type: Option<&Value>) -> bool {
    let is_product = |t: &str| matches!(t, "Product" | "ProductGroup");
    match ld_type {
        Some(Value::String(t)) => is_product(t),
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).any(is_product),
        _ => false,
    }
}
