//! Generic content-section sweep with leading-text de-duplication.

use std::collections::HashSet;

use sha2::{Digest, Sha256};

use super::document::{visible_text, PageDocument};

/// Containers that commonly hold secondary product prose.
const SECTION_SELECTORS: &[&str] = &[
    "details",
    r#"[class*="accordion"]"#,
    r#"[class*="tab-content"]"#,
    ".tabs__content",
    r#"[role="tabpanel"]"#,
    r#"[class*="collapsible"]"#,
    r#"[class*="care"]"#,
    r#"[class*="shipping"]"#,
    r#"[class*="material"]"#,
    r#"[class*="ingredient"]"#,
    r#"[class*="size-guide"]"#,
    r#"[class*="product-info"]"#,
];

const MIN_SECTION_CHARS: usize = 20;
const MAX_SECTIONS: usize = 12;
const FINGERPRINT_CHARS: usize = 80;

/// Text of every innermost matching section not already seen. A match
/// that contains another qualifying match is dropped so nested panels are
/// counted once. `seen` carries fingerprints of text extracted elsewhere
/// (the description).
pub(crate) fn sweep_sections(doc: &PageDocument, seen: &mut HashSet<String>) -> Vec<String> {
    let mut matched = HashSet::new();
    let mut candidates = Vec::new();
    for selector in SECTION_SELECTORS {
        for element in doc.select_all(selector) {
            if !matched.insert(element.id()) {
                continue;
            }
            let text = visible_text(&element);
            if text.chars().count() >= MIN_SECTION_CHARS {
                candidates.push((element, text));
            }
        }
    }

    let enclosing: HashSet<_> = candidates
        .iter()
        .flat_map(|(element, _)| element.ancestors().map(|node| node.id()))
        .collect();

    let mut sections = Vec::new();
    for (element, text) in candidates {
        if enclosing.contains(&element.id()) {
            continue;
        }
        if seen.insert(fingerprint(&text)) {
            sections.push(text);
            if sections.len() == MAX_SECTIONS {
                break;
            }
        }
    }
    sections
}

/// Hash of the first characters of `text` after case and punctuation folding,
/// so the same prose found under two selectors collapses to one section.
pub(crate) fn fingerprint(text: &str) -> String {
    let folded: String = text
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c.to_ascii_lowercase())
            } else if c.is_whitespace() {
                Some(' ')
            } else {
                None
            }
        })
        .collect();
    let lead: String = folded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(FINGERPRINT_CHARS)
        .collect();
    format!("{:x}", Sha256::digest(lead.as_bytes()))
}
