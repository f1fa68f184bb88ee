//! Structural extraction from an HTML document
//!
//! Everything here is synchronous and works on a string, so the website
//! analyzer can be tested without a network.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value as JsonValue;
use std::collections::{BTreeSet, HashSet};

use crate::types::{HeadingSummary, LandmarkSummary, StructuredDataSummary, WebsiteAnalysis};

const EXCERPT_CHARS: usize = 4_000;

/// Page-level facts; site-level fields (robots, sitemap, llms.txt) are left
/// at their defaults for the caller to fill.
pub fn extract_page(html: &str) -> WebsiteAnalysis {
    let document = Html::parse_document(html);
    let text = visible_text(html);

    let (total_inputs, labeled_inputs) = count_inputs(&document);

    WebsiteAnalysis {
        page_bytes: html.len(),
        title: first_text(&document, "title"),
        meta_description: first_attr(&document, "meta[name='description']", "content"),
        language: first_attr(&document, "html", "lang"),
        has_viewport: select_exists(&document, "meta[name='viewport']"),
        hreflang_count: count_elements(&document, "link[rel='alternate'][hreflang]"),
        headings: headings(&document),
        landmarks: landmarks(&document),
        form_count: count_elements(&document, "form"),
        total_inputs,
        labeled_inputs,
        button_count: count_elements(
            &document,
            "button, input[type='submit'], input[type='button'], [role='button']",
        ),
        has_search: select_exists(
            &document,
            "input[type='search'], [role='search'], input[name='q'], input[name='search']",
        ),
        structured_data: structured_data(&extract_json_ld_blocks(&document)),
        word_count: text.split_whitespace().count(),
        text_excerpt: text.chars().take(EXCERPT_CHARS).collect(),
        ..Default::default()
    }
}

fn landmarks(document: &Html) -> LandmarkSummary {
    LandmarkSummary {
        has_main: select_exists(document, "main, [role='main']"),
        has_navigation: select_exists(document, "nav, [role='navigation']"),
        has_header: select_exists(document, "header, [role='banner']"),
        has_footer: select_exists(document, "footer, [role='contentinfo']"),
    }
}

fn headings(document: &Html) -> HeadingSummary {
    let distribution: Vec<usize> = (1..=6)
        .map(|level| count_elements(document, &format!("h{level}")))
        .collect();

    // no skipped levels between the headings that are present
    let mut proper_hierarchy = distribution.iter().any(|c| *c > 0);
    let mut last_level = 0;
    for (index, count) in distribution.iter().enumerate() {
        if *count == 0 {
            continue;
        }
        let level = index + 1;
        if level > last_level + 1 {
            proper_hierarchy = false;
        }
        last_level = level;
    }

    HeadingSummary {
        h1_count: distribution[0],
        distribution,
        proper_hierarchy,
    }
}

/// `(total, labeled)` over user-editable inputs
fn count_inputs(document: &Html) -> (usize, usize) {
    let Ok(inputs) = Selector::parse(
        "input:not([type='hidden']):not([type='submit']):not([type='button']), select, textarea",
    ) else {
        return (0, 0);
    };

    let label_targets: HashSet<&str> = Selector::parse("label[for]")
        .map(|s| document.select(&s).filter_map(|l| l.value().attr("for")).collect())
        .unwrap_or_default();

    let mut total = 0;
    let mut labeled = 0;
    for input in document.select(&inputs) {
        total += 1;
        let element = input.value();
        let has_aria = element.attr("aria-label").is_some_and(|v| !v.trim().is_empty())
            || element.attr("aria-labelledby").is_some();
        let has_for_label = element.id().is_some_and(|id| label_targets.contains(id));
        if has_aria || has_for_label || inside_label(input) {
            labeled += 1;
        }
    }
    (total, labeled)
}

fn inside_label(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().name() == "label")
}

/// Trimmed contents of every non-empty `ld+json` script
pub fn extract_json_ld_blocks(document: &Html) -> Vec<String> {
    let Ok(scripts) = Selector::parse("script") else {
        return Vec::new();
    };
    document
        .select(&scripts)
        .filter(|script| {
            script
                .value()
                .attr("type")
                .is_some_and(|t| t.trim().to_ascii_lowercase().contains("ld+json"))
        })
        .map(|script| script.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect()
}

fn structured_data(blocks: &[String]) -> StructuredDataSummary {
    let mut types = BTreeSet::new();
    for block in blocks {
        if let Ok(value) = serde_json::from_str::<JsonValue>(block) {
            collect_types(&value, &mut types);
        }
    }
    let has_faq = types.iter().any(|t| t == "FAQPage" || t == "QAPage");
    StructuredDataSummary {
        block_count: blocks.len(),
        types: types.into_iter().collect(),
        has_faq,
    }
}

/// `@type` values anywhere in the tree, including `@graph` members
fn collect_types(value: &JsonValue, types: &mut BTreeSet<String>) {
    match value {
        JsonValue::Object(map) => {
            match map.get("@type") {
                Some(JsonValue::String(t)) => {
                    types.insert(short_type(t));
                }
                Some(JsonValue::Array(list)) => {
                    types.extend(list.iter().filter_map(JsonValue::as_str).map(short_type));
                }
                _ => {}
            }
            for child in map.values() {
                collect_types(child, types);
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                collect_types(item, types);
            }
        }
        _ => {}
    }
}

/// `https://schema.org/Product` → `Product`
fn short_type(t: &str) -> String {
    t.rsplit(['/', '#', ':']).next().unwrap_or(t).to_string()
}

/// Whitespace-collapsed text without scripts, styles and comments
pub fn visible_text(html: &str) -> String {
    static RE_HIDDEN_BLOCKS: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?is)<(script|style|noscript|template)[^>]*?>.*?</(script|style|noscript|template)>")
            .expect("invalid block regex")
    });
    static RE_COMMENT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("invalid comment regex"));

    let clean = RE_HIDDEN_BLOCKS.replace_all(html, " ");
    let clean = RE_COMMENT.replace_all(&clean, " ");

    let document = Html::parse_document(&clean);
    let root = Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next())
        .unwrap_or_else(|| document.root_element());

    root.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let text = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    (!text.is_empty()).then_some(text)
}

fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn select_exists(document: &Html, selector: &str) -> bool {
    Selector::parse(selector)
        .map(|s| document.select(&s).next().is_some())
        .unwrap_or(false)
}

fn count_elements(document: &Html, selector: &str) -> usize {
    Selector::parse(selector)
        .map(|s| document.select(&s).count())
        .unwrap_or(0)
}
