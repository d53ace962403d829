//! HTML extraction: title, bounded plain text, and outbound links
//!
//! Parsing never fails. html5ever recovers from any markup, so the worst
//! case is an empty link list and a placeholder title.

use crate::config::ExtractionConfig;
use crate::url::{extract_domain, resolve_and_normalize, PatternMap};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use url::Url;

/// Title used when a page has no non-empty `<title>`
pub const PLACEHOLDER_TITLE: &str = "No Title";

/// Elements whose text is never page content
const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub title: String,

    /// Whitespace-collapsed visible text, truncated to the configured length
    pub text: String,

    /// Links to follow, normalized, filtered and capped
    pub links: Vec<Url>,

    /// Distinct followable links found before the cap was applied
    pub discovered: usize,
}

/// A link as it appeared on the page
#[derive(Debug, Clone)]
struct Candidate {
    url: Url,
    anchor_text: String,
}

/// Parses `html` fetched from `page_url`
///
/// # Link Extraction Rules
///
/// **Include:** `<a href="...">` anywhere in the document, resolved against
/// `page_url` and normalized.
///
/// **Exclude:**
/// - `<a ... download>`
/// - `javascript:`, `mailto:`, `tel:`, `data:` and anything else that is not http(s)
/// - fragment-only anchors and links back to the page itself
/// - hosts matching the blacklist
/// - repeats of an earlier link on the same page
///
/// At most `max_links_per_page` links survive. Links whose URL or anchor
/// text mentions an importance keyword are kept first; the remaining slots
/// go to other links in document order.
///
/// # Example
///
/// ```
/// use frontier_crawl::config::ExtractionConfig;
/// use frontier_crawl::crawler::extract_page;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base = Url::parse("https://example.com/").unwrap();
/// let parsed = extract_page(html, &base, &ExtractionConfig::default());
/// assert_eq!(parsed.title, "Test");
/// assert_eq!(parsed.links[0].as_str(), "https://example.com/page");
/// ```
pub fn extract_page(html: &str, page_url: &Url, config: &ExtractionConfig) -> ParsedPage {
    let document = Html::parse_document(html);

    let title = extract_title(&document).unwrap_or_else(|| PLACEHOLDER_TITLE.to_string());
    let text = extract_text(&document, config.max_text_chars as usize);

    let blacklist = PatternMap::from_patterns(&config.blacklist);
    let candidates = extract_candidates(&document, page_url, &blacklist);
    let discovered = candidates.len();
    let links = select_links(
        candidates,
        &config.importance_keywords,
        config.max_links_per_page as usize,
    );

    ParsedPage {
        title,
        text,
        links,
        discovered,
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Collects visible text from `<body>` (or the whole document if absent)
fn extract_text(document: &Html, max_chars: usize) -> String {
    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut raw = String::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| NON_CONTENT_TAGS.contains(&el.name()))
        });
        if !hidden {
            raw.push_str(text);
            raw.push(' ');
        }
    }

    truncate_chars(&collapse_whitespace(&raw), max_chars)
}

fn extract_candidates(
    document: &Html,
    page_url: &Url,
    blacklist: &PatternMap<()>,
) -> Vec<Candidate> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(page_url.as_str().to_string());

    let mut candidates = Vec::new();
    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_link(href, page_url) else {
            continue;
        };

        if extract_domain(&url).is_some_and(|host| blacklist.contains(&host)) {
            tracing::trace!("Dropping blacklisted link {}", url);
            continue;
        }
        if !seen.insert(url.as_str().to_string()) {
            continue;
        }

        candidates.push(Candidate {
            url,
            anchor_text: anchor_text(&element),
        });
    }
    candidates
}

/// Resolves an href to a normalized http(s) URL
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, page_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    resolve_and_normalize(page_url, href).ok()
}

fn anchor_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Picks up to `cap` links, preferring ones that mention a keyword
fn select_links(candidates: Vec<Candidate>, keywords: &[String], cap: usize) -> Vec<Url> {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    let (important, ordinary): (Vec<Candidate>, Vec<Candidate>) = candidates
        .into_iter()
        .partition(|candidate| is_important(candidate, &keywords));

    important
        .into_iter()
        .chain(ordinary)
        .take(cap)
        .map(|candidate| candidate.url)
        .collect()
}

fn is_important(candidate: &Candidate, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return false;
    }
    let url = candidate.url.as_str().to_lowercase();
    let text = candidate.anchor_text.to_lowercase();
    keywords
        .iter()
        .any(|keyword| url.contains(keyword.as_str()) || text.contains(keyword.as_str()))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_index, _)) => s[..byte_index].to_string(),
        None => s.to_string(),
    }
}
