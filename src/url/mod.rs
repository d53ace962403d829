//! URL handling module for Frontier-Crawl
//!
//! This module provides URL normalization, domain extraction, wildcard matching,
//! and the depth policy applied to discovered links.

mod domain;
mod matcher;
mod normalize;

use url::Url;

// Re-export main functions
pub use domain::{domain_key, extract_domain, registrable_domain};
pub use matcher::{matches_wildcard, DomainPattern, PatternMap};
pub use normalize::{normalize_url, resolve_and_normalize};

/// Where a discovered link points relative to the page it was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkScope {
    /// Same registrable domain as the parent page
    SameSite,
    /// A different registrable domain
    CrossSite,
}

/// Classifies `child` relative to `parent` by registrable domain
///
/// `www.example.com` and `docs.example.com` are the same site;
/// `example.com` and `example.org` are not. A URL without a host is
/// always treated as crossing.
pub fn link_scope(parent: &Url, child: &Url) -> LinkScope {
    match (registrable_domain(parent), registrable_domain(child)) {
        (Some(a), Some(b)) if a == b => LinkScope::SameSite,
        _ => LinkScope::CrossSite,
    }
}

/// Computes the depth assigned to a link discovered on a page
///
/// Staying on the parent's registrable domain costs one level. Crossing to
/// another domain resets the depth to `cross_domain_depth`, so a deep page
/// on one site can still open a shallow exploration of another.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use frontier_crawl::url::child_depth;
///
/// let parent = Url::parse("https://example.com/a/b/c").unwrap();
/// let same = Url::parse("https://example.com/d").unwrap();
/// let other = Url::parse("https://example.org/").unwrap();
///
/// assert_eq!(child_depth(&parent, 5, &same, 1), 6);
/// assert_eq!(child_depth(&parent, 5, &other, 1), 1);
/// ```
pub fn child_depth(parent: &Url, parent_depth: u32, child: &Url, cross_domain_depth: u32) -> u32 {
    match link_scope(parent, child) {
        LinkScope::SameSite => parent_depth.saturating_add(1),
        LinkScope::CrossSite => cross_domain_depth,
    }
}
