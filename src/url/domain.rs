use url::{Host, Url};

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use frontier_crawl::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the key used for per-domain politeness state
///
/// This is the lowercase host, followed by the port when the URL names a
/// non-default one. Two servers on the same host but different ports are
/// rate limited and robots-checked independently.
///
/// ```
/// use url::Url;
/// use frontier_crawl::url::domain_key;
///
/// let url = Url::parse("http://127.0.0.1:8080/page").unwrap();
/// assert_eq!(domain_key(&url), Some("127.0.0.1:8080".to_string()));
///
/// let url = Url::parse("https://example.com:443/page").unwrap();
/// assert_eq!(domain_key(&url), Some("example.com".to_string()));
/// ```
pub fn domain_key(url: &Url) -> Option<String> {
    let host = extract_domain(url)?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Returns the registrable domain ("eTLD+1") of a URL
///
/// `news.bbc.co.uk` and `www.bbc.co.uk` share `bbc.co.uk`. IP hosts and names
/// the public suffix list cannot split are returned unchanged.
pub fn registrable_domain(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) => {
            let domain = domain.to_lowercase();
            let registrable = psl::domain_str(&domain)
                .map(str::to_string)
                .unwrap_or_else(|| domain.clone());
            Some(registrable)
        }
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(addr.to_string()),
    }
}
