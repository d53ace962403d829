/// A domain pattern from configuration
///
/// Two forms are recognized:
/// 1. Exact: `example.com` matches only `example.com`
/// 2. Wildcard: `*.example.com` matches `example.com` itself and any
///    subdomain at any depth (`blog.example.com`, `api.v2.example.com`)
///
/// Patterns are lowercased when parsed; candidates are expected to be
/// lowercase already (see [`extract_domain`](super::extract_domain)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainPattern {
    Exact(String),
    Wildcard(String),
}

impl DomainPattern {
    pub fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim().to_lowercase();
        match pattern.strip_prefix("*.") {
            Some(base) => Self::Wildcard(base.to_string()),
            None => Self::Exact(pattern),
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Exact(domain) => candidate == domain,
            Self::Wildcard(base) => {
                candidate == base
                    || candidate
                        .strip_suffix(base.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
        }
    }

    /// Number of labels the pattern pins down; longer is more specific
    fn specificity(&self) -> (usize, bool) {
        match self {
            Self::Exact(domain) => (domain.split('.').count(), true),
            Self::Wildcard(base) => (base.split('.').count(), false),
        }
    }
}

/// Checks if a domain matches a wildcard pattern
///
/// # Examples
///
/// ```
/// use frontier_crawl::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(!matches_wildcard("example.com", "blog.example.com"));
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "myexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    DomainPattern::parse(pattern).matches(candidate)
}

/// A set of domain patterns, each mapped to a value
///
/// Used for the blacklist (value `()`) and for per-domain interval overrides.
/// When several patterns match, the most specific one wins: more labels
/// beats fewer, and an exact pattern beats a wildcard with the same base.
#[derive(Debug, Clone)]
pub struct PatternMap<T> {
    entries: Vec<(DomainPattern, T)>,
}

impl<T> Default for PatternMap<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> PatternMap<T> {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(pattern, value)| (DomainPattern::parse(pattern.as_ref()), value))
                .collect(),
        }
    }

    /// Returns the value of the most specific matching pattern
    pub fn lookup(&self, domain: &str) -> Option<&T> {
        self.entries
            .iter()
            .filter(|(pattern, _)| pattern.matches(domain))
            .max_by_key(|(pattern, _)| pattern.specificity())
            .map(|(_, value)| value)
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.entries.iter().any(|(pattern, _)| pattern.matches(domain))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PatternMap<()> {
    /// Builds a value-less set, as used for the domain blacklist
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(patterns.into_iter().map(|p| (p, ())))
    }
}
