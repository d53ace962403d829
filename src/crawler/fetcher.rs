//! HTTP fetcher implementation
//!
//! This module handles all page requests for the crawler, including:
//! - Building the shared HTTP client with the crawler's user agent
//! - GET requests bounded by a per-request timeout
//! - Classifying failures into typed [`FetchError`]s
//! - Handing successful HTML bodies to the extractor

use crate::config::{ExtractionConfig, UserAgentConfig};
use crate::crawler::parser::{extract_page, ParsedPage};
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Redirect hops followed before a fetch fails
pub const MAX_REDIRECTS: usize = 10;

/// Why a fetch did not produce a page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx status; terminal for this URL in this run
    #[error("HTTP {0}")]
    Http(u16),

    /// Body is not something the extractor can use
    #[error("unparseable response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if let Some(status) = e.status() {
            Self::Http(status.as_u16())
        } else if e.is_decode() || e.is_body() {
            Self::Parse(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// A fetched and extracted page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    pub status: u16,
    pub page: ParsedPage,
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```
/// use frontier_crawl::config::UserAgentConfig;
/// use frontier_crawl::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "FrontierCrawl".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/bot".to_string(),
///     contact_email: "bot@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches `url` and extracts it
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx, HTML (or no Content-Type) | `Ok(FetchedPage)` |
/// | non-2xx | `Err(Http(status))`, body not read |
/// | 2xx, non-HTML Content-Type | `Err(Parse)` |
/// | timeout | `Err(Timeout)` |
/// | connection, DNS, TLS, redirect loop | `Err(Network)` |
///
/// Bodies are decoded as UTF-8 with invalid sequences replaced; markup
/// problems never fail the fetch.
pub async fn fetch_page(
    client: &Client,
    url: &Url,
    timeout: Duration,
    extraction: &ExtractionConfig,
) -> Result<FetchedPage, FetchError> {
    let response = client.get(url.clone()).timeout(timeout).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http(status.as_u16()));
    }

    if let Some(content_type) = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        if !is_html(content_type) {
            return Err(FetchError::Parse(format!(
                "expected HTML, got {}",
                content_type
            )));
        }
    }

    let final_url = response.url().clone();
    let bytes = response.bytes().await?;
    let html = String::from_utf8_lossy(&bytes);

    let page = extract_page(&html, &final_url, extraction);

    Ok(FetchedPage {
        final_url,
        status: status.as_u16(),
        page,
    })
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime.is_empty() || mime == "text/html" || mime == "application/xhtml+xml"
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user_agent() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    fn client() -> Client {
        build_http_client(&user_agent()).unwrap()
    }

    #[test]
    fn test_is_html() {
        assert!(is_html("text/html"));
        assert!(is_html("text/html; charset=ISO-8859-1"));
        assert!(is_html("TEXT/HTML"));
        assert!(is_html("application/xhtml+xml"));
        assert!(!is_html("application/pdf"));
        assert!(!is_html("image/png"));
    }

    #[tokio::test]
    async fn test_fetch_success_extracts_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(
                    r#"<html><head><title>Home</title></head><body>Hi <a href="/a">A</a></body></html>"#,
                    "text/html; charset=utf-8",
                ),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/", server.uri())).unwrap();
        let fetched = fetch_page(&client(), &url, Duration::from_secs(5), &ExtractionConfig::default())
            .await
            .unwrap();

        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.page.title, "Home");
        assert_eq!(fetched.page.text, "Hi A");
        assert_eq!(fetched.page.links.len(), 1);
        assert_eq!(fetched.page.links[0].path(), "/a");
    }

    #[tokio::test]
    async fn test_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(wiremock::matchers::header(
                "user-agent",
                "TestCrawler/1.0 (+https://example.com/about; admin@example.com)",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<title>ok</title>", "text/html"))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let result = fetch_page(&client(), &url, Duration::from_secs(5), &ExtractionConfig::default()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let result = fetch_page(&client(), &url, Duration::from_secs(5), &ExtractionConfig::default()).await;
        assert_eq!(result.unwrap_err(), FetchError::Http(404));
    }

    #[tokio::test]
    async fn test_non_html_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(vec![0x25, 0x50, 0x44, 0x46], "application/pdf"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/doc.pdf", server.uri())).unwrap();
        let result = fetch_page(&client(), &url, Duration::from_secs(5), &ExtractionConfig::default()).await;
        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let result = fetch_page(&client(), &url, Duration::from_millis(200), &ExtractionConfig::default()).await;
        assert_eq!(result.unwrap_err(), FetchError::Timeout);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_tolerated() {
        let server = MockServer::start().await;
        let mut body = b"<html><head><title>Caf".to_vec();
        body.push(0xff);
        body.extend_from_slice(b"</title></head></html>");
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(body, "text/html"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let fetched = fetch_page(&client(), &url, Duration::from_secs(5), &ExtractionConfig::default())
            .await
            .unwrap();
        assert!(fetched.page.title.starts_with("Caf"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let result = fetch_page(&client(), &url, Duration::from_secs(2), &ExtractionConfig::default()).await;
        assert!(matches!(result, Err(FetchError::Network(_))));
    }
}
