//! Content fetching from URLs, files, and stdin.
//!
//! URL fetching is a single GET with a browser-like `User-Agent`. A
//! non-success status is an error carrying the status and reason; nothing
//! is retried.

use std::fs;
use std::path::PathBuf;
#[cfg(feature = "fetch")]
use std::time::Duration;

#[cfg(feature = "fetch")]
use reqwest::Client;
use url::Url;

use crate::{CrawlError, Result};

/// User-Agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 30, user_agent: DEFAULT_USER_AGENT.to_string() }
    }
}

impl FetchConfig {
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Parses and checks that `url` is an absolute http(s) URL.
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim()).map_err(|e| CrawlError::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(CrawlError::InvalidUrl(format!("unsupported scheme '{other}' in {url}"))),
    }
}

/// Fetches HTML content from a URL.
///
/// # Errors
///
/// - [`CrawlError::InvalidUrl`] for unparseable or non-http(s) URLs
/// - [`CrawlError::Timeout`] when the request exceeds `config.timeout`
/// - [`CrawlError::FetchStatus`] for non-2xx responses
/// - [`CrawlError::HttpError`] for other transport failures
#[cfg(feature = "fetch")]
pub async fn fetch_url(url: &str, config: &FetchConfig) -> Result<String> {
    let parsed_url = validate_url(url)?;

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .build()
        .map_err(CrawlError::HttpError)?;

    tracing::info!(url = %parsed_url, "fetching");

    let timed_out = |e: reqwest::Error| {
        if e.is_timeout() { CrawlError::Timeout { timeout: config.timeout } } else { CrawlError::HttpError(e) }
    };

    let response = client
        .get(parsed_url.clone())
        .header("User-Agent", &config.user_agent)
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .map_err(timed_out)?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(url = %parsed_url, status = status.as_u16(), "fetch returned non-success status");
        return Err(CrawlError::FetchStatus {
            url: url.to_string(),
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        });
    }

    let content = response.text().await.map_err(timed_out)?;
    tracing::info!(url = %parsed_url, bytes = content.len(), "fetched");

    Ok(content)
}

/// Reads HTML content from a local file.
///
/// Callers should validate and sanitize the path when accepting user input.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(CrawlError::FileNotFound(path_buf))
    } else {
        fs::read_to_string(&path_buf).map_err(CrawlError::from)
    }
}

/// Reads HTML content from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 30);
        assert!(config.user_agent.contains("Chrome/120.0.0.0"));
    }

    #[test]
    fn test_fetch_config_overrides() {
        let config = FetchConfig::default().with_timeout(5).with_user_agent("crawlmark-test");
        assert_eq!(config.timeout, 5);
        assert_eq!(config.user_agent, "crawlmark-test");
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com/a").is_ok());
        assert!(validate_url("  http://example.com  ").is_ok());
        assert!(matches!(validate_url("example.com"), Err(CrawlError::InvalidUrl(_))));
        assert!(matches!(validate_url("ftp://example.com"), Err(CrawlError::InvalidUrl(_))));
        assert!(matches!(validate_url("file:///etc/passwd"), Err(CrawlError::InvalidUrl(_))));
    }

    #[cfg(feature = "fetch")]
    #[test]
    fn test_fetch_url_invalid() {
        let config = FetchConfig::default();
        let result = std::thread::spawn(move || {
            tokio::runtime::Runtime::new()
                .unwrap()
                .block_on(fetch_url("not-a-url", &config))
        })
        .join()
        .unwrap();

        assert!(matches!(result, Err(CrawlError::InvalidUrl(_))));
    }

    #[test]
    fn test_fetch_file_not_found() {
        let result = fetch_file("/nonexistent/path/file.html");
        assert!(matches!(result, Err(CrawlError::FileNotFound(_))));
    }

    #[test]
    fn test_fetch_file_reads_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<p>from disk</p>").unwrap();
        let content = fetch_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(content, "<p>from disk</p>");
    }
}
