//! Fetch, extract, convert.
//!
//! [`Crawler`] wires the collaborators together: the fetcher produces raw
//! HTML, the [`ArticleExtractor`] isolates the article, the converter turns
//! it into Markdown and the metadata extractor scans the full page. The
//! conversion and metadata passes work on the same normalized tree but
//! share no mutable state.
//!
//! # Example
//!
//! ```rust
//! use crawlmark_core::Crawler;
//!
//! let paragraph = "Crawlers fetch pages, extract the readable part, and convert it to Markdown for later use. ";
//! let html = format!(
//!     r#"<html><head><meta property="og:title" content="Guide"></head><body><article><p>{}</p></article></body></html>"#,
//!     paragraph.repeat(3)
//! );
//!
//! let result = Crawler::new().crawl_html(&html, "https://example.com/guide").unwrap();
//! assert_eq!(result.title.as_deref(), Some("Guide"));
//! assert!(result.markdown.starts_with("Crawlers fetch pages"));
//! assert_eq!(result.metadata["og:title"], "Guide");
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::article::{ArticleExtractor, ArticleResult};
use crate::convert::{MarkdownOptions, RuleRegistry, html_to_markdown_with};
#[cfg(feature = "fetch")]
use crate::fetch::fetch_url;
use crate::fetch::FetchConfig;
use crate::metadata::{FlattenPolicy, MetadataEntry, article_entries, extract_document_metadata, flatten};
use crate::parse::normalize;
use crate::readability::{Readability, ReadabilityConfig};
use crate::{CrawlError, Result};

/// Everything produced for one page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    pub url: String,
    pub title: Option<String>,
    /// Article HTML.
    pub content: String,
    pub text_content: String,
    pub excerpt: Option<String>,
    pub byline: Option<String>,
    pub length: usize,
    pub markdown: String,
    /// Flattened metadata (article fields, `<title>`, meta tags, JSON-LD).
    pub metadata: Map<String, Value>,
    /// The ordered entries `metadata` was flattened from.
    #[serde(skip)]
    pub entries: Vec<MetadataEntry>,
    #[serde(skip)]
    pub article: ArticleResult,
}

/// Crawl pipeline with its collaborators.
#[derive(Clone)]
pub struct Crawler {
    fetch_config: FetchConfig,
    extractor: Arc<dyn ArticleExtractor>,
    markdown_options: MarkdownOptions,
    flatten_policy: FlattenPolicy,
}

impl fmt::Debug for Crawler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crawler")
            .field("fetch_config", &self.fetch_config)
            .field("markdown_options", &self.markdown_options)
            .field("flatten_policy", &self.flatten_policy)
            .finish_non_exhaustive()
    }
}

impl Default for Crawler {
    fn default() -> Self {
        Self::new()
    }
}

impl Crawler {
    /// A crawler with default fetch settings and the [`Readability`] extractor.
    pub fn new() -> Self {
        Self {
            fetch_config: FetchConfig::default(),
            extractor: Arc::new(Readability::new()),
            markdown_options: MarkdownOptions::default(),
            flatten_policy: FlattenPolicy::default(),
        }
    }

    pub fn with_fetch_config(mut self, config: FetchConfig) -> Self {
        self.fetch_config = config;
        self
    }

    pub fn with_readability_config(self, config: ReadabilityConfig) -> Self {
        self.with_extractor(Readability::with_config(config))
    }

    /// Replaces the article extractor.
    pub fn with_extractor(mut self, extractor: impl ArticleExtractor + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn with_markdown_options(mut self, options: MarkdownOptions) -> Self {
        self.markdown_options = options;
        self
    }

    pub fn with_flatten_policy(mut self, policy: FlattenPolicy) -> Self {
        self.flatten_policy = policy;
        self
    }

    pub fn fetch_config(&self) -> &FetchConfig {
        &self.fetch_config
    }

    pub fn flatten_policy(&self) -> FlattenPolicy {
        self.flatten_policy
    }

    /// Fetches `url` and runs [`Crawler::crawl_html`] on the body.
    #[cfg(feature = "fetch")]
    pub async fn fetch_and_parse(&self, url: &str) -> Result<CrawlResult> {
        let html = fetch_url(url, &self.fetch_config).await?;
        self.crawl_html(&html, url)
    }

    /// Fetches `url` and returns its flattened document metadata.
    #[cfg(feature = "fetch")]
    pub async fn get_metadata(&self, url: &str) -> Result<Map<String, Value>> {
        let html = fetch_url(url, &self.fetch_config).await?;
        Ok(flatten(&self.metadata_entries(&html), self.flatten_policy))
    }

    /// `<title>`, meta and JSON-LD entries of `html`, in document order.
    pub fn metadata_entries(&self, html: &str) -> Vec<MetadataEntry> {
        extract_document_metadata(&normalize(html))
    }

    /// Converts HTML to Markdown with this crawler's options.
    pub fn markdown(&self, html: &str) -> String {
        html_to_markdown_with(html, &self.registry())
    }

    /// Runs extraction, conversion and metadata on already fetched HTML.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::NotExtractable`] when the extractor finds no article.
    pub fn crawl_html(&self, html: &str, url: &str) -> Result<CrawlResult> {
        let root = normalize(html);

        let Some(article) = self.extractor.extract(&root) else {
            tracing::warn!(url, "article not extractable");
            return Err(CrawlError::NotExtractable);
        };

        let markdown = self.markdown(&article.content_html);
        let entries = article_entries(&article, extract_document_metadata(&root));
        let metadata = flatten(&entries, self.flatten_policy);

        tracing::debug!(url, length = article.length, entries = entries.len(), "page crawled");

        Ok(CrawlResult {
            url: url.to_string(),
            title: article.title.clone(),
            content: article.content_html.clone(),
            text_content: article.text_content.clone(),
            excerpt: article.excerpt.clone(),
            byline: article.byline.clone(),
            length: article.length,
            markdown,
            metadata,
            entries,
            article,
        })
    }

    fn registry(&self) -> RuleRegistry {
        RuleRegistry::builder().options(self.markdown_options.clone()).build()
    }
}

/// Fetches and crawls `url` with default settings.
#[cfg(feature = "fetch")]
pub async fn fetch_and_parse(url: &str) -> Result<CrawlResult> {
    Crawler::new().fetch_and_parse(url).await
}

/// Fetches `url` and returns its flattened metadata with default settings.
#[cfg(feature = "fetch")]
pub async fn get_metadata(url: &str) -> Result<Map<String, Value>> {
    Crawler::new().get_metadata(url).await
}

/// Crawls already fetched HTML with default settings.
pub fn crawl_html(html: &str, url: &str) -> Result<CrawlResult> {
    Crawler::new().crawl_html(html, url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Node;

    const BODY: &str = "Markdown conversion keeps headings, lists, links, and code readable in plain text, \
        which is why crawlers emit it for downstream indexing and language model pipelines.";

    fn page() -> String {
        format!(
            r#"<html dir="ltr">
            <head>
                <title>Crawl Test</title>
                <meta name="description" content="A page about crawling.">
                <meta property="og:title" content="OG Crawl Test">
                <script type="application/ld+json">{{"@type":"Article","headline":"LD"}}</script>
            </head>
            <body>
                <nav><a href="/">Home</a></nav>
                <article>
                    <h2>Section</h2>
                    <p>{BODY}</p>
                    <p>{BODY}</p>
                    <pre><code>let x = 1;</code></pre>
                </article>
            </body>
            </html>"#
        )
    }

    #[test]
    fn test_crawl_html() {
        let result = crawl_html(&page(), "https://example.com/post").unwrap();

        assert_eq!(result.url, "https://example.com/post");
        assert_eq!(result.title.as_deref(), Some("OG Crawl Test"));
        assert_eq!(result.excerpt.as_deref(), Some("A page about crawling."));
        assert!(result.markdown.starts_with("## Section\n\nMarkdown conversion"));
        assert!(result.markdown.ends_with("```\nlet x = 1;\n```"));
        assert!(!result.markdown.contains("Home"));
        assert_eq!(result.length, result.text_content.chars().count());
    }

    #[test]
    fn test_crawl_metadata_order_and_values() {
        let result = crawl_html(&page(), "https://example.com/post").unwrap();

        let keys: Vec<&str> = result.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["title", "excerpt", "dir", "length", "title", "description", "og:title", "json-ld:0"]
        );

        assert_eq!(result.metadata["title"], "Crawl Test");
        assert_eq!(result.metadata["dir"], "ltr");
        assert_eq!(result.metadata["json-ld:0"]["headline"], "LD");

        let first = Crawler::new()
            .with_flatten_policy(FlattenPolicy::FirstWins)
            .crawl_html(&page(), "https://example.com/post")
            .unwrap();
        assert_eq!(first.metadata["title"], "OG Crawl Test");
    }

    #[test]
    fn test_not_extractable() {
        let err = crawl_html("<html><body><p>tiny</p></body></html>", "https://example.com").unwrap_err();
        assert!(matches!(err, CrawlError::NotExtractable));
    }

    #[test]
    fn test_deep_nesting_is_not_extractable() {
        let html = format!("{}<p>{BODY}{BODY}</p>{}", "<div>".repeat(20_000), "</div>".repeat(20_000));
        let result = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(move || crawl_html(&html, "https://example.com/deep"))
            .unwrap()
            .join()
            .unwrap();
        assert!(matches!(result, Err(CrawlError::NotExtractable)));
    }

    #[test]
    fn test_custom_extractor() {
        let crawler = Crawler::new().with_extractor(|root: &Node| {
            let body = crate::parse::body_of(root)?;
            Some(ArticleResult::from_content(body.inner_html()))
        });
        let result = crawler.crawl_html("<p>Short but <em>accepted</em></p>", "https://example.com").unwrap();
        assert_eq!(result.markdown, "Short but *accepted*");
        assert_eq!(result.metadata["length"], "18");
    }

    #[test]
    fn test_markdown_options_applied() {
        let crawler = Crawler::new().with_markdown_options(MarkdownOptions::builder().fence("~~~").build());
        let result = crawler.crawl_html(&page(), "https://example.com/post").unwrap();
        assert!(result.markdown.ends_with("~~~\nlet x = 1;\n~~~"));
    }

    #[test]
    fn test_serialized_shape() {
        let result = crawl_html(&page(), "https://example.com/post").unwrap();
        let json = serde_json::to_value(&result).unwrap();
        for key in ["url", "title", "content", "textContent", "excerpt", "byline", "length", "markdown", "metadata"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json.get("entries").is_none());
    }

    #[cfg(feature = "fetch")]
    #[test]
    fn test_fetch_and_parse_invalid_url() {
        let result = std::thread::spawn(|| {
            tokio::runtime::Runtime::new()
                .unwrap()
                .block_on(fetch_and_parse("not a url"))
        })
        .join()
        .unwrap();
        assert!(matches!(result, Err(CrawlError::InvalidUrl(_))));
    }
}
