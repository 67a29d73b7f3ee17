//! Extracted article type and the extractor seam.
//!
//! [`ArticleResult`] is what a content extractor hands back for a page.
//! An extractor returns `None` when nothing readable was found, which the
//! crawl pipeline reports as [`crate::CrawlError::NotExtractable`] rather
//! than as an empty article.

use serde::{Deserialize, Serialize};

use crate::dom::Node;
use crate::parse::{Document, normalize_fragment};

/// The readable part of a page plus its article-level fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResult {
    pub title: Option<String>,

    /// Cleaned HTML of the main content.
    #[serde(rename = "content")]
    pub content_html: String,

    /// Text of the main content, tags stripped.
    pub text_content: String,

    pub excerpt: Option<String>,
    pub byline: Option<String>,
    pub site_name: Option<String>,
    pub published_time: Option<String>,

    /// Reading direction (`ltr` / `rtl`) declared by the page.
    pub dir: Option<String>,

    /// Character count of `text_content`.
    pub length: usize,
}

impl ArticleResult {
    /// Builds a result from content HTML, deriving text and length.
    pub fn from_content(content_html: String) -> Self {
        let text_content = normalize_fragment(&content_html).text_content();
        let length = text_content.chars().count();
        Self { content_html, text_content, length, ..Default::default() }
    }

    /// Copies page-level fields from the source document.
    pub fn with_document_fields(mut self, doc: &Document) -> Self {
        self.title = doc.article_title();
        self.byline = doc.byline();
        self.site_name = doc.meta_content("og:site_name");
        self.published_time = doc.published_time();
        self.dir = doc.dir().map(str::to_string);
        self.excerpt = doc
            .meta_content("og:description")
            .or_else(|| doc.meta_content("description"))
            .or_else(|| first_paragraph(&self.content_html));
        self
    }

    /// Word count of the text content.
    pub fn word_count(&self) -> usize {
        self.text_content.split_whitespace().count()
    }
}

fn first_paragraph(content_html: &str) -> Option<String> {
    let root = normalize_fragment(content_html);
    let el = root.as_element()?;
    el.find_all("p")
        .map(|p| p.text_content().split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|text| !text.is_empty())
}

/// Isolates the main article of a normalized document.
///
/// `None` means "content not extractable" and must not be treated as an
/// empty-but-valid article.
pub trait ArticleExtractor: Send + Sync {
    fn extract(&self, document: &Node) -> Option<ArticleResult>;
}

impl<F> ArticleExtractor for F
where
    F: Fn(&Node) -> Option<ArticleResult> + Send + Sync,
{
    fn extract(&self, document: &Node) -> Option<ArticleResult> {
        self(document)
    }
}

impl Document {
    /// Title with fallbacks: `og:title`, `twitter:title`, `<title>`, first `<h1>`.
    pub fn article_title(&self) -> Option<String> {
        self.meta_content("og:title")
            .or_else(|| self.meta_content("twitter:title"))
            .or_else(|| self.title().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()))
            .or_else(|| self.json_ld_field("headline"))
            .or_else(|| {
                self.root()
                    .find("h1")
                    .map(|h| h.text_content().trim().to_string())
                    .filter(|t| !t.is_empty())
            })
    }

    /// Author with fallbacks: `author` meta, JSON-LD author, `rel="author"`,
    /// then a short element whose class or id mentions a byline.
    pub fn byline(&self) -> Option<String> {
        if let Some(author) = self.meta_content("author") {
            return Some(author);
        }

        if let Some(author) = self.json_ld_field("author") {
            return Some(author);
        }

        let short_text = |text: String| {
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            (!text.is_empty() && text.chars().count() < 100).then_some(text)
        };

        if let Some(text) = self
            .root()
            .descendants()
            .filter(|el| el.attr("rel").is_some_and(|rel| rel.split_whitespace().any(|r| r == "author")))
            .find_map(|el| short_text(el.text_content()))
        {
            return Some(text);
        }

        self.body()
            .descendants()
            .filter(|el| {
                [el.attr("class"), el.attr("id")]
                    .into_iter()
                    .flatten()
                    .any(|v| v.contains("byline") || v.contains("author"))
            })
            .take(3)
            .find_map(|el| short_text(el.text_content()))
    }

    /// `article:published_time`, first `<time datetime>`, JSON-LD `datePublished`.
    pub fn published_time(&self) -> Option<String> {
        self.meta_content("article:published_time")
            .or_else(|| {
                self.root()
                    .find_all("time")
                    .find_map(|t| t.non_empty_attr("datetime"))
                    .map(str::to_string)
            })
            .or_else(|| self.json_ld_field("datePublished"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <!DOCTYPE html>
        <html lang="en" dir="ltr">
        <head>
            <title>Page Title</title>
            <meta name="author" content="Test Author">
            <meta property="og:site_name" content="Example Site">
            <meta property="article:published_time" content="2024-01-15T10:30:00Z">
        </head>
        <body>
            <h1>Heading</h1>
            <article><p>First paragraph text.</p><p>Second.</p></article>
        </body>
        </html>
    "#;

    #[test]
    fn test_from_content_derives_text_and_length() {
        let article = ArticleResult::from_content("<p>Hello <b>world</b></p>".to_string());
        assert_eq!(article.text_content, "Hello world");
        assert_eq!(article.length, 11);
        assert_eq!(article.word_count(), 2);
    }

    #[test]
    fn test_document_fields() {
        let doc = Document::parse(PAGE);
        let article = ArticleResult::from_content("<p>First paragraph text.</p>".to_string()).with_document_fields(&doc);

        assert_eq!(article.title.as_deref(), Some("Page Title"));
        assert_eq!(article.byline.as_deref(), Some("Test Author"));
        assert_eq!(article.site_name.as_deref(), Some("Example Site"));
        assert_eq!(article.published_time.as_deref(), Some("2024-01-15T10:30:00Z"));
        assert_eq!(article.dir.as_deref(), Some("ltr"));
        assert_eq!(article.excerpt.as_deref(), Some("First paragraph text."));
    }

    #[test]
    fn test_title_fallback_order() {
        let doc = Document::parse(
            r#"<head><title>Plain</title><meta name="twitter:title" content="Tweet"></head><body><h1>H</h1></body>"#,
        );
        assert_eq!(doc.article_title(), Some("Tweet".to_string()));

        let doc = Document::parse("<body><h1> Only heading </h1></body>");
        assert_eq!(doc.article_title(), Some("Only heading".to_string()));
    }

    #[test]
    fn test_byline_fallbacks() {
        let doc = Document::parse(r#"<body><a rel="author" href="/me">Jane Roe</a></body>"#);
        assert_eq!(doc.byline(), Some("Jane Roe".to_string()));

        let doc = Document::parse(r#"<body><div class="post-byline">By  Sam</div></body>"#);
        assert_eq!(doc.byline(), Some("By Sam".to_string()));

        let doc = Document::parse("<body><p>nobody</p></body>");
        assert_eq!(doc.byline(), None);
    }

    #[test]
    fn test_published_time_from_time_element() {
        let doc = Document::parse(r#"<body><time>no attr</time><time datetime="2024-03-20">March</time></body>"#);
        assert_eq!(doc.published_time(), Some("2024-03-20".to_string()));
    }

    #[test]
    fn test_closure_extractor() {
        let extractor = |_: &Node| Some(ArticleResult::from_content("<p>x</p>".to_string()));
        let doc = crate::parse::normalize("<p>y</p>");
        assert_eq!(extractor.extract(&doc).map(|a| a.text_content), Some("x".to_string()));
    }

    #[test]
    fn test_serialization_uses_camel_case() {
        let article = ArticleResult::from_content("<p>Test</p>".to_string());
        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["content"], "<p>Test</p>");
        assert_eq!(json["textContent"], "Test");
        assert!(json.get("siteName").is_some());
        assert!(json.get("content_html").is_none());
    }
}
