//! Main-content extraction.
//!
//! [`Readability`] is the default [`ArticleExtractor`]. It strips noise
//! elements, scores paragraph-like elements and propagates their points to
//! up to three ancestors, then takes the best container (plus any strong
//! siblings) as the article.
//!
//! # Example
//!
//! ```rust
//! use crawlmark_core::{ArticleExtractor, Readability, ReadabilityConfig};
//! use crawlmark_core::parse::normalize;
//!
//! let config = ReadabilityConfig::builder().char_threshold(20).build();
//! let reader = Readability::with_config(config);
//!
//! let paragraph = "A sentence with enough words, commas, and length to count as prose. ";
//! let html = format!("<html><body><article><p>{}</p></article></body></html>", paragraph.repeat(3));
//! let article = reader.extract(&normalize(&html)).unwrap();
//! assert!(article.text_content.contains("enough words"));
//! ```

use std::collections::BTreeMap;

use crate::article::{ArticleExtractor, ArticleResult};
use crate::convert::{MAX_DEPTH, classify};
use crate::dom::{Element, Node};
use crate::parse::{Document, normalize};
use crate::scoring::{ScoreConfig, class_id_weight, content_density_score, initial_score, is_unlikely_candidate, link_density};
use crate::{CrawlError, Result};

/// Elements removed before scoring.
const NOISE_TAGS: &[&str] =
    &["script", "style", "noscript", "iframe", "form", "nav", "aside", "footer", "header", "svg", "canvas", "template"];

/// Minimum text length for an element to award points.
const MIN_PARAGRAPH_LENGTH: usize = 25;

/// Configuration for the Readability extractor.
///
/// # Example
///
/// ```rust
/// use crawlmark_core::ReadabilityConfig;
///
/// let config = ReadabilityConfig::builder()
///     .min_score(10.0)
///     .char_threshold(500)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ReadabilityConfig {
    /// Minimum score the best candidate must reach (default: 5.0).
    pub min_score: f64,

    /// Minimum character count of the extracted text (default: 140).
    pub char_threshold: usize,

    /// Whether to drop elements whose class/id look like boilerplate
    /// before scoring (default: true). Extraction retries without this
    /// when the first pass finds nothing.
    pub remove_unlikely: bool,
}

impl Default for ReadabilityConfig {
    fn default() -> Self {
        Self { min_score: 5.0, char_threshold: 140, remove_unlikely: true }
    }
}

impl ReadabilityConfig {
    pub fn builder() -> ReadabilityConfigBuilder {
        ReadabilityConfigBuilder::new()
    }
}

/// Builder for ReadabilityConfig.
pub struct ReadabilityConfigBuilder {
    config: ReadabilityConfig,
}

impl ReadabilityConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: ReadabilityConfig::default() }
    }

    /// Sets the minimum score threshold.
    pub fn min_score(mut self, value: f64) -> Self {
        self.config.min_score = value;
        self
    }

    /// Sets the character threshold.
    pub fn char_threshold(mut self, value: usize) -> Self {
        self.config.char_threshold = value;
        self
    }

    /// Sets whether to remove unlikely candidates.
    pub fn remove_unlikely(mut self, value: bool) -> Self {
        self.config.remove_unlikely = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> ReadabilityConfig {
        self.config
    }
}

impl Default for ReadabilityConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Scores keyed by the child-index path from the cleaned `<body>`.
type Scores = BTreeMap<Vec<usize>, f64>;

/// Default article extractor.
#[derive(Debug, Clone, Default)]
pub struct Readability {
    config: ReadabilityConfig,
    score_config: ScoreConfig,
}

impl Readability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReadabilityConfig) -> Self {
        Self { config, score_config: ScoreConfig::default() }
    }

    pub fn config(&self) -> &ReadabilityConfig {
        &self.config
    }

    /// Parses HTML and extracts the article.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::NotExtractable`] when no readable content is found.
    pub fn parse(&self, html: &str) -> Result<ArticleResult> {
        self.extract(&normalize(html)).ok_or(CrawlError::NotExtractable)
    }

    /// Checks if content appears readable without full extraction.
    ///
    /// Sums `sqrt(len - 140)` over visible paragraphs, `pre` blocks and
    /// articles of at least 140 characters and answers whether the total
    /// passes 20.
    pub fn is_probably_readable(&self, html: &str) -> bool {
        let doc = Document::parse(html);
        let mut score = 0.0;

        for el in doc.body().descendants() {
            if !matches!(el.tag_name.as_str(), "p" | "pre" | "article") || is_hidden(el) || is_unlikely_candidate(el) {
                continue;
            }
            let length = el.text_content().trim().chars().count();
            if length < 140 {
                continue;
            }
            score += ((length - 140) as f64).sqrt();
            if score > 20.0 {
                return true;
            }
        }

        false
    }

    fn extract_pass(&self, doc: &Document, remove_unlikely: bool) -> Option<ArticleResult> {
        let body = cleaned(doc.body(), remove_unlikely);
        let scores = self.score_candidates(&body);

        let mut best: Option<(&Vec<usize>, f64)> = None;
        for (path, score) in &scores {
            let Some(el) = at_path(&body, path) else { continue };
            let adjusted = score * (1.0 - link_density(el));
            if best.is_none_or(|(_, s)| adjusted > s) {
                best = Some((path, adjusted));
            }
        }

        let (top_path, top_score) = best?;
        if top_score < self.config.min_score {
            tracing::debug!(top_score, min_score = self.config.min_score, "best candidate below minimum score");
            return None;
        }

        let content = self.assemble(&body, top_path, top_score, &scores)?;
        let article = ArticleResult::from_content(content);
        if article.length < self.config.char_threshold {
            tracing::debug!(
                length = article.length,
                threshold = self.config.char_threshold,
                "extracted text shorter than threshold"
            );
            return None;
        }

        Some(article)
    }

    fn score_candidates(&self, body: &Element) -> Scores {
        let mut scores = Scores::new();
        let mut stack: Vec<(&Element, Vec<usize>)> = vec![(body, Vec::new())];

        while let Some((el, path)) = stack.pop() {
            for (i, child) in el.children.iter().enumerate() {
                if let Node::Element(child) = child {
                    let mut child_path = path.clone();
                    child_path.push(i);
                    stack.push((child, child_path));
                }
            }

            if !is_scorable(el) {
                continue;
            }

            let text = collapsed_text(el);
            if text.chars().count() < MIN_PARAGRAPH_LENGTH {
                continue;
            }

            let points = content_density_score(&text, &self.score_config);
            for level in 1..=3usize {
                if path.len() < level {
                    break;
                }
                let ancestor_path = &path[..path.len() - level];
                let Some(ancestor) = at_path(body, ancestor_path) else { break };
                let divider = if level == 1 { 1.0 } else { level as f64 };
                let entry = scores
                    .entry(ancestor_path.to_vec())
                    .or_insert_with(|| initial_score(ancestor, &self.score_config));
                *entry += points / divider;
            }
        }

        scores
    }

    /// Serializes the top candidate together with qualifying siblings.
    fn assemble(&self, body: &Element, top_path: &[usize], top_score: f64, scores: &Scores) -> Option<String> {
        let top = at_path(body, top_path)?;
        let Some((_, parent_path)) = top_path.split_last() else {
            return Some(clean_conditionally(top, &self.score_config).outer_html());
        };

        let parent = at_path(body, parent_path)?;
        let threshold = (top_score * 0.2).max(10.0);
        let mut parts = Vec::new();

        for (i, child) in parent.children.iter().enumerate() {
            let Node::Element(sibling) = child else { continue };
            let mut sibling_path = parent_path.to_vec();
            sibling_path.push(i);

            let include = sibling_path == top_path
                || scores
                    .get(&sibling_path)
                    .is_some_and(|score| score * (1.0 - link_density(sibling)) >= threshold)
                || (sibling.is("p") && collapsed_text(sibling).chars().count() > 80 && link_density(sibling) < 0.25);

            if include {
                parts.push(clean_conditionally(sibling, &self.score_config).outer_html());
            }
        }

        match parts.len() {
            1 => parts.pop(),
            _ => Some(format!("<div>{}</div>", parts.concat())),
        }
    }
}

impl ArticleExtractor for Readability {
    fn extract(&self, document: &Node) -> Option<ArticleResult> {
        let root = document.as_element()?;
        let depth = root.depth();
        if depth > MAX_DEPTH {
            tracing::warn!(depth, max_depth = MAX_DEPTH, "document too deeply nested to extract");
            return None;
        }
        let doc = Document::from_root(root.clone());

        let article = self.extract_pass(&doc, self.config.remove_unlikely).or_else(|| {
            if self.config.remove_unlikely {
                tracing::debug!("retrying extraction with unlikely candidates kept");
                self.extract_pass(&doc, false)
            } else {
                None
            }
        });

        match article {
            Some(article) => Some(article.with_document_fields(&doc)),
            None => {
                tracing::info!("no readable content found");
                None
            }
        }
    }
}

/// Paragraph-like elements award points to their ancestors. A `div` or
/// `section` counts when it has no block children, i.e. it is used as a
/// paragraph.
fn is_scorable(el: &Element) -> bool {
    match el.tag_name.as_str() {
        "p" | "pre" | "td" => true,
        "div" | "section" => !el.descendants().any(|d| classify(&d.tag_name).is_block()),
        _ => false,
    }
}

fn is_hidden(el: &Element) -> bool {
    el.attr("hidden").is_some()
        || el.attr("aria-hidden").is_some_and(|v| v == "true")
        || el.attr("style").is_some_and(|s| s.replace(' ', "").contains("display:none"))
}

fn collapsed_text(el: &Element) -> String {
    el.text_content().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Follows child indices from `root`.
fn at_path<'a>(root: &'a Element, path: &[usize]) -> Option<&'a Element> {
    path.iter().try_fold(root, |el, &i| el.children.get(i).and_then(Node::as_element))
}

/// Deep copy without noise, comments, hidden elements and (optionally)
/// unlikely candidates.
fn cleaned(el: &Element, remove_unlikely: bool) -> Element {
    let children = el
        .children
        .iter()
        .filter_map(|child| match child {
            Node::Element(c) if NOISE_TAGS.contains(&c.tag_name.as_str()) || is_hidden(c) => None,
            Node::Element(c) if remove_unlikely && is_unlikely_candidate(c) => None,
            Node::Element(c) => Some(Node::Element(cleaned(c, remove_unlikely))),
            Node::Comment(_) => None,
            Node::Text(t) => Some(Node::Text(t.clone())),
        })
        .collect();

    Element { tag_name: el.tag_name.clone(), attributes: el.attributes.clone(), children }
}

/// Drops link-heavy or negatively weighted containers inside the article.
fn clean_conditionally(el: &Element, config: &ScoreConfig) -> Element {
    let children = el
        .children
        .iter()
        .filter_map(|child| match child {
            Node::Element(c) if is_droppable(c, config) => None,
            Node::Element(c) => Some(Node::Element(clean_conditionally(c, config))),
            other => Some(other.clone()),
        })
        .collect();

    Element { tag_name: el.tag_name.clone(), attributes: el.attributes.clone(), children }
}

fn is_droppable(el: &Element, config: &ScoreConfig) -> bool {
    if !matches!(el.tag_name.as_str(), "div" | "section" | "ul" | "ol") {
        return false;
    }
    if class_id_weight(el, config) < 0.0 {
        return true;
    }
    let text_length = collapsed_text(el).chars().count();
    link_density(el) > 0.5 && text_length < 200 && el.find("p").is_none()
}

/// Convenience function for one-liner extraction with defaults.
///
/// # Errors
///
/// Returns [`CrawlError::NotExtractable`] when no readable content is found.
pub fn parse(html: &str) -> Result<ArticleResult> {
    Readability::new().parse(html)
}

/// Quick readability check with default settings.
pub fn is_probably_readable(html: &str) -> bool {
    Readability::new().is_probably_readable(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAGRAPH: &str = "Rust is a language empowering everyone to build reliable and efficient software, \
        with a rich type system, an ownership model, and great tooling that guarantees memory safety.";

    fn article_page() -> String {
        format!(
            r#"<!DOCTYPE html>
            <html lang="en">
            <head>
                <title>Reliable Software</title>
                <meta name="author" content="Ferris">
                <meta property="og:site_name" content="Crab Times">
            </head>
            <body>
                <header><a href="/">Home</a></header>
                <nav><a href="/a">A</a> <a href="/b">B</a></nav>
                <div class="sidebar"><p>{PARAGRAPH}</p></div>
                <div id="main">
                    <article class="post">
                        <h1>Reliable Software</h1>
                        <p>{PARAGRAPH}</p>
                        <p>{PARAGRAPH}</p>
                        <div class="share"><a href="/x">Share on X</a> <a href="/y">Share on Y</a></div>
                        <p>{PARAGRAPH}</p>
                    </article>
                </div>
                <footer>Copyright</footer>
                <script>track();</script>
            </body>
            </html>"#
        )
    }

    #[test]
    fn test_readability_config_default() {
        let config = ReadabilityConfig::default();
        assert_eq!(config.min_score, 5.0);
        assert_eq!(config.char_threshold, 140);
        assert!(config.remove_unlikely);
    }

    #[test]
    fn test_readability_config_builder() {
        let config = ReadabilityConfig::builder()
            .min_score(25.0)
            .char_threshold(500)
            .remove_unlikely(false)
            .build();

        assert_eq!(config.min_score, 25.0);
        assert_eq!(config.char_threshold, 500);
        assert!(!config.remove_unlikely);
    }

    #[test]
    fn test_extracts_main_article() {
        let article = parse(&article_page()).unwrap();

        assert!(article.content_html.starts_with("<article"));
        assert_eq!(article.text_content.matches("ownership model").count(), 3);
        assert!(!article.content_html.contains("Share on X"));
        assert!(!article.text_content.contains("Copyright"));
        assert!(!article.text_content.contains("track()"));
        assert_eq!(article.length, article.text_content.chars().count());
    }

    #[test]
    fn test_document_fields_attached() {
        let article = parse(&article_page()).unwrap();
        assert_eq!(article.title.as_deref(), Some("Reliable Software"));
        assert_eq!(article.byline.as_deref(), Some("Ferris"));
        assert_eq!(article.site_name.as_deref(), Some("Crab Times"));
        assert!(article.excerpt.unwrap().starts_with("Rust is a language"));
    }

    #[test]
    fn test_not_extractable() {
        let html = r##"<html><body><nav><a href="#">Link</a></nav><p>Too short.</p></body></html>"##;
        assert!(matches!(parse(html), Err(CrawlError::NotExtractable)));
        assert!(Readability::new().extract(&normalize(html)).is_none());
    }

    #[test]
    fn test_char_threshold() {
        let html = format!("<html><body><div><p>{PARAGRAPH}</p></div></body></html>");
        assert!(parse(&html).is_ok());

        let strict = Readability::with_config(ReadabilityConfig::builder().char_threshold(5000).build());
        assert!(strict.parse(&html).is_err());
    }

    #[test]
    fn test_retry_without_unlikely_removal() {
        let html = format!(r#"<html><body><div class="social"><p>{PARAGRAPH}</p><p>{PARAGRAPH}</p></div></body></html>"#);
        let article = parse(&html).unwrap();
        assert!(article.text_content.contains("ownership model"));
    }

    #[test]
    fn test_siblings_included() {
        let html = format!(
            r#"<html><body><div><div class="entry"><p>{PARAGRAPH}</p><p>{PARAGRAPH}</p></div><p>{PARAGRAPH} Trailing sibling.</p></div></body></html>"#
        );
        let article = parse(&html).unwrap();
        assert!(article.content_html.starts_with("<div><div class=\"entry\">"));
        assert!(article.text_content.contains("Trailing sibling."));
    }

    #[test]
    fn test_is_probably_readable() {
        assert!(is_probably_readable(&article_page()));
        assert!(!is_probably_readable(r##"<html><body><nav><a href="#">Link</a></nav></body></html>"##));

        let hidden = format!(r#"<html><body><p hidden>{PARAGRAPH}{PARAGRAPH}{PARAGRAPH}</p></body></html>"#);
        assert!(!is_probably_readable(&hidden));
    }

    #[test]
    fn test_deeply_nested_document_not_extractable() {
        let depth = MAX_DEPTH + 10;
        let html = format!("{}<p>{PARAGRAPH}{PARAGRAPH}</p>{}", "<div>".repeat(depth), "</div>".repeat(depth));
        assert!(matches!(parse(&html), Err(CrawlError::NotExtractable)));
    }

    #[test]
    fn test_at_path() {
        let root = Element::new("div")
            .with_text("x")
            .with_child(Element::new("p").with_child(Element::new("span")));
        assert!(at_path(&root, &[1, 0]).unwrap().is("span"));
        assert!(at_path(&root, &[0]).is_none());
        assert!(at_path(&root, &[]).unwrap().is("div"));
    }
}
