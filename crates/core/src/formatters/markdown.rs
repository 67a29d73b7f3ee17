use std::collections::HashSet;

use crate::Result;
use crate::article::ArticleResult;
use crate::convert::{MarkdownOptions, RuleRegistry, try_html_to_markdown};
use crate::parse::normalize_fragment;

/// Words per minute used for the frontmatter reading time.
const WORDS_PER_MINUTE: f64 = 200.0;

/// Configuration for document Markdown output
#[derive(Debug, Clone, Default)]
pub struct MarkdownConfig {
    /// Include TOML frontmatter with article fields
    pub include_frontmatter: bool,
    /// Generate reference table for all links
    pub include_references: bool,
    /// Strip images from output
    pub strip_images: bool,
    /// Include title as H1 heading at the start of content
    pub include_title_heading: bool,
}

/// A collected link reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReference {
    pub text: String,
    pub url: String,
}

/// Renders an article as a Markdown document with the default converter options.
///
/// Unlike [`crate::html_to_markdown`], a conversion fault is returned as an
/// error instead of an empty body.
pub fn convert_to_markdown(article: &ArticleResult, config: &MarkdownConfig) -> Result<String> {
    render(article, config, MarkdownOptions::default())
}

fn render(article: &ArticleResult, config: &MarkdownConfig, mut options: MarkdownOptions) -> Result<String> {
    let mut output = String::new();

    if config.include_frontmatter {
        output.push_str(&generate_frontmatter(article));
        output.push('\n');
    }

    if config.include_title_heading
        && let Some(title) = &article.title
    {
        output.push_str(&format!("# {}\n\n", title.trim()));
    }

    options.strip_images |= config.strip_images;
    let registry = RuleRegistry::builder().options(options).build();
    output.push_str(&try_html_to_markdown(&article.content_html, &registry)?);

    if config.include_references {
        let links = extract_links(&article.content_html);
        if !links.is_empty() {
            output.push_str("\n\n## References\n\n");
            output.push_str(&generate_reference_table(&links));
        }
    }

    Ok(output)
}

/// TOML frontmatter from the article fields that are present.
fn generate_frontmatter(article: &ArticleResult) -> String {
    let mut frontmatter = String::from("+++");

    let fields = [
        ("title", &article.title),
        ("author", &article.byline),
        ("date", &article.published_time),
        ("site", &article.site_name),
        ("excerpt", &article.excerpt),
    ];
    for (key, value) in fields {
        if let Some(value) = value {
            frontmatter.push_str(&format!("\n{key} = {}", toml_escape_string(value)));
        }
    }

    let word_count = article.word_count();
    if word_count > 0 {
        frontmatter.push_str(&format!("\nword_count = {word_count}"));
        frontmatter.push_str(&format!("\nreading_time_minutes = {:.1}", word_count as f64 / WORDS_PER_MINUTE));
    }

    frontmatter.push_str("\n+++\n");
    frontmatter
}

/// Escape a string for TOML format
fn toml_escape_string(s: &str) -> String {
    format!(
        "\"{}\"",
        s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n").replace('\t', "\\t")
    )
}

/// Links with non-empty text and href, first occurrence of each URL only.
pub fn extract_links(html: &str) -> Vec<LinkReference> {
    let root = normalize_fragment(html);
    let Some(root) = root.as_element() else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    root.find_all("a")
        .filter_map(|a| {
            let url = a.non_empty_attr("href")?.trim().to_string();
            let text = a.text_content().split_whitespace().collect::<Vec<_>>().join(" ");
            (!text.is_empty() && !url.is_empty()).then_some(LinkReference { text, url })
        })
        .filter(|link| seen.insert(link.url.clone()))
        .collect()
}

/// Generate a reference table from collected links
fn generate_reference_table(links: &[LinkReference]) -> String {
    let mut table = String::from("| # | Text | URL |\n");
    table.push_str("|---|------|-----|\n");

    for (i, link) in links.iter().enumerate() {
        table.push_str(&format!("| {} | {} | {} |\n", i + 1, escape_pipe(&link.text), escape_pipe(&link.url)));
    }

    table
}

fn escape_pipe(s: &str) -> String {
    s.replace('|', "\\|")
}

/// Markdown formatter with configurable document and converter options
#[derive(Debug, Clone, Default)]
pub struct MarkdownFormatter {
    config: MarkdownConfig,
    options: MarkdownOptions,
}

impl MarkdownFormatter {
    pub fn new(config: MarkdownConfig) -> Self {
        Self { config, options: MarkdownOptions::default() }
    }

    pub fn with_options(mut self, options: MarkdownOptions) -> Self {
        self.options = options;
        self
    }

    pub fn convert(&self, article: &ArticleResult) -> Result<String> {
        render(article, &self.config, self.options.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(html: &str) -> ArticleResult {
        ArticleResult::from_content(html.to_string())
    }

    #[test]
    fn test_convert_basic() {
        let markdown =
            convert_to_markdown(&article("<h1>Title</h1><p>This is a paragraph.</p>"), &MarkdownConfig::default())
                .unwrap();
        assert_eq!(markdown, "# Title\n\nThis is a paragraph.");
    }

    #[test]
    fn test_convert_with_images() {
        let html = r#"<p>An image: <img src="photo.jpg" alt="A photo"></p>"#;
        let markdown = convert_to_markdown(&article(html), &MarkdownConfig::default()).unwrap();
        assert!(markdown.contains("![A photo](photo.jpg)"));
    }

    #[test]
    fn test_strip_images() {
        let html = r#"<p>Text before <img src="photo.jpg"> text after.</p>"#;
        let config = MarkdownConfig { strip_images: true, ..Default::default() };
        let markdown = convert_to_markdown(&article(html), &config).unwrap();
        assert!(!markdown.contains("photo.jpg"));
        assert!(markdown.contains("Text before"));
    }

    #[test]
    fn test_title_heading() {
        let mut input = article("<p>Body</p>");
        input.title = Some("Heading ".to_string());
        let config = MarkdownConfig { include_title_heading: true, ..Default::default() };
        assert_eq!(convert_to_markdown(&input, &config).unwrap(), "# Heading\n\nBody");
    }

    #[test]
    fn test_frontmatter_generation() {
        let mut input = article("<p>one two three four</p>");
        input.title = Some("Test \"Quoted\" Title".to_string());
        input.byline = Some("Test Author".to_string());
        input.published_time = Some("2024-01-15".to_string());
        input.site_name = Some("Test Site".to_string());

        let frontmatter = generate_frontmatter(&input);
        assert!(frontmatter.starts_with("+++\n"));
        assert!(frontmatter.ends_with("\n+++\n"));
        assert!(frontmatter.contains(r#"title = "Test \"Quoted\" Title""#));
        assert!(frontmatter.contains("author = \"Test Author\""));
        assert!(frontmatter.contains("date = \"2024-01-15\""));
        assert!(frontmatter.contains("site = \"Test Site\""));
        assert!(frontmatter.contains("word_count = 4"));
        assert!(frontmatter.contains("reading_time_minutes = 0.0"));
        assert!(!frontmatter.contains("excerpt"));
    }

    #[test]
    fn test_frontmatter_precedes_body() {
        let mut input = article("<p>Body</p>");
        input.title = Some("T".to_string());
        let config = MarkdownConfig { include_frontmatter: true, ..Default::default() };
        let markdown = convert_to_markdown(&input, &config).unwrap();
        assert_eq!(markdown, "+++\ntitle = \"T\"\nword_count = 1\nreading_time_minutes = 0.0\n+++\n\nBody");
    }

    #[test]
    fn test_toml_escape() {
        assert_eq!(toml_escape_string("plain"), "\"plain\"");
        assert_eq!(toml_escape_string("a\\b\nc"), "\"a\\\\b\\nc\"");
    }

    #[test]
    fn test_extract_links_deduplicates() {
        let html = r#"
            <p>
                <a href="https://example.com">Example</a>
                <a href="/relative">Relative</a>
                <a href="https://example.com">Again</a>
                <a href="">Empty</a>
                <a href="/no-text"> </a>
            </p>
        "#;

        let links = extract_links(html);
        assert_eq!(
            links,
            vec![
                LinkReference { text: "Example".to_string(), url: "https://example.com".to_string() },
                LinkReference { text: "Relative".to_string(), url: "/relative".to_string() },
            ]
        );
    }

    #[test]
    fn test_reference_table_generation() {
        let links = vec![
            LinkReference { text: "Example | Site".to_string(), url: "https://example.com".to_string() },
            LinkReference { text: "Test Link".to_string(), url: "https://test.com".to_string() },
        ];

        let table = generate_reference_table(&links);
        assert!(table.starts_with("| # | Text | URL |\n|---|------|-----|\n"));
        assert!(table.contains(r"| 1 | Example \| Site | https://example.com |"));
        assert!(table.contains("| 2 | Test Link | https://test.com |"));
    }

    #[test]
    fn test_convert_with_references() {
        let html = r#"<p>Visit <a href="https://example.com">Example</a> for more info.</p>"#;
        let config = MarkdownConfig { include_references: true, ..Default::default() };
        let markdown = convert_to_markdown(&article(html), &config).unwrap();
        assert!(markdown.starts_with("Visit [Example](https://example.com) for more info."));
        assert!(markdown.contains("\n\n## References\n\n| # | Text | URL |"));
    }

    #[test]
    fn test_formatter_uses_options() {
        let formatter = MarkdownFormatter::new(MarkdownConfig::default())
            .with_options(MarkdownOptions::builder().em_delimiter("_").build());
        assert_eq!(formatter.convert(&article("<p><em>hi</em></p>")).unwrap(), "_hi_");
    }

    #[test]
    fn test_code_blocks_and_tables() {
        let html = r#"<pre><code>fn main() {}</code></pre><table><tr><td>Data 1</td></tr></table>"#;
        let markdown = convert_to_markdown(&article(html), &MarkdownConfig::default()).unwrap();
        assert!(markdown.starts_with("```\nfn main() {}\n```"));
        assert!(markdown.contains("<td>Data 1</td>"));
    }
}
