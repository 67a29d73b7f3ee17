//! HTML to Markdown conversion.
//!
//! The converter parses HTML with [`crate::parse::normalize`], walks the
//! `<body>` with a [`RuleRegistry`] and post-processes the result. Every
//! call builds its own registry and walk state, so concurrent conversions
//! share nothing.
//!
//! # Example
//!
//! ```rust
//! use crawlmark_core::html_to_markdown;
//!
//! assert_eq!(html_to_markdown("<p>Hello <strong>world</strong></p>"), "Hello **world**");
//! ```

mod escape;
mod rules;
mod serializer;

pub use escape::escape_markdown;
pub use rules::{Classification, Content, Filter, Rule, RuleRegistry, RuleRegistryBuilder, classify, default_rules};
pub use serializer::{ConversionContext, MAX_DEPTH, RenderContext, post_process, serialize, serialize_element};

use crate::Result;
use crate::dom::Node;
use crate::parse::{body_of, normalize};

/// Heading syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadingStyle {
    /// `# Title`
    #[default]
    Atx,
    /// `Title` underlined with `=` (h1) or `-` (h2). Deeper levels use ATX.
    Setext,
}

/// Formatting choices for the built-in rules.
///
/// # Example
///
/// ```rust
/// use crawlmark_core::convert::MarkdownOptions;
///
/// let options = MarkdownOptions::builder()
///     .em_delimiter("_")
///     .bullet_marker("-")
///     .build();
/// assert_eq!(options.strong_delimiter, "**");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownOptions {
    /// Emphasis delimiter (default: `*`).
    pub em_delimiter: String,
    /// Strong delimiter (default: `**`).
    pub strong_delimiter: String,
    /// Unordered list marker (default: `*`).
    pub bullet_marker: String,
    /// Heading syntax (default: ATX).
    pub heading_style: HeadingStyle,
    /// Horizontal rule (default: `* * *`).
    pub hr: String,
    /// Text emitted before the newline of a `<br>` (default: two spaces).
    pub br: String,
    /// Indentation per list nesting level (default: four spaces).
    pub list_indent: String,
    /// Code fence (default: three backticks).
    pub fence: String,
    /// Drop `<img>` elements entirely (default: false).
    pub strip_images: bool,
    /// Put the `language-xxx` / `lang-xxx` class of a `pre > code` block
    /// after the opening fence (default: false).
    pub code_language: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            em_delimiter: "*".to_string(),
            strong_delimiter: "**".to_string(),
            bullet_marker: "*".to_string(),
            heading_style: HeadingStyle::Atx,
            hr: "* * *".to_string(),
            br: "  ".to_string(),
            list_indent: "    ".to_string(),
            fence: "```".to_string(),
            strip_images: false,
            code_language: false,
        }
    }
}

impl MarkdownOptions {
    pub fn builder() -> MarkdownOptionsBuilder {
        MarkdownOptionsBuilder::new()
    }
}

/// Builder for [`MarkdownOptions`].
pub struct MarkdownOptionsBuilder {
    options: MarkdownOptions,
}

impl MarkdownOptionsBuilder {
    pub fn new() -> Self {
        Self { options: MarkdownOptions::default() }
    }

    pub fn em_delimiter(mut self, value: impl Into<String>) -> Self {
        self.options.em_delimiter = value.into();
        self
    }

    pub fn strong_delimiter(mut self, value: impl Into<String>) -> Self {
        self.options.strong_delimiter = value.into();
        self
    }

    pub fn bullet_marker(mut self, value: impl Into<String>) -> Self {
        self.options.bullet_marker = value.into();
        self
    }

    pub fn heading_style(mut self, value: HeadingStyle) -> Self {
        self.options.heading_style = value;
        self
    }

    pub fn hr(mut self, value: impl Into<String>) -> Self {
        self.options.hr = value.into();
        self
    }

    pub fn br(mut self, value: impl Into<String>) -> Self {
        self.options.br = value.into();
        self
    }

    pub fn list_indent(mut self, value: impl Into<String>) -> Self {
        self.options.list_indent = value.into();
        self
    }

    pub fn fence(mut self, value: impl Into<String>) -> Self {
        self.options.fence = value.into();
        self
    }

    /// Sets whether images are dropped from the output.
    pub fn strip_images(mut self, value: bool) -> Self {
        self.options.strip_images = value;
        self
    }

    /// Sets whether fenced code blocks carry a language hint.
    pub fn code_language(mut self, value: bool) -> Self {
        self.options.code_language = value;
        self
    }

    pub fn build(self) -> MarkdownOptions {
        self.options
    }
}

impl Default for MarkdownOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts an HTML document or fragment to Markdown with the default rules.
///
/// Never fails. An internal conversion fault is logged and yields `""`;
/// use [`try_html_to_markdown`] to tell "no content" from "fault".
pub fn html_to_markdown(html: &str) -> String {
    html_to_markdown_with(html, &RuleRegistry::default())
}

/// Like [`html_to_markdown`] with a caller-built registry.
pub fn html_to_markdown_with(html: &str, registry: &RuleRegistry) -> String {
    let _span = tracing::debug_span!("html_to_markdown", input_len = html.len()).entered();

    match try_html_to_markdown(html, registry) {
        Ok(markdown) => {
            tracing::debug!(bytes = markdown.len(), "HTML converted to markdown");
            markdown
        }
        Err(err) => {
            tracing::error!(error = %err, "markdown conversion fault, returning empty output");
            String::new()
        }
    }
}

/// Converts HTML to Markdown, surfacing internal faults.
///
/// `Ok("")` means the input had no convertible content.
pub fn try_html_to_markdown(html: &str, registry: &RuleRegistry) -> Result<String> {
    let root = normalize(html);
    match body_of(&root) {
        Some(body) => serialize_element(body, registry),
        None => Ok(String::new()),
    }
}

/// Converts an already normalized node.
pub fn node_to_markdown(node: &Node, registry: &RuleRegistry) -> Result<String> {
    serialize(node, registry)
}
