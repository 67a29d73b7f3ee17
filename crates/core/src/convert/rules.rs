//! Node-matching transformation rules.
//!
//! A [`Rule`] pairs a [`Filter`] with a render function that turns an
//! element (plus the Markdown already produced for its children) into
//! Markdown. Rules live in a [`RuleRegistry`] that is assembled once by a
//! [`RuleRegistryBuilder`] and never mutated afterwards: overriding a
//! built-in means registering another rule with a higher priority, not
//! editing the existing one.
//!
//! # Example
//!
//! ```rust
//! use crawlmark_core::convert::{Filter, Rule, RuleRegistry};
//! use crawlmark_core::html_to_markdown_with;
//!
//! let registry = RuleRegistry::builder()
//!     .register(Rule::new("keyboard", Filter::Tag("kbd"), |content, _, _| format!("<kbd>{content}</kbd>")))
//!     .build();
//!
//! assert_eq!(html_to_markdown_with("<p>Press <kbd>Ctrl</kbd></p>", &registry), "Press <kbd>Ctrl</kbd>");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::convert::serializer::RenderContext;
use crate::convert::{HeadingStyle, MarkdownOptions};
use crate::dom::{Element, Node};

/// Render function: `(children_markdown, element, context) -> markdown`.
pub type RenderFn = dyn Fn(&str, &Element, &RenderContext<'_>) -> String + Send + Sync;

/// Custom element predicate.
pub type PredicateFn = dyn Fn(&Element) -> bool + Send + Sync;

/// Which elements a rule applies to.
#[derive(Clone)]
pub enum Filter {
    Tag(&'static str),
    Tags(&'static [&'static str]),
    Predicate(Arc<PredicateFn>),
}

impl Filter {
    /// Wraps an arbitrary predicate.
    pub fn predicate(f: impl Fn(&Element) -> bool + Send + Sync + 'static) -> Self {
        Filter::Predicate(Arc::new(f))
    }

    pub fn matches(&self, el: &Element) -> bool {
        match self {
            Filter::Tag(tag) => el.is(tag),
            Filter::Tags(tags) => tags.contains(&el.tag_name.as_str()),
            Filter::Predicate(f) => f(el),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Tag(tag) => f.debug_tuple("Tag").field(tag).finish(),
            Filter::Tags(tags) => f.debug_tuple("Tags").field(tags).finish(),
            Filter::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// How the serializer produces the child string handed to a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content {
    /// Children are converted with the registry.
    Children,
    /// Children are emitted as raw text: no rules, no escaping, whitespace kept.
    Verbatim,
    /// Children are never visited; the rule receives an empty string.
    Skip,
}

/// An immutable transformation rule.
#[derive(Clone)]
pub struct Rule {
    name: Cow<'static, str>,
    priority: i32,
    filter: Filter,
    content: Content,
    render: Arc<RenderFn>,
}

impl Rule {
    /// Creates a rule with priority 0 whose children are converted normally.
    pub fn new(
        name: impl Into<Cow<'static, str>>, filter: Filter,
        render: impl Fn(&str, &Element, &RenderContext<'_>) -> String + Send + Sync + 'static,
    ) -> Self {
        Self { name: name.into(), priority: 0, filter, content: Content::Children, render: Arc::new(render) }
    }

    /// Sets the priority. Higher wins when several rules match.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets how children are produced for this rule.
    pub fn with_content(mut self, content: Content) -> Self {
        self.content = content;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn content(&self) -> Content {
        self.content
    }

    pub fn matches(&self, el: &Element) -> bool {
        self.filter.matches(el)
    }

    pub fn render(&self, content: &str, el: &Element, ctx: &RenderContext<'_>) -> String {
        (self.render)(content, el, ctx)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("filter", &self.filter)
            .field("content", &self.content)
            .finish()
    }
}

/// Static block/inline classification used by the fallback rule and by the
/// serializer's whitespace handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Heading(u8),
    Block,
    Inline,
}

impl Classification {
    pub fn is_block(self) -> bool {
        !matches!(self, Classification::Inline)
    }
}

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "audio", "blockquote", "body", "canvas", "center", "dd", "details", "dialog", "dir",
    "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "frameset", "header", "hgroup", "hr",
    "html", "isindex", "li", "main", "menu", "nav", "noframes", "noscript", "ol", "output", "p", "pre", "section",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul", "video",
];

/// Elements that still count as content when they contain no text.
pub const MEANINGFUL_WHEN_BLANK: &[&str] =
    &["a", "table", "thead", "tbody", "tfoot", "th", "td", "iframe", "script", "audio", "video"];

/// Classifies a tag name.
pub fn classify(tag: &str) -> Classification {
    match tag {
        "h1" => Classification::Heading(1),
        "h2" => Classification::Heading(2),
        "h3" => Classification::Heading(3),
        "h4" => Classification::Heading(4),
        "h5" => Classification::Heading(5),
        "h6" => Classification::Heading(6),
        _ if BLOCK_ELEMENTS.contains(&tag) => Classification::Block,
        _ => Classification::Inline,
    }
}

/// An ordered, immutable set of rules plus the fallback.
#[derive(Debug)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
    fallback: Rule,
    options: MarkdownOptions,
}

impl RuleRegistry {
    /// Starts a registry pre-populated with the built-in rules.
    pub fn builder() -> RuleRegistryBuilder {
        RuleRegistryBuilder::new()
    }

    /// Starts an empty registry (only the fallback rule applies).
    pub fn empty() -> RuleRegistryBuilder {
        RuleRegistryBuilder { rules: Vec::new(), options: MarkdownOptions::default(), defaults: false }
    }

    /// Returns the rule to apply to `el`.
    ///
    /// The highest priority match wins; among equal priorities the most
    /// recently registered rule wins, so custom rules shadow built-ins.
    /// When nothing matches the fallback rule is returned.
    pub fn resolve(&self, el: &Element) -> &Rule {
        let mut best: Option<&Rule> = None;
        for rule in self.rules.iter().rev() {
            if rule.matches(el) && best.is_none_or(|b| rule.priority > b.priority) {
                best = Some(rule);
            }
        }
        best.unwrap_or(&self.fallback)
    }

    pub fn options(&self) -> &MarkdownOptions {
        &self.options
    }

    /// Registered rules in registration order (fallback excluded).
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        RuleRegistryBuilder::new().build()
    }
}

/// Collects rules before the registry is frozen.
pub struct RuleRegistryBuilder {
    rules: Vec<Rule>,
    options: MarkdownOptions,
    defaults: bool,
}

impl RuleRegistryBuilder {
    /// Creates a builder that will include the built-in rules.
    pub fn new() -> Self {
        Self { rules: Vec::new(), options: MarkdownOptions::default(), defaults: true }
    }

    /// Sets the conversion options the rules render with.
    pub fn options(mut self, options: MarkdownOptions) -> Self {
        self.options = options;
        self
    }

    /// Appends a rule. Rules registered here are checked before built-ins.
    pub fn register(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Freezes the registry.
    pub fn build(self) -> RuleRegistry {
        let mut rules = if self.defaults { default_rules() } else { Vec::new() };
        if self.options.strip_images {
            rules.push(
                Rule::new("strip_images", Filter::Tag("img"), |_, _, _| String::new())
                    .with_priority(10)
                    .with_content(Content::Skip),
            );
        }
        rules.extend(self.rules);
        RuleRegistry { rules, fallback: fallback_rule(), options: self.options }
    }
}

impl Default for RuleRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn block(content: &str) -> String {
    format!("\n\n{content}\n\n")
}

/// Code kept byte for byte between fence lines.
fn fenced(content: &str, fence: &str, language: &str) -> String {
    format!("\n\n{fence}{language}\n{content}\n{fence}\n\n")
}

/// Language hint from a `language-xxx` / `lang-xxx` class on the inner `code`.
fn code_language(pre: &Element) -> &str {
    let Some(Node::Element(code)) = pre.first_child() else { return "" };
    code.attr("class")
        .into_iter()
        .flat_map(str::split_whitespace)
        .find_map(|class| class.strip_prefix("language-").or_else(|| class.strip_prefix("lang-")))
        .unwrap_or_default()
}

/// The generic rule used when nothing else matches.
fn fallback_rule() -> Rule {
    Rule::new("fallback", Filter::predicate(|_| true), |content, el, ctx| {
        match classify(&el.tag_name) {
            Classification::Heading(level) => heading(content, level, ctx.options),
            Classification::Block => block(content),
            Classification::Inline => content.to_string(),
        }
    })
    .with_priority(i32::MIN)
}

fn heading(content: &str, level: u8, options: &MarkdownOptions) -> String {
    match (options.heading_style, level) {
        (HeadingStyle::Setext, 1 | 2) => {
            let underline = if level == 1 { "=" } else { "-" };
            let width = content.chars().count().max(3);
            format!("\n\n{content}\n{}\n\n", underline.repeat(width))
        }
        _ => format!("\n\n{} {content}\n\n", "#".repeat(level as usize)),
    }
}

fn is_code_block(el: &Element) -> bool {
    el.is("pre") && matches!(el.first_child(), Some(Node::Element(code)) if code.is("code"))
}

/// The built-in rules, in registration order.
///
/// The `table` rule passes tables through as HTML re-serialized from the
/// parsed tree rather than the source bytes. Rows gain the `<tbody>` the
/// parser implies and text comes back entity-escaped, so
/// `<table><tr><td>a &amp; b</td></tr></table>` renders as
/// `<table><tbody><tr><td>a &amp; b</td></tr></tbody></table>`.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new("paragraph", Filter::Tag("p"), |content, _, _| block(content)),
        Rule::new("line_break", Filter::Tag("br"), |_, _, ctx| format!("{}\n", ctx.options.br)),
        Rule::new("blockquote", Filter::Tag("blockquote"), |content, _, _| {
            let quoted: Vec<String> = content
                .trim_matches('\n')
                .lines()
                .map(|line| if line.is_empty() { ">".to_string() } else { format!("> {line}") })
                .collect();
            block(&quoted.join("\n"))
        }),
        Rule::new("list", Filter::Tags(&["ul", "ol"]), |content, _, ctx| {
            if ctx.parent_is("li") && ctx.is_last {
                format!("\n{content}")
            } else {
                block(content)
            }
        }),
        Rule::new("list_item", Filter::Tag("li"), list_item),
        Rule::new("horizontal_rule", Filter::Tag("hr"), |_, _, ctx| block(&ctx.options.hr)),
        Rule::new("emphasis", Filter::Tags(&["em", "i"]), |content, _, ctx| {
            wrap_inline(content, &ctx.options.em_delimiter)
        }),
        Rule::new("strong", Filter::Tags(&["strong", "b"]), |content, _, ctx| {
            wrap_inline(content, &ctx.options.strong_delimiter)
        }),
        Rule::new("inline_code", Filter::Tag("code"), |content, _, _| inline_code(content))
            .with_content(Content::Verbatim),
        Rule::new("preformatted", Filter::Tag("pre"), |content, _, ctx| fenced(content, &ctx.options.fence, ""))
            .with_content(Content::Verbatim),
        Rule::new("link", Filter::predicate(|el| el.is("a") && el.non_empty_attr("href").is_some()), link),
        Rule::new("image", Filter::Tag("img"), image),
        Rule::new("fenced_code_block", Filter::predicate(is_code_block), |content, el, ctx| {
            let language = if ctx.options.code_language { code_language(el) } else { "" };
            fenced(content, &ctx.options.fence, language)
        })
        .with_priority(50)
        .with_content(Content::Verbatim),
        Rule::new("table", Filter::Tag("table"), |_, el, _| block(&el.outer_html()))
            .with_priority(50)
            .with_content(Content::Skip),
        Rule::new("remove_noise", Filter::Tags(&["script", "style", "noscript"]), |_, _, _| String::new())
            .with_priority(100)
            .with_content(Content::Skip),
    ]
}

fn wrap_inline(content: &str, delimiter: &str) -> String {
    if content.trim().is_empty() {
        return String::new();
    }
    format!("{delimiter}{content}{delimiter}")
}

fn list_item(content: &str, _: &Element, ctx: &RenderContext<'_>) -> String {
    let prefix = match ctx.parent {
        Some(list) if list.is("ol") => {
            let start = list.attr("start").and_then(|s| s.trim().parse::<i64>().ok()).unwrap_or(1);
            let number = i64::try_from(ctx.index).map_or(start, |index| start.saturating_add(index));
            format!("{number}. ")
        }
        _ => format!("{} ", ctx.options.bullet_marker),
    };

    let indent = &ctx.options.list_indent;
    let body = content
        .trim_start_matches('\n')
        .trim_end()
        .lines()
        .enumerate()
        .map(|(i, line)| if i == 0 || line.is_empty() { line.to_string() } else { format!("{indent}{line}") })
        .collect::<Vec<_>>()
        .join("\n");

    let separator = if ctx.is_last { "" } else { "\n" };
    format!("{prefix}{body}{separator}")
}

fn inline_code(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }

    let content = content.replace("\r\n", " ").replace(['\n', '\r'], " ");

    let mut runs = Vec::new();
    let mut current = 0usize;
    for c in content.chars() {
        if c == '`' {
            current += 1;
        } else if current > 0 {
            runs.push(current);
            current = 0;
        }
    }
    if current > 0 {
        runs.push(current);
    }

    let mut width = 1;
    while runs.contains(&width) {
        width += 1;
    }
    let delimiter = "`".repeat(width);

    let padded = content.starts_with('`')
        || content.ends_with('`')
        || (content.len() > 2 && content.starts_with(' ') && content.ends_with(' ') && !content.trim().is_empty());
    let space = if padded { " " } else { "" };

    format!("{delimiter}{space}{content}{space}{delimiter}")
}

fn clean_title(el: &Element) -> Option<String> {
    let title = el.non_empty_attr("title")?;
    let collapsed: Vec<&str> = title.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    Some(format!(" \"{}\"", collapsed.join("\n").replace('"', "\\\"")))
}

fn link(content: &str, el: &Element, _: &RenderContext<'_>) -> String {
    let href = el.attr("href").unwrap_or_default().replace('(', "\\(").replace(')', "\\)");
    let title = clean_title(el).unwrap_or_default();
    format!("[{content}]({href}{title})")
}

fn image(_: &str, el: &Element, _: &RenderContext<'_>) -> String {
    let alt = el.attr("alt").unwrap_or_default().trim().to_string();
    match el.non_empty_attr("src") {
        Some(src) => {
            let title = clean_title(el).unwrap_or_default();
            format!("![{alt}]({src}{title})")
        }
        None => alt,
    }
}
