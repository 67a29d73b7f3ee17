//! Tree-to-Markdown serializer.
//!
//! Depth-first, bottom-up: children of an element are rendered first and
//! the resolved [`Rule`](super::Rule) receives the finished child string.
//! The walk owns all of its state in a [`ConversionContext`]; the tree and
//! the registry are only ever borrowed.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::LazyLock;

use regex::Regex;

use super::escape::escape_markdown;
use super::rules::{Content, MEANINGFUL_WHEN_BLANK, RuleRegistry, classify};
use super::MarkdownOptions;
use crate::dom::{Element, Node};
use crate::{CrawlError, Result};

/// Maximum element nesting the walk will follow before reporting a fault.
pub const MAX_DEPTH: usize = 512;

static EXCESS_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Per-invocation walk state.
#[derive(Debug, Clone)]
pub struct ConversionContext {
    /// Number of enclosing `ul`/`ol` elements.
    pub list_depth: usize,
    /// Number of enclosing `blockquote` elements.
    pub blockquote_depth: usize,
    /// Inside a verbatim region: no rules, no escaping, no whitespace collapsing.
    pub in_code: bool,
    depth: usize,
    /// Whether the output so far ends in (collapsible) whitespace.
    trailing_space: bool,
}

impl Default for ConversionContext {
    fn default() -> Self {
        Self { list_depth: 0, blockquote_depth: 0, in_code: false, depth: 0, trailing_space: true }
    }
}

/// What a rule sees about the element it renders.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub options: &'a MarkdownOptions,
    pub parent: Option<&'a Element>,
    /// Position among the parent's element children.
    pub index: usize,
    /// Whether this is the parent's last element child.
    pub is_last: bool,
    pub list_depth: usize,
    pub blockquote_depth: usize,
}

impl RenderContext<'_> {
    pub fn parent_is(&self, tag: &str) -> bool {
        self.parent.is_some_and(|p| p.is(tag))
    }
}

struct Rendered {
    text: String,
    /// Subtree holds text, a void element, or an element that counts even when empty.
    has_content: bool,
}

impl Rendered {
    fn empty() -> Self {
        Self { text: String::new(), has_content: false }
    }
}

struct Serializer<'r> {
    registry: &'r RuleRegistry,
    ctx: ConversionContext,
}

/// Serializes `root` with `registry`.
///
/// Returns [`CrawlError::ConversionFault`] when the tree is nested deeper
/// than [`MAX_DEPTH`] or a rule panics. An empty `Ok` means the tree simply
/// had nothing to say.
pub fn serialize(root: &Node, registry: &RuleRegistry) -> Result<String> {
    guarded(registry, |s| s.node(root, None, 0, true))
}

/// Serializes a single element (typically `<body>`) with `registry`.
pub fn serialize_element(root: &Element, registry: &RuleRegistry) -> Result<String> {
    guarded(registry, |s| s.element(root, None, 0, true))
}

fn guarded<F>(registry: &RuleRegistry, walk: F) -> Result<String>
where
    F: FnOnce(&mut Serializer<'_>) -> Result<Rendered>,
{
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let mut serializer = Serializer { registry, ctx: ConversionContext::default() };
        walk(&mut serializer)
    }));

    match outcome {
        Ok(Ok(rendered)) => Ok(post_process(&rendered.text)),
        Ok(Err(err)) => Err(err),
        Err(payload) => Err(CrawlError::ConversionFault(format!("rule panicked: {}", panic_message(payload.as_ref())))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Collapses runs of three or more newlines and trims the result.
pub fn post_process(markdown: &str) -> String {
    EXCESS_NEWLINES.replace_all(markdown, "\n\n").trim().to_string()
}

impl Serializer<'_> {
    fn node(&mut self, node: &Node, parent: Option<&Element>, index: usize, is_last: bool) -> Result<Rendered> {
        match node {
            Node::Element(el) => self.element(el, parent, index, is_last),
            Node::Text(t) => Ok(self.text(t)),
            Node::Comment(_) => Ok(Rendered::empty()),
        }
    }

    fn children(&mut self, parent: &Element) -> Result<Rendered> {
        let last_element = parent.children.iter().rposition(|c| matches!(c, Node::Element(_)));
        let mut out = String::new();
        let mut has_content = false;
        let mut element_index = 0;

        for (position, child) in parent.children.iter().enumerate() {
            let piece = match child {
                Node::Element(_) => {
                    let is_last = last_element == Some(position);
                    let piece = self.node(child, Some(parent), element_index, is_last)?;
                    element_index += 1;
                    piece
                }
                _ => self.node(child, Some(parent), element_index, false)?,
            };

            has_content |= piece.has_content;
            if self.ctx.in_code {
                out.push_str(&piece.text);
            } else if !piece.text.is_empty() {
                join(&mut out, &piece.text);
            }
        }

        Ok(Rendered { text: out, has_content })
    }

    fn text(&mut self, raw: &str) -> Rendered {
        if self.ctx.in_code {
            return Rendered { text: raw.to_string(), has_content: !raw.trim().is_empty() };
        }

        let collapsed = collapse_whitespace(raw);
        let text = if self.ctx.trailing_space { collapsed.trim_start_matches(' ') } else { collapsed.as_str() };
        if text.is_empty() {
            return Rendered::empty();
        }

        self.ctx.trailing_space = text.ends_with(' ');
        Rendered { text: escape_markdown(text), has_content: !text.trim().is_empty() }
    }

    fn element(&mut self, el: &Element, parent: Option<&Element>, index: usize, is_last: bool) -> Result<Rendered> {
        if self.ctx.depth >= MAX_DEPTH {
            return Err(CrawlError::ConversionFault(format!(
                "document nesting exceeds {MAX_DEPTH} levels at <{}>",
                el.tag_name
            )));
        }

        self.ctx.depth += 1;
        let rendered = if self.ctx.in_code { self.verbatim(el) } else { self.apply_rule(el, parent, index, is_last) };
        self.ctx.depth -= 1;
        rendered
    }

    /// Elements inside a verbatim region contribute only their text.
    fn verbatim(&mut self, el: &Element) -> Result<Rendered> {
        if el.is("br") {
            return Ok(Rendered { text: "\n".to_string(), has_content: true });
        }
        self.children(el)
    }

    fn apply_rule(&mut self, el: &Element, parent: Option<&Element>, index: usize, is_last: bool) -> Result<Rendered> {
        let registry = self.registry;
        let rule = registry.resolve(el);
        let is_block = classify(&el.tag_name).is_block();
        let is_list = el.is("ul") || el.is("ol");
        let is_quote = el.is("blockquote");

        if is_block {
            self.ctx.trailing_space = true;
        }
        if is_list {
            self.ctx.list_depth += 1;
        }
        if is_quote {
            self.ctx.blockquote_depth += 1;
        }

        let children = match rule.content() {
            Content::Skip => Ok(Rendered { text: String::new(), has_content: true }),
            Content::Children => self.children(el),
            Content::Verbatim => {
                let outer = std::mem::replace(&mut self.ctx.in_code, true);
                let children = self.children(el);
                self.ctx.in_code = outer;
                children
            }
        };

        if is_list {
            self.ctx.list_depth -= 1;
        }
        if is_quote {
            self.ctx.blockquote_depth -= 1;
        }
        let children = children?;

        let has_content =
            children.has_content || el.is_void() || MEANINGFUL_WHEN_BLANK.contains(&el.tag_name.as_str());
        let render_ctx = RenderContext {
            options: registry.options(),
            parent,
            index,
            is_last,
            list_depth: self.ctx.list_depth,
            blockquote_depth: self.ctx.blockquote_depth,
        };

        if is_block {
            self.ctx.trailing_space = true;
            if !has_content {
                return Ok(Rendered { text: "\n\n".to_string(), has_content });
            }
            let content = match rule.content() {
                Content::Children => children.text.trim_end_matches(' '),
                _ => children.text.as_str(),
            };
            return Ok(Rendered { text: rule.render(content, el, &render_ctx), has_content });
        }

        let (leading, content, trailing) = match rule.content() {
            Content::Children => flanking(&children.text),
            _ => ("", children.text.as_str(), ""),
        };
        let body = if has_content { rule.render(content, el, &render_ctx) } else { String::new() };
        let text = format!("{leading}{body}{trailing}");
        if !text.is_empty() {
            self.ctx.trailing_space = text.ends_with(char::is_whitespace);
        }

        Ok(Rendered { text, has_content })
    }
}

/// Splits leading and trailing spaces off inline content so they land
/// outside the element's delimiters.
fn flanking(content: &str) -> (&str, &str, &str) {
    let start = content.len() - content.trim_start_matches(' ').len();
    let leading = if start > 0 { " " } else { "" };
    let rest = &content[start..];
    let end = rest.trim_end_matches(' ').len();
    let trailing = if end < rest.len() { " " } else { "" };
    (leading, &rest[..end], trailing)
}

/// Replaces runs of ASCII whitespace with a single space. Non-breaking
/// spaces are content and survive.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// Appends `piece` to `out`, merging the newlines at the seam so that the
/// larger of the two separators wins, capped at one blank line.
fn join(out: &mut String, piece: &str) {
    let trailing = out.len() - out.trim_end_matches('\n').len();
    let leading = piece.len() - piece.trim_start_matches('\n').len();

    out.truncate(out.len() - trailing);
    if trailing == 0 && leading > 0 {
        let kept = out.trim_end_matches(' ').len();
        out.truncate(kept);
    }

    for _ in 0..trailing.max(leading).min(2) {
        out.push('\n');
    }
    out.push_str(&piece[leading..]);
}
