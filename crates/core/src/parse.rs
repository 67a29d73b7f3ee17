//! HTML parsing and tree normalization.
//!
//! This module turns raw HTML into the owned [`Node`] tree the rest of the
//! crate works on. The heavy lifting (tokenizing, error recovery for
//! unclosed tags and stray text, entity decoding, case-folding of tag and
//! attribute names) is html5ever's, reached through `scraper`. What this
//! module guarantees on top:
//!
//! - void elements (`br`, `img`, ...) are childless;
//! - whitespace-only text nodes are kept where the parser put them, so the
//!   serializer can decide whether they are significant;
//! - doctypes and processing instructions are dropped.
//!
//! # Example
//!
//! ```rust
//! use crawlmark_core::parse::Document;
//!
//! let doc = Document::parse("<html><head><title>Test</title></head><body><p>Hi &amp; bye</p></body></html>");
//! assert_eq!(doc.title(), Some("Test".to_string()));
//! assert_eq!(doc.body().text_content(), "Hi & bye");
//! ```

use scraper::{ElementRef, Html};

use crate::dom::{Element, Node};

/// Parses a full HTML document and returns its root (`<html>`) element.
///
/// Never fails: malformed input is recovered per the HTML parsing rules.
pub fn normalize(html: &str) -> Node {
    let parsed = Html::parse_document(html);
    Node::Element(convert(parsed.root_element()))
}

/// Parses an HTML fragment (no implied `<head>`/`<body>`).
///
/// The returned element is a synthetic `<html>` container whose children
/// are the fragment's top-level nodes.
pub fn normalize_fragment(html: &str) -> Node {
    let parsed = Html::parse_fragment(html);
    Node::Element(convert(parsed.root_element()))
}

/// The `<body>` of a normalized document, or the root itself when there is none.
pub fn body_of(root: &Node) -> Option<&Element> {
    let el = root.as_element()?;
    if el.is("body") {
        return Some(el);
    }
    Some(el.element_children().find(|c| c.is("body")).unwrap_or(el))
}

/// A parsed HTML document.
///
/// Wraps the normalized tree and offers the lookups the crawl pipeline
/// needs (title, head, body, language direction).
#[derive(Debug, Clone)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Parses HTML from a string.
    pub fn parse(html: &str) -> Self {
        let root = match normalize(html) {
            Node::Element(el) => el,
            _ => Element::new("html"),
        };
        Self { root }
    }

    /// Wraps an already normalized root.
    pub fn from_root(root: Element) -> Self {
        Self { root }
    }

    /// The `<html>` element.
    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn head(&self) -> Option<&Element> {
        self.root.element_children().find(|c| c.is("head"))
    }

    /// The `<body>` element, or the root when the parser produced none.
    pub fn body(&self) -> &Element {
        self.root.element_children().find(|c| c.is("body")).unwrap_or(&self.root)
    }

    /// Text of the first `<title>` element, if any.
    pub fn title(&self) -> Option<String> {
        self.root.find("title").map(Element::text_content)
    }

    /// Text direction declared on `<html>` or `<body>`.
    pub fn dir(&self) -> Option<&str> {
        self.root.non_empty_attr("dir").or_else(|| self.body().non_empty_attr("dir"))
    }
}

enum Pending<'a> {
    Text(String),
    Comment(String),
    Element(ElementRef<'a>),
}

struct Frame<'a> {
    element: Element,
    pending: std::vec::IntoIter<Pending<'a>>,
}

impl<'a> Frame<'a> {
    fn open(el: ElementRef<'a>) -> Self {
        let value = el.value();
        let element = Element {
            tag_name: value.name().to_ascii_lowercase(),
            attributes: value
                .attrs()
                .map(|(name, v)| (name.to_ascii_lowercase(), v.to_string()))
                .collect(),
            children: Vec::new(),
        };

        let pending: Vec<Pending<'a>> = el
            .children()
            .filter_map(|child| match child.value() {
                scraper::Node::Text(t) => Some(Pending::Text(t.text.to_string())),
                scraper::Node::Comment(c) => Some(Pending::Comment(c.comment.to_string())),
                scraper::Node::Element(_) => ElementRef::wrap(child).map(Pending::Element),
                _ => None,
            })
            .collect();

        Self { element, pending: pending.into_iter() }
    }
}

/// Copies a scraper subtree into an owned [`Element`].
///
/// Iterative so that deeply nested markup cannot exhaust the stack here.
fn convert(root: ElementRef<'_>) -> Element {
    let mut stack = vec![Frame::open(root)];

    while let Some(frame) = stack.last_mut() {
        match frame.pending.next() {
            Some(Pending::Text(t)) => frame.element.children.push(Node::Text(t)),
            Some(Pending::Comment(c)) => frame.element.children.push(Node::Comment(c)),
            Some(Pending::Element(el)) => stack.push(Frame::open(el)),
            None => {
                let Some(done) = stack.pop() else { break };
                let mut element = done.element;
                if element.is_void() {
                    element.children.clear();
                }
                match stack.last_mut() {
                    Some(parent) => parent.element.children.push(Node::Element(element)),
                    None => return element,
                }
            }
        }
    }

    Element::new("html")
}
