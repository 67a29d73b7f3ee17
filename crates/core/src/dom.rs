//! In-memory document tree.
//!
//! [`Node`] is an explicit tagged variant so that every consumer (the
//! Markdown serializer, the metadata extractor, the article extractor)
//! pattern-matches node kinds instead of comparing node-name strings.
//! Children are owned by their parent; there are no back-references, the
//! walkers carry whatever ancestor context they need.

use std::fmt::Write;

/// Elements that never have children.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text children are serialized without entity escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript"];

/// A node in the normalized document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

/// An element with case-folded tag and attribute names.
///
/// Attributes keep the order the parser reported them in, which is what
/// [`Element::outer_html`] reproduces.
#[derive(Debug, PartialEq, Eq)]
pub struct Element {
    pub tag_name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Node {
    /// Convenience constructor for a text node.
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(content.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// True for text nodes made only of whitespace.
    pub fn is_whitespace_text(&self) -> bool {
        matches!(self, Node::Text(t) if t.chars().all(char::is_whitespace))
    }

    /// Concatenated text of this node and its descendants (comments excluded).
    pub fn text_content(&self) -> String {
        match self {
            Node::Element(el) => el.text_content(),
            Node::Text(t) => t.clone(),
            Node::Comment(_) => String::new(),
        }
    }

    /// Serialized HTML for this node.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_markup(&mut out, vec![Step::Node(self, false)]);
        out
    }

    /// Every element in this subtree, in document order, including `self`
    /// when it is an element.
    pub fn elements(&self) -> Elements<'_> {
        Elements { stack: vec![self] }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

impl Element {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self { tag_name: tag_name.into().to_ascii_lowercase(), attributes: Vec::new(), children: Vec::new() }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Builder-style text child append.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(Node::Text(text.into()))
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Attribute value, treating an empty value like a missing one.
    pub fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).filter(|v| !v.is_empty())
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag_name == tag
    }

    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.tag_name.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|name| name == class))
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.children.first()
    }

    pub fn element_children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Descendant elements in document order, excluding `self`.
    pub fn descendants(&self) -> Elements<'_> {
        Elements { stack: self.children.iter().rev().collect() }
    }

    /// First descendant element with the given tag.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.descendants().find(|el| el.is(tag))
    }

    /// All descendant elements with the given tag, in document order.
    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.descendants().filter(move |el| el.is(tag))
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<&Node> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element(el) => stack.extend(el.children.iter().rev()),
                Node::Comment(_) => {}
            }
        }
        out
    }

    /// The element's own markup including its tags.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        write_markup(&mut out, vec![Step::Element(self)]);
        out
    }

    /// The markup of the element's children.
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        write_markup(&mut out, self.child_steps());
        out
    }

    /// Number of element levels in this subtree, counting `self`.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((el, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(el.element_children().map(|child| (child, level + 1)));
        }
        deepest
    }

    /// Tag and attributes without children.
    fn shell(&self) -> Element {
        Element {
            tag_name: self.tag_name.clone(),
            attributes: self.attributes.clone(),
            children: Vec::with_capacity(self.children.len()),
        }
    }

    /// Children as write steps, last child first.
    fn child_steps(&self) -> Vec<Step<'_>> {
        let raw = RAW_TEXT_ELEMENTS.contains(&self.tag_name.as_str());
        self.children.iter().rev().map(|child| Step::Node(child, raw)).collect()
    }
}

impl Clone for Element {
    fn clone(&self) -> Self {
        let mut stack = vec![(self.children.iter(), self.shell())];

        while let Some((source, copy)) = stack.last_mut() {
            match source.next() {
                Some(Node::Element(child)) => stack.push((child.children.iter(), child.shell())),
                Some(other) => copy.children.push(other.clone()),
                None => {
                    let Some((_, done)) = stack.pop() else { break };
                    match stack.last_mut() {
                        Some((_, parent)) => parent.children.push(Node::Element(done)),
                        None => return done,
                    }
                }
            }
        }

        self.shell()
    }
}

/// Tears the subtree down level by level so that dropping a deeply nested
/// tree does not recurse.
impl Drop for Element {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(node) = pending.pop() {
            if let Node::Element(mut el) = node {
                pending.append(&mut el.children);
            }
        }
    }
}

/// Pre-order iterator over elements.
pub struct Elements<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Elements<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<&'a Element> {
        while let Some(node) = self.stack.pop() {
            if let Node::Element(el) = node {
                self.stack.extend(el.children.iter().rev());
                return Some(el);
            }
        }
        None
    }
}

enum Step<'a> {
    Node(&'a Node, bool),
    Element(&'a Element),
    Close(&'a str),
}

/// Serializes with an explicit stack; `steps` is popped from the end.
fn write_markup(out: &mut String, mut steps: Vec<Step<'_>>) {
    while let Some(step) = steps.pop() {
        match step {
            Step::Node(Node::Element(el), _) | Step::Element(el) => {
                write_open_tag(out, el);
                if !el.is_void() {
                    steps.push(Step::Close(&el.tag_name));
                    steps.extend(el.child_steps());
                }
            }
            Step::Node(Node::Text(t), true) => out.push_str(t),
            Step::Node(Node::Text(t), false) => escape_text(out, t),
            Step::Node(Node::Comment(c), _) => {
                let _ = write!(out, "<!--{}-->", c);
            }
            Step::Close(tag) => {
                let _ = write!(out, "</{}>", tag);
            }
        }
    }
}

fn write_open_tag(out: &mut String, el: &Element) {
    out.push('<');
    out.push_str(&el.tag_name);
    for (name, value) in &el.attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attr(out, value);
        out.push('"');
    }
    out.push('>');
}

fn escape_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}
