//! Markdown escaping for ordinary text nodes.
//!
//! Characters that are special anywhere (`\ * _ ` [ ]`) are always escaped.
//! Characters that only start a construct (`- + = # > ~~~` and `1. `) are
//! escaped only at the start of the text node. Verbatim regions (code,
//! tables) never pass through here.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static ESCAPES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\\", r"\\"),
        (r"\*", r"\*"),
        (r"^-", r"\-"),
        (r"^\+ ", r"\+ "),
        (r"^(=+)", r"\${1}"),
        (r"^(#{1,6}) ", r"\${1} "),
        (r"`", r"\`"),
        (r"^~~~", r"\~~~"),
        (r"\[", r"\["),
        (r"\]", r"\]"),
        (r"^>", r"\>"),
        (r"_", r"\_"),
        (r"^(\d+)\. ", r"${1}\. "),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

/// Escapes `text` so it renders literally in Markdown.
pub fn escape_markdown(text: &str) -> String {
    let mut out = Cow::Borrowed(text);
    for (re, replacement) in ESCAPES.iter() {
        if re.is_match(&out) {
            out = Cow::Owned(re.replace_all(&out, *replacement).into_owned());
        }
    }
    out.into_owned()
}
