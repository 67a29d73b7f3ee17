//! Metadata extraction.
//!
//! Produces an ordered list of [`MetadataEntry`] pairs from `<meta>` tags
//! and embedded JSON-LD blocks. Keys are not unique and entries are never
//! overwritten: two `og:title` tags yield two entries, in source order.
//! Callers that want a key/value map pick a [`FlattenPolicy`] and call
//! [`flatten`] on the same list.
//!
//! # Example
//!
//! ```rust
//! use crawlmark_core::metadata::{extract_metadata, flatten, FlattenPolicy};
//! use crawlmark_core::parse::normalize;
//!
//! let root = normalize(r#"<meta property="og:title" content="A"><meta name="description" content="B">"#);
//! let entries = extract_metadata(&root);
//! assert_eq!(entries[0].key, "og:title");
//! assert_eq!(entries[1].key, "description");
//!
//! let map = flatten(&entries, FlattenPolicy::LastWins);
//! assert_eq!(map["description"], "B");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::article::ArticleResult;
use crate::dom::{Element, Node};
use crate::parse::Document;

/// Value of a metadata entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataContent {
    /// A `<meta content>` value or an article field.
    Text(String),
    /// A parsed JSON-LD block.
    Json(Value),
}

impl MetadataContent {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataContent::Text(s) => Some(s),
            MetadataContent::Json(v) => v.as_str(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            MetadataContent::Text(s) => Value::String(s.clone()),
            MetadataContent::Json(v) => v.clone(),
        }
    }
}

impl From<&str> for MetadataContent {
    fn from(s: &str) -> Self {
        MetadataContent::Text(s.to_string())
    }
}

impl From<String> for MetadataContent {
    fn from(s: String) -> Self {
        MetadataContent::Text(s)
    }
}

impl From<Value> for MetadataContent {
    fn from(v: Value) -> Self {
        MetadataContent::Json(v)
    }
}

/// One `{key, content}` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub content: MetadataContent,
}

impl MetadataEntry {
    pub fn new(key: impl Into<String>, content: impl Into<MetadataContent>) -> Self {
        Self { key: key.into(), content: content.into() }
    }
}

/// Which entry wins when a key repeats during [`flatten`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlattenPolicy {
    #[default]
    LastWins,
    FirstWins,
}

/// Scans `root` for `<meta>` and JSON-LD entries, in document order.
///
/// 1. Every `meta` with a non-empty `property` (else `name`) and a
///    non-empty `content` becomes an entry.
/// 2. Every `script[type="application/ld+json"]` gets an index among such
///    scripts; its text parsed as JSON becomes `json-ld:<index>`. A block
///    that fails to parse is skipped and does not shift later indices. An
///    empty block parses as `{}`.
pub fn extract_metadata(root: &Node) -> Vec<MetadataEntry> {
    let mut entries: Vec<MetadataEntry> = root.elements().filter(|el| el.is("meta")).filter_map(meta_entry).collect();

    for (index, script) in root.elements().filter(|el| is_json_ld(el)).enumerate() {
        let text = script.text_content();
        let source = if text.is_empty() { "{}" } else { text.as_str() };
        match serde_json::from_str::<Value>(source) {
            Ok(value) => entries.push(MetadataEntry::new(format!("json-ld:{index}"), value)),
            Err(err) => tracing::debug!(index, error = %err, "skipping malformed JSON-LD block"),
        }
    }

    entries
}

/// [`extract_metadata`] preceded by the first `<title>`, untrimmed, when its
/// text is non-empty.
pub fn extract_document_metadata(root: &Node) -> Vec<MetadataEntry> {
    let mut entries = Vec::new();
    if let Some(title) = root.elements().find(|el| el.is("title")) {
        let text = title.text_content();
        if !text.is_empty() {
            entries.push(MetadataEntry::new("title", text));
        }
    }
    entries.extend(extract_metadata(root));
    entries
}

fn meta_entry(el: &Element) -> Option<MetadataEntry> {
    let key = el.non_empty_attr("property").or_else(|| el.non_empty_attr("name"))?;
    let content = el.non_empty_attr("content")?;
    Some(MetadataEntry::new(key, content))
}

fn is_json_ld(el: &Element) -> bool {
    el.is("script") && el.attr("type").is_some_and(|t| t.trim().eq_ignore_ascii_case("application/ld+json"))
}

type FieldFn = fn(&ArticleResult) -> Option<String>;

/// Article-level fields promoted to metadata, in output order.
pub const ARTICLE_FIELDS: &[(&str, FieldFn)] = &[
    ("title", |a: &ArticleResult| a.title.clone()),
    ("excerpt", |a: &ArticleResult| a.excerpt.clone()),
    ("byline", |a: &ArticleResult| a.byline.clone()),
    ("site_name", |a: &ArticleResult| a.site_name.clone()),
    ("published_time", |a: &ArticleResult| a.published_time.clone()),
    ("dir", |a: &ArticleResult| a.dir.clone()),
    ("length", |a: &ArticleResult| (a.length > 0).then(|| a.length.to_string())),
];

/// Article fields (non-empty only) followed by `scanned`.
pub fn article_entries(article: &ArticleResult, scanned: Vec<MetadataEntry>) -> Vec<MetadataEntry> {
    let mut entries: Vec<MetadataEntry> = ARTICLE_FIELDS
        .iter()
        .filter_map(|(key, field)| {
            let value = field(article)?;
            let value = value.trim();
            (!value.is_empty()).then(|| MetadataEntry::new(*key, value))
        })
        .collect();
    entries.extend(scanned);
    entries
}

/// Folds entries into a key/value map.
///
/// Keys keep the position of their first occurrence; the value is chosen
/// by `policy`.
pub fn flatten(entries: &[MetadataEntry], policy: FlattenPolicy) -> Map<String, Value> {
    let mut map = Map::new();
    for entry in entries {
        if policy == FlattenPolicy::FirstWins && map.contains_key(&entry.key) {
            continue;
        }
        map.insert(entry.key.clone(), entry.content.to_value());
    }
    map
}

impl Document {
    /// First non-empty `content` of a `meta` whose `property` or `name`
    /// equals `key` (case-insensitive).
    pub fn meta_content(&self, key: &str) -> Option<String> {
        self.root().descendants().filter(|el| el.is("meta")).find_map(|el| {
            let matches = [el.attr("property"), el.attr("name")]
                .into_iter()
                .flatten()
                .any(|k| k.eq_ignore_ascii_case(key));
            if !matches {
                return None;
            }
            el.non_empty_attr("content").map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
        })
    }

    /// Every JSON-LD block that parses, in document order.
    pub fn json_ld(&self) -> Vec<Value> {
        self.root()
            .descendants()
            .filter(|el| is_json_ld(el))
            .filter_map(|el| serde_json::from_str(el.text_content().trim()).ok())
            .collect()
    }

    /// A string field from the first JSON-LD block that has it.
    pub fn json_ld_field(&self, field: &str) -> Option<String> {
        self.json_ld().iter().find_map(|value| {
            let value = match value {
                Value::Array(items) => items.iter().find_map(|v| v.get(field))?,
                other => other.get(field)?,
            };
            json_ld_text(value)
        })
    }
}

/// Text of a JSON-LD value, which may be a string, a `{ "name": .. }`
/// object or an array of either.
fn json_ld_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(obj) => obj.get("name").and_then(json_ld_text),
        Value::Array(items) => items.first().and_then(json_ld_text),
        _ => None,
    }
}
