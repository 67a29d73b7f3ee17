use serde::Serialize;
use serde_json::Value;

use crate::Result;
use crate::crawl::CrawlResult;
use crate::formatters::markdown::{LinkReference, extract_links};
use crate::metadata::{FlattenPolicy, MetadataEntry, flatten};

/// Shape of metadata JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Flattened key/value object.
    #[default]
    Flat,
    /// Ordered `[{key, content}]` list, duplicates kept.
    Entries,
}

/// A reference link for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct JsonReference {
    pub index: usize,
    pub text: String,
    pub url: String,
}

/// Configuration for crawl JSON output
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    /// Add a `references` array of the article's links
    pub include_references: bool,
    /// Pretty print JSON output
    pub pretty: bool,
}

fn references(links: Vec<LinkReference>) -> Vec<JsonReference> {
    links
        .into_iter()
        .enumerate()
        .map(|(i, link)| JsonReference { index: i + 1, text: link.text, url: link.url })
        .collect()
}

fn to_string(value: &impl Serialize, pretty: bool) -> Result<String> {
    let json = if pretty { serde_json::to_string_pretty(value)? } else { serde_json::to_string(value)? };
    Ok(json)
}

/// Serializes a crawl result, optionally with its link references.
pub fn crawl_to_json(result: &CrawlResult, config: &JsonConfig) -> Result<String> {
    let mut value = serde_json::to_value(result)?;

    if config.include_references
        && let Value::Object(map) = &mut value
    {
        let refs = references(extract_links(&result.content));
        map.insert("references".to_string(), serde_json::to_value(refs)?);
    }

    to_string(&value, config.pretty)
}

/// Serializes metadata entries as a flat object or as the ordered list.
pub fn metadata_to_json(
    entries: &[MetadataEntry], format: JsonFormat, policy: FlattenPolicy, pretty: bool,
) -> Result<String> {
    match format {
        JsonFormat::Flat => to_string(&flatten(entries, policy), pretty),
        JsonFormat::Entries => to_string(&entries, pretty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::crawl_html;

    const PARAGRAPH: &str = "Structured output keeps every field of the crawl, from the article text \
        to the flattened metadata, in a form that other tools can consume directly.";

    fn result() -> CrawlResult {
        let html = format!(
            r#"<html><head><title>Doc</title></head><body><article>
                <p>{PARAGRAPH} <a href="https://example.com/a">First</a></p>
                <p>{PARAGRAPH} <a href="https://example.com/a">Again</a></p>
            </article></body></html>"#
        );
        crawl_html(&html, "https://example.com").unwrap()
    }

    #[test]
    fn test_crawl_to_json_compact() {
        let json = crawl_to_json(&result(), &JsonConfig::default()).unwrap();
        assert!(!json.contains('\n'));
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["url"], "https://example.com");
        assert_eq!(value["metadata"]["title"], "Doc");
        assert!(value.get("references").is_none());
    }

    #[test]
    fn test_crawl_to_json_with_references() {
        let config = JsonConfig { include_references: true, pretty: true };
        let json = crawl_to_json(&result(), &config).unwrap();
        assert!(json.contains('\n'));
        let value: Value = serde_json::from_str(&json).unwrap();
        let refs = value["references"].as_array().unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0]["index"], 1);
        assert_eq!(refs[0]["text"], "First");
    }

    #[test]
    fn test_metadata_to_json_formats() {
        let entries = vec![
            MetadataEntry::new("og:title", "A"),
            MetadataEntry::new("description", "B"),
            MetadataEntry::new("og:title", "C"),
        ];

        let flat = metadata_to_json(&entries, JsonFormat::Flat, FlattenPolicy::LastWins, false).unwrap();
        assert_eq!(flat, r#"{"og:title":"C","description":"B"}"#);

        let first = metadata_to_json(&entries, JsonFormat::Flat, FlattenPolicy::FirstWins, false).unwrap();
        assert_eq!(first, r#"{"og:title":"A","description":"B"}"#);

        let list = metadata_to_json(&entries, JsonFormat::Entries, FlattenPolicy::LastWins, false).unwrap();
        let value: Value = serde_json::from_str(&list).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 3);
        assert_eq!(value[2]["key"], "og:title");
        assert_eq!(value[2]["content"], "C");
    }
}
