pub mod json;
pub mod markdown;

pub use json::{JsonConfig, JsonFormat, JsonReference, crawl_to_json, metadata_to_json};
pub use markdown::{LinkReference, MarkdownConfig, MarkdownFormatter, convert_to_markdown, extract_links};
