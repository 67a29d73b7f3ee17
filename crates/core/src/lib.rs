pub mod article;
pub mod convert;
pub mod crawl;
pub mod dom;
pub mod error;
pub mod fetch;
pub mod formatters;
pub mod metadata;
pub mod parse;
pub mod readability;
pub mod scoring;

pub use article::{ArticleExtractor, ArticleResult};
pub use convert::{
    HeadingStyle, MarkdownOptions, MarkdownOptionsBuilder, Rule, RuleRegistry, RuleRegistryBuilder, html_to_markdown,
    html_to_markdown_with, node_to_markdown, try_html_to_markdown,
};
pub use crawl::{CrawlResult, Crawler, crawl_html};
#[cfg(feature = "fetch")]
pub use crawl::{fetch_and_parse, get_metadata};
pub use dom::{Element, Node};
pub use error::{CrawlError, Result};
#[cfg(feature = "fetch")]
pub use fetch::fetch_url;
pub use fetch::{FetchConfig, fetch_file, fetch_stdin, validate_url};
pub use formatters::{
    JsonConfig, JsonFormat, MarkdownConfig, MarkdownFormatter, convert_to_markdown, crawl_to_json, metadata_to_json,
};
pub use metadata::{
    FlattenPolicy, MetadataContent, MetadataEntry, extract_document_metadata, extract_metadata, flatten,
};
pub use parse::{Document, normalize};
pub use readability::{Readability, ReadabilityConfig, ReadabilityConfigBuilder, is_probably_readable};
#[doc(hidden)]
pub use scoring::{ScoreConfig, base_tag_score, class_id_weight, content_density_score, link_density};
