use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use crawlmark_core::metadata::extract_document_metadata;
use crawlmark_core::parse::body_of;
use crawlmark_core::{
    ArticleResult, CrawlResult, Crawler, Document, FetchConfig, FlattenPolicy, JsonConfig, JsonFormat, MarkdownConfig,
    MarkdownFormatter, MarkdownOptions, Node, ReadabilityConfig, crawl_to_json, fetch_file, fetch_stdin, fetch_url,
    metadata_to_json, normalize,
};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for converted content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Markdown,
    Html,
    Text,
    Json,
    Metadata,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "html" => Ok(Self::Html),
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "metadata" | "meta" => Ok(Self::Metadata),
            _ => Err(format!(
                "Invalid format: {}. Valid options: markdown, html, text, json, metadata",
                s
            )),
        }
    }
}

/// Convert web pages into clean Markdown and flat metadata
#[derive(Parser, Debug)]
#[command(name = "crawlmark")]
#[command(version)]
#[command(about = "Convert web pages into Markdown and metadata", long_about = None)]
struct Args {
    /// URL to fetch, local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format (markdown, html, text, json, metadata)
    #[arg(short, long, default_value = "markdown", value_name = "FORMAT")]
    format: OutputFormat,

    /// Include reference table with all links (Markdown/JSON only)
    #[arg(long)]
    references: bool,

    /// Include TOML frontmatter (Markdown only)
    #[arg(long)]
    frontmatter: bool,

    /// Strip images from output
    #[arg(long)]
    no_images: bool,

    /// Convert the whole body instead of the extracted article
    #[arg(long)]
    raw: bool,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Minimum characters the extracted article must have
    #[arg(long, default_value = "140", value_name = "NUM")]
    char_threshold: usize,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

async fn read_input(args: &Args) -> anyhow::Result<String> {
    if args.input == "-" {
        return fetch_stdin().context("Failed to read from stdin");
    }

    if is_url(&args.input) {
        let mut config = FetchConfig::default().with_timeout(args.timeout);
        if let Some(user_agent) = &args.user_agent {
            config = config.with_user_agent(user_agent.clone());
        }
        return fetch_url(&args.input, &config).await.context("Failed to fetch URL");
    }

    fetch_file(&args.input).with_context(|| format!("Failed to read file: {}", args.input))
}

/// Treats the whole `<body>` as the article.
fn whole_body(root: &Node) -> Option<ArticleResult> {
    let body = body_of(root)?;
    let doc = Document::from_root(root.as_element()?.clone());
    Some(ArticleResult::from_content(body.inner_html()).with_document_fields(&doc))
}

fn init_logging(verbose: bool) {
    if !verbose {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crawlmark_core=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

fn metadata(args: &Args, html: &str) -> anyhow::Result<String> {
    let entries = extract_document_metadata(&normalize(html));
    if args.verbose {
        echo::print_step(2, 3, "Scanning metadata");
        echo::print_detail("Entries", entries.len());
        eprintln!();
    }
    metadata_to_json(&entries, JsonFormat::Flat, FlattenPolicy::LastWins, true).context("Failed to serialize metadata")
}

fn markdown_options(args: &Args) -> MarkdownOptions {
    MarkdownOptions::builder().strip_images(args.no_images).build()
}

fn crawl(args: &Args, html: &str) -> anyhow::Result<CrawlResult> {
    let mut crawler = Crawler::new()
        .with_readability_config(ReadabilityConfig::builder().char_threshold(args.char_threshold).build())
        .with_markdown_options(markdown_options(args));
    if args.raw {
        crawler = crawler.with_extractor(whole_body);
    }

    if args.verbose {
        echo::print_step(2, 3, "Extracting main content");
    }

    let started = Instant::now();
    let result = crawler.crawl_html(html, &args.input).context("Failed to extract content")?;

    if args.verbose {
        if let Some(title) = &result.title {
            echo::print_detail("Title", title);
        }
        echo::print_detail("Length", result.length);
        echo::print_timing("Extraction", started.elapsed());
        eprintln!();
    }

    Ok(result)
}

fn render(args: &Args, html: &str) -> anyhow::Result<String> {
    let output = match args.format {
        OutputFormat::Metadata => metadata(args, html)?,
        OutputFormat::Markdown => {
            let result = crawl(args, html)?;
            let config = MarkdownConfig {
                include_frontmatter: args.frontmatter,
                include_references: args.references,
                strip_images: args.no_images,
                include_title_heading: false,
            };
            MarkdownFormatter::new(config)
                .with_options(markdown_options(args))
                .convert(&result.article)
                .context("Failed to convert to Markdown")?
        }
        OutputFormat::Html => crawl(args, html)?.content,
        OutputFormat::Text => crawl(args, html)?.text_content,
        OutputFormat::Json => {
            let config = JsonConfig { include_references: args.references, pretty: true };
            crawl_to_json(&crawl(args, html)?, &config).context("Failed to serialize result")?
        }
    };

    Ok(output)
}

async fn execute(args: &Args) -> anyhow::Result<()> {
    init_logging(args.verbose);

    if args.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
        let source = if args.input == "-" { "stdin".to_string() } else { args.input.clone() };
        echo::print_step(1, 3, &format!("Reading from {}", source.bright_white()));
    }

    let html = read_input(args).await?;

    if args.verbose {
        echo::print_detail("Size", echo::format_size(html.len()));
        eprintln!();
    }

    let output = render(args, &html)?;

    if args.verbose {
        echo::print_step(3, 3, "Writing output");
        echo::print_detail("Format", format!("{:?}", args.format));
        eprintln!();
    }

    match &args.output {
        Some(path) => {
            fs::write(path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            echo::print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => print!("{}", output),
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(err) = execute(&args).await {
        echo::print_error(&format!("{err:#}"));
        std::process::exit(1);
    }
}
