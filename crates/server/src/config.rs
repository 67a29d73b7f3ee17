use std::time::Duration;

use clap::Parser;
use crawlmark_core::FetchConfig;

/// Server settings, read from flags with environment fallbacks.
#[derive(Parser, Debug, Clone)]
#[command(name = "crawlmark-server")]
#[command(version)]
#[command(about = "HTTP API for converting web pages into Markdown and metadata", long_about = None)]
pub struct ServerConfig {
    /// Address to bind to
    #[arg(long, env = "CRAWLMARK_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "CRAWLMARK_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Timeout for fetching a page, in seconds
    #[arg(long, env = "CRAWLMARK_FETCH_TIMEOUT", default_value_t = 30)]
    pub fetch_timeout: u64,

    /// Deadline for a whole request, in seconds
    #[arg(long, env = "CRAWLMARK_REQUEST_TIMEOUT", default_value_t = 60)]
    pub request_timeout: u64,

    /// User-Agent sent when fetching pages
    #[arg(long, env = "CRAWLMARK_USER_AGENT")]
    pub user_agent: Option<String>,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn fetch_config(&self) -> FetchConfig {
        let config = FetchConfig::default().with_timeout(self.fetch_timeout);
        match &self.user_agent {
            Some(user_agent) => config.with_user_agent(user_agent.clone()),
            None => config,
        }
    }
}
