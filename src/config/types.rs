use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default link depth followed from the start page
pub const DEFAULT_MAX_DEPTH: u32 = 1;

/// Default global (and per-request) timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Default number of parallel workers
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default capacity of the job queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default output directory
pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// On-disk configuration file for Site-Mirror
///
/// Every section and key is optional; missing values take the defaults above.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Page to start mirroring from
    #[serde(rename = "start-url")]
    pub start_url: Option<String>,

    pub crawler: CrawlerConfig,

    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,

    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum link depth for pages (0 = only the start page)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Number of parallel workers
    pub concurrency: usize,

    /// Global run deadline, also applied to each request (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Capacity of the bounded job queue
    #[serde(rename = "queue-capacity")]
    pub queue_capacity: usize,

    /// Optional cap on distinct assets fetched per run
    #[serde(rename = "max-assets")]
    pub max_assets: Option<usize>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            concurrency: DEFAULT_CONCURRENCY,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_assets: None,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value: `Name/Version`
    pub fn header_value(&self) -> String {
        format!("{}/{}", self.crawler_name, self.crawler_version)
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: env!("CARGO_PKG_NAME").to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the `<host>/` mirror tree is created in
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

/// Runtime settings for one mirror run
///
/// Built from a [`Config`] via [`crate::config::resolve`] or directly with
/// [`MirrorConfig::new`] and the `with_*` builders. The engine normalises it
/// once at construction and never mutates it afterwards.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub start_url: Url,
    pub max_depth: u32,
    pub output_dir: PathBuf,
    pub timeout: Duration,
    pub concurrency: usize,
    pub queue_capacity: usize,
    pub user_agent: String,
    pub max_assets: Option<usize>,
}

impl MirrorConfig {
    /// Creates a configuration with default settings for `start_url`
    pub fn new(start_url: Url) -> Self {
        Self {
            start_url,
            max_depth: DEFAULT_MAX_DEPTH,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            user_agent: UserAgentConfig::default().header_value(),
            max_assets: None,
        }
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_max_assets(mut self, max_assets: Option<usize>) -> Self {
        self.max_assets = max_assets;
        self
    }
}
