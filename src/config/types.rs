use serde::Deserialize;

/// Main configuration structure for Listing-Harvest
///
/// Every section is optional in the TOML file; missing sections and keys
/// take the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scraper: ScraperConfig,
    #[serde(rename = "rate-limit")]
    pub rate_limit: RateLimitConfig,
    pub identity: IdentityConfig,
    pub output: OutputConfig,
    pub sources: SourcesConfig,
}

/// Fetch and pagination behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout")]
    pub connect_timeout: u64,

    /// Retries after the first attempt for transient failures
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Base delay of the exponential backoff (milliseconds)
    #[serde(rename = "retry-base-delay")]
    pub retry_base_delay: u64,

    /// Upper bound on a single backoff delay (milliseconds)
    #[serde(rename = "retry-max-delay")]
    pub retry_max_delay: u64,

    /// Maximum number of listing pages per session (absent = unbounded)
    #[serde(rename = "max-pages")]
    pub max_pages: Option<u32>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            request_timeout: 30,
            connect_timeout: 10,
            max_retries: 3,
            retry_base_delay: 1000,
            retry_max_delay: 30_000,
            max_pages: None,
        }
    }
}

/// How rate-limit timestamps are keyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateLimitScope {
    /// One gate per target host
    #[default]
    PerHost,
    /// A single gate shared by every host
    Global,
}

/// Outbound request spacing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Minimum time between two requests to the same key (milliseconds)
    #[serde(rename = "min-interval")]
    pub min_interval: u64,

    /// Per-host or global keying
    pub scope: RateLimitScope,

    /// Permits `min-interval = 0`, which disables spacing entirely
    #[serde(rename = "allow-zero-interval")]
    pub allow_zero_interval: bool,

    /// Interval overrides for specific hosts
    pub hosts: Vec<HostRateLimit>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval: 1500,
            scope: RateLimitScope::PerHost,
            allow_zero_interval: false,
            hosts: Vec::new(),
        }
    }
}

/// Interval override for hosts matching a pattern
#[derive(Debug, Clone, Deserialize)]
pub struct HostRateLimit {
    /// Host pattern (e.g., "www.amazon.com" or "*.daraz.pk")
    pub host: String,

    /// Minimum time between requests to matching hosts (milliseconds)
    #[serde(rename = "min-interval")]
    pub min_interval: u64,
}

/// Identity selection order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RotationStrategy {
    #[default]
    RoundRobin,
    Random,
}

/// Client identities presented to target sites
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Rotate through `user-agents`; when false, `default-user-agent` is used
    pub rotate: bool,

    pub strategy: RotationStrategy,

    #[serde(rename = "default-user-agent")]
    pub default_user_agent: String,

    #[serde(rename = "user-agents")]
    pub user_agents: Vec<String>,

    #[serde(rename = "proxies-enabled")]
    pub proxies_enabled: bool,

    /// Outbound proxy URLs (e.g., "http://10.0.0.1:3128")
    pub proxies: Vec<String>,
}

/// Desktop browser user agents shipped as the default rotation set
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            rotate: true,
            strategy: RotationStrategy::RoundRobin,
            default_user_agent: DEFAULT_USER_AGENTS[0].to_string(),
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            proxies_enabled: false,
            proxies: Vec::new(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving CSV and JSON exports
    pub directory: String,

    /// File formats written by default ("csv", "json")
    pub formats: Vec<String>,

    #[serde(rename = "database-enabled")]
    pub database_enabled: bool,

    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "data".to_string(),
            formats: vec!["csv".to_string(), "json".to_string()],
            database_enabled: true,
            database_path: "data/products.db".to_string(),
        }
    }
}

/// Which registered adapters may be resolved
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Adapter ids; empty means every registered adapter
    pub enabled: Vec<String>,
}
