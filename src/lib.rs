//! Listing-Harvest: product listing extraction across e-commerce site families
//!
//! This crate drives a paginated scrape of a single listing URL through a
//! site-specific adapter, under a polite rate limiter, a retry policy and a
//! rotating client identity, and hands the normalized product records to
//! one or more output sinks.

pub mod adapters;
pub mod config;
pub mod engine;
pub mod model;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Listing-Harvest operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Unsupported source: no adapter matches {url}")]
    UnsupportedSource { url: String },

    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("No identities configured while rotation is enabled")]
    NoIdentitiesConfigured,

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl ScrapeError {
    /// Maps this error onto the operator-facing error taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::Client(_) => ErrorKind::Configuration,
            Self::Url(_) => ErrorKind::NetworkPermanent,
            Self::UnsupportedSource { .. } => ErrorKind::UnsupportedSource,
            Self::Fetch(e) => e.kind(),
            Self::NoIdentitiesConfigured => ErrorKind::NoIdentitiesConfigured,
        }
    }
}

/// Error taxonomy reported on a failed session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NetworkTransient,
    NetworkPermanent,
    PageStructureChanged,
    UnsupportedSource,
    NoIdentitiesConfigured,
    Sink,
    Configuration,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkTransient => "network_transient",
            Self::NetworkPermanent => "network_permanent",
            Self::PageStructureChanged => "page_structure_changed",
            Self::UnsupportedSource => "unsupported_source",
            Self::NoIdentitiesConfigured => "no_identities_configured",
            Self::Sink => "sink",
            Self::Configuration => "configuration",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a fetch failure is worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Permanent,
}

/// Failure of one fetch+parse unit for a single page
///
/// Carries plain strings rather than the underlying client error so that it
/// can be cloned into session results and replayed by test fetchers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection error for {url}: {message}")]
    Connection { url: String, message: String },

    #[error("DNS resolution failed for {url}: {message}")]
    Dns { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read response body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("Request blocked by anti-bot check at {url}")]
    Blocked { url: String },

    #[error("Malformed URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Page structure changed at {url}: {reason}")]
    PageStructureChanged { url: String, reason: String },

    #[error("Cancelled")]
    Cancelled,
}

impl FetchError {
    /// Classifies the error for the retry policy
    ///
    /// | Condition | Class |
    /// |-----------|-------|
    /// | Timeout, connection reset/refused, body read | Transient |
    /// | HTTP 5xx, HTTP 429 | Transient |
    /// | Anti-bot interstitial | Transient |
    /// | Other HTTP 4xx, DNS failure, malformed URL | Permanent |
    /// | Page structure changed, cancellation | Permanent |
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Timeout { .. }
            | Self::Connection { .. }
            | Self::Body { .. }
            | Self::Blocked { .. } => ErrorClass::Transient,
            Self::Status { status, .. } if *status == 429 || *status >= 500 => {
                ErrorClass::Transient
            }
            Self::Status { .. }
            | Self::Dns { .. }
            | Self::InvalidUrl { .. }
            | Self::PageStructureChanged { .. }
            | Self::Cancelled => ErrorClass::Permanent,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PageStructureChanged { .. } => ErrorKind::PageStructureChanged,
            Self::Cancelled => ErrorKind::Cancelled,
            _ if self.is_transient() => ErrorKind::NetworkTransient,
            _ => ErrorKind::NetworkPermanent,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid host pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Listing-Harvest operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

// Re-export commonly used types
pub use adapters::{AdapterRegistry, PageRequest, PageResult, SiteAdapter};
pub use config::Config;
pub use engine::{Orchestrator, ScrapeContext};
pub use model::ProductRecord;
pub use state::{ScrapeOutcome, SessionStatus};
