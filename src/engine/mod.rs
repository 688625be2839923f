//! Engine module: the scrape loop and its resilience layer
//!
//! # Components
//!
//! - `IdentityPool`: Rotating user agents and optional proxies
//! - `RateLimiter`: Minimum spacing between requests, per host or global
//! - `RetryPolicy`: Bounded retries with exponential back-off on transient errors
//! - `PageFetcher` / `HttpFetcher`: One network fetch per call
//! - `Orchestrator`: The pagination state machine tying the above together

mod fetcher;
mod identity;
mod orchestrator;
mod rate_limiter;
mod retry;

pub use fetcher::{build_http_client, FetchedPage, HttpFetcher, PageFetcher};
pub use identity::{Identity, IdentityPool};
pub use orchestrator::{Orchestrator, ScrapeContext};
pub use rate_limiter::RateLimiter;
pub use retry::RetryPolicy;
