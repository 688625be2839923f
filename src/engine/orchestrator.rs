//! Scrape orchestrator - the pagination control loop
//!
//! One session walks a listing from its first page along the adapter's
//! next-page links:
//! - Init: resolve the adapter and build the first request
//! - Fetching: pick an identity, pass the rate limiter, fetch under the retry policy
//! - Extracting: the adapter turns the body into records (inside the same retry unit)
//! - Paginating: append records, stop on no next link or the page limit
//!
//! Pages are fetched strictly one after another. Records gathered before a
//! failure or cancellation are always part of the outcome.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::fetcher::{HttpFetcher, PageFetcher};
use super::identity::{Identity, IdentityPool};
use super::rate_limiter::RateLimiter;
use super::retry::RetryPolicy;
use crate::adapters::{AdapterRegistry, PageRequest, PageResult, SiteAdapter};
use crate::config::Config;
use crate::state::{ScrapeOutcome, ScrapeSession, SessionStatus};
use crate::url::{extract_host, parse_listing_url};
use crate::{FetchError, ScrapeError};

/// Everything a session needs besides the fetcher
///
/// Built once per invocation from configuration and shared (behind an `Arc`)
/// by every session of that invocation.
#[derive(Debug)]
pub struct ScrapeContext {
    pub identities: IdentityPool,
    pub rate_limiter: RateLimiter,
    pub retry: RetryPolicy,
    pub registry: AdapterRegistry,

    /// Pages per session; None means follow pagination to the end
    pub max_pages: Option<u32>,
}

impl ScrapeContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            identities: IdentityPool::from_config(&config.identity),
            rate_limiter: RateLimiter::from_config(&config.rate_limit),
            retry: RetryPolicy::from_config(&config.scraper),
            registry: AdapterRegistry::from_config(&config.sources),
            max_pages: config.scraper.max_pages,
        }
    }

    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }
}

/// Drives scrape sessions over a [`PageFetcher`]
pub struct Orchestrator<F: PageFetcher> {
    context: Arc<ScrapeContext>,
    fetcher: F,
}

impl Orchestrator<HttpFetcher> {
    /// Builds the context and the HTTP clients for one invocation
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded configuration
    /// * `max_pages` - Page limit, already merged with any CLI override
    ///
    /// # Returns
    ///
    /// * `Err(ScrapeError::Client)` - A client could not be built (bad proxy URL, TLS setup)
    pub fn from_config(config: &Config, max_pages: Option<u32>) -> crate::Result<Self> {
        let context = ScrapeContext::from_config(config).with_max_pages(max_pages);
        let fetcher = HttpFetcher::new(&config.scraper, context.identities.proxies())?;
        Ok(Self::new(Arc::new(context), fetcher))
    }
}

impl<F: PageFetcher> Orchestrator<F> {
    pub fn new(context: Arc<ScrapeContext>, fetcher: F) -> Self {
        Self { context, fetcher }
    }

    pub fn context(&self) -> &ScrapeContext {
        &self.context
    }

    /// Scrapes a listing URL through the adapter the registry resolves for it
    ///
    /// # Arguments
    ///
    /// * `url` - The starting listing URL
    /// * `cancel` - Checked before every page and raced against every wait
    ///
    /// # Returns
    ///
    /// * `Ok(ScrapeOutcome)` - The session ran; its status says how it ended
    /// * `Err(ScrapeError)` - Init failed (malformed URL, unsupported source);
    ///   no request was sent
    pub async fn run(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<ScrapeOutcome, ScrapeError> {
        let adapter = self.context.registry.resolve(url)?;
        self.run_with_adapter(&adapter, url, cancel).await
    }

    /// Scrapes a listing URL with an explicitly chosen adapter
    pub async fn run_with_adapter(
        &self,
        adapter: &SiteAdapter,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<ScrapeOutcome, ScrapeError> {
        let start_url = parse_listing_url(url)?;
        let mut request = adapter.build_initial_request(&start_url)?;
        let start_url = request.url.clone();

        tracing::info!(
            "Starting {} scrape of {} (max pages: {})",
            adapter.display_name(),
            start_url,
            self.context
                .max_pages
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unbounded".to_string())
        );

        let mut session = ScrapeSession::new(start_url.clone());

        loop {
            if cancel.is_cancelled() {
                tracing::info!("Cancelled before page {}", session.current_page());
                session.cancel();
                break;
            }

            let identity = match self.context.identities.next_identity() {
                Ok(identity) => identity,
                Err(err) => {
                    tracing::error!("Cannot fetch page {}: {}", session.current_page(), err);
                    session.fail(err.kind(), err.to_string());
                    break;
                }
            };

            tracing::debug!("Fetching page {}: {}", session.current_page(), request.url);

            match self.fetch_page(adapter, &request, identity, cancel).await {
                Ok(page) => {
                    let found = page.records.len();
                    let next = session.absorb(page).filter(|next| *next != request.url);
                    tracing::info!(
                        "Page {}: {} records ({} total)",
                        session.pages_fetched,
                        found,
                        session.records.len()
                    );

                    let Some(next) = next else {
                        session.complete(SessionStatus::CompletedNormal);
                        break;
                    };
                    if let Some(max_pages) = self.context.max_pages {
                        if session.pages_fetched >= max_pages {
                            tracing::info!("Reached page limit of {}", max_pages);
                            session.complete(SessionStatus::CompletedPageLimit);
                            break;
                        }
                    }

                    session.current_url = next.clone();
                    request = request.follow(next);
                }
                Err(FetchError::Cancelled) => {
                    tracing::info!("Cancelled during page {}", session.current_page());
                    session.cancel();
                    break;
                }
                Err(err) => {
                    tracing::error!(
                        "Page {} failed [{}]: {}",
                        session.current_page(),
                        err.kind(),
                        err
                    );
                    session.fail(err.kind(), err.to_string());
                    break;
                }
            }
        }

        let outcome = session.finish(adapter.id(), adapter.display_name(), &start_url);
        tracing::info!(
            "Finished {} scrape: {} ({} records from {} pages)",
            outcome.source_display_name,
            outcome.status,
            outcome.records.len(),
            outcome.pages_fetched
        );
        Ok(outcome)
    }

    /// Fetches and parses one page under the retry policy
    ///
    /// Each attempt passes the rate limiter again. The first attempt uses
    /// `identity`; retries rotate to the next identity in the pool.
    async fn fetch_page(
        &self,
        adapter: &SiteAdapter,
        request: &PageRequest,
        identity: Identity,
        cancel: &CancellationToken,
    ) -> Result<PageResult, FetchError> {
        let host_key = extract_host(&request.url).unwrap_or_default();
        let host = host_key.as_str();
        let limiter = &self.context.rate_limiter;
        let identities = &self.context.identities;
        let fetcher = &self.fetcher;
        let mut attempt = 0u32;

        self.context
            .retry
            .execute(cancel, || {
                attempt += 1;
                let identity = if attempt == 1 {
                    identity.clone()
                } else {
                    identities
                        .next_identity()
                        .unwrap_or_else(|_| identity.clone())
                };

                async move {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                        _ = limiter.acquire(host) => {}
                    }

                    let fetched = tokio::select! {
                        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                        result = fetcher.fetch(request, &identity) => result?,
                    };

                    adapter.parse_page(&fetched.body, &fetched.final_url)
                }
            })
            .await
    }
}
