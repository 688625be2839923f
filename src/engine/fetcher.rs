//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the orchestrator, including:
//! - Building HTTP clients (one direct, one per configured proxy)
//! - Presenting the identity's user agent and the adapter's headers
//! - Classifying failures into [`FetchError`] variants for the retry policy

use std::collections::HashMap;
use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{redirect::Policy, Client, Proxy};
use url::Url;

use super::identity::Identity;
use crate::adapters::PageRequest;
use crate::config::ScraperConfig;
use crate::FetchError;

/// Maximum redirect hops followed for one page
const MAX_REDIRECTS: usize = 10;

/// A successfully fetched page body
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,

    /// HTTP status code
    pub status: u16,

    pub body: String,
}

/// Performs one network fetch for a page request
///
/// Implementations must not retry; the retry policy owns that.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(
        &self,
        request: &PageRequest,
        identity: &Identity,
    ) -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with the configured timeouts
///
/// # Arguments
///
/// * `config` - Timeouts come from here
/// * `proxy` - Routes every request through this proxy when set
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Invalid proxy URL or TLS backend failure
pub fn build_http_client(
    config: &ScraperConfig,
    proxy: Option<&str>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.request_timeout))
        .connect_timeout(Duration::from_secs(config.connect_timeout))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// reqwest-backed [`PageFetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    direct: Client,
    proxied: HashMap<String, Client>,
}

impl HttpFetcher {
    /// Creates the direct client plus one client per proxy URL
    pub fn new(config: &ScraperConfig, proxies: &[String]) -> Result<Self, reqwest::Error> {
        let direct = build_http_client(config, None)?;
        let mut proxied = HashMap::new();
        for proxy in proxies {
            proxied.insert(proxy.clone(), build_http_client(config, Some(proxy))?);
        }
        Ok(Self { direct, proxied })
    }

    fn client_for(&self, identity: &Identity) -> &Client {
        match &identity.proxy {
            Some(proxy) => match self.proxied.get(proxy) {
                Some(client) => client,
                None => {
                    tracing::warn!("No client for proxy {}, fetching directly", proxy);
                    &self.direct
                }
            },
            None => &self.direct,
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    /// Fetches the page with the identity's user agent
    ///
    /// # Error Classification
    ///
    /// | Condition | Error |
    /// |-----------|-------|
    /// | Timeout | `Timeout` |
    /// | Name resolution failure | `Dns` |
    /// | Connection refused/reset | `Connection` |
    /// | Non-2xx status | `Status` |
    /// | Body read failure | `Body` |
    async fn fetch(
        &self,
        request: &PageRequest,
        identity: &Identity,
    ) -> Result<FetchedPage, FetchError> {
        let mut builder = self
            .client_for(identity)
            .get(request.url.clone())
            .header(USER_AGENT, identity.user_agent.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_send_error(&request.url, &e))?;

        let status = response.status();
        let final_url = response.url().clone();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: request.url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Body {
            url: request.url.to_string(),
            message: e.to_string(),
        })?;

        Ok(FetchedPage {
            final_url,
            status: status.as_u16(),
            body,
        })
    }
}

/// Maps a reqwest send error onto a [`FetchError`]
fn classify_send_error(url: &Url, error: &reqwest::Error) -> FetchError {
    let url = url.to_string();
    if error.is_timeout() {
        return FetchError::Timeout { url };
    }
    if error.is_builder() {
        return FetchError::InvalidUrl {
            url,
            reason: error.to_string(),
        };
    }

    let chain = error_chain(error);
    if chain.contains("dns error") || chain.contains("failed to lookup address") {
        return FetchError::Dns {
            url,
            message: chain,
        };
    }
    FetchError::Connection {
        url,
        message: chain,
    }
}

/// Joins an error and all its sources into one message
fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
