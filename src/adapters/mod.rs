//! Site adapters for supported e-commerce site families
//!
//! This module handles:
//! - Matching a listing URL to the site family that can parse it
//! - Building the first request for a listing URL (normalization, headers)
//! - Turning a fetched listing page into product records and a next-page link
//!
//! Adapters form a closed set of variants behind [`SiteAdapter`]. The
//! orchestrator only ever calls `matches`, `build_initial_request` and
//! `parse_page`; it never branches on which site it is talking to. Adding a
//! site means adding a variant here and an entry in [`AdapterRegistry::builtin`].

mod amazon;
mod daraz;
pub mod extract;
mod registry;

pub use amazon::AmazonAdapter;
pub use daraz::DarazAdapter;
pub use registry::{AdapterRegistry, SourceInfo};

use chrono::Utc;
use scraper::{ElementRef, Html};
use url::Url;

use crate::model::{ProductDraft, ProductRecord};
use crate::url::{extract_host, host_has_label, parse_listing_url};
use crate::{FetchError, ScrapeError};

/// A request descriptor for one listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: Url,

    /// Extra headers the site needs, on top of the identity's user agent
    pub headers: Vec<(String, String)>,
}

impl PageRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Builds the request for the next page, keeping the site headers
    pub fn follow(&self, next: Url) -> Self {
        Self {
            url: next,
            headers: self.headers.clone(),
        }
    }
}

/// One page's extracted records plus the link to the next page, if any
#[derive(Debug, Clone, Default)]
pub struct PageResult {
    /// Records in the order they appear on the page
    pub records: Vec<ProductRecord>,

    /// Absolute URL of the next page; never equal to the page's own URL
    pub next_page_url: Option<Url>,

    /// Product nodes that could not be turned into a record
    pub skipped: usize,
}

impl PageResult {
    /// Creates a page result, dropping a next link that points back at `page_url`
    pub fn new(
        records: Vec<ProductRecord>,
        next_page_url: Option<Url>,
        skipped: usize,
        page_url: &Url,
    ) -> Self {
        let next_page_url = next_page_url.filter(|next| {
            let self_loop = next == page_url;
            if self_loop {
                tracing::warn!("Ignoring next-page link that points back at {}", page_url);
            }
            !self_loop
        });
        Self {
            records,
            next_page_url,
            skipped,
        }
    }

    /// A legitimately empty page: no records, no next page
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Site-specific markup knowledge consumed by [`parse_listing`]
pub(crate) trait ListingLayout {
    /// Selector for one product node
    fn product_selector(&self) -> &'static str;

    /// Selectors that only match on a legitimate "no results" page
    fn empty_markers(&self) -> &'static [&'static str];

    /// Selectors that identify an anti-bot interstitial instead of a listing
    fn blocked_markers(&self) -> &'static [&'static str];

    /// Collects raw field values from one product node
    fn extract(&self, node: ElementRef<'_>, page_url: &Url) -> ProductDraft;

    /// Finds the next-page link, if the page has one
    fn next_page(&self, document: &Html, page_url: &Url) -> Option<Url>;
}

/// Runs the shared listing-page parse over a site layout
///
/// # Returns
///
/// * `Ok(PageResult)` - Records found, or a page showing an empty-state marker
/// * `Err(FetchError::Blocked)` - The page is an anti-bot interstitial
/// * `Err(FetchError::PageStructureChanged)` - No product nodes and no
///   empty-state marker, or nodes present but none yielded a record
pub(crate) fn parse_listing<L: ListingLayout>(
    layout: &L,
    source_name: &str,
    body: &str,
    page_url: &Url,
) -> Result<PageResult, FetchError> {
    let document = Html::parse_document(body);

    if extract::has_marker(&document, layout.blocked_markers()) {
        return Err(FetchError::Blocked {
            url: page_url.to_string(),
        });
    }

    let nodes = extract::select_nodes(&document, layout.product_selector());
    if nodes.is_empty() {
        if extract::has_marker(&document, layout.empty_markers()) {
            tracing::info!("No results on {}", page_url);
            return Ok(PageResult::empty());
        }
        return Err(FetchError::PageStructureChanged {
            url: page_url.to_string(),
            reason: format!(
                "no nodes match '{}' and no empty-state marker found",
                layout.product_selector()
            ),
        });
    }

    let scraped_at = Utc::now();
    let mut records = Vec::with_capacity(nodes.len());
    let mut skipped = 0;

    for (index, node) in nodes.iter().enumerate() {
        match layout
            .extract(*node, page_url)
            .finish(page_url, source_name, scraped_at)
        {
            Ok(record) => records.push(record),
            Err(rejection) => {
                skipped += 1;
                tracing::warn!(
                    "Skipping product node {} on {}: {}",
                    index + 1,
                    page_url,
                    rejection
                );
            }
        }
    }

    if records.is_empty() {
        return Err(FetchError::PageStructureChanged {
            url: page_url.to_string(),
            reason: format!(
                "{} product nodes found but none yielded a record",
                nodes.len()
            ),
        });
    }

    let next = layout.next_page(&document, page_url);
    tracing::debug!(
        "Extracted {} records ({} skipped) from {}, next page: {}",
        records.len(),
        skipped,
        page_url,
        next.as_ref().map(Url::as_str).unwrap_or("none")
    );

    Ok(PageResult::new(records, next, skipped, page_url))
}

/// The closed set of supported site families
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteAdapter {
    Amazon(AmazonAdapter),
    Daraz(DarazAdapter),
}

impl SiteAdapter {
    /// Every built-in adapter, in registration order
    pub fn all() -> Vec<Self> {
        vec![
            Self::Amazon(AmazonAdapter::new()),
            Self::Daraz(DarazAdapter::new()),
        ]
    }

    /// Looks up a built-in adapter by its identifier
    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().into_iter().find(|adapter| adapter.id() == id)
    }

    /// Stable identifier, also used as `source_name` on records
    pub fn id(&self) -> &'static str {
        match self {
            Self::Amazon(_) => AmazonAdapter::ID,
            Self::Daraz(_) => DarazAdapter::ID,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Amazon(_) => "Amazon",
            Self::Daraz(_) => "Daraz",
        }
    }

    /// Host labels that identify the site family across its country domains
    pub fn host_labels(&self) -> &'static [&'static str] {
        match self {
            Self::Amazon(_) => AmazonAdapter::HOST_LABELS,
            Self::Daraz(_) => DarazAdapter::HOST_LABELS,
        }
    }

    /// Tests whether this adapter can handle the URL
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = extract_host(url) else {
            return false;
        };
        self.host_labels()
            .iter()
            .any(|label| host_has_label(&host, label))
    }

    /// Normalizes the input URL into the first request descriptor
    ///
    /// Host matching is the registry's job; this only rewrites the URL and
    /// attaches the site's headers.
    ///
    /// # Arguments
    ///
    /// * `url` - The listing URL as given by the caller
    ///
    /// # Returns
    ///
    /// * `Ok(PageRequest)` - The request for page 1
    /// * `Err(ScrapeError::Url)` - The URL is not an HTTP(S) URL with a host
    pub fn build_initial_request(&self, url: &Url) -> Result<PageRequest, ScrapeError> {
        let url = parse_listing_url(url.as_str())?;
        Ok(match self {
            Self::Amazon(adapter) => adapter.build_initial_request(url),
            Self::Daraz(adapter) => adapter.build_initial_request(url),
        })
    }

    /// Extracts a page of records and the next-page link from a fetched body
    pub fn parse_page(&self, body: &str, base_url: &Url) -> Result<PageResult, FetchError> {
        match self {
            Self::Amazon(adapter) => parse_listing(adapter, self.id(), body, base_url),
            Self::Daraz(adapter) => parse_listing(adapter, self.id(), body, base_url),
        }
    }
}

impl std::fmt::Display for SiteAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
