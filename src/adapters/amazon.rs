use scraper::{ElementRef, Html};
use url::Url;

use super::extract::{
    detect_currency, document_attr, parse_count, parse_price, parse_rating, select_attr,
    select_text,
};
use super::{ListingLayout, PageRequest};
use crate::model::ProductDraft;
use crate::url::{extract_host, remove_query_params, resolve_link};

/// Query parameters Amazon appends for click tracking
const TRACKING_PARAMS: &[&str] = &["ref", "crid", "sprefix", "qid"];

/// Amazon search-result listings (any amazon.<tld> storefront)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmazonAdapter;

impl AmazonAdapter {
    pub const ID: &'static str = "amazon";
    pub const HOST_LABELS: &'static [&'static str] = &["amazon"];

    pub fn new() -> Self {
        Self
    }

    pub(crate) fn build_initial_request(&self, mut url: Url) -> PageRequest {
        url.set_fragment(None);
        remove_query_params(&mut url, |key| TRACKING_PARAMS.contains(&key));
        PageRequest::new(url)
            .with_header("Accept-Language", "en-US,en;q=0.9")
            .with_header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
    }

    /// Currency implied by the storefront's country domain
    fn storefront_currency(page_url: &Url) -> Option<&'static str> {
        let host = extract_host(page_url)?;
        let currency = if host.ends_with(".co.uk") {
            "GBP"
        } else if host.ends_with(".in") {
            "INR"
        } else if host.ends_with(".ca") {
            "CAD"
        } else if host.ends_with(".com.au") {
            "AUD"
        } else if host.ends_with(".co.jp") {
            "JPY"
        } else if [".de", ".fr", ".it", ".es", ".nl"]
            .iter()
            .any(|tld| host.ends_with(tld))
        {
            "EUR"
        } else if host.ends_with(".com") {
            "USD"
        } else {
            return None;
        };
        Some(currency)
    }
}

impl ListingLayout for AmazonAdapter {
    fn product_selector(&self) -> &'static str {
        "div.s-result-item[data-component-type='s-search-result']"
    }

    fn empty_markers(&self) -> &'static [&'static str] {
        &[
            "div.s-no-results-result",
            "#noResultsTitle",
            "span[data-component-type='s-no-results']",
        ]
    }

    fn blocked_markers(&self) -> &'static [&'static str] {
        &["form[action*='validateCaptcha']", "#captchacharacters"]
    }

    fn extract(&self, node: ElementRef<'_>, page_url: &Url) -> ProductDraft {
        let price_text = select_text(
            node,
            &[
                "span.a-price:not(.a-text-price) span.a-offscreen",
                "span.a-price span.a-offscreen",
            ],
        );
        let price = price_text.as_deref().and_then(|text| {
            let price = parse_price(text);
            if price.is_none() {
                tracing::warn!("Unparseable price text '{}' on {}", text, page_url);
            }
            price
        });
        let currency = Self::storefront_currency(page_url)
            .or_else(|| price_text.as_deref().and_then(detect_currency))
            .map(String::from);

        ProductDraft {
            name: select_text(node, &["h2 a span", "h2 span", "h2"]),
            price,
            currency,
            rating: select_text(node, &["span.a-icon-alt"]).and_then(|t| parse_rating(&t)),
            review_count: select_text(
                node,
                &["span.s-underline-text", "a[href*='customerReviews'] span"],
            )
            .and_then(|t| parse_count(&t)),
            availability: select_text(node, &["span.a-color-price"]),
            href: select_attr(
                node,
                &["h2 a", "a.a-link-normal.s-no-outline", "a.a-link-normal"],
                "href",
            ),
            image_url: select_attr(node, &["img.s-image"], "src"),
            sku: node
                .value()
                .attr("data-asin")
                .map(str::trim)
                .filter(|asin| !asin.is_empty())
                .map(String::from),
            ..Default::default()
        }
    }

    fn next_page(&self, document: &Html, page_url: &Url) -> Option<Url> {
        document_attr(
            document,
            &["a.s-pagination-next[href]", "li.a-last a[href]"],
            "href",
        )
        .and_then(|href| resolve_link(&href, page_url))
    }
}
