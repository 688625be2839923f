use scraper::{ElementRef, Html};
use url::Url;

use super::extract::{
    detect_currency, document_attr, parse_count, parse_price, parse_rating, select_attr,
    select_nodes, select_text,
};
use super::{ListingLayout, PageRequest};
use crate::model::ProductDraft;
use crate::url::{extract_host, query_param, resolve_link, set_query_param};

/// Country domains and the currency each storefront prices in
const COUNTRY_CURRENCIES: &[(&str, &str)] = &[
    (".pk", "PKR"),
    (".com.bd", "BDT"),
    (".lk", "LKR"),
    (".com.np", "NPR"),
    (".com.mm", "MMK"),
];

/// Daraz catalog and search listings (daraz.pk, daraz.com.bd, daraz.lk, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DarazAdapter;

impl DarazAdapter {
    pub const ID: &'static str = "daraz";
    pub const HOST_LABELS: &'static [&'static str] = &["daraz"];

    pub fn new() -> Self {
        Self
    }

    pub(crate) fn build_initial_request(&self, mut url: Url) -> PageRequest {
        url.set_fragment(None);
        if Self::page_number(&url).is_none() {
            set_query_param(&mut url, "page", "1");
        }
        PageRequest::new(url).with_header("Accept-Language", "en-US,en;q=0.9")
    }

    /// The valid page number in the URL, if any
    fn page_number(url: &Url) -> Option<u32> {
        query_param(url, "page")
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p >= 1)
    }

    fn country_currency(page_url: &Url) -> Option<&'static str> {
        let host = extract_host(page_url)?;
        COUNTRY_CURRENCIES
            .iter()
            .find(|(tld, _)| host.ends_with(tld))
            .map(|(_, code)| *code)
    }

    /// Category slug from the listing path ("/smartphones/" -> "smartphones")
    fn category(page_url: &Url) -> Option<String> {
        page_url
            .path_segments()?
            .find(|segment| !segment.is_empty())
            .filter(|segment| *segment != "catalog")
            .map(|segment| segment.replace('-', " "))
    }

    fn next_control_enabled(document: &Html) -> bool {
        select_nodes(document, "li.ant-pagination-next")
            .first()
            .map(|control| {
                let element = control.value();
                let disabled = element.classes().any(|c| c.ends_with("disabled"))
                    || element.attr("aria-disabled") == Some("true");
                !disabled
            })
            .unwrap_or(false)
    }
}

impl ListingLayout for DarazAdapter {
    fn product_selector(&self) -> &'static str {
        "div[data-qa-locator='product-item']"
    }

    fn empty_markers(&self) -> &'static [&'static str] {
        &[
            "[data-qa-locator='search-no-result']",
            "div[class*='no-result']",
            "div[class*='noResult']",
        ]
    }

    fn blocked_markers(&self) -> &'static [&'static str] {
        &["#nocaptcha", "div[id*='baxia-punish']"]
    }

    fn extract(&self, node: ElementRef<'_>, page_url: &Url) -> ProductDraft {
        let price_text = select_text(
            node,
            &["span[class*='currency']", "div[class*='price'] span"],
        );
        let price = price_text.as_deref().and_then(|text| {
            let price = parse_price(text);
            if price.is_none() {
                tracing::warn!("Unparseable price text '{}' on {}", text, page_url);
            }
            price
        });
        let currency = Self::country_currency(page_url)
            .or_else(|| price_text.as_deref().and_then(detect_currency))
            .map(String::from);

        ProductDraft {
            name: select_text(node, &["div[class*='title'] a"])
                .or_else(|| select_attr(node, &["a[title]"], "title")),
            price,
            currency,
            rating: select_attr(node, &["[data-rating]"], "data-rating")
                .and_then(|t| parse_rating(&t)),
            review_count: select_text(
                node,
                &["span[class*='rating__review']", "span[class*='review']"],
            )
            .and_then(|t| parse_count(&t)),
            href: select_attr(
                node,
                &["div[class*='title'] a", "a[href*='/products/']", "a[href]"],
                "href",
            ),
            image_url: select_attr(node, &["img[type='product']", "img"], "src")
                .or_else(|| select_attr(node, &["img"], "data-src")),
            category: Self::category(page_url),
            sku: node
                .value()
                .attr("data-item-id")
                .or_else(|| node.value().attr("data-sku-simple"))
                .map(str::trim)
                .filter(|sku| !sku.is_empty())
                .map(String::from),
            ..Default::default()
        }
    }

    fn next_page(&self, document: &Html, page_url: &Url) -> Option<Url> {
        if let Some(next) = document_attr(document, &["link[rel='next'][href]"], "href")
            .and_then(|href| resolve_link(&href, page_url))
        {
            return Some(next);
        }

        if !Self::next_control_enabled(document) {
            return None;
        }
        let next_number = Self::page_number(page_url).unwrap_or(1).checked_add(1)?;
        let mut next = page_url.clone();
        set_query_param(&mut next, "page", &next_number.to_string());
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SiteAdapter;
    use crate::FetchError;
    use rust_decimal::Decimal;

    fn adapter() -> SiteAdapter {
        SiteAdapter::Daraz(DarazAdapter::new())
    }

    fn card(id: &str, title: &str, price: &str) -> String {
        format!(
            r#"<div data-qa-locator="product-item" data-item-id="{id}">
                 <div class="img--x"><img type="product" src="//static-01.daraz.pk/p/{id}.jpg"></div>
                 <div class="title--wFj93"><a href="//www.daraz.pk/products/{id}.html">{title}</a></div>
                 <div class="price--NVB62"><span class="currency--GVKjl">{price}</span></div>
                 <span class="rating__review--ygkUy">(87)</span>
               </div>"#
        )
    }

    fn listing(cards: &str, pagination: &str) -> String {
        format!("<html><body><div data-qa-locator='general-products'>{cards}</div>{pagination}</body></html>")
    }

    #[test]
    fn test_initial_request_adds_page() {
        let url = Url::parse("https://www.daraz.pk/catalog/?q=ceiling%20fan#reviews").unwrap();
        let request = adapter().build_initial_request(&url).unwrap();
        assert_eq!(
            request.url.as_str(),
            "https://www.daraz.pk/catalog/?q=ceiling+fan&page=1"
        );

        let url = Url::parse("https://www.daraz.pk/catalog/?q=fan&page=3").unwrap();
        let request = adapter().build_initial_request(&url).unwrap();
        assert_eq!(query_param(&request.url, "page").as_deref(), Some("3"));

        let url = Url::parse("https://www.daraz.pk/catalog/?q=fan&page=abc").unwrap();
        let request = adapter().build_initial_request(&url).unwrap();
        assert_eq!(query_param(&request.url, "page").as_deref(), Some("1"));
    }

    #[test]
    fn test_parse_cards_with_currency_from_tld() {
        let html = listing(
            &format!(
                "{}{}",
                card("101", "Ceiling Fan 56 inch", "Rs. 8,499"),
                card("102", "Pedestal Fan", "Rs. 5,250")
            ),
            "",
        );
        let url = Url::parse("https://www.daraz.pk/catalog/?q=fan&page=1").unwrap();
        let result = adapter().parse_page(&html, &url).unwrap();

        assert_eq!(result.records.len(), 2);
        let first = &result.records[0];
        assert_eq!(first.name, "Ceiling Fan 56 inch");
        assert_eq!(first.price, Some(Decimal::new(8499, 0)));
        assert_eq!(first.currency.as_deref(), Some("PKR"));
        assert_eq!(first.review_count, Some(87));
        assert_eq!(first.rating, None);
        assert_eq!(first.url, "https://www.daraz.pk/products/101.html");
        assert_eq!(
            first.image_url.as_deref(),
            Some("https://static-01.daraz.pk/p/101.jpg")
        );
        assert_eq!(first.sku.as_deref(), Some("101"));
        assert_eq!(first.category, None);
        assert!(result.next_page_url.is_none());
    }

    #[test]
    fn test_bangladesh_currency_and_category() {
        let html = listing(&card("7", "Rice Cooker", "৳ 2,950"), "");
        let url = Url::parse("https://www.daraz.com.bd/rice-cookers/?page=1").unwrap();
        let result = adapter().parse_page(&html, &url).unwrap();
        assert_eq!(result.records[0].currency.as_deref(), Some("BDT"));
        assert_eq!(result.records[0].category.as_deref(), Some("rice cookers"));
    }

    #[test]
    fn test_next_page_from_link_rel() {
        let html = format!(
            "<html><head><link rel='next' href='https://www.daraz.pk/catalog/?q=fan&page=2'></head>{}</html>",
            listing(&card("1", "Fan", "Rs. 100"), "")
        );
        let url = Url::parse("https://www.daraz.pk/catalog/?q=fan&page=1").unwrap();
        let result = adapter().parse_page(&html, &url).unwrap();
        assert_eq!(
            result.next_page_url.map(|u| u.to_string()),
            Some("https://www.daraz.pk/catalog/?q=fan&page=2".to_string())
        );
    }

    #[test]
    fn test_next_page_from_pagination_control() {
        let url = Url::parse("https://www.daraz.pk/catalog/?q=fan&page=2").unwrap();

        let enabled = listing(
            &card("1", "Fan", "Rs. 100"),
            r#"<ul class="ant-pagination"><li class="ant-pagination-next" aria-disabled="false"><a>›</a></li></ul>"#,
        );
        let result = adapter().parse_page(&enabled, &url).unwrap();
        assert_eq!(
            result.next_page_url.map(|u| u.to_string()),
            Some("https://www.daraz.pk/catalog/?q=fan&page=3".to_string())
        );

        let disabled = listing(
            &card("1", "Fan", "Rs. 100"),
            r#"<ul class="ant-pagination"><li class="ant-pagination-next ant-pagination-disabled" aria-disabled="true"><a>›</a></li></ul>"#,
        );
        let result = adapter().parse_page(&disabled, &url).unwrap();
        assert!(result.next_page_url.is_none());
    }

    #[test]
    fn test_last_representable_page_ends_pagination() {
        let url = Url::parse("https://www.daraz.pk/catalog/?q=fan&page=4294967295").unwrap();
        let html = listing(
            &card("1", "Fan", "Rs. 100"),
            r#"<ul class="ant-pagination"><li class="ant-pagination-next" aria-disabled="false"><a>›</a></li></ul>"#,
        );
        let result = adapter().parse_page(&html, &url).unwrap();
        assert_eq!(result.records.len(), 1);
        assert!(result.next_page_url.is_none());
    }

    #[test]
    fn test_no_result_marker() {
        let html = r#"<html><body><div data-qa-locator="search-no-result">
            Search No Result</div></body></html>"#;
        let url = Url::parse("https://www.daraz.pk/catalog/?q=zzqqxx&page=1").unwrap();
        let result = adapter().parse_page(html, &url).unwrap();
        assert!(result.records.is_empty());
        assert!(result.next_page_url.is_none());
    }

    #[test]
    fn test_stale_field_selectors_is_structure_change() {
        let html = listing(
            r#"<div data-qa-locator="product-item"><span>renamed markup</span></div>"#,
            "",
        );
        let url = Url::parse("https://www.daraz.pk/catalog/?q=fan&page=1").unwrap();
        match adapter().parse_page(&html, &url) {
            Err(FetchError::PageStructureChanged { reason, .. }) => {
                assert!(reason.contains("none yielded a record"));
            }
            other => panic!("expected PageStructureChanged, got {:?}", other),
        }
    }
}
