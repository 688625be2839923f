use crate::UrlError;
use url::Url;

/// Tracking query parameters dropped from listing URLs before fetching
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "spm", "from"];

/// Parses a caller-supplied listing URL
///
/// # Rules
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only `http` and `https`
/// 3. Require a host
/// 4. Remove the fragment (everything after #)
/// 5. Remove generic tracking parameters (`utm_*`, `fbclid`, `gclid`, ...)
///
/// Host case is already folded by the `url` crate. Path and the remaining
/// query are left untouched because listing sites encode search state there.
///
/// # Examples
///
/// ```
/// use listing_harvest::url::parse_listing_url;
///
/// let url = parse_listing_url("https://WWW.Amazon.com/s?k=laptop&utm_source=x#top").unwrap();
/// assert_eq!(url.as_str(), "https://www.amazon.com/s?k=laptop");
/// ```
pub fn parse_listing_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);
    remove_query_params(&mut url, |key| is_tracking_param(key));

    Ok(url)
}

/// Removes every query parameter whose key satisfies `drop`
///
/// Parameter order of the survivors is preserved; an empty query is removed
/// entirely rather than leaving a trailing `?`.
pub fn remove_query_params<F>(url: &mut Url, drop: F)
where
    F: Fn(&str) -> bool,
{
    if url.query().is_none() {
        return;
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !drop(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    rewrite_query(url, &kept);
}

/// Sets `key` to `value`, replacing an existing value in place or appending
pub fn set_query_param(url: &mut Url, key: &str, value: &str) {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    match pairs.iter_mut().find(|(k, _)| k == key) {
        Some(pair) => pair.1 = value.to_string(),
        None => pairs.push((key.to_string(), value.to_string())),
    }

    rewrite_query(url, &pairs);
}

/// Returns the first value of query parameter `key`
pub fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Resolves a link href against the page URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
///
/// Protocol-relative links (`//host/path`) take the base URL's scheme.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    if absolute.scheme() == "http" || absolute.scheme() == "https" {
        Some(absolute)
    } else {
        None
    }
}

fn rewrite_query(url: &mut Url, pairs: &[(String, String)]) {
    if pairs.is_empty() {
        url.set_query(None);
        return;
    }

    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_search_state() {
        let result = parse_listing_url("https://www.daraz.pk/catalog/?q=phone&page=2").unwrap();
        assert_eq!(result.as_str(), "https://www.daraz.pk/catalog/?q=phone&page=2");
    }

    #[test]
    fn test_remove_fragment() {
        let result = parse_listing_url("https://example.com/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_remove_tracking_params() {
        let result =
            parse_listing_url("https://example.com/s?k=tv&utm_source=twitter&gclid=1").unwrap();
        assert_eq!(result.as_str(), "https://example.com/s?k=tv");
    }

    #[test]
    fn test_all_tracking_params_removed() {
        let result =
            parse_listing_url("https://example.com/page?utm_source=a&fbclid=b&gclid=c").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_lowercase_host() {
        let result = parse_listing_url("https://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = parse_listing_url("ftp://example.com/page");
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }

    #[test]
    fn test_malformed_url() {
        assert!(matches!(
            parse_listing_url("not a url"),
            Err(UrlError::Parse(_))
        ));
    }

    #[test]
    fn test_set_query_param_replaces_in_place() {
        let mut url = Url::parse("https://example.com/c?q=tv&page=1&sort=new").unwrap();
        set_query_param(&mut url, "page", "2");
        assert_eq!(url.as_str(), "https://example.com/c?q=tv&page=2&sort=new");
    }

    #[test]
    fn test_set_query_param_appends() {
        let mut url = Url::parse("https://example.com/c").unwrap();
        set_query_param(&mut url, "page", "1");
        assert_eq!(url.as_str(), "https://example.com/c?page=1");
    }

    #[test]
    fn test_remove_query_params_drops_empty_query() {
        let mut url = Url::parse("https://example.com/s?ref=nav").unwrap();
        remove_query_params(&mut url, |k| k == "ref");
        assert_eq!(url.as_str(), "https://example.com/s");
    }

    #[test]
    fn test_query_param() {
        let url = Url::parse("https://example.com/s?k=usb+hub&page=3").unwrap();
        assert_eq!(query_param(&url, "k"), Some("usb hub".to_string()));
        assert_eq!(query_param(&url, "page"), Some("3".to_string()));
        assert_eq!(query_param(&url, "missing"), None);
    }

    #[test]
    fn test_resolve_relative_link() {
        let base = Url::parse("https://www.amazon.com/s?k=tv").unwrap();
        let resolved = resolve_link("/dp/B000123?ref=sr_1", &base).unwrap();
        assert_eq!(resolved.as_str(), "https://www.amazon.com/dp/B000123?ref=sr_1");
    }

    #[test]
    fn test_resolve_protocol_relative_link() {
        let base = Url::parse("https://www.daraz.pk/phones/").unwrap();
        let resolved = resolve_link("//www.daraz.pk/products/item-i1.html", &base).unwrap();
        assert_eq!(resolved.as_str(), "https://www.daraz.pk/products/item-i1.html");
    }

    #[test]
    fn test_resolve_rejects_special_schemes() {
        let base = Url::parse("https://example.com/").unwrap();
        assert!(resolve_link("javascript:void(0)", &base).is_none());
        assert!(resolve_link("mailto:a@example.com", &base).is_none());
        assert!(resolve_link("#top", &base).is_none());
        assert!(resolve_link("   ", &base).is_none());
        assert!(resolve_link("ftp://example.com/file", &base).is_none());
    }
}
