use url::Url;

/// Extracts the lowercase host from a URL
///
/// Used as the rate-limiter key; the port is ignored so that all requests to
/// one site share a gate.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use listing_harvest::url::extract_host;
///
/// let url = Url::parse("https://www.Amazon.com:443/s?k=tv").unwrap();
/// assert_eq!(extract_host(&url), Some("www.amazon.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}
