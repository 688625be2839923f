/// Checks if a host matches a pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "www.amazon.com" matches only "www.amazon.com"
/// 2. Wildcard match: "*.daraz.pk" matches:
///    - "daraz.pk" (the bare domain)
///    - "www.daraz.pk" (single subdomain)
///    - "m.shop.daraz.pk" (nested subdomains)
///
/// Hosts are expected to be lowercase already.
///
/// # Examples
///
/// ```
/// use listing_harvest::url::matches_wildcard;
///
/// assert!(matches_wildcard("www.amazon.com", "www.amazon.com"));
/// assert!(!matches_wildcard("www.amazon.com", "smile.amazon.com"));
///
/// assert!(matches_wildcard("*.daraz.pk", "daraz.pk"));
/// assert!(matches_wildcard("*.daraz.pk", "www.daraz.pk"));
/// assert!(!matches_wildcard("*.daraz.pk", "daraz.lk"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// Checks whether any dot-separated label of `host` equals `label`
///
/// Used for site families that span many country domains: the label
/// "amazon" matches "amazon.com", "www.amazon.co.uk" and "amazon.de", but
/// not "notamazon.com" or "amazonaws.com".
///
/// # Examples
///
/// ```
/// use listing_harvest::url::host_has_label;
///
/// assert!(host_has_label("www.amazon.co.uk", "amazon"));
/// assert!(!host_has_label("amazonaws.com", "amazon"));
/// ```
pub fn host_has_label(host: &str, label: &str) -> bool {
    !label.is_empty() && host.split('.').any(|part| part.eq_ignore_ascii_case(label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_wildcard("amazon.com", "amazon.com"));
        assert!(matches_wildcard("www.daraz.pk", "www.daraz.pk"));
    }

    #[test]
    fn test_exact_no_match() {
        assert!(!matches_wildcard("amazon.com", "amazon.de"));
        assert!(!matches_wildcard("amazon.com", "www.amazon.com"));
    }

    #[test]
    fn test_wildcard_matches_bare_and_subdomains() {
        assert!(matches_wildcard("*.amazon.com", "amazon.com"));
        assert!(matches_wildcard("*.amazon.com", "www.amazon.com"));
        assert!(matches_wildcard("*.amazon.com", "images.na.amazon.com"));
    }

    #[test]
    fn test_wildcard_no_match_partial() {
        assert!(!matches_wildcard("*.amazon.com", "myamazon.com"));
        assert!(!matches_wildcard("*.amazon.com", "amazon.com.evil.org"));
    }

    #[test]
    fn test_wildcard_multi_label_suffix() {
        assert!(matches_wildcard("*.daraz.com.bd", "www.daraz.com.bd"));
        assert!(!matches_wildcard("*.daraz.com.bd", "daraz.com"));
    }

    #[test]
    fn test_host_label_across_country_domains() {
        assert!(host_has_label("amazon.com", "amazon"));
        assert!(host_has_label("www.amazon.co.uk", "amazon"));
        assert!(host_has_label("www.daraz.com.bd", "daraz"));
        assert!(host_has_label("WWW.DARAZ.PK", "daraz"));
    }

    #[test]
    fn test_host_label_rejects_substrings() {
        assert!(!host_has_label("amazonaws.com", "amazon"));
        assert!(!host_has_label("notdaraz.pk", "daraz"));
        assert!(!host_has_label("example.com", ""));
    }
}
