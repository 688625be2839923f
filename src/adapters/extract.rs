//! Field extraction helpers shared by the site adapters
//!
//! Selectors are CSS strings; a selector that fails to compile simply
//! matches nothing. Every text value is whitespace-collapsed and trimmed,
//! and an empty result is reported as absent.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};

/// ISO codes recognized verbatim in price text
const CURRENCY_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "INR", "PKR", "BDT", "LKR", "NPR", "MMK", "JPY", "CAD", "AUD",
];

/// Currency symbols, longest and most specific first
const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("Rs.", "PKR"),
    ("₨", "PKR"),
    ("৳", "BDT"),
    ("₹", "INR"),
    ("£", "GBP"),
    ("€", "EUR"),
    ("¥", "JPY"),
    ("$", "USD"),
];

/// Collapses runs of whitespace and trims; empty input is None
pub fn clean_text(raw: &str) -> Option<String> {
    let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Returns the cleaned text content of an element
pub fn element_text(element: ElementRef<'_>) -> Option<String> {
    clean_text(&element.text().collect::<String>())
}

/// Selects every element in the document matching `css`
pub fn select_nodes<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Returns the first non-empty text found by trying each selector in order
///
/// # Arguments
///
/// * `scope` - The element to search within
/// * `selectors` - CSS selectors, most specific first
pub fn select_text(scope: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        scope.select(&selector).find_map(element_text)
    })
}

/// Returns the first non-empty attribute value found by trying each selector in order
pub fn select_attr(scope: ElementRef<'_>, selectors: &[&str], attr: &str) -> Option<String> {
    selectors.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        scope
            .select(&selector)
            .find_map(|el| el.value().attr(attr).and_then(clean_text))
    })
}

/// Same as [`select_attr`] but searches the whole document
pub fn document_attr(document: &Html, selectors: &[&str], attr: &str) -> Option<String> {
    select_attr(document.root_element(), selectors, attr)
}

/// Checks whether any of the marker selectors matches an element in the document
pub fn has_marker(document: &Html, markers: &[&str]) -> bool {
    markers.iter().any(|css| {
        Selector::parse(css)
            .map(|selector| document.select(&selector).next().is_some())
            .unwrap_or(false)
    })
}

/// Parses the first numeric run of a price text
///
/// Thousands separators are removed. A decimal comma ("1.299,00" or
/// "12,50") is recognized when the trailing group has exactly two digits.
/// A minus sign before the number yields a negative value so that the
/// caller can reject it.
///
/// # Examples
///
/// ```
/// use listing_harvest::adapters::extract::parse_price;
/// use rust_decimal::Decimal;
///
/// assert_eq!(parse_price("$1,299.99"), Some(Decimal::new(129999, 2)));
/// assert_eq!(parse_price("Rs. 2,450"), Some(Decimal::new(2450, 0)));
/// assert_eq!(parse_price("call for price"), None);
/// ```
pub fn parse_price(text: &str) -> Option<Decimal> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let run: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let number = normalize_number(run.trim_end_matches(['.', ',']))?;
    let value = Decimal::from_str(&number).ok()?;
    if text[..start].contains('-') {
        Some(-value)
    } else {
        Some(value)
    }
}

fn normalize_number(run: &str) -> Option<String> {
    if run.is_empty() {
        return None;
    }
    let last_comma = run.rfind(',');
    let last_dot = run.rfind('.');
    let decimal_comma = match (last_comma, last_dot) {
        (Some(c), Some(d)) => c > d,
        (Some(c), None) => run.len() - c - 1 == 2,
        _ => false,
    };
    let normalized = if decimal_comma {
        run.replace('.', "").replace(',', ".")
    } else {
        run.replace(',', "")
    };
    if normalized.matches('.').count() > 1 {
        return None;
    }
    Some(normalized)
}

/// Detects a currency code from the symbol or ISO code in a price text
pub fn detect_currency(text: &str) -> Option<&'static str> {
    if let Some(code) = CURRENCY_CODES.iter().find(|code| text.contains(*code)) {
        return Some(code);
    }
    CURRENCY_SYMBOLS
        .iter()
        .find(|(symbol, _)| text.contains(symbol))
        .map(|(_, code)| *code)
}

/// Parses the first decimal number of a rating text ("4.5 out of 5 stars")
pub fn parse_rating(text: &str) -> Option<Decimal> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let run: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let run = run.trim_end_matches(['.', ',']).replace(',', ".");
    Decimal::from_str(&run).ok()
}

/// Parses a review count such as "(1,234)", "2.5K" or "1M"
///
/// Counts that do not fit a `u32` are treated as unparseable.
pub fn parse_count(text: &str) -> Option<u32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let run: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let multiplier = match rest[run.len()..].chars().next() {
        Some('k') | Some('K') => Decimal::from(1_000),
        Some('m') | Some('M') => Decimal::from(1_000_000),
        _ => Decimal::ONE,
    };
    let digits = if multiplier == Decimal::ONE {
        run.replace([',', '.'], "")
    } else {
        run.replace(',', "")
    };
    let value = Decimal::from_str(digits.trim_end_matches('.'))
        .ok()?
        .checked_mul(multiplier)?;
    value.trunc().to_u32()
}
