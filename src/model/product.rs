//! Normalized product records and the draft they are built from

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::url::resolve_link;

/// One scraped product, normalized across site families
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Product title as listed; never empty
    pub name: String,

    /// Listed price, non-negative
    pub price: Option<Decimal>,

    /// ISO-like currency code (e.g., "USD", "PKR")
    pub currency: Option<String>,

    /// Average rating in [0, 5]
    pub rating: Option<Decimal>,

    pub review_count: Option<u32>,

    /// Free-text stock status as shown by the site
    pub availability: Option<String>,

    /// Absolute product page URL
    pub url: String,

    pub image_url: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,

    /// Id of the adapter that produced this record
    pub source_name: String,

    /// Extraction time
    pub scraped_at: DateTime<Utc>,
}

/// Why a product node could not become a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftRejection {
    MissingName,
    MissingUrl,
}

impl std::fmt::Display for DraftRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => f.write_str("missing product name"),
            Self::MissingUrl => f.write_str("missing or unresolvable product URL"),
        }
    }
}

/// Raw field values collected from one product node
///
/// Adapters fill in whatever they can find; [`ProductDraft::finish`]
/// enforces the record invariants (non-empty name, absolute URL, price and
/// rating ranges) and stamps the source and extraction time.
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub rating: Option<Decimal>,
    pub review_count: Option<u32>,
    pub availability: Option<String>,
    /// Href as found in the markup, possibly relative
    pub href: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
}

impl ProductDraft {
    /// Validates the draft and converts it into a record
    ///
    /// # Arguments
    ///
    /// * `base_url` - The page URL relative links are resolved against
    /// * `source_name` - The producing adapter's id
    /// * `scraped_at` - Extraction timestamp
    ///
    /// # Returns
    ///
    /// * `Ok(ProductRecord)` - The node yielded a usable record
    /// * `Err(DraftRejection)` - Name or URL is missing; the node is skipped
    pub fn finish(
        self,
        base_url: &Url,
        source_name: &str,
        scraped_at: DateTime<Utc>,
    ) -> Result<ProductRecord, DraftRejection> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or(DraftRejection::MissingName)?;

        let url = self
            .href
            .as_deref()
            .and_then(|href| resolve_link(href, base_url))
            .ok_or(DraftRejection::MissingUrl)?;

        let price = self.price.filter(|p| {
            let valid = !p.is_sign_negative();
            if !valid {
                tracing::warn!("Dropping negative price {} for '{}'", p, name);
            }
            valid
        });

        let rating = self.rating.filter(|r| {
            let valid = *r >= Decimal::ZERO && *r <= Decimal::from(5);
            if !valid {
                tracing::warn!("Dropping out-of-range rating {} for '{}'", r, name);
            }
            valid
        });

        let image_url = self
            .image_url
            .as_deref()
            .and_then(|src| resolve_link(src, base_url))
            .map(String::from);

        Ok(ProductRecord {
            name,
            price,
            currency: self.currency,
            rating,
            review_count: self.review_count,
            availability: self.availability,
            url: url.to_string(),
            image_url,
            category: self.category,
            brand: self.brand,
            sku: self.sku,
            description: self.description,
            source_name: source_name.to_string(),
            scraped_at,
        })
    }
}
