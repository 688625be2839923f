//! URL handling module for Listing-Harvest
//!
//! This module provides listing URL parsing, query manipulation, link
//! resolution, host extraction and host pattern matching.

mod domain;
mod matcher;
mod normalize;

pub use domain::extract_host;
pub use matcher::{host_has_label, matches_wildcard};
pub use normalize::{
    parse_listing_url, query_param, remove_query_params, resolve_link, set_query_param,
};
