//! Integration tests for Listing-Harvest
//!
//! These tests drive the real HTTP fetcher against wiremock servers.

mod scrape_tests;
