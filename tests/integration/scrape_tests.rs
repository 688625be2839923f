//! End-to-end scrape sessions against mock listing pages
//!
//! The mock server serves Daraz-style listing markup on 127.0.0.1, so the
//! adapter is chosen explicitly instead of through host resolution.

use listing_harvest::adapters::DarazAdapter;
use listing_harvest::config::{RateLimitScope, ScraperConfig};
use listing_harvest::engine::{
    HttpFetcher, IdentityPool, Orchestrator, RateLimiter, RetryPolicy, ScrapeContext,
};
use listing_harvest::output::{export_outcome, DatabaseTarget, ExportPlan, OutputFormat};
use listing_harvest::storage::{SqliteStorage, Storage};
use listing_harvest::{AdapterRegistry, ErrorKind, ScrapeOutcome, SessionStatus, SiteAdapter};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_AGENT: &str = "listing-harvest-test/1.0";

/// Creates an orchestrator with fast retries and a tiny rate-limit interval
fn create_orchestrator(max_pages: Option<u32>) -> Orchestrator<HttpFetcher> {
    let scraper = ScraperConfig {
        request_timeout: 5,
        connect_timeout: 2,
        ..Default::default()
    };
    let context = ScrapeContext {
        identities: IdentityPool::fixed(USER_AGENT),
        rate_limiter: RateLimiter::new(RateLimitScope::PerHost, Duration::from_millis(5)),
        retry: RetryPolicy::new(2, Duration::from_millis(5), Duration::from_millis(20)),
        registry: AdapterRegistry::builtin(),
        max_pages,
    };
    let fetcher = HttpFetcher::new(&scraper, &[]).expect("Failed to build HTTP client");
    Orchestrator::new(Arc::new(context), fetcher)
}

fn card(id: u32) -> String {
    format!(
        r#"<div data-qa-locator="product-item" data-item-id="{id}">
             <div class="title--wFj93"><a href="/products/fan-i{id}.html">Pedestal Fan {id}</a></div>
             <div class="price--NVB62"><span class="currency--GVKjl">Rs. {id},499</span></div>
           </div>"#
    )
}

/// A listing page with the given product ids and an optional next page number
fn listing_page(ids: &[u32], next: Option<u32>) -> String {
    let cards: String = ids.iter().map(|id| card(*id)).collect();
    let link = next
        .map(|page| format!(r#"<link rel="next" href="/catalog/?q=fan&page={page}">"#))
        .unwrap_or_default();
    format!("<html><head>{link}</head><body>{cards}</body></html>")
}

async fn mount_page(server: &MockServer, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path("/catalog/"))
        .and(query_param("page", page.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn scrape(orchestrator: &Orchestrator<HttpFetcher>, server: &MockServer) -> ScrapeOutcome {
    let adapter = SiteAdapter::Daraz(DarazAdapter::new());
    let url = format!("{}/catalog/?q=fan", server.uri());
    orchestrator
        .run_with_adapter(&adapter, &url, &CancellationToken::new())
        .await
        .expect("Session failed to start")
}

fn names(outcome: &ScrapeOutcome) -> Vec<&str> {
    outcome.records.iter().map(|r| r.name.as_str()).collect()
}

#[tokio::test]
async fn test_follows_pagination_to_the_end() {
    let server = MockServer::start().await;
    mount_page(&server, 1, listing_page(&[1, 2], Some(2))).await;
    mount_page(&server, 2, listing_page(&[3], Some(3))).await;
    mount_page(&server, 3, listing_page(&[4, 5], None)).await;

    let outcome = scrape(&create_orchestrator(None), &server).await;

    assert_eq!(outcome.status, SessionStatus::CompletedNormal);
    assert_eq!(outcome.pages_fetched, 3);
    assert_eq!(
        names(&outcome),
        [
            "Pedestal Fan 1",
            "Pedestal Fan 2",
            "Pedestal Fan 3",
            "Pedestal Fan 4",
            "Pedestal Fan 5"
        ]
    );

    let first = &outcome.records[0];
    assert_eq!(first.source_name, "daraz");
    assert_eq!(first.url, format!("{}/products/fan-i1.html", server.uri()));
    assert_eq!(first.price.map(|p| p.to_string()).as_deref(), Some("1499"));
}

#[tokio::test]
async fn test_sends_identity_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog/"))
        .and(header("user-agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[1], None)))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = scrape(&create_orchestrator(None), &server).await;

    assert_eq!(outcome.status, SessionStatus::CompletedNormal);
    assert_eq!(outcome.records.len(), 1);
}

#[tokio::test]
async fn test_stops_at_page_limit() {
    let server = MockServer::start().await;
    mount_page(&server, 1, listing_page(&[1], Some(2))).await;
    mount_page(&server, 2, listing_page(&[2], Some(3))).await;
    Mock::given(method("GET"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[3], None)))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = scrape(&create_orchestrator(Some(2)), &server).await;

    assert_eq!(outcome.status, SessionStatus::CompletedPageLimit);
    assert_eq!(outcome.pages_fetched, 2);
    assert_eq!(names(&outcome), ["Pedestal Fan 1", "Pedestal Fan 2"]);
}

#[tokio::test]
async fn test_server_errors_exhaust_retries_and_keep_records() {
    let server = MockServer::start().await;
    mount_page(&server, 1, listing_page(&[1, 2], Some(2))).await;
    Mock::given(method("GET"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let outcome = scrape(&create_orchestrator(None), &server).await;

    assert_eq!(outcome.status, SessionStatus::Failed);
    assert!(outcome.is_partial());
    assert_eq!(names(&outcome), ["Pedestal Fan 1", "Pedestal Fan 2"]);

    let failure = outcome.failure.as_ref().expect("Missing failure detail");
    assert_eq!(failure.kind, ErrorKind::NetworkTransient);
    assert_eq!(failure.page_number, 2);
    assert!(failure.url.contains("page=2"));
}

#[tokio::test]
async fn test_not_found_fails_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = scrape(&create_orchestrator(None), &server).await;

    assert_eq!(outcome.status, SessionStatus::Failed);
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.pages_fetched, 0);

    let failure = outcome.failure.as_ref().expect("Missing failure detail");
    assert_eq!(failure.kind, ErrorKind::NetworkPermanent);
    assert_eq!(failure.page_number, 1);
}

#[tokio::test]
async fn test_empty_results_page_completes() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        r#"<html><body><div data-qa-locator="search-no-result">No results</div></body></html>"#
            .to_string(),
    )
    .await;

    let outcome = scrape(&create_orchestrator(None), &server).await;

    assert_eq!(outcome.status, SessionStatus::CompletedNormal);
    assert_eq!(outcome.pages_fetched, 1);
    assert!(outcome.records.is_empty());
}

#[tokio::test]
async fn test_changed_markup_is_reported() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        "<html><body><div class='grid'>redesigned</div></body></html>".to_string(),
    )
    .await;

    let outcome = scrape(&create_orchestrator(None), &server).await;

    assert_eq!(outcome.status, SessionStatus::Failed);
    let failure = outcome.failure.as_ref().expect("Missing failure detail");
    assert_eq!(failure.kind, ErrorKind::PageStructureChanged);
}

#[tokio::test]
async fn test_partial_session_reaches_every_sink() {
    let server = MockServer::start().await;
    mount_page(&server, 1, listing_page(&[1, 2, 3], Some(2))).await;
    Mock::given(method("GET"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let outcome = scrape(&create_orchestrator(None), &server).await;
    assert_eq!(outcome.status, SessionStatus::Failed);

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("products.db");
    let plan = ExportPlan {
        directory: dir.path().join("exports"),
        base_name: "fans".to_string(),
        formats: vec![OutputFormat::Csv, OutputFormat::Json],
        database: Some(DatabaseTarget {
            path: db_path.clone(),
            config_hash: "test".to_string(),
        }),
    };

    let reports = export_outcome(&plan, &outcome);

    assert_eq!(reports.len(), 3);
    for report in &reports {
        assert_eq!(report.result, Ok(3), "sink {} failed", report.sink);
    }

    let csv = std::fs::read_to_string(dir.path().join("exports/fans.csv")).unwrap();
    assert_eq!(csv.lines().count(), 4);

    let json: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("exports/fans.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(json["status"], "failed");
    assert_eq!(json["total"], 3);

    let storage = SqliteStorage::new(&db_path).expect("Failed to open DB");
    let run = storage.get_latest_run().unwrap().expect("Missing run");
    assert_eq!(run.status, SessionStatus::Failed);
    assert_eq!(run.error_kind.as_deref(), Some("network_transient"));
    let stored = storage.load_products(run.id).unwrap();
    assert_eq!(stored, outcome.records);
}
