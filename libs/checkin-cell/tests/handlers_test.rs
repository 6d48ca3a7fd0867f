use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use checkin_cell::{
    create_checkin_router, DashboardService, MemoryVersionStore, RecordCache, ReloadTrigger,
};
use shared_utils::test_utils::{MockFoodBankResponses, TestConfig};

const DATE: &str = "2024-03-05";

struct TestApp {
    router: Router,
    cache: Arc<RecordCache>,
}

fn create_test_app(server: &MockServer, store: Arc<MemoryVersionStore>) -> TestApp {
    let config = TestConfig::with_base_url(&server.uri()).to_app_config();
    let cache = Arc::new(RecordCache::new());
    let service = DashboardService::new(&config, cache.clone(), store).unwrap();

    TestApp {
        router: create_checkin_router(Arc::new(service)),
        cache,
    }
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };

    (status, json)
}

async fn mount_listing(server: &MockServer, body: Value, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/api/appointments"))
        .and(query_param("date", DATE))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn sample_listing() -> Value {
    MockFoodBankResponses::appointments_response(vec![
        MockFoodBankResponses::record_with_timestamp(1, "Ada", "checked_in", "2024-03-05T09:00:00Z"),
        MockFoodBankResponses::record_with_clock_time(2, "Ben", "cancelled", "09:00"),
        MockFoodBankResponses::record_with_clock_time(3, "Cy", "completed", "09:07"),
        MockFoodBankResponses::unresolvable_record(4, "Di"),
        serde_json::json!("not a record"),
    ])
}

#[tokio::test]
async fn test_summary_counts_resolved_records_for_date() {
    let server = MockServer::start().await;
    mount_listing(&server, sample_listing(), 1).await;
    let app = create_test_app(&server, Arc::new(MemoryVersionStore::new()));

    let (status, json) = get_json(&app.router, &format!("/summary?date={}", DATE)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reference_date"], DATE);
    assert_eq!(json["totals"]["completed"], 2);
    assert_eq!(json["totals"]["cancelled"], 1);
    assert_eq!(json["totals"]["total"], 3);
    assert_eq!(json["unresolved"], 1);
}

#[tokio::test]
async fn test_slots_are_fixed_length_and_exact_match() {
    let server = MockServer::start().await;
    mount_listing(&server, sample_listing(), 1).await;
    let app = create_test_app(&server, Arc::new(MemoryVersionStore::new()));

    let (status, json) = get_json(&app.router, &format!("/slots?date={}", DATE)).await;

    assert_eq!(status, StatusCode::OK);
    let slots = json["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 49);
    assert_eq!(json["total"], 49);

    let nine = slots.iter().find(|s| s["label"] == "09:00").unwrap();
    assert_eq!(nine["counts"]["completed"], 1);
    assert_eq!(nine["counts"]["cancelled"], 1);
    assert_eq!(nine["counts"]["total"], 2);

    let charted: u64 = slots.iter().map(|s| s["counts"]["total"].as_u64().unwrap()).sum();
    assert_eq!(charted, 2);
}

#[tokio::test]
async fn test_clients_include_unresolvable_rows() {
    let server = MockServer::start().await;
    mount_listing(&server, sample_listing(), 1).await;
    let app = create_test_app(&server, Arc::new(MemoryVersionStore::new()));

    let (status, json) = get_json(&app.router, &format!("/clients?date={}", DATE)).await;

    assert_eq!(status, StatusCode::OK);
    let clients = json["clients"].as_array().unwrap();
    assert_eq!(clients.len(), 4);

    let unresolved = clients.iter().find(|c| c["record"]["id"] == 4).unwrap();
    assert!(unresolved["state"].is_null());
    assert!(unresolved["scheduled_at"].is_null());
    assert_eq!(unresolved["record"]["appointmentTime"], "25:99");
}

#[tokio::test]
async fn test_records_are_cached_until_reload() {
    let server = MockServer::start().await;
    mount_listing(&server, sample_listing(), 2).await;
    let app = create_test_app(&server, Arc::new(MemoryVersionStore::new()));

    let uri = format!("/summary?date={}", DATE);
    get_json(&app.router, &uri).await;
    get_json(&app.router, &format!("/slots?date={}", DATE)).await;
    assert_eq!(app.cache.len(), 1);

    app.cache.reload("v1", "v2");
    assert!(app.cache.is_empty());

    let (status, json) = get_json(&app.router, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totals"]["total"], 3);
}

#[tokio::test]
async fn test_unsuccessful_listing_reads_as_zero_records() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        MockFoodBankResponses::failed_appointments_response("no data uploaded"),
        1,
    )
    .await;
    let app = create_test_app(&server, Arc::new(MemoryVersionStore::new()));

    let (status, json) = get_json(&app.router, &format!("/slots?date={}", DATE)).await;

    assert_eq!(status, StatusCode::OK);
    let slots = json["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 49);
    assert!(slots.iter().all(|s| s["counts"]["total"] == 0));
    assert!(app.cache.is_empty());
}

#[tokio::test]
async fn test_upstream_error_reads_as_zero_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_json(MockFoodBankResponses::error_response("boom")))
        .mount(&server)
        .await;
    let app = create_test_app(&server, Arc::new(MemoryVersionStore::new()));

    let (status, json) = get_json(&app.router, &format!("/summary?date={}", DATE)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totals"]["total"], 0);
}

#[tokio::test]
async fn test_invalid_date_is_rejected() {
    let server = MockServer::start().await;
    let app = create_test_app(&server, Arc::new(MemoryVersionStore::new()));

    let (status, _) = get_json(&app.router, "/summary?date=05-03-2024").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_reports_local_and_upstream_versions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/daily-status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(MockFoodBankResponses::daily_status_response(Some("v3"), 120)),
        )
        .mount(&server)
        .await;
    let app = create_test_app(&server, Arc::new(MemoryVersionStore::with_version("v3")));

    let (status, json) = get_json(&app.router, "/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["upstream"]["dataVersion"], "v3");
    assert_eq!(json["upstream"]["recordCount"], 120);
    assert_eq!(json["local_version"], "v3");
    assert_eq!(json["in_sync"], true);
}

#[tokio::test]
async fn test_status_rate_limited_is_service_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/daily-status"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    let app = create_test_app(&server, Arc::new(MemoryVersionStore::new()));

    let (status, json) = get_json(&app.router, "/status").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["error"].is_string());
}
