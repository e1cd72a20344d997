//! Integration tests for the DocNum worker API.
//!
//! These tests spin up a real server instance and make HTTP requests to
//! verify the complete request/response cycle.

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;

use docnum_worker::api::{AppState, create_router};
use docnum_worker::config::{
    AppConfig, FileStorageConfig, ObservabilityConfig, ReaperConfig, ReservationConfig,
    ServerConfig, StorageBackend, StorageConfig,
};
use docnum_worker::storage::create_storage;

// ============================================================================
// Test Harness
// ============================================================================

/// Test server instance.
struct TestServer {
    addr: SocketAddr,
    client: Client,
    _temp_dir: TempDir,
}

impl TestServer {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".parse().unwrap(),
                port: 0,
            },
            storage: StorageConfig {
                backend: StorageBackend::File,
                file: FileStorageConfig {
                    data_dir: temp_dir.path().to_path_buf(),
                },
                ..Default::default()
            },
            reservation: ReservationConfig {
                default_lease_seconds: 300,
                max_lease_seconds: 3600,
                retention_seconds: 300,
                cas_max_attempts: 50,
                cas_backoff_ms: 0,
                cas_jitter_ms: 2,
            },
            reaper: ReaperConfig {
                enabled: false,
                interval_seconds: 300,
            },
            observability: ObservabilityConfig {
                log_level: "warn".to_string(),
                log_format: "text".to_string(),
                metrics_enabled: false,
            },
        };

        let storage = create_storage(&config.storage)
            .await
            .expect("Failed to create storage");

        let state = AppState::new(Arc::new(config), storage);
        let app = create_router(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server failed");
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr,
            client: Client::new(),
            _temp_dir: temp_dir,
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await
            .expect("Request failed")
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Response {
        self.client
            .post(format!("{}{}", self.base_url(), path))
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }

    async fn post_empty(&self, path: &str) -> Response {
        self.client
            .post(format!("{}{}", self.base_url(), path))
            .send()
            .await
            .expect("Request failed")
    }

    async fn put<T: Serialize>(&self, path: &str, body: &T) -> Response {
        self.client
            .put(format!("{}{}", self.base_url(), path))
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }

    async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(format!("{}{}", self.base_url(), path))
            .send()
            .await
            .expect("Request failed")
    }

    /// Create an invoice-style series and return its mapping id.
    async fn create_invoice_series(&self, mapping_id: &str) -> String {
        let response = self
            .post(
                "/v1/series",
                &json!({
                    "mapping_id": mapping_id,
                    "prefix": "INV-",
                    "pattern": "{PREFIX}{VALUE:4}",
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        mapping_id.to_string()
    }
}

/// API response structure.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    code: i32,
    #[allow(dead_code)]
    message: String,
    data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn is_success(&self) -> bool {
        self.code == 0
    }
}

#[derive(Debug, Deserialize)]
struct SeriesData {
    mapping_id: String,
    enabled: bool,
    last_value: i64,
    consumed_value: i64,
    prefix: String,
    update_after_transfer: bool,
}

#[derive(Debug, Deserialize)]
struct ReservationData {
    reservation_id: String,
    mapping_id: String,
    value: i64,
    formatted: String,
    status: String,
    warning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SweepData {
    expired: BTreeMap<String, usize>,
    total: usize,
}

// ============================================================================
// Health Endpoint Tests
// ============================================================================

#[derive(Debug, Deserialize)]
struct HealthData {
    status: String,
}

#[derive(Debug, Deserialize)]
struct ReadyData {
    ready: bool,
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::new().await;
    let response = server.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: ApiResponse<HealthData> = response.json().await.unwrap();
    assert!(body.is_success());
    assert_eq!(body.data.unwrap().status, "healthy");
}

#[tokio::test]
async fn test_ready_endpoint() {
    let server = TestServer::new().await;
    let response = server.get("/ready").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: ApiResponse<ReadyData> = response.json().await.unwrap();
    assert!(body.is_success());
    assert!(body.data.unwrap().ready);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let server = TestServer::new().await;
    let response = server.get("/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);

    let text = response.text().await.unwrap();
    assert!(text.contains("docnum_up"));
}

// ============================================================================
// Series Configuration Tests
// ============================================================================

#[tokio::test]
async fn test_series_crud() {
    let server = TestServer::new().await;

    // Create
    let response = server
        .post(
            "/v1/series",
            &json!({
                "mapping_id": "invoices",
                "field_name": "DocNumber",
                "detail_field_name": "DocNumberLine",
                "prefix": "FAC-",
                "start_value": 100,
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: ApiResponse<SeriesData> = response.json().await.unwrap();
    let series = body.data.unwrap();
    assert_eq!(series.mapping_id, "invoices");
    assert!(series.enabled);
    assert_eq!(series.last_value, 100);
    assert_eq!(series.consumed_value, 100);
    assert!(series.update_after_transfer);

    // Get
    let response = server.get("/v1/series?mapping=invoices").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: ApiResponse<SeriesData> = response.json().await.unwrap();
    assert_eq!(body.data.unwrap().prefix, "FAC-");

    // List
    let response = server.get("/v1/series/list").await;
    let body: ApiResponse<Vec<SeriesData>> = response.json().await.unwrap();
    assert_eq!(body.data.unwrap().len(), 1);

    // Update
    let response = server
        .put(
            "/v1/series",
            &json!({
                "mapping_id": "invoices",
                "enabled": false,
                "prefix": "INV-",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: ApiResponse<SeriesData> = response.json().await.unwrap();
    let series = body.data.unwrap();
    assert!(!series.enabled);
    assert_eq!(series.prefix, "INV-");
    // Counters cannot be edited.
    assert_eq!(series.last_value, 100);

    // Delete
    let response = server.delete("/v1/series?mapping=invoices").await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = server.get("/v1/series?mapping=invoices").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_series_conflict() {
    let server = TestServer::new().await;
    server.create_invoice_series("invoices").await;

    let response = server
        .post("/v1/series", &json!({"mapping_id": "invoices"}))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body: ApiResponse<SeriesData> = response.json().await.unwrap();
    assert_eq!(body.code, 1002);
}

#[tokio::test]
async fn test_invalid_pattern_rejected_at_creation() {
    let server = TestServer::new().await;

    let response = server
        .post(
            "/v1/series",
            &json!({
                "mapping_id": "invoices",
                "pattern": "{PREFIX}{VALUE:4",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_unknown_series() {
    let server = TestServer::new().await;
    let response = server.get("/v1/series?mapping=ghost").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: ApiResponse<SeriesData> = response.json().await.unwrap();
    assert_eq!(body.code, 1001);
}

// ============================================================================
// Reservation Tests
// ============================================================================

#[tokio::test]
async fn test_reserve_commit_flow() {
    let server = TestServer::new().await;
    server.create_invoice_series("invoices").await;

    // Reserve
    let response = server
        .post("/v1/reservations", &json!({"mapping_id": "invoices"}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: ApiResponse<ReservationData> = response.json().await.unwrap();
    let reservation = body.data.unwrap();
    assert_eq!(reservation.mapping_id, "invoices");
    assert_eq!(reservation.value, 1);
    assert_eq!(reservation.formatted, "INV-0001");
    assert_eq!(reservation.status, "active");
    assert!(reservation.warning.is_none());

    // Lookup
    let response = server
        .get(&format!("/v1/reservations/{}", reservation.reservation_id))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Commit
    let response = server
        .post_empty(&format!(
            "/v1/reservations/{}/commit",
            reservation.reservation_id
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: ApiResponse<ReservationData> = response.json().await.unwrap();
    assert_eq!(body.data.unwrap().status, "committed");

    // Commit again: idempotent success
    let response = server
        .post_empty(&format!(
            "/v1/reservations/{}/commit",
            reservation.reservation_id
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Cancel after commit is a conflict
    let response = server
        .post_empty(&format!(
            "/v1/reservations/{}/cancel",
            reservation.reservation_id
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: ApiResponse<ReservationData> = response.json().await.unwrap();
    assert_eq!(body.code, 2002);
}

#[tokio::test]
async fn test_cancelled_value_is_not_reissued() {
    let server = TestServer::new().await;
    server.create_invoice_series("invoices").await;

    let response = server
        .post("/v1/reservations", &json!({"mapping_id": "invoices"}))
        .await;
    let body: ApiResponse<ReservationData> = response.json().await.unwrap();
    let first = body.data.unwrap();

    let response = server
        .post_empty(&format!("/v1/reservations/{}/cancel", first.reservation_id))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = server
        .post("/v1/reservations", &json!({"mapping_id": "invoices"}))
        .await;
    let body: ApiResponse<ReservationData> = response.json().await.unwrap();
    let second = body.data.unwrap();

    assert_eq!(second.value, first.value + 1);
    assert_eq!(second.formatted, "INV-0002");
}

#[tokio::test]
async fn test_reserve_on_disabled_series() {
    let server = TestServer::new().await;
    server.create_invoice_series("invoices").await;

    server
        .put(
            "/v1/series",
            &json!({"mapping_id": "invoices", "enabled": false}),
        )
        .await;

    let response = server
        .post("/v1/reservations", &json!({"mapping_id": "invoices"}))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body: ApiResponse<ReservationData> = response.json().await.unwrap();
    assert_eq!(body.code, 1004);
}

#[tokio::test]
async fn test_reserve_validation() {
    let server = TestServer::new().await;

    let response = server
        .post("/v1/reservations", &json!({"mapping_id": ""}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server
        .post(
            "/v1/reservations",
            &json!({"mapping_id": "invoices", "lease_seconds": 0}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server
        .post(
            "/v1/reservations",
            &json!({"mapping_id": "invoices", "lease_seconds": 86400}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server
        .post("/v1/reservations", &json!({"mapping_id": "ghost"}))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concurrent_reservations_yield_distinct_numbers() {
    let server = Arc::new(TestServer::new().await);
    server.create_invoice_series("M1").await;

    let mut handles = Vec::new();
    for _ in 0..3 {
        let server = Arc::clone(&server);
        handles.push(tokio::spawn(async move {
            let response = server
                .post(
                    "/v1/reservations",
                    &json!({"mapping_id": "M1", "lease_seconds": 300}),
                )
                .await;
            assert_eq!(response.status(), StatusCode::OK);
            let body: ApiResponse<ReservationData> = response.json().await.unwrap();
            body.data.unwrap()
        }));
    }

    let mut formatted = HashSet::new();
    let mut ids = HashSet::new();
    for handle in handles {
        let reservation = handle.await.unwrap();
        formatted.insert(reservation.formatted);
        ids.insert(reservation.reservation_id);
    }

    let expected: HashSet<String> = ["INV-0001", "INV-0002", "INV-0003"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(formatted, expected);
    assert_eq!(ids.len(), 3);

    let response = server.get("/v1/series?mapping=M1").await;
    let body: ApiResponse<SeriesData> = response.json().await.unwrap();
    assert_eq!(body.data.unwrap().last_value, 3);
}

// ============================================================================
// Expiry Tests
// ============================================================================

#[tokio::test]
async fn test_expired_reservation_after_sweep() {
    let server = TestServer::new().await;
    server.create_invoice_series("invoices").await;

    let response = server
        .post(
            "/v1/reservations",
            &json!({"mapping_id": "invoices", "lease_seconds": 1}),
        )
        .await;
    let body: ApiResponse<ReservationData> = response.json().await.unwrap();
    let reservation = body.data.unwrap();

    // A sweep before the lease lapses expires nothing.
    let response = server.post_empty("/v1/reservations/sweep").await;
    let body: ApiResponse<SweepData> = response.json().await.unwrap();
    assert_eq!(body.data.unwrap().total, 0);

    tokio::time::sleep(tokio::time::Duration::from_millis(1200)).await;

    let response = server.post_empty("/v1/reservations/sweep").await;
    let body: ApiResponse<SweepData> = response.json().await.unwrap();
    let sweep = body.data.unwrap();
    assert_eq!(sweep.total, 1);
    assert_eq!(sweep.expired["invoices"], 1);

    // The reservation is now expired; a late commit is a conflict.
    let response = server
        .get(&format!("/v1/reservations/{}", reservation.reservation_id))
        .await;
    let body: ApiResponse<ReservationData> = response.json().await.unwrap();
    assert_eq!(body.data.unwrap().status, "expired");

    let response = server
        .post_empty(&format!(
            "/v1/reservations/{}/commit",
            reservation.reservation_id
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_reservation_operations() {
    let server = TestServer::new().await;

    let ghost = uuid::Uuid::new_v4();
    let response = server
        .post_empty(&format!("/v1/reservations/{ghost}/commit"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: ApiResponse<ReservationData> = response.json().await.unwrap();
    assert_eq!(body.code, 2001);
}
