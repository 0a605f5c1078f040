use reqwest::StatusCode;
use serde_json::json;

use stockhold_api::config::AppConfig;
use stockhold_core::ProductId;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Product 1 holds 10 units, product 2 holds 3.
    async fn spawn() -> Self {
        let config = AppConfig {
            seed_products: vec![(ProductId::new(1), 10), (ProductId::new(2), 3)],
            ..AppConfig::default()
        };

        // Build app (same router as prod), but bind to an ephemeral port.
        let app = stockhold_api::app::build_app(&config)
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn session() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

async fn reserve(
    client: &reqwest::Client,
    base_url: &str,
    session_id: &str,
    supplier_id: i64,
    product_id: i64,
    quantity: i64,
) -> reqwest::Response {
    client
        .post(format!("{}/api/reservations", base_url))
        .json(&json!({
            "sessionId": session_id,
            "supplierId": supplier_id,
            "productId": product_id,
            "quantity": quantity,
        }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_returns_created_with_location() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let s = session();

    let res = reserve(&client, &srv.base_url, &s, 1, 1, 4).await;

    assert_eq!(res.status(), StatusCode::CREATED);
    let location = res.headers()[reqwest::header::LOCATION].to_str().unwrap().to_string();
    assert_eq!(location, format!("/api/reservations/{s}/1/1"));

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["sessionId"], s.as_str());
    assert_eq!(body["supplierId"], 1);
    assert_eq!(body["productId"], 1);
    assert_eq!(body["quantity"], 4);
    assert!(body["expiresAt"].is_string());

    let res = client
        .get(format!("{}{}", srv.base_url, location))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: serde_json::Value = res.json().await.unwrap();
    assert_eq!(fetched, body);
}

#[tokio::test]
async fn capacity_is_enforced_over_http() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    assert_eq!(reserve(&client, &srv.base_url, &session(), 1, 1, 5).await.status(), StatusCode::CREATED);
    assert_eq!(reserve(&client, &srv.base_url, &session(), 1, 1, 5).await.status(), StatusCode::CREATED);

    let res = reserve(&client, &srv.base_url, &session(), 1, 1, 1).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "capacity_exceeded");

    let res = client
        .get(format!("{}/api/availability/1/1", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let availability: serde_json::Value = res.json().await.unwrap();
    assert_eq!(availability, json!({ "capacity": 10, "reserved": 10, "remaining": 0 }));
}

#[tokio::test]
async fn unknown_product_is_bad_request() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = reserve(&client, &srv.base_url, &session(), 1, 404, 1).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "product_not_found");

    let all: Vec<serde_json::Value> = client
        .get(format!("{}/api/reservations", srv.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn invalid_bodies_are_validation_errors() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for quantity in [0, -1] {
        let res = reserve(&client, &srv.base_url, &session(), 1, 1, quantity).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "validation_error");
    }

    let res = reserve(&client, &srv.base_url, "", 1, 1, 1).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/api/reservations", srv.base_url))
        .json(&json!({ "sessionId": "abc" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn control_characters_in_session_id_are_rejected_before_admission() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = reserve(&client, &srv.base_url, "bad\u{7}sess", 1, 1, 1).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let all: Vec<serde_json::Value> = client
        .get(format!("{}/api/reservations", srv.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn pair_listing_filters_by_supplier_and_product() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let s = session();

    reserve(&client, &srv.base_url, &s, 2, 1, 1).await;
    reserve(&client, &srv.base_url, &s, 2, 2, 1).await;
    reserve(&client, &srv.base_url, &s, 12, 1, 1).await;

    let listed: Vec<serde_json::Value> = client
        .get(format!("{}/api/reservations/2/1", srv.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["supplierId"], 2);
    assert_eq!(listed[0]["productId"], 1);

    let all: Vec<serde_json::Value> = client
        .get(format!("{}/api/reservations", srv.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn re_reserve_replaces_previous_hold() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let s = session();

    assert_eq!(reserve(&client, &srv.base_url, &s, 1, 2, 1).await.status(), StatusCode::CREATED);
    // The existing hold counts: 1 + 3 exceeds the capacity of 3.
    assert_eq!(reserve(&client, &srv.base_url, &s, 1, 2, 3).await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(reserve(&client, &srv.base_url, &s, 1, 2, 2).await.status(), StatusCode::CREATED);

    let listed: Vec<serde_json::Value> = client
        .get(format!("{}/api/reservations/1/2", srv.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["quantity"], 2);
}

#[tokio::test]
async fn missing_reservation_and_bad_ids() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/reservations/nobody/1/1", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    let res = client
        .get(format!("{}/api/reservations/one/1", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_id");

    let res = client
        .get(format!("{}/api/availability/1/999", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn concurrent_http_requests_never_oversubscribe() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let client = client.clone();
            let base_url = srv.base_url.clone();
            tokio::spawn(async move { reserve(&client, &base_url, &session(), 3, 2, 1).await.status() })
        })
        .collect();

    let mut created = 0;
    for t in tasks {
        if t.await.unwrap() == StatusCode::CREATED {
            created += 1;
        }
    }

    assert_eq!(created, 3);
}
