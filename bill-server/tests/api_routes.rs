//! Router-level tests: the auth guard, the management endpoints and the
//! public lookup surface, driven through the full middleware stack.

mod common;

use axum::Router;
use axum::body::Body;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::util::ServiceExt;

use bill_server::core::{ServerState, build_router};

use common::{midday_millis, test_state};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn get_authed(uri: &str, token: &str) -> Request<Body> {
    Request::get(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn token_for(state: &ServerState) -> String {
    state.jwt_service.generate_token("owner", "owner").unwrap()
}

fn sample_bill_json(date: &str, phone: &str) -> Value {
    json!({
        "date": midday_millis(date),
        "customer_name": "Asha",
        "customer_phone": phone,
        "items": [{"kind": "Saree", "unit_price": 1500.0, "quantity": 2}],
        "total_amount": 3000.0,
        "payment_mode": "CASH",
    })
}

async fn test_app() -> (tempfile::TempDir, ServerState, Router) {
    let (dir, state) = test_state().await;
    let app = build_router(state.clone());
    (dir, state, app)
}

#[tokio::test]
async fn health_needs_no_token() {
    let (_dir, _state, app) = test_app().await;

    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn management_routes_reject_missing_and_bad_tokens() {
    let (_dir, _state, app) = test_app().await;

    let response = app.clone().oneshot(get("/api/bills")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "E3001");

    let response = app
        .oneshot(get_authed("/api/bills", "not-a-real-token"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "E3002");
}

#[tokio::test]
async fn login_rejects_bad_credentials_with_a_unified_message() {
    let (_dir, _state, app) = test_app().await;

    let request = Request::post("/api/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"username": "owner", "password": "wrong"}).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Invalid username or password");
}

#[tokio::test]
async fn login_issues_a_token_that_opens_the_management_api() {
    let (_dir, _state, app) = test_app().await;

    let request = Request::post("/api/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"username": "owner", "password": "test-password-123"}).to_string(),
        ))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(body["username"], "owner");
    assert_eq!(body["expires_in"], 3600);

    let response = app
        .oneshot(get_authed("/api/auth/me", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["username"], "owner");
}

#[tokio::test]
async fn bills_can_be_created_and_listed_over_http() {
    let (_dir, state, app) = test_app().await;
    let token = token_for(&state);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/bills",
            &token,
            sample_bill_json("2025-04-01", "9876543210"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let created = body_json(response).await;
    assert_eq!(created["id"], "25040101");
    assert_eq!(created["url_hash"].as_str().unwrap().len(), 8);

    let response = app
        .clone()
        .oneshot(get_authed("/api/bills", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

    // Range filtering by business date
    let response = app
        .clone()
        .oneshot(get_authed(
            "/api/bills?start=2025-04-01&end=2025-04-01",
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

    let response = app
        .oneshot(get_authed(
            "/api/bills?start=2025-04-02&end=2025-04-02",
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn half_open_range_is_a_validation_error() {
    let (_dir, state, app) = test_app().await;
    let token = token_for(&state);

    let response = app
        .oneshot(get_authed("/api/bills?start=2025-04-01", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "E0002");
}

#[tokio::test]
async fn public_lookup_serves_html_without_a_token() {
    let (_dir, state, app) = test_app().await;

    state.shop.get_or_create().await.unwrap();
    let bill = state
        .manager
        .create(common::sample_create("2025-04-01", "9876543210"))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get(&format!("/b/{}", bill.url_hash)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("Bill #: 25040101"));
    assert!(html.contains("Asha"));

    // Legacy query-string link shape resolves by id
    let response = app.oneshot(get("/b?id=25040101")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn public_lookup_json_resolves_a_hash() {
    let (_dir, state, app) = test_app().await;

    state.shop.get_or_create().await.unwrap();
    let bill = state
        .manager
        .create(common::sample_create("2025-04-01", "9876543210"))
        .await
        .unwrap();

    let response = app
        .oneshot(get(&format!("/api/public/bills/{}", bill.url_hash)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["bill"]["id"], "25040101");
    assert_eq!(body["bill"]["url_hash"], bill.url_hash);
}

#[tokio::test]
async fn unknown_and_missing_identifiers_render_error_pages() {
    let (_dir, state, app) = test_app().await;
    state.shop.get_or_create().await.unwrap();

    let response = app.clone().oneshot(get("/b/zz9999zz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Bill not found"));

    let response = app.oneshot(get("/b")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(
        body_text(response)
            .await
            .contains("No bill identifier provided")
    );
}

#[tokio::test]
async fn trash_endpoints_drive_the_lifecycle() {
    let (_dir, state, app) = test_app().await;
    let token = token_for(&state);

    let bill = state
        .manager
        .create(common::sample_create("2025-04-01", "9876543210"))
        .await
        .unwrap();
    let id = bill.id.unwrap();

    let request = Request::delete(format!("/api/bills/{id}"))
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_authed("/api/trash", &token))
        .await
        .unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/trash/{id}/restore"),
            &token,
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], id);

    let response = app
        .oneshot(get_authed("/api/trash", &token))
        .await
        .unwrap();
    assert!(body_json(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn shop_update_round_trips() {
    let (_dir, state, app) = test_app().await;
    let token = token_for(&state);

    let request = Request::put("/api/shop")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "name": "Sri Sarees",
                "address": "12 Market Road",
                "phone": "04422334455",
                "gst": "27AAPFU0939F1ZV",
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get_authed("/api/shop", &token)).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["name"], "Sri Sarees");
    assert_eq!(body["gst"], "27AAPFU0939F1ZV");
}

#[tokio::test]
async fn analytics_summary_totals_a_seeded_range() {
    let (_dir, state, app) = test_app().await;
    let token = token_for(&state);

    state
        .manager
        .create(common::sample_create("2025-04-01", "9876543210"))
        .await
        .unwrap();
    let mut upi = common::sample_create("2025-04-02", "9876543211");
    upi.payment_mode = shared::models::PaymentMode::Upi;
    state.manager.create(upi).await.unwrap();
    // Outside the queried range
    state
        .manager
        .create(common::sample_create("2025-05-01", "9876543212"))
        .await
        .unwrap();

    let response = app
        .oneshot(get_authed(
            "/api/analytics/summary?start=2025-04-01&end=2025-04-30",
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["total_bills"], 2);
    assert_eq!(body["total_sales"], 6000.0);
    assert_eq!(body["cash_amount"], 3000.0);
    assert_eq!(body["upi_amount"], 3000.0);
    assert_eq!(body["saree_quantity"], 4);
}

#[tokio::test]
async fn customer_search_matches_name_prefixes() {
    let (_dir, state, app) = test_app().await;
    let token = token_for(&state);

    state
        .manager
        .create(common::sample_create("2025-04-01", "9876543210"))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get_authed("/api/customers/search?q=ash", &token))
        .await
        .unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

    let response = app
        .oneshot(get_authed("/api/customers/search?q=meena", &token))
        .await
        .unwrap();
    assert!(body_json(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn share_payload_carries_the_public_link() {
    let (_dir, state, app) = test_app().await;
    let token = token_for(&state);

    let bill = state
        .manager
        .create(common::sample_create("2025-04-01", "9876543210"))
        .await
        .unwrap();
    let id = bill.id.unwrap();

    let response = app
        .oneshot(get_authed(&format!("/api/bills/{id}/share"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let message = body["message"].as_str().unwrap();
    assert!(message.contains(&bill.url_hash));
    assert!(
        body["whatsapp_link"]
            .as_str()
            .unwrap()
            .starts_with("whatsapp://send?phone=919876543210")
    );
}
