//! Router tests that never touch the database.
//!
//! Every request here is answered before a query would run: auth checks,
//! request validation and the per-IP request-rate lock.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{Duration, Utc};
use secrecy::SecretString;
use serde_json::json;

use souk_api::models::AdminUser;
use souk_api::services::auth::TokenService;
use souk_core::lockout::LockoutPolicy;
use souk_core::{AdminUserId, OrderId, ProductId, Username};
use souk_integration_tests::{FormImage, TestApp, empty_request, json_request, multipart_request};

#[tokio::test]
async fn test_health() {
    let app = TestApp::without_database();
    let response = app.send(empty_request("GET", "/health", None)).await;
    assert_eq!(response.0, StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::without_database();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-abc-123")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = app.send(request).await;
    assert_eq!(headers.get("x-request-id").unwrap(), "trace-abc-123");

    let (_, headers, _) = app.send(empty_request("GET", "/health", None)).await;
    assert!(headers.get("x-request-id").is_some());
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::without_database();
    let id = OrderId::generate();

    for (method, uri) in [
        ("GET", "/api/orders".to_string()),
        ("DELETE", "/api/orders".to_string()),
        ("DELETE", format!("/api/orders/{id}")),
        ("GET", "/api/superadmin/analytics".to_string()),
        ("GET", "/api/superadmin/orders".to_string()),
        ("GET", "/api/superadmin/products".to_string()),
        ("GET", "/api/superadmin/contacts".to_string()),
        ("GET", "/api/auth/verify".to_string()),
        ("DELETE", format!("/api/products/{}", ProductId::generate())),
    ] {
        let (status, _, body) = app.send(empty_request(method, &uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body["message"], "Authentication required", "{method} {uri}");
    }
}

#[tokio::test]
async fn test_token_rejections_are_distinguished() {
    let app = TestApp::without_database();

    let (status, _, body) = app
        .send(empty_request("GET", "/api/auth/verify", Some("not-a-jwt")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Malformed token");

    let expired = app.owner_token_at(Utc::now() - Duration::hours(2));
    let (status, _, body) = app
        .send(empty_request("GET", "/api/auth/verify", Some(&expired)))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token expired");

    let forger = TokenService::new(SecretString::from("an0ther-Sign1ng-key/0123456789abc"));
    let owner = AdminUser {
        id: AdminUserId::generate(),
        username: Username::parse("owner").unwrap(),
        created_at: Utc::now(),
    };
    let forged = forger.issue(&owner, Utc::now()).unwrap().token;
    let (status, _, body) = app
        .send(empty_request("GET", "/api/auth/verify", Some(&forged)))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn test_verify_accepts_valid_token() {
    let app = TestApp::without_database();
    let token = app.owner_token();

    let (status, _, body) = app
        .send(empty_request("GET", "/api/auth/verify", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["username"], "owner");
    assert!(body["expiresAt"].is_string());
}

#[tokio::test]
async fn test_checkout_validation() {
    let app = TestApp::without_database();

    let (status, _, body) = app
        .send(json_request(
            "POST",
            "/api/orders",
            &json!({ "products": [{ "id": ProductId::generate(), "quantity": 1 }], "phone": "", "city": "Addis Ababa", "location": "Bole" }),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "All fields are required");

    let (status, _, _) = app
        .send(json_request(
            "POST",
            "/api/orders",
            &json!({ "products": [], "phone": "0911", "city": "Addis Ababa", "location": "Bole" }),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = app
        .send(json_request("POST", "/api/orders", &json!({ "products": "nope" }), None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_order_state_must_be_canonical() {
    let app = TestApp::without_database();
    let token = app.owner_token();
    let uri = format!("/api/orders/{}", OrderId::generate());

    for state in ["pending", "Shipped", ""] {
        let (status, _, _) = app
            .send(json_request("PUT", &uri, &json!({ "state": state }), Some(&token)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "state {state:?}");
    }

    let (status, _, body) = app
        .send(json_request(
            "PUT",
            "/api/orders/not-a-uuid",
            &json!({ "state": "Delivered" }),
            Some(&token),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid order id");
}

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

#[tokio::test]
async fn test_product_create_requires_all_fields() {
    let app = TestApp::without_database();
    let token = app.owner_token();

    let request = multipart_request(
        "POST",
        "/api/products",
        &[("title", "Red Mug"), ("price", "120")],
        None,
        Some(&token),
    );
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "All fields and image are required");
}

#[tokio::test]
async fn test_product_create_rejects_unsupported_image() {
    let app = TestApp::without_database();
    let token = app.owner_token();

    let request = multipart_request(
        "POST",
        "/api/products",
        &[("title", "Red Mug"), ("description", "A mug"), ("price", "120")],
        Some(FormImage {
            filename: "mug.gif",
            content_type: "image/gif",
            bytes: b"GIF89a",
        }),
        Some(&token),
    );
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("png"));
}

#[tokio::test]
async fn test_product_create_rejects_unstorable_price() {
    let app = TestApp::without_database();
    let token = app.owner_token();

    // The asset host is unreachable here, so a 400 means nothing was uploaded
    for (price, message) in [
        ("12345678901234", "price cannot exceed 99999999.99"),
        ("100000000", "price cannot exceed 99999999.99"),
        ("-5", "price cannot be negative"),
        ("twelve", "invalid price: twelve"),
    ] {
        let request = multipart_request(
            "POST",
            "/api/products",
            &[("title", "Red Mug"), ("description", "A mug"), ("price", price)],
            Some(FormImage {
                filename: "mug.png",
                content_type: "image/png",
                bytes: PNG,
            }),
            Some(&token),
        );
        let (status, _, body) = app.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "price {price:?}");
        assert_eq!(body["message"], message);
    }
}

#[tokio::test]
async fn test_security_log_requires_reason() {
    let app = TestApp::without_database();
    let (status, _, body) = app
        .send(json_request("POST", "/api/security/log", &json!({ "reason": "  " }), None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Reason is required");
}

#[tokio::test]
async fn test_request_rate_lock() {
    let app = TestApp::with_policy(LockoutPolicy {
        rate_max_requests: 5,
        ..LockoutPolicy::default()
    });
    let empty_report = || json_request("POST", "/api/security/log", &json!({}), None);

    for _ in 0..5 {
        let (status, _, _) = app.send(empty_report()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, headers, body) = app.send(empty_report()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    let retry: i64 = headers
        .get(header::RETRY_AFTER)
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry > 0 && retry <= 300);
    assert!(body["lockedUntil"].is_string());

    // Other clients are unaffected
    let request = Request::builder()
        .method("POST")
        .uri("/api/security/log")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "203.0.113.99")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Health checks are outside /api
    let (status, _, _) = app.send(empty_request("GET", "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unreachable_database_is_a_hidden_500() {
    let app = TestApp::without_database();
    let (status, _, body) = app.send(empty_request("GET", "/api/products", None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Internal server error");

    let (status, _, _) = app.send(empty_request("GET", "/health/ready", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
