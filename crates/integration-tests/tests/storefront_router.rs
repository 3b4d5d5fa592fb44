//! Storefront router tests.
//!
//! These drive the full application router, middleware stack included,
//! through `tower::ServiceExt::oneshot`. The database is never reachable,
//! so these cover the behaviour that must hold before a query succeeds.
//!
//! Run with: `cargo test -p technova-integration-tests --test storefront_router`

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use technova_integration_tests::offline_app;

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(body))
        .unwrap()
}

async fn html(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

#[tokio::test]
async fn test_health_is_ok_without_database() {
    let response = offline_app().unwrap().oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let response = offline_app()
        .unwrap()
        .oneshot(get("/health/ready"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_every_response_carries_request_id_and_security_headers() {
    let response = offline_app().unwrap().oneshot(get("/health")).await.unwrap();
    let headers = response.headers();

    let request_id = headers.get("x-request-id").unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(request_id).is_ok());
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert!(headers.contains_key("content-security-policy"));
}

#[tokio::test]
async fn test_upstream_request_id_is_echoed() {
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "edge-4242")
        .body(Body::empty())
        .unwrap();
    let response = offline_app().unwrap().oneshot(request).await.unwrap();

    assert_eq!(response.headers().get("x-request-id").unwrap(), "edge-4242");
}

#[tokio::test]
async fn test_customer_pages_redirect_anonymous_visitors_to_login() {
    for uri in ["/orders", "/checkout", "/wishlist", "/account"] {
        let response = offline_app().unwrap().oneshot(get(uri)).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), "/auth/login", "{uri}");
    }
}

#[tokio::test]
async fn test_staff_pages_redirect_anonymous_visitors_to_login() {
    for uri in ["/admin", "/admin/orders", "/admin/reviews"] {
        let response = offline_app().unwrap().oneshot(get(uri)).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), "/auth/login", "{uri}");
    }
}

#[tokio::test]
async fn test_login_page_renders_when_navigation_cannot_load() {
    let response = offline_app()
        .unwrap()
        .oneshot(get("/auth/login"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("name=\"password\""));
}

#[tokio::test]
async fn test_static_assets_are_served() {
    let response = offline_app()
        .unwrap()
        .oneshot(get("/static/css/main.css"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = offline_app()
        .unwrap()
        .oneshot(get("/no-such-page"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_logout_requires_post() {
    let response = offline_app()
        .unwrap()
        .oneshot(get("/auth/logout"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_contact_page_renders_subjects_and_footer_signup() {
    let response = offline_app().unwrap().oneshot(get("/contact")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = html(response).await;
    assert!(html.contains("<option value=\"support\""));
    assert!(html.contains("action=\"/newsletter/subscribe\""));
}

#[tokio::test]
async fn test_newsletter_rejects_bad_address_without_database() {
    let response = offline_app()
        .unwrap()
        .oneshot(post_form("/newsletter/subscribe", "email=not-an-address"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?error=invalid_email");
}

#[tokio::test]
async fn test_invalid_contact_message_is_shown_again_with_error() {
    let response = offline_app()
        .unwrap()
        .oneshot(post_form(
            "/contact",
            "name=Ana+Perez&email=ana%40example.com&subject=sales&message=+",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = html(response).await;
    assert!(html.contains("Please write a message."));
    assert!(html.contains("value=\"Ana Perez\""));
    assert!(html.contains("<option value=\"sales\" selected>"));
}
