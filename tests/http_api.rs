use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Method, Request, StatusCode,
        header::{ACCESS_CONTROL_REQUEST_METHOD, CONTENT_TYPE, ORIGIN},
    },
};
use chat_paywall::{
    application::usecases::paywall::PaywallUseCase,
    config::config_model::Server,
    domain::repositories::paywall::{MockPaywallRepository, PaywallRepository},
    infrastructure::{axum_http::http_serve, memory::paywall::PaywallInMemory},
};
use serde_json::{Value, json};
use tower::ServiceExt;

fn server(timeout: u64) -> Server {
    Server {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        body_limit: 1,
        timeout,
    }
}

fn app_with<T>(store: Arc<T>) -> Router
where
    T: PaywallRepository + Send + Sync + 'static,
{
    let paywall_usecase = Arc::new(PaywallUseCase::new(store));
    http_serve::app(&server(5), paywall_usecase).unwrap()
}

fn app() -> Router {
    app_with(Arc::new(PaywallInMemory::new()))
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    (status, bytes.to_vec())
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let (status, bytes) = post(app, uri, body).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn chat_owner_flow() {
    let app = app();

    let (status, body) = post(
        &app,
        "/add_new_chat",
        json!({
            "chat_id": 1,
            "owner_id": 9,
            "price": 100,
            "name": "Rust jobs",
            "description": "New postings every day"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());

    let (status, chats) = post_json(&app, "/get_chats", json!({ "owner_id": 9 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        chats,
        json!([{
            "chat_id": 1,
            "name": "Rust jobs",
            "description": "New postings every day",
            "price": 100,
            "is_active": true
        }])
    );

    let (status, _) = post(&app, "/change_price", json!({ "chat_id": 1, "price": 200 })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post(
        &app,
        "/change_description",
        json!({ "chat_id": 1, "description": "Weekly digest" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post(&app, "/disable_chat", json!({ "chat_id": 1 })).await;
    assert_eq!(status, StatusCode::OK);

    let (_, chats) = post_json(&app, "/get_chats", json!({ "owner_id": 9 })).await;
    assert_eq!(chats[0]["price"], 200);
    assert_eq!(chats[0]["description"], "Weekly digest");
    assert_eq!(chats[0]["is_active"], false);
}

#[tokio::test]
async fn subscriber_flow() {
    let app = app();
    let pair = json!({ "chat_id": 1, "user_id": 42 });

    let (status, _) = post(&app, "/new_subscribe", pair.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let (_, exists) = post_json(&app, "/is_subscribe_exist", pair.clone()).await;
    assert_eq!(exists, json!(true));
    let (_, paid) = post_json(&app, "/is_paid", pair.clone()).await;
    assert_eq!(paid, json!(false));

    let (status, _) = post(&app, "/pay", pair.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (_, paid) = post_json(&app, "/is_paid", pair.clone()).await;
    assert_eq!(paid, json!(true));

    let (_, subscribers) = post_json(&app, "/get_all_slaves", json!({ "chat_id": 1 })).await;
    assert_eq!(subscribers, json!([42]));
    let (_, subscriptions) =
        post_json(&app, "/get_all_subscriptions", json!({ "user_id": 42 })).await;
    assert_eq!(subscriptions, json!([1]));
}

#[tokio::test]
async fn duplicate_subscription_is_a_server_error() {
    let app = app();
    let pair = json!({ "chat_id": 1, "user_id": 42 });

    post(&app, "/new_subscribe", pair.clone()).await;
    let (status, body) = post_json(&app, "/new_subscribe", pair).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "failed to add new subscribe" }));
}

#[tokio::test]
async fn malformed_body_is_a_server_error() {
    let app = app();

    let (status, body) = post_json(&app, "/pay", json!({ "chat_id": "one" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "failed to unmarshal" }));
}

#[tokio::test]
async fn non_post_methods_are_not_found() {
    let app = app();

    for (method, uri) in [
        (Method::GET, "/get_chats"),
        (Method::PUT, "/pay"),
        (Method::DELETE, "/disable_chat"),
        (Method::GET, "/is_paid"),
    ] {
        let request = Request::builder()
            .method(method.clone())
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method} {uri}");
    }

    // Browser preflight.
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/pay")
        .header(ORIGIN, "https://example.com")
        .header(ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let app = app();

    let (status, _) = post(&app, "/refund", json!({ "chat_id": 1, "user_id": 42 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn closed_storage_reports_server_error() {
    let store = Arc::new(PaywallInMemory::new());
    let app = app_with(Arc::clone(&store));
    store.close().await.unwrap();

    let (status, body) = post_json(&app, "/get_chats", json!({ "owner_id": 9 })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "failed to get chats by owner id" }));
}

#[tokio::test]
async fn health_check_answers_ok() {
    let app = app();

    let request = Request::builder()
        .uri("/health-check")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn operation_deadline_reports_json_error() {
    let mut paywall_repository = MockPaywallRepository::new();
    paywall_repository
        .expect_get_chats_by_owner()
        .returning(|ctx, _| {
            let ctx = ctx.clone();
            Box::pin(async move { Err(ctx.done().await) })
        });

    let paywall_usecase = Arc::new(PaywallUseCase::new(Arc::new(paywall_repository)));
    let app = http_serve::app(&server(1), paywall_usecase).unwrap();

    let (status, body) = post_json(&app, "/get_chats", json!({ "owner_id": 9 })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "failed to get chats by owner id" }));
}

#[tokio::test]
async fn stuck_request_times_out() {
    let mut paywall_repository = MockPaywallRepository::new();
    paywall_repository
        .expect_get_chats_by_owner()
        .returning(|_, _| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(vec![])
            })
        });

    let paywall_usecase = Arc::new(PaywallUseCase::new(Arc::new(paywall_repository)));
    let app = http_serve::app(&server(1), paywall_usecase).unwrap();

    let (status, _) = post(&app, "/get_chats", json!({ "owner_id": 9 })).await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
}
