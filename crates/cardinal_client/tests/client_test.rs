//! Client lifecycle tests.

mod test_utils;

use cardinal_api::{ApiConfig, WHOAMI_PATH};
use cardinal_client::Client;
use cardinal_error::{CardinalErrorKind, ClientErrorKind};
use cardinal_interface::Method;
use serde_json::json;
use std::sync::Arc;
use test_utils::*;

#[tokio::test]
async fn test_requests_before_login_fail_not_connected() {
    let client = Client::new(ApiConfig::default());

    assert!(!client.is_connected());
    assert!(client.token().is_none());

    let err = client
        .guilds()
        .resolve(GUILD)
        .await
        .expect_err("no transport installed");

    match err.kind() {
        CardinalErrorKind::Client(client_err) => {
            assert_eq!(client_err.kind, ClientErrorKind::NotConnected)
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(client.connect().await.is_err());
}

#[tokio::test]
async fn test_connect_returns_user() {
    let transport = Arc::new(MockTransport::new());
    transport.on(
        Method::Get,
        WHOAMI_PATH,
        MockResponse::Json(json!({ "username": "cardinal-bot" })),
    );
    let client = client_with(&transport);

    let user = client.connect().await.expect("connect should succeed");

    assert_eq!(user.username(), "cardinal-bot");
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_connect_three_server_errors() {
    let transport = Arc::new(MockTransport::new());
    transport.on(Method::Get, WHOAMI_PATH, MockResponse::Status(500));
    let client = client_with(&transport);

    let err = client.connect().await.expect_err("all attempts fail");

    assert_eq!(err.status(), Some(500));
    assert_eq!(transport.count(Method::Get, WHOAMI_PATH), 3);
}

#[tokio::test]
async fn test_clones_share_caches() {
    let transport = Arc::new(MockTransport::new());
    let client = client_with(&transport);
    let guild = resolved_guild(&transport, &client).await;

    let other = client.clone();
    let cached = other.guilds().cached(GUILD).expect("shared cache");

    assert!(Arc::ptr_eq(&guild, &cached));
}

#[tokio::test]
async fn test_failed_login_leaves_client_disconnected() {
    let config = ApiConfig::default()
        .with_base_url("http://127.0.0.1:9".to_string())
        .with_max_attempts(1)
        .with_timeout_secs(1);
    let client = Client::new(config);

    assert!(client.login("bad-token").await.is_err());

    assert!(!client.is_connected());
    assert!(client.token().is_none());
}

#[cfg(feature = "api")]
#[tokio::test]
async fn test_live_login() {
    let token = std::env::var("CARDINAL_TOKEN").expect("CARDINAL_TOKEN not set");
    let config = ApiConfig::load().expect("configuration should load");
    let client = Client::new(config);

    let returned = client.login(token.clone()).await.expect("login should succeed");

    assert_eq!(returned, token);
    assert_eq!(client.token(), Some(token));
}
